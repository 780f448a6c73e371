//! The blob store capability trait

use oaistore_core::Result;

/// Content-addressed store for metadata payloads
///
/// One instance serves one network partition. Implementations are safe to
/// share across threads; writes funnel through whatever synchronization the
/// backend needs, reads are unserialized.
pub trait MetadataStore: Send + Sync {
    /// Store content, returning its fingerprint
    ///
    /// Idempotent: putting identical content again returns the same
    /// fingerprint and must not change the stored bytes. Concurrent puts of
    /// the same content resolve to a single physical copy.
    fn put(&self, content: &str) -> Result<String>;

    /// Fetch content by fingerprint
    ///
    /// Fails with `NotFound` when the fingerprint is absent.
    fn get(&self, hash: &str) -> Result<String>;

    /// Remove content by fingerprint
    ///
    /// Returns whether a deletion occurred.
    fn delete(&self, hash: &str) -> Result<bool>;

    /// Invoke `consumer` for every fingerprint in this partition
    ///
    /// No ordering guarantee. Safe to run alongside concurrent writers
    /// because writers publish atomically; a concurrently written blob may
    /// or may not be visited.
    fn for_each_hash(&self, consumer: &mut dyn FnMut(&str)) -> Result<()>;

    /// Opportunistic compaction (vacuum / repack)
    ///
    /// Reports success without guaranteeing a byte-level reduction.
    fn clean_and_optimize(&self) -> Result<bool>;
}
