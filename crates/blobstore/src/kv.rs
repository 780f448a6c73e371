//! Embedded key/value blob backend
//!
//! One sled database per network. Keys are fingerprints, values the raw
//! XML. sled's insert is atomic per key, which already collapses concurrent
//! puts of identical content to one stored copy; durability follows the
//! engine's flush semantics (`clean_and_optimize` forces one).

use std::path::Path;

use tracing::debug;

use oaistore_core::{Result, StoreError};

use crate::hasher::ContentHasher;
use crate::store::MetadataStore;

/// sled-backed blob store for one network partition
pub struct KvBlobStore {
    db: sled::Db,
    hasher: Box<dyn ContentHasher>,
}

impl KvBlobStore {
    /// Open (creating if needed) the database under the given directory
    pub fn open(path: impl AsRef<Path>, hasher: Box<dyn ContentHasher>) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| StoreError::store_io_with_source("open kv blob store", e))?;
        Ok(KvBlobStore { db, hasher })
    }
}

impl MetadataStore for KvBlobStore {
    fn put(&self, content: &str) -> Result<String> {
        let hash = self.hasher.fingerprint(content);
        if self
            .db
            .contains_key(hash.as_bytes())
            .map_err(|e| StoreError::store_io_with_source("probe kv blob", e))?
        {
            return Ok(hash);
        }
        self.db
            .insert(hash.as_bytes(), content.as_bytes())
            .map_err(|e| StoreError::store_io_with_source("insert kv blob", e))?;
        Ok(hash)
    }

    fn get(&self, hash: &str) -> Result<String> {
        let value = self
            .db
            .get(hash.as_bytes())
            .map_err(|e| StoreError::store_io_with_source("read kv blob", e))?
            .ok_or_else(|| StoreError::not_found(format!("metadata blob {}", hash)))?;
        String::from_utf8(value.to_vec())
            .map_err(|_| StoreError::parse(format!("blob {} is not valid UTF-8", hash)))
    }

    fn delete(&self, hash: &str) -> Result<bool> {
        let removed = self
            .db
            .remove(hash.as_bytes())
            .map_err(|e| StoreError::store_io_with_source("delete kv blob", e))?;
        Ok(removed.is_some())
    }

    fn for_each_hash(&self, consumer: &mut dyn FnMut(&str)) -> Result<()> {
        for item in self.db.iter() {
            let (key, _) = item.map_err(|e| StoreError::store_io_with_source("scan kv blobs", e))?;
            if let Ok(hash) = std::str::from_utf8(&key) {
                consumer(hash);
            }
        }
        Ok(())
    }

    fn clean_and_optimize(&self) -> Result<bool> {
        let flushed = self
            .db
            .flush()
            .map_err(|e| StoreError::store_io_with_source("flush kv blob store", e))?;
        debug!(bytes = flushed, "flushed kv blob store");
        Ok(true)
    }
}
