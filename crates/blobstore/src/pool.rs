//! Per-network handle pool
//!
//! At most one live backend handle exists per sanitized network acronym.
//! Creation is serialized under the pool lock; the returned `Arc` is shared
//! by all callers, so pure reads run unserialized while the backend's own
//! synchronization covers writes. Handles live until the pool is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use oaistore_core::{BlobBackend, NetworkRef, Result, StoreConfig, StorePaths};

use crate::fs::FsBlobStore;
use crate::hasher::{ContentHasher, Md5Hasher, Sha256Hasher};
use crate::kv::KvBlobStore;
use crate::sql::SqlBlobStore;
use crate::store::MetadataStore;

/// Fingerprint algorithm selection for the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// MD5 (legacy-compatible fingerprints)
    #[default]
    Md5,
    /// SHA-256
    Sha256,
}

impl HashAlgorithm {
    fn hasher(&self) -> Box<dyn ContentHasher> {
        match self {
            HashAlgorithm::Md5 => Box::new(Md5Hasher),
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher),
        }
    }
}

/// Pool of per-network blob store handles
pub struct BlobStorePool {
    config: StoreConfig,
    paths: StorePaths,
    algorithm: HashAlgorithm,
    handles: Mutex<HashMap<String, Arc<dyn MetadataStore>>>,
}

impl BlobStorePool {
    /// Create a pool using the configured backend and MD5 fingerprints
    pub fn new(config: StoreConfig) -> Self {
        Self::with_algorithm(config, HashAlgorithm::Md5)
    }

    /// Create a pool with an explicit fingerprint algorithm
    pub fn with_algorithm(config: StoreConfig, algorithm: HashAlgorithm) -> Self {
        let paths = StorePaths::new(&config.base_path);
        BlobStorePool {
            config,
            paths,
            algorithm,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Get (opening on first use) the blob store of a network
    pub fn store_for(&self, network: &NetworkRef) -> Result<Arc<dyn MetadataStore>> {
        let key = network.sanitized_acronym();
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&key) {
            return Ok(handle.clone());
        }

        let handle: Arc<dyn MetadataStore> = match self.config.blob_backend {
            BlobBackend::Fs => Arc::new(FsBlobStore::open(
                self.paths.metadata_dir(network),
                self.algorithm.hasher(),
            )?),
            BlobBackend::Sql => Arc::new(SqlBlobStore::open(
                self.paths.sqlite_file(network),
                self.algorithm.hasher(),
                self.config.catalog_batch_size,
            )?),
            BlobBackend::Kv => Arc::new(KvBlobStore::open(
                self.paths.kv_dir(network),
                self.algorithm.hasher(),
            )?),
        };
        debug!(network = %key, backend = ?self.config.blob_backend, "opened blob store");
        handles.insert(key, handle.clone());
        Ok(handle)
    }

    /// Drop every open handle
    ///
    /// Backends flush on drop; subsequent `store_for` calls reopen.
    pub fn close_all(&self) {
        self.handles.lock().clear();
    }
}
