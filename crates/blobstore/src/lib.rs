//! Content-addressed metadata blob store
//!
//! XML payloads are stored once per content fingerprint and shared by every
//! snapshot of the owning network. Three interchangeable backends honor the
//! same contract:
//!
//! - `FsBlobStore`: gzip files under a three-level hex-nibble partition
//! - `SqlBlobStore`: embedded SQLite, `(hash PRIMARY KEY, content)`
//! - `KvBlobStore`: embedded key/value database (sled)
//!
//! All backends guarantee: `put` is idempotent (repeated puts of the same
//! content never create a second physical copy), `get` of a missing
//! fingerprint is `NotFound`, and a returned `put` is at least as durable
//! as the filesystem's fsync-at-flush semantics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fs;
pub mod hasher;
pub mod kv;
pub mod pool;
pub mod sql;
pub mod store;

pub use fs::FsBlobStore;
pub use hasher::{ContentHasher, Md5Hasher, Sha256Hasher};
pub use kv::KvBlobStore;
pub use pool::{BlobStorePool, HashAlgorithm};
pub use sql::SqlBlobStore;
pub use store::MetadataStore;
