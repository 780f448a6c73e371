//! On-disk layout
//!
//! Every path the store touches is derived here, rooted at the configured
//! base path. The layout is:
//!
//! ```text
//! {base_path}/
//!   {SANITIZED_ACRONYM}/
//!     metadata/{H1}/{H2}/{H3}/{FULL_HASH}.xml.gz    # FS blob backend
//!     {SANITIZED_ACRONYM}.sqlite                    # SQL blob backend
//!     kv/                                           # KV blob backend
//!     snapshots/snapshot_{id}/
//!       metadata.json
//!       catalog/oai_records_batch_{N}.parquet
//!       validation/records_batch_{N}.parquet
//!       validation/validation_index.parquet
//!       validation/validation_stats.json
//! ```
//!
//! The hex-nibble partition uses the first three characters of the
//! uppercase fingerprint.

use std::path::{Path, PathBuf};

use crate::types::{NetworkRef, SnapshotId};

/// Path derivations rooted at the store base path
#[derive(Debug, Clone)]
pub struct StorePaths {
    base: PathBuf,
}

impl StorePaths {
    /// Create paths rooted at the given base directory
    pub fn new(base: impl AsRef<Path>) -> Self {
        StorePaths {
            base: base.as_ref().to_path_buf(),
        }
    }

    /// Root of the store
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Partition directory of a network
    pub fn network_root(&self, network: &NetworkRef) -> PathBuf {
        self.base.join(network.sanitized_acronym())
    }

    /// Root of the FS blob backend for a network
    pub fn metadata_dir(&self, network: &NetworkRef) -> PathBuf {
        self.network_root(network).join("metadata")
    }

    /// Blob file for a fingerprint (FS backend)
    pub fn blob_file(&self, network: &NetworkRef, hash: &str) -> PathBuf {
        let upper = hash.to_uppercase();
        let mut chars = upper.chars();
        let h1 = chars.next().unwrap_or('0').to_string();
        let h2 = chars.next().unwrap_or('0').to_string();
        let h3 = chars.next().unwrap_or('0').to_string();
        self.metadata_dir(network)
            .join(h1)
            .join(h2)
            .join(h3)
            .join(format!("{}.xml.gz", hash))
    }

    /// SQLite database file of a network (SQL backend)
    pub fn sqlite_file(&self, network: &NetworkRef) -> PathBuf {
        let acronym = network.sanitized_acronym();
        self.network_root(network)
            .join(format!("{}.sqlite", acronym))
    }

    /// Key/value database directory of a network (KV backend)
    pub fn kv_dir(&self, network: &NetworkRef) -> PathBuf {
        self.network_root(network).join("kv")
    }

    /// Snapshots directory of a network
    pub fn snapshots_dir(&self, network: &NetworkRef) -> PathBuf {
        self.network_root(network).join("snapshots")
    }

    /// Directory of one snapshot
    pub fn snapshot_dir(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.snapshots_dir(network).join(format!("snapshot_{}", id))
    }

    /// Lifecycle metadata file of one snapshot
    pub fn snapshot_metadata_file(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.snapshot_dir(network, id).join("metadata.json")
    }

    /// Catalog directory of one snapshot
    pub fn catalog_dir(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.snapshot_dir(network, id).join("catalog")
    }

    /// Validation directory of one snapshot
    pub fn validation_dir(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.snapshot_dir(network, id).join("validation")
    }

    /// Lightweight index file of one snapshot
    pub fn validation_index_file(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.validation_dir(network, id).join("validation_index.parquet")
    }

    /// Aggregated validation stats file of one snapshot
    pub fn validation_stats_file(&self, network: &NetworkRef, id: SnapshotId) -> PathBuf {
        self.validation_dir(network, id).join("validation_stats.json")
    }
}

/// Name of a catalog batch file
pub fn catalog_batch_name(index: usize) -> String {
    format!("oai_records_batch_{}.parquet", index)
}

/// Name of a validation batch file
pub fn validation_batch_name(index: usize) -> String {
    format!("records_batch_{}.parquet", index)
}

/// Parse the batch index out of a batch file name
///
/// Accepts both catalog and validation batch names. Returns `None` for
/// anything else (including in-progress temporaries).
pub fn parse_batch_index(file_name: &str) -> Option<usize> {
    let stem = file_name.strip_suffix(".parquet")?;
    let idx = stem
        .strip_prefix("oai_records_batch_")
        .or_else(|| stem.strip_prefix("records_batch_"))?;
    idx.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> NetworkRef {
        NetworkRef::new(3, "open-repo ar")
    }

    #[test]
    fn test_network_root_uses_sanitized_acronym() {
        let paths = StorePaths::new("/data");
        assert_eq!(
            paths.network_root(&network()),
            PathBuf::from("/data/OPEN_REPO_AR")
        );
    }

    #[test]
    fn test_blob_file_three_level_partition() {
        let paths = StorePaths::new("/data");
        let file = paths.blob_file(&network(), "ab3f00");
        assert_eq!(
            file,
            PathBuf::from("/data/OPEN_REPO_AR/metadata/A/B/3/ab3f00.xml.gz")
        );
    }

    #[test]
    fn test_snapshot_layout() {
        let paths = StorePaths::new("/data");
        let net = network();
        assert_eq!(
            paths.snapshot_dir(&net, 7),
            PathBuf::from("/data/OPEN_REPO_AR/snapshots/snapshot_7")
        );
        assert_eq!(
            paths.snapshot_metadata_file(&net, 7),
            PathBuf::from("/data/OPEN_REPO_AR/snapshots/snapshot_7/metadata.json")
        );
        assert_eq!(
            paths.catalog_dir(&net, 7),
            PathBuf::from("/data/OPEN_REPO_AR/snapshots/snapshot_7/catalog")
        );
        assert_eq!(
            paths.validation_index_file(&net, 7),
            PathBuf::from(
                "/data/OPEN_REPO_AR/snapshots/snapshot_7/validation/validation_index.parquet"
            )
        );
    }

    #[test]
    fn test_sqlite_file_named_after_acronym() {
        let paths = StorePaths::new("/data");
        assert_eq!(
            paths.sqlite_file(&network()),
            PathBuf::from("/data/OPEN_REPO_AR/OPEN_REPO_AR.sqlite")
        );
    }

    #[test]
    fn test_batch_names_round_trip() {
        assert_eq!(catalog_batch_name(1), "oai_records_batch_1.parquet");
        assert_eq!(validation_batch_name(12), "records_batch_12.parquet");
        assert_eq!(parse_batch_index("oai_records_batch_1.parquet"), Some(1));
        assert_eq!(parse_batch_index("records_batch_12.parquet"), Some(12));
        assert_eq!(parse_batch_index("validation_index.parquet"), None);
        assert_eq!(
            parse_batch_index("oai_records_batch_2.parquet.inprogress"),
            None
        );
    }

    #[test]
    fn test_batch_index_ordering_is_write_order() {
        // Numeric ordering, not raw string ordering: batch 10 follows batch 9.
        let mut names = vec![
            catalog_batch_name(10),
            catalog_batch_name(2),
            catalog_batch_name(1),
        ];
        names.sort_by_key(|n| parse_batch_index(n).unwrap());
        assert_eq!(
            names,
            vec![
                catalog_batch_name(1),
                catalog_batch_name(2),
                catalog_batch_name(10)
            ]
        );
    }
}
