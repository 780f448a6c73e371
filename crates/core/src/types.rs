//! Domain types shared across the workspace
//!
//! Snapshots, networks, catalog records, and validation facts. Everything
//! that is persisted (metadata.json, validation_stats.json) derives
//! `Serialize`/`Deserialize`; Parquet rows are encoded column-wise by the
//! records crate and do not go through serde.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::limits::truncate_identifier;

/// Snapshot identifier, monotone and unique within one store
pub type SnapshotId = i64;

/// Compute the catalog record id for an OAI identifier
///
/// Record ids are the lowercase hex MD5 of the (already truncated)
/// identifier. Identical identifiers map to identical ids across snapshots.
pub fn record_id(identifier: &str) -> String {
    format!("{:x}", md5::compute(identifier.as_bytes()))
}

/// Current time as epoch milliseconds (UTC)
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Sanitize a network acronym for use as a filesystem partition key
///
/// Uppercases and replaces every run of non-alphanumeric characters with a
/// single `_`.
pub fn sanitize_acronym(acronym: &str) -> String {
    let mut out = String::with_capacity(acronym.len());
    let mut in_run = false;
    for c in acronym.chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_uppercase());
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Flattened reference to the network that owns a snapshot
///
/// Networks are an external collaborator; the core only needs an opaque
/// numeric id plus the acronym used as a filesystem partition key. This
/// flattened DTO is the canonical shape; rows and cache keys never carry a
/// live network handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRef {
    /// Opaque network id assigned by the external registry
    pub network_id: i64,
    /// Acronym as registered (unsanitized)
    pub acronym: String,
}

impl NetworkRef {
    /// Create a network reference
    pub fn new(network_id: i64, acronym: impl Into<String>) -> Self {
        NetworkRef {
            network_id,
            acronym: acronym.into(),
        }
    }

    /// Acronym sanitized for filesystem use
    pub fn sanitized_acronym(&self) -> String {
        sanitize_acronym(&self.acronym)
    }
}

/// Snapshot plus the network that owns it
///
/// Carried by every operation that needs to resolve on-disk paths for a
/// snapshot. Records never hold this back-reference; readers dereference it
/// at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// Snapshot id
    pub id: SnapshotId,
    /// Owning network
    pub network: NetworkRef,
}

impl SnapshotMeta {
    /// Create a snapshot meta handle
    pub fn new(id: SnapshotId, network: NetworkRef) -> Self {
        SnapshotMeta { id, network }
    }
}

/// Lifecycle status of a snapshot
///
/// Transitions are enforced by the snapshot store; see its documentation
/// for the full table. There is no separate VALIDATING state; `Valid` is
/// the working state of the validation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotStatus {
    /// Records are being written to the catalog
    Harvesting,
    /// Harvest completed without a fatal error
    HarvestingFinishedValid,
    /// Harvest aborted with a fatal error
    HarvestingFinishedError,
    /// A failed harvest is being retried
    Retrying,
    /// Validation working/final state
    Valid,
    /// Logical tombstone
    Deleted,
}

impl SnapshotStatus {
    /// Stable string form (matches the persisted representation)
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotStatus::Harvesting => "HARVESTING",
            SnapshotStatus::HarvestingFinishedValid => "HARVESTING_FINISHED_VALID",
            SnapshotStatus::HarvestingFinishedError => "HARVESTING_FINISHED_ERROR",
            SnapshotStatus::Retrying => "RETRYING",
            SnapshotStatus::Valid => "VALID",
            SnapshotStatus::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Full-text index status of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexStatus {
    /// Not known to be indexed
    #[default]
    Unknown,
    /// Handed to the full-text indexer
    Indexed,
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexStatus::Unknown => write!(f, "UNKNOWN"),
            IndexStatus::Indexed => write!(f, "INDEXED"),
        }
    }
}

/// Validation-status filter for lightweight record scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Only records that passed validation
    Valid,
    /// Only records that failed validation
    Invalid,
    /// No filter
    Untested,
}

impl RecordStatus {
    /// Whether an observation with the given validity flag passes this filter
    pub fn accepts(&self, record_is_valid: bool) -> bool {
        match self {
            RecordStatus::Valid => record_is_valid,
            RecordStatus::Invalid => !record_is_valid,
            RecordStatus::Untested => true,
        }
    }
}

/// Immutable catalog entry for one harvested record
///
/// Written once per snapshot, never rewritten. `id` is the MD5 of the
/// identifier; `original_metadata_hash` is the blob fingerprint of the
/// harvested XML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OaiRecord {
    /// MD5(identifier), lowercase hex
    pub id: String,
    /// OAI identifier, truncated to 255 characters
    pub identifier: String,
    /// Datestamp, epoch milliseconds UTC
    pub datestamp: i64,
    /// Blob fingerprint of the original harvested metadata
    pub original_metadata_hash: String,
    /// Whether the remote repository reported the record deleted
    pub deleted: bool,
}

impl OaiRecord {
    /// Create a record, truncating the identifier and deriving the id
    pub fn new(
        identifier: impl Into<String>,
        datestamp: i64,
        original_metadata_hash: impl Into<String>,
        deleted: bool,
    ) -> Self {
        let identifier = truncate_identifier(&identifier.into()).to_string();
        OaiRecord {
            id: record_id(&identifier),
            identifier,
            datestamp,
            original_metadata_hash: original_metadata_hash.into(),
            deleted,
        }
    }
}

/// One validation rule outcome for one record
///
/// `is_valid` is asserted by the producer; readers must not reinterpret the
/// occurrence lists against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFact {
    /// Rule identifier
    pub rule_id: i32,
    /// Occurrence strings that satisfied the rule
    pub valid_occurrences: Vec<String>,
    /// Occurrence strings that violated the rule
    pub invalid_occurrences: Vec<String>,
    /// Whether the rule as a whole passed for this record
    pub is_valid: bool,
}

impl RuleFact {
    /// Create a rule fact
    pub fn new(
        rule_id: i32,
        valid_occurrences: Vec<String>,
        invalid_occurrences: Vec<String>,
        is_valid: bool,
    ) -> Self {
        RuleFact {
            rule_id,
            valid_occurrences,
            invalid_occurrences,
            is_valid,
        }
    }
}

/// Per-record validation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordValidation {
    /// OAI identifier (truncated to 255 characters)
    pub identifier: String,
    /// Datestamp, epoch milliseconds UTC
    pub datestamp: i64,
    /// Whether the record as a whole passed validation
    pub record_is_valid: bool,
    /// Whether a published (post-transform) variant exists
    pub is_transformed: bool,
    /// Blob fingerprint of the published metadata, if any
    pub published_metadata_hash: Option<String>,
    /// Ordered per-rule outcomes; may be empty
    pub rule_facts: Vec<RuleFact>,
}

impl RecordValidation {
    /// Create a validation outcome with no rule facts
    pub fn new(identifier: impl Into<String>, datestamp: i64, record_is_valid: bool) -> Self {
        let identifier = truncate_identifier(&identifier.into()).to_string();
        RecordValidation {
            identifier,
            datestamp,
            record_is_valid,
            is_transformed: false,
            published_metadata_hash: None,
            rule_facts: Vec::new(),
        }
    }

    /// Set the transformed flag
    pub fn with_transformed(mut self, is_transformed: bool) -> Self {
        self.is_transformed = is_transformed;
        self
    }

    /// Set the published metadata fingerprint
    pub fn with_published_hash(mut self, hash: impl Into<String>) -> Self {
        self.published_metadata_hash = Some(hash.into());
        self
    }

    /// Append a rule fact
    pub fn with_fact(mut self, fact: RuleFact) -> Self {
        self.rule_facts.push(fact);
        self
    }

    /// Catalog record id of this record (MD5 of the identifier)
    pub fn record_id(&self) -> String {
        record_id(&self.identifier)
    }

    /// Project to the lightweight shape (drops rule facts)
    pub fn observation(&self) -> RecordObservation {
        RecordObservation {
            identifier: self.identifier.clone(),
            datestamp: self.datestamp,
            record_is_valid: self.record_is_valid,
            is_transformed: self.is_transformed,
            published_metadata_hash: self.published_metadata_hash.clone(),
        }
    }
}

/// Lightweight projection of a validation outcome (no rule facts)
///
/// Persisted as the single overwriteable `validation_index.parquet` file.
/// At roughly 35 bytes per record a ten-million-record load stays near
/// 350 MB, which large filter/scan operations accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordObservation {
    /// OAI identifier
    pub identifier: String,
    /// Datestamp, epoch milliseconds UTC
    pub datestamp: i64,
    /// Whether the record passed validation
    pub record_is_valid: bool,
    /// Whether a published variant exists
    pub is_transformed: bool,
    /// Blob fingerprint of the published metadata, if any
    pub published_metadata_hash: Option<String>,
}

impl RecordObservation {
    /// Catalog record id of this record (MD5 of the identifier)
    pub fn record_id(&self) -> String {
        record_id(&self.identifier)
    }
}
