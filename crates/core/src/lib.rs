//! Core types for the OAI snapshot store
//!
//! This crate defines the foundational types used throughout the system:
//! - NetworkRef: flattened reference to a harvested network
//! - SnapshotStatus / IndexStatus: lifecycle states of a snapshot
//! - OaiRecord: immutable catalog entry for one harvested record
//! - RecordValidation / RuleFact: per-record derived validation state
//! - StoreError: unified error type
//! - StoreConfig: configuration recognized by the core
//! - StorePaths: on-disk layout rooted at the configured base path

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod limits;
pub mod paths;
pub mod signal;
pub mod types;

pub use config::{BlobBackend, ConfigError, ParquetCompression, StoreConfig};
pub use error::{Result, StoreError};
pub use limits::{truncate_identifier, MAX_IDENTIFIER_LENGTH};
pub use paths::StorePaths;
pub use signal::StopSignal;
pub use types::{
    epoch_millis, record_id, sanitize_acronym, IndexStatus, NetworkRef, OaiRecord, RecordStatus,
    RecordValidation, RuleFact, RecordObservation, SnapshotId, SnapshotMeta, SnapshotStatus,
};
