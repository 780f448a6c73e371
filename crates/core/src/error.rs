//! Error types for the OAI snapshot store
//!
//! A single unified error type is shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Error categories:
//!
//! - **Not Found**: snapshot id, record id, or blob fingerprint absent
//! - **Store I/O**: filesystem, database, or Parquet failure
//! - **Parse**: XML parse, field-address compile, or transform fault
//! - **State**: operation not permitted in the current lifecycle state
//! - **Invalid**: malformed input (missing fields, unknown format pair,
//!   malformed filter)

use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for all store operations
///
/// All public APIs in the workspace return `Result<T>`. Errors are explicit
/// returns from the operation that observed them; nothing retries
/// internally.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A snapshot, record, or blob fingerprint was not found
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing entity
        what: String,
    },

    /// Underlying filesystem, database, or Parquet I/O failure
    #[error("store I/O error: {message}")]
    StoreIo {
        /// What failed
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// XML parse, field-address compile, or transform error
    #[error("parse error: {message}")]
    Parse {
        /// What could not be parsed
        message: String,
    },

    /// Operation not permitted in the current lifecycle state
    #[error("illegal state: {message}")]
    State {
        /// Why the operation was rejected
        message: String,
    },

    /// Malformed input: missing required fields, malformed filter, bad value
    #[error("invalid: {message}")]
    Invalid {
        /// Description of the invalid input
        message: String,
    },

    /// No transformer registered for the requested format pair
    #[error("no transformer registered for {source_format} -> {target_format}")]
    TransformerNotFound {
        /// Requested source format
        source_format: String,
        /// Requested target format
        target_format: String,
    },
}

impl StoreError {
    /// Create a NotFound error
    pub fn not_found(what: impl Into<String>) -> Self {
        StoreError::NotFound { what: what.into() }
    }

    /// Create a StoreIo error without an underlying source
    pub fn store_io(message: impl Into<String>) -> Self {
        StoreError::StoreIo {
            message: message.into(),
            source: None,
        }
    }

    /// Create a StoreIo error wrapping an underlying error
    pub fn store_io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StoreError::StoreIo {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        StoreError::Parse {
            message: message.into(),
        }
    }

    /// Create a State error
    pub fn state(message: impl Into<String>) -> Self {
        StoreError::State {
            message: message.into(),
        }
    }

    /// Create an Invalid error
    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::Invalid {
            message: message.into(),
        }
    }

    /// Create a TransformerNotFound error
    pub fn transformer_not_found(
        source_format: impl Into<String>,
        target_format: impl Into<String>,
    ) -> Self {
        StoreError::TransformerNotFound {
            source_format: source_format.into(),
            target_format: target_format.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this is an I/O-level error
    pub fn is_store_io(&self) -> bool {
        matches!(self, StoreError::StoreIo { .. })
    }

    /// Check if this is a lifecycle-state error
    pub fn is_state_error(&self) -> bool {
        matches!(self, StoreError::State { .. })
    }

    /// Check if this is a validation/input error
    ///
    /// Returns true for `Invalid` and `TransformerNotFound`; both indicate
    /// bad input rather than a store fault; fixing the input is the remedy.
    pub fn is_invalid(&self) -> bool {
        matches!(
            self,
            StoreError::Invalid { .. } | StoreError::TransformerNotFound { .. }
        )
    }

    /// Check if this is a parse-level error
    pub fn is_parse(&self) -> bool {
        matches!(self, StoreError::Parse { .. })
    }
}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::StoreIo {
            message: format!("I/O error: {}", e),
            source: Some(Box::new(e)),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Parse {
            message: format!("JSON error: {}", e),
        }
    }
}
