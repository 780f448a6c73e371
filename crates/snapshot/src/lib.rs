//! Snapshot lifecycle store
//!
//! The authoritative source of truth for snapshot state, counters,
//! timestamps, and queries. Rows persist as one `metadata.json` per
//! snapshot directory, rewritten atomically; dirty mutations batch in
//! memory and auto-flush every hundred updates or at explicit phase
//! boundaries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod row;
pub mod store;

pub use row::SnapshotRow;
pub use store::{CleanOutcome, SnapshotStore, AUTOFLUSH_UPDATES};
