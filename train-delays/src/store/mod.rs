//! On-disk layout of the pipeline.
//!
//! Raw XML responses live under a raw directory in timestamped snapshots.
//! Parsed and merged tables are CSV files in a processed directory.

mod error;
mod raw;
mod tables;

pub use error::StoreError;
pub use raw::{RawKind, RawStore, Snapshot, stamp};
pub use tables::{read_rows, write_rows};
