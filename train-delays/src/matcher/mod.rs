//! Plan/change reconciliation.
//!
//! Matches each planned arrival or departure to the change message nearest
//! to it in time, and derives the actual time, delay and platform from the
//! match.
//!
//! Stop ids are the only link between a plan row and the changes for the
//! same train, and the feed does not always provide them. Without them the
//! join can only go by time, which may attach another train's change to a
//! plan row. [`Grouping`] makes that tradeoff explicit.

mod config;
mod merge;

#[cfg(test)]
mod merge_tests;

pub use config::{Grouping, InvalidGrouping, MergeConfig};
pub use merge::{merge, merge_with_tolerance};
