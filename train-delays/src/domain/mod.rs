//! Domain types for the delay pipeline.
//!
//! Instants decoded from the feed, the event/scope vocabulary shared by both
//! XML schemas, and the row types that flow between pipeline stages.

mod event;
mod rows;
mod time;

pub use event::{EventKind, Scope};
pub use rows::{ChangeRow, MergedRow, PlanRow, Record};
pub use time::{
    FEED_TZ, Instant, TimeError, cmp_absent_last, decode, encode, parse_instant, serde_instant,
    to_yymmdd,
};
