//! Deutsche Bahn Timetables API.
//!
//! HTTP client plus parsers for the two XML schemas the pipeline consumes:
//!
//! - `/plan/{eva}/{YYMMDD}/{HH}` - the planned timetable for one station
//!   and hour, parsed by [`parse_plan`]
//! - `/fchg/{eva}` - every known change for a station, parsed by
//!   [`parse_changes`]
//!
//! Both schemas share the `<timetable><s>...</s></timetable>` shape. Stop
//! ids (`<s id>`) tie a plan stop to its changes but are only unique within
//! a station and day.

mod changes;
mod client;
mod document;
mod error;
mod plan;
mod stations;
mod types;

pub use changes::parse_changes;
pub use client::{RetryPolicy, TimetablesClient, TimetablesConfig};
pub use error::{FetchError, ParseError};
pub use plan::parse_plan;
pub use stations::parse_stations;
pub use types::{
    ChangeDocument, ChangeEvent, ChangeStop, Message, PlanDocument, PlanEvent, PlanStop,
    StationEntry, StationList, TripLabel,
};
