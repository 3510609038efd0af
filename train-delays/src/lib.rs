//! Train delay pipeline for the Deutsche Bahn Timetables API.
//!
//! Downloads the planned timetable and the change feed for a station,
//! flattens both XML documents into tables, and joins every planned
//! arrival and departure to its nearest change to compute the delay.

pub mod config;
pub mod domain;
pub mod matcher;
pub mod pipeline;
pub mod store;
pub mod timetables;
