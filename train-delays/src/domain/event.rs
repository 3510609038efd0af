//! Event and message-scope kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a row describes a train arriving at or departing from a stop.
///
/// Serialised with the feed's own tag names (`ar` / `dp`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "ar")]
    Arrival,
    #[serde(rename = "dp")]
    Departure,
}

impl EventKind {
    /// Both kinds, in the order merged output is emitted.
    pub const ALL: [EventKind; 2] = [EventKind::Arrival, EventKind::Departure];

    /// The XML tag / CSV value for this kind.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::Arrival => "ar",
            EventKind::Departure => "dp",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where in a stop a change message was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Directly under the stop, with no arrival/departure context.
    #[serde(rename = "s")]
    Stop,
    #[serde(rename = "ar")]
    Arrival,
    #[serde(rename = "dp")]
    Departure,
}

impl Scope {
    /// The event kind this scope implies, if any.
    pub fn event(&self) -> Option<EventKind> {
        match self {
            Scope::Stop => None,
            Scope::Arrival => Some(EventKind::Arrival),
            Scope::Departure => Some(EventKind::Departure),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Scope::Stop => "s",
            Scope::Arrival => "ar",
            Scope::Departure => "dp",
        }
    }
}

impl From<EventKind> for Scope {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Arrival => Scope::Arrival,
            EventKind::Departure => Scope::Departure,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
