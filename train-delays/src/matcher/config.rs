//! Merge configuration.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;

/// Default match tolerance in minutes.
const DEFAULT_TOLERANCE_MINS: u32 = 2;

/// How change rows are restricted before the nearest-time search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Group by stop id when both sides carry at least one stop id,
    /// otherwise match across all rows of the event type.
    #[default]
    Auto,
    /// Always group by stop id. Rows without one never match.
    ByStopId,
    /// Never group: the nearest change of the right event type wins,
    /// whichever train it belongs to.
    Ungrouped,
}

impl Grouping {
    /// Whether to group by stop id, given which sides have any stop ids.
    pub fn groups_by_stop_id(self, plan_has_ids: bool, changes_have_ids: bool) -> bool {
        match self {
            Grouping::Auto => plan_has_ids && changes_have_ids,
            Grouping::ByStopId => true,
            Grouping::Ungrouped => false,
        }
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Grouping::Auto => "auto",
            Grouping::ByStopId => "by-stop-id",
            Grouping::Ungrouped => "ungrouped",
        })
    }
}

/// Error returned when parsing an unknown grouping name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown grouping {0:?} (expected auto, by-stop-id or ungrouped)")]
pub struct InvalidGrouping(String);

impl FromStr for Grouping {
    type Err = InvalidGrouping;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Grouping::Auto),
            "by-stop-id" => Ok(Grouping::ByStopId),
            "ungrouped" => Ok(Grouping::Ungrouped),
            other => Err(InvalidGrouping(other.to_string())),
        }
    }
}

/// Configuration for joining plan and change rows.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Largest allowed distance between planned time and change time.
    pub tolerance_mins: u32,

    pub grouping: Grouping,
}

impl MergeConfig {
    /// Create a configuration with the given tolerance and automatic grouping.
    pub fn new(tolerance_mins: u32) -> Self {
        Self {
            tolerance_mins,
            grouping: Grouping::Auto,
        }
    }

    pub fn with_grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }

    /// Returns the tolerance as a Duration.
    pub fn tolerance(&self) -> Duration {
        Duration::minutes(i64::from(self.tolerance_mins))
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_MINS)
    }
}
