//! Tabular rows produced by the parsers and the matcher.
//!
//! Field order is column order: the CSV header of each table is exactly the
//! `COLUMNS` list of its [`Record`] impl, even when the table has no rows.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::event::{EventKind, Scope};
use super::time::{Instant, serde_instant};

/// A row type with a fixed column set.
pub trait Record: Serialize + DeserializeOwned {
    /// Column names in serialisation order.
    const COLUMNS: &'static [&'static str];
}

/// One scheduled arrival or departure at a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    pub station: Option<String>,
    pub eva: Option<String>,
    /// Identifies one train's visit to this station. Not globally unique.
    pub stop_id: Option<String>,
    /// Always set by the parser. A table read back without an `event`
    /// column yields `None`, and such rows take part in no join.
    #[serde(default)]
    pub event: Option<EventKind>,
    #[serde(with = "serde_instant", default)]
    pub planned_ts: Option<Instant>,
    pub platform_planned: Option<String>,
    pub platform_current: Option<String>,
    pub line: Option<String>,
    /// Planned path: `|`-separated intermediate stations.
    pub path: Option<String>,
    pub train_run_id: Option<String>,
    /// Ids of coupled trains.
    pub wings: Option<String>,
    // Train identity from the first `<tl>` of the stop only.
    pub train_class: Option<String>,
    pub train_type: Option<String>,
    pub train_operator: Option<String>,
    pub train_category: Option<String>,
    pub train_number: Option<String>,
}

impl Record for PlanRow {
    const COLUMNS: &'static [&'static str] = &[
        "station",
        "eva",
        "stop_id",
        "event",
        "planned_ts",
        "platform_planned",
        "platform_current",
        "line",
        "path",
        "train_run_id",
        "wings",
        "train_class",
        "train_type",
        "train_operator",
        "train_category",
        "train_number",
    ];
}

/// One change message, with the context it was found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub station: Option<String>,
    pub eva: Option<String>,
    pub stop_id: Option<String>,
    pub scope: Scope,
    /// Set when the scope is an arrival or departure.
    pub event: Option<EventKind>,
    /// Current (actual/forecast) time of the enclosing arrival/departure.
    #[serde(with = "serde_instant", default)]
    pub event_ct: Option<Instant>,
    pub platform: Option<String>,
    pub line: Option<String>,
    pub path: Option<String>,
    pub msg_id: Option<String>,
    pub msg_type: Option<String>,
    pub msg_code: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    #[serde(with = "serde_instant", default)]
    pub ts: Option<Instant>,
    #[serde(with = "serde_instant", default)]
    pub from_ts: Option<Instant>,
    #[serde(with = "serde_instant", default)]
    pub to_ts: Option<Instant>,
    pub ts_tts: Option<String>,
    /// `event_ct` if present, else `ts`. The join key for matching.
    #[serde(with = "serde_instant", default)]
    pub change_time: Option<Instant>,
}

impl ChangeRow {
    /// Recompute `change_time` from `event_ct` and `ts`.
    pub fn with_derived_change_time(mut self) -> Self {
        self.change_time = self.event_ct.or(self.ts);
        self
    }
}

impl Record for ChangeRow {
    const COLUMNS: &'static [&'static str] = &[
        "station",
        "eva",
        "stop_id",
        "scope",
        "event",
        "event_ct",
        "platform",
        "line",
        "path",
        "msg_id",
        "msg_type",
        "msg_code",
        "category",
        "priority",
        "ts",
        "from_ts",
        "to_ts",
        "ts_tts",
        "change_time",
    ];
}

/// A plan row joined with its nearest change row, if any.
///
/// Change-side columns carry a `_chg` suffix and are all empty when no
/// change matched within tolerance. The change's `event` is not repeated:
/// a match always has the plan row's event, and `scope_chg` records it.
/// `station_chg` and `eva_chg` are kept because a matched change may come
/// from another stop when the join is ungrouped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub station: Option<String>,
    pub eva: Option<String>,
    pub stop_id: Option<String>,
    pub event: EventKind,
    #[serde(with = "serde_instant", default)]
    pub planned_ts: Option<Instant>,
    #[serde(with = "serde_instant", default)]
    pub changed_ts: Option<Instant>,
    pub delay_min: Option<i64>,
    pub platform_planned: Option<String>,
    pub platform_actual: Option<String>,
    pub platform_current: Option<String>,
    pub line: Option<String>,
    pub path: Option<String>,
    pub train_run_id: Option<String>,
    pub wings: Option<String>,
    pub train_class: Option<String>,
    pub train_type: Option<String>,
    pub train_operator: Option<String>,
    pub train_category: Option<String>,
    pub train_number: Option<String>,
    pub station_chg: Option<String>,
    pub eva_chg: Option<String>,
    pub stop_id_chg: Option<String>,
    pub scope_chg: Option<Scope>,
    #[serde(with = "serde_instant", default)]
    pub event_ct_chg: Option<Instant>,
    pub platform_chg: Option<String>,
    pub line_chg: Option<String>,
    pub path_chg: Option<String>,
    pub msg_id_chg: Option<String>,
    pub msg_type_chg: Option<String>,
    pub msg_code_chg: Option<String>,
    pub category_chg: Option<String>,
    pub priority_chg: Option<String>,
    #[serde(with = "serde_instant", default)]
    pub ts_chg: Option<Instant>,
    #[serde(with = "serde_instant", default)]
    pub from_ts_chg: Option<Instant>,
    #[serde(with = "serde_instant", default)]
    pub to_ts_chg: Option<Instant>,
    pub ts_tts_chg: Option<String>,
    #[serde(with = "serde_instant", default)]
    pub change_time_chg: Option<Instant>,
}

impl MergedRow {
    /// Whether a change row was matched to this plan row.
    pub fn is_matched(&self) -> bool {
        self.scope_chg.is_some()
    }
}

impl Record for MergedRow {
    const COLUMNS: &'static [&'static str] = &[
        "station",
        "eva",
        "stop_id",
        "event",
        "planned_ts",
        "changed_ts",
        "delay_min",
        "platform_planned",
        "platform_actual",
        "platform_current",
        "line",
        "path",
        "train_run_id",
        "wings",
        "train_class",
        "train_type",
        "train_operator",
        "train_category",
        "train_number",
        "station_chg",
        "eva_chg",
        "stop_id_chg",
        "scope_chg",
        "event_ct_chg",
        "platform_chg",
        "line_chg",
        "path_chg",
        "msg_id_chg",
        "msg_type_chg",
        "msg_code_chg",
        "category_chg",
        "priority_chg",
        "ts_chg",
        "from_ts_chg",
        "to_ts_chg",
        "ts_tts_chg",
        "change_time_chg",
    ];
}
