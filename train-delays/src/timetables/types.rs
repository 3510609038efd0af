//! Timetables API response DTOs.
//!
//! These types map directly onto the XML documents served by the API.
//! Attribute fields are named after their XML attribute with an `@` rename;
//! every attribute is optional because the feed omits rather than empties
//! them. Unknown attributes and elements are ignored.

use serde::{Deserialize, Serialize};

/// Root of a planned-timetable document (`/plan/{eva}/{date}/{hour}`).
#[derive(Debug, Clone, Deserialize)]
pub struct PlanDocument {
    #[serde(rename = "@station")]
    pub station: Option<String>,

    #[serde(rename = "@eva")]
    pub eva: Option<String>,

    #[serde(rename = "s", default)]
    pub stops: Vec<PlanStop>,
}

/// A planned stop: one train's visit to the station.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanStop {
    #[serde(rename = "@id")]
    pub id: Option<String>,

    #[serde(rename = "@eva")]
    pub eva: Option<String>,

    /// Trip labels. Coupled trains may carry several.
    #[serde(rename = "tl", default)]
    pub trip_labels: Vec<TripLabel>,

    #[serde(rename = "ar", default)]
    pub arrivals: Vec<PlanEvent>,

    #[serde(rename = "dp", default)]
    pub departures: Vec<PlanEvent>,
}

/// Train identity (`<tl>`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripLabel {
    /// Filter flags (train class, e.g. `F` long distance, `N` regional).
    #[serde(rename = "@f")]
    pub class: Option<String>,

    /// Trip type (e.g. `p` for planned).
    #[serde(rename = "@t")]
    pub trip_type: Option<String>,

    /// Operator code.
    #[serde(rename = "@o")]
    pub operator: Option<String>,

    /// Category, e.g. `ICE`, `RE`, `S`.
    #[serde(rename = "@c")]
    pub category: Option<String>,

    /// Train number.
    #[serde(rename = "@n")]
    pub number: Option<String>,
}

/// A planned arrival (`<ar>`) or departure (`<dp>`).
#[derive(Debug, Clone, Deserialize)]
pub struct PlanEvent {
    /// Planned time, `YYMMDDHHMM`.
    #[serde(rename = "@pt")]
    pub planned_time: Option<String>,

    #[serde(rename = "@pp")]
    pub planned_platform: Option<String>,

    #[serde(rename = "@cp")]
    pub current_platform: Option<String>,

    #[serde(rename = "@l")]
    pub line: Option<String>,

    #[serde(rename = "@ppth")]
    pub planned_path: Option<String>,

    #[serde(rename = "@tra")]
    pub transition: Option<String>,

    #[serde(rename = "@wings")]
    pub wings: Option<String>,
}

/// Root of a change document (`/fchg/{eva}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeDocument {
    #[serde(rename = "@station")]
    pub station: Option<String>,

    #[serde(rename = "@eva")]
    pub eva: Option<String>,

    #[serde(rename = "s", default)]
    pub stops: Vec<ChangeStop>,
}

/// Changes for one stop.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStop {
    #[serde(rename = "@id")]
    pub id: Option<String>,

    #[serde(rename = "@eva")]
    pub eva: Option<String>,

    /// Messages attached to the stop as a whole.
    #[serde(rename = "m", default)]
    pub messages: Vec<Message>,

    #[serde(rename = "ar", default)]
    pub arrivals: Vec<ChangeEvent>,

    #[serde(rename = "dp", default)]
    pub departures: Vec<ChangeEvent>,
}

/// Changed arrival or departure, carrying the current values.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    /// Current time, `YYMMDDHHMM`.
    #[serde(rename = "@ct")]
    pub current_time: Option<String>,

    #[serde(rename = "@cp")]
    pub current_platform: Option<String>,

    #[serde(rename = "@l")]
    pub line: Option<String>,

    #[serde(rename = "@cpth")]
    pub current_path: Option<String>,

    #[serde(rename = "m", default)]
    pub messages: Vec<Message>,
}

/// A disruption or update message (`<m>`).
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    #[serde(rename = "@id")]
    pub id: Option<String>,

    /// Message type (`d` delay, `q` quality, `f` free text, `h` HIM, ...).
    #[serde(rename = "@t")]
    pub message_type: Option<String>,

    /// Numeric reason code.
    #[serde(rename = "@c")]
    pub code: Option<String>,

    #[serde(rename = "@cat")]
    pub category: Option<String>,

    #[serde(rename = "@pr")]
    pub priority: Option<String>,

    /// Timestamp of the message, `YYMMDDHHMM`.
    #[serde(rename = "@ts")]
    pub timestamp: Option<String>,

    #[serde(rename = "@from")]
    pub valid_from: Option<String>,

    #[serde(rename = "@to")]
    pub valid_to: Option<String>,

    /// Timestamp with seconds and milliseconds, kept verbatim.
    #[serde(rename = "@ts-tts")]
    pub timestamp_tts: Option<String>,
}

/// Response of the station search (`/station/{pattern}`).
#[derive(Debug, Clone, Deserialize)]
pub struct StationList {
    #[serde(rename = "station", default)]
    pub stations: Vec<StationEntry>,
}

/// One station search hit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StationEntry {
    #[serde(rename(deserialize = "@name"))]
    pub name: Option<String>,

    #[serde(rename(deserialize = "@eva"), alias = "@evaNr")]
    pub eva: Option<String>,

    #[serde(rename(deserialize = "@ds100"))]
    pub ds100: Option<String>,

    #[serde(rename(deserialize = "@db"))]
    pub db: Option<String>,

    #[serde(rename(deserialize = "@creationts"))]
    pub creation_ts: Option<String>,
}
