//! Station search results.

use super::document::from_document;
use super::error::ParseError;
use super::types::{StationEntry, StationList};

/// Parse a station search response.
pub fn parse_stations(xml: &str) -> Result<Vec<StationEntry>, ParseError> {
    let list: StationList = from_document("station", xml)?;
    Ok(list.stations)
}

impl StationEntry {
    /// Display name, falling back to the EVA number.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.eva.as_deref())
            .unwrap_or("<unnamed>")
    }
}
