//! Change (fchg) document parsing.
//!
//! Each `<m>` message becomes one [`ChangeRow`]. Messages are found in three
//! places under a stop, and the place determines which context fields the
//! row carries:
//!
//! - directly under `<s>`: stop scope, no event and no current-time context
//! - under `<ar>`: arrival scope, with that node's `ct`/`cp`/`l`/`cpth`
//! - under `<dp>`: departure scope, likewise

use tracing::debug;

use crate::domain::{ChangeRow, EventKind, Scope, cmp_absent_last, decode};

use super::document::from_document;
use super::error::ParseError;
use super::types::{ChangeDocument, ChangeEvent, ChangeStop, Message};

/// Parse a change document into rows.
///
/// Rows are sorted by message timestamp, then by event current time, absent
/// values last in both keys.
pub fn parse_changes(xml: &str) -> Result<Vec<ChangeRow>, ParseError> {
    let doc: ChangeDocument = from_document("fchg", xml)?;

    let mut rows = Vec::new();
    for stop in &doc.stops {
        let emit = RowEmitter::new(&doc, stop);

        rows.extend(stop.messages.iter().map(|m| emit.row(m, Scope::Stop, None)));

        for (kind, events) in [
            (EventKind::Arrival, &stop.arrivals),
            (EventKind::Departure, &stop.departures),
        ] {
            for event in events {
                rows.extend(
                    event
                        .messages
                        .iter()
                        .map(|m| emit.row(m, Scope::from(kind), Some(event))),
                );
            }
        }
    }

    rows.sort_by(|a, b| {
        cmp_absent_last(a.ts.as_ref(), b.ts.as_ref())
            .then_with(|| cmp_absent_last(a.event_ct.as_ref(), b.event_ct.as_ref()))
    });

    debug!(
        station = doc.station.as_deref().unwrap_or("?"),
        stops = doc.stops.len(),
        rows = rows.len(),
        "parsed fchg document"
    );

    Ok(rows)
}

struct RowEmitter<'a> {
    station: Option<&'a str>,
    eva: Option<&'a str>,
    stop_id: Option<&'a str>,
}

impl<'a> RowEmitter<'a> {
    fn new(doc: &'a ChangeDocument, stop: &'a ChangeStop) -> Self {
        Self {
            station: doc.station.as_deref(),
            eva: stop.eva.as_deref().or(doc.eva.as_deref()),
            stop_id: stop.id.as_deref(),
        }
    }

    fn row(&self, message: &Message, scope: Scope, event: Option<&ChangeEvent>) -> ChangeRow {
        let event_ct = event
            .and_then(|e| e.current_time.as_deref())
            .and_then(decode);
        let ts = message.timestamp.as_deref().and_then(decode);

        ChangeRow {
            station: self.station.map(str::to_string),
            eva: self.eva.map(str::to_string),
            stop_id: self.stop_id.map(str::to_string),
            scope,
            event: scope.event(),
            event_ct,
            platform: event.and_then(|e| e.current_platform.clone()),
            line: event.and_then(|e| e.line.clone()),
            path: event.and_then(|e| e.current_path.clone()),
            msg_id: message.id.clone(),
            msg_type: message.message_type.clone(),
            msg_code: message.code.clone(),
            category: message.category.clone(),
            priority: message.priority.clone(),
            ts,
            from_ts: message.valid_from.as_deref().and_then(decode),
            to_ts: message.valid_to.as_deref().and_then(decode),
            ts_tts: message.timestamp_tts.clone(),
            change_time: event_ct.or(ts),
        }
    }
}
