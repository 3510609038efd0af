//! Planned timetable parsing.
//!
//! Turns a `/plan` document into one [`PlanRow`] per arrival/departure node.

use tracing::debug;

use crate::domain::{EventKind, PlanRow, cmp_absent_last, decode};

use super::document::from_document;
use super::error::ParseError;
use super::types::{PlanDocument, PlanEvent, PlanStop, TripLabel};

/// Parse a planned timetable document into rows.
///
/// Every `<ar>` and `<dp>` under every `<s>` becomes a row, including
/// repeated tags under one stop. A stop without its own `eva` inherits the
/// document's. Train identity comes from the first `<tl>` of the stop; any
/// further labels (coupled trains) are not represented.
///
/// Rows are sorted by planned time with unparseable times last; rows with
/// equal times keep document order.
pub fn parse_plan(xml: &str) -> Result<Vec<PlanRow>, ParseError> {
    let doc: PlanDocument = from_document("plan", xml)?;

    let mut rows = Vec::new();
    for stop in &doc.stops {
        let context = StopContext::new(&doc, stop);
        for (kind, events) in [
            (EventKind::Arrival, &stop.arrivals),
            (EventKind::Departure, &stop.departures),
        ] {
            rows.extend(events.iter().map(|event| context.row(kind, event)));
        }
    }

    rows.sort_by(|a, b| cmp_absent_last(a.planned_ts.as_ref(), b.planned_ts.as_ref()));

    debug!(
        station = doc.station.as_deref().unwrap_or("?"),
        stops = doc.stops.len(),
        rows = rows.len(),
        "parsed plan document"
    );

    Ok(rows)
}

/// Fields shared by every row emitted for one stop.
struct StopContext<'a> {
    station: Option<&'a str>,
    eva: Option<&'a str>,
    stop_id: Option<&'a str>,
    label: Option<&'a TripLabel>,
}

impl<'a> StopContext<'a> {
    fn new(doc: &'a PlanDocument, stop: &'a PlanStop) -> Self {
        Self {
            station: doc.station.as_deref(),
            eva: stop.eva.as_deref().or(doc.eva.as_deref()),
            stop_id: stop.id.as_deref(),
            label: stop.trip_labels.first(),
        }
    }

    fn row(&self, kind: EventKind, event: &PlanEvent) -> PlanRow {
        let label = self.label.cloned().unwrap_or_default();

        PlanRow {
            station: self.station.map(str::to_string),
            eva: self.eva.map(str::to_string),
            stop_id: self.stop_id.map(str::to_string),
            event: Some(kind),
            planned_ts: event.planned_time.as_deref().and_then(decode),
            platform_planned: event.planned_platform.clone(),
            platform_current: event.current_platform.clone(),
            line: event.line.clone(),
            path: event.planned_path.clone(),
            train_run_id: event.transition.clone(),
            wings: event.wings.clone(),
            train_class: label.class,
            train_type: label.trip_type,
            train_operator: label.operator,
            train_category: label.category,
            train_number: label.number,
        }
    }
}
