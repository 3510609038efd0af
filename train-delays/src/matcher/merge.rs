//! Nearest-time join of plan rows against change rows.

use std::collections::HashMap;

use chrono::Duration;
use tracing::{debug, warn};

use crate::domain::{ChangeRow, EventKind, Instant, MergedRow, PlanRow};

use super::config::{Grouping, MergeConfig};

/// Join every plan row with its nearest change row.
///
/// Arrivals and departures are matched separately so an arrival change can
/// never be attached to a departure and vice versa. Arrival rows come first
/// in the output, then departure rows, each in the order of `plan`.
///
/// For each plan row the change row whose `change_time` is nearest to
/// `planned_ts` wins, provided the distance is within the configured
/// tolerance (inclusive). When two candidates are equally near, the earlier
/// one wins; among candidates with the same change time, the one that comes
/// last in `changes` wins. Plan rows without a planned time and change rows
/// without a change time never match. Unmatched plan rows are still emitted
/// with empty change-side fields. Plan rows with no event belong to neither
/// join and are left out.
pub fn merge(plan: &[PlanRow], changes: &[ChangeRow], config: &MergeConfig) -> Vec<MergedRow> {
    let mut merged = Vec::with_capacity(plan.len());
    for kind in EventKind::ALL {
        merged.extend(merge_event(plan, changes, kind, config));
    }
    merged
}

/// [`merge`] with automatic grouping and the given tolerance.
pub fn merge_with_tolerance(
    plan: &[PlanRow],
    changes: &[ChangeRow],
    tolerance_mins: u32,
) -> Vec<MergedRow> {
    merge(plan, changes, &MergeConfig::new(tolerance_mins))
}

fn merge_event(
    plan: &[PlanRow],
    changes: &[ChangeRow],
    kind: EventKind,
    config: &MergeConfig,
) -> Vec<MergedRow> {
    let left: Vec<&PlanRow> = plan.iter().filter(|r| r.event == Some(kind)).collect();
    let right: Vec<&ChangeRow> = changes.iter().filter(|r| r.event == Some(kind)).collect();

    let plan_has_ids = left.iter().any(|r| r.stop_id.is_some());
    let changes_have_ids = right.iter().any(|r| r.stop_id.is_some());
    let grouped = config
        .grouping
        .groups_by_stop_id(plan_has_ids, changes_have_ids);

    if config.grouping == Grouping::Auto && !grouped && !left.is_empty() && !right.is_empty() {
        warn!(
            event = %kind,
            plan_has_ids,
            changes_have_ids,
            "stop ids missing, matching across all trains"
        );
    }

    let index = CandidateIndex::build(&right, grouped);
    let tolerance = config.tolerance();

    let merged: Vec<MergedRow> = left
        .iter()
        .map(|row| {
            let candidates = index.candidates_for(row);
            let hit = row
                .planned_ts
                .and_then(|target| nearest(candidates, &target, tolerance));
            merged_row(row, kind, hit)
        })
        .collect();

    debug!(
        event = %kind,
        plan_rows = left.len(),
        change_rows = right.len(),
        grouped,
        matched = merged.iter().filter(|r| r.is_matched()).count(),
        "merged event type"
    );

    merged
}

/// A change row keyed by its change time.
type Candidate<'a> = (Instant, &'a ChangeRow);

/// Change rows sorted by change time, optionally split by stop id.
enum CandidateIndex<'a> {
    All(Vec<Candidate<'a>>),
    ByStopId(HashMap<&'a str, Vec<Candidate<'a>>>),
}

impl<'a> CandidateIndex<'a> {
    fn build(rows: &[&'a ChangeRow], grouped: bool) -> Self {
        let timed = rows
            .iter()
            .filter_map(|row| row.change_time.map(|t| (t, *row)));

        if grouped {
            let mut groups: HashMap<&'a str, Vec<Candidate<'a>>> = HashMap::new();
            for (t, row) in timed {
                if let Some(id) = row.stop_id.as_deref() {
                    groups.entry(id).or_default().push((t, row));
                }
            }
            for group in groups.values_mut() {
                group.sort_by_key(|(t, _)| *t);
            }
            CandidateIndex::ByStopId(groups)
        } else {
            let mut all: Vec<Candidate<'a>> = timed.collect();
            all.sort_by_key(|(t, _)| *t);
            CandidateIndex::All(all)
        }
    }

    fn candidates_for(&self, row: &PlanRow) -> &[Candidate<'a>] {
        match self {
            CandidateIndex::All(all) => all,
            CandidateIndex::ByStopId(groups) => row
                .stop_id
                .as_deref()
                .and_then(|id| groups.get(id))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

/// Nearest candidate to `target` within `tolerance`.
///
/// `candidates` must be sorted by time. Ties go to the earlier candidate.
fn nearest<'a>(
    candidates: &[Candidate<'a>],
    target: &Instant,
    tolerance: Duration,
) -> Option<&'a ChangeRow> {
    let split = candidates.partition_point(|(t, _)| t <= target);
    let backward = split.checked_sub(1).map(|i| &candidates[i]);
    let forward = candidates.get(split);

    let (time, row) = match (backward, forward) {
        (Some(b), Some(f)) => {
            let behind = target.signed_duration_since(b.0);
            let ahead = f.0.signed_duration_since(target);
            if ahead < behind { f } else { b }
        }
        (Some(b), None) => b,
        (None, Some(f)) => f,
        (None, None) => return None,
    };

    (time.signed_duration_since(target).abs() <= tolerance).then_some(*row)
}

/// Build the output row for a plan row and its match, if any.
fn merged_row(plan: &PlanRow, event: EventKind, change: Option<&ChangeRow>) -> MergedRow {
    let changed_ts = change.and_then(|c| c.event_ct.or(c.change_time));
    let delay_min = match (changed_ts, plan.planned_ts) {
        (Some(changed), Some(planned)) => Some(round_minutes(changed.signed_duration_since(planned))),
        _ => None,
    };
    let platform_chg = change.and_then(|c| c.platform.clone());
    let platform_actual = platform_chg.clone().or_else(|| plan.platform_planned.clone());
    let chg = |f: fn(&ChangeRow) -> Option<String>| change.and_then(f);

    MergedRow {
        station: plan.station.clone(),
        eva: plan.eva.clone(),
        stop_id: plan.stop_id.clone(),
        event,
        planned_ts: plan.planned_ts,
        changed_ts,
        delay_min,
        platform_planned: plan.platform_planned.clone(),
        platform_actual,
        platform_current: plan.platform_current.clone(),
        line: plan.line.clone(),
        path: plan.path.clone(),
        train_run_id: plan.train_run_id.clone(),
        wings: plan.wings.clone(),
        train_class: plan.train_class.clone(),
        train_type: plan.train_type.clone(),
        train_operator: plan.train_operator.clone(),
        train_category: plan.train_category.clone(),
        train_number: plan.train_number.clone(),
        station_chg: chg(|c| c.station.clone()),
        eva_chg: chg(|c| c.eva.clone()),
        stop_id_chg: chg(|c| c.stop_id.clone()),
        scope_chg: change.map(|c| c.scope),
        event_ct_chg: change.and_then(|c| c.event_ct),
        platform_chg,
        line_chg: chg(|c| c.line.clone()),
        path_chg: chg(|c| c.path.clone()),
        msg_id_chg: chg(|c| c.msg_id.clone()),
        msg_type_chg: chg(|c| c.msg_type.clone()),
        msg_code_chg: chg(|c| c.msg_code.clone()),
        category_chg: chg(|c| c.category.clone()),
        priority_chg: chg(|c| c.priority.clone()),
        ts_chg: change.and_then(|c| c.ts),
        from_ts_chg: change.and_then(|c| c.from_ts),
        to_ts_chg: change.and_then(|c| c.to_ts),
        ts_tts_chg: chg(|c| c.ts_tts.clone()),
        change_time_chg: change.and_then(|c| c.change_time),
    }
}

/// Whole minutes, rounding half to even.
fn round_minutes(delta: Duration) -> i64 {
    (delta.num_seconds() as f64 / 60.0).round_ties_even() as i64
}
