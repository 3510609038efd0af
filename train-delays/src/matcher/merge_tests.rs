//! Table-level tests for the plan/change join.

use super::*;
use crate::domain::{ChangeRow, EventKind, Instant, PlanRow, Scope, decode};
use crate::timetables::{parse_changes, parse_plan};

fn at(code: &str) -> Instant {
    decode(code).unwrap()
}

fn plan(stop_id: Option<&str>, event: EventKind, pt: &str) -> PlanRow {
    PlanRow {
        station: Some("Teststadt".to_string()),
        eva: Some("8000001".to_string()),
        stop_id: stop_id.map(str::to_string),
        event: Some(event),
        planned_ts: decode(pt),
        platform_planned: Some("1".to_string()),
        platform_current: None,
        line: None,
        path: None,
        train_run_id: None,
        wings: None,
        train_class: None,
        train_type: None,
        train_operator: None,
        train_category: Some("RE".to_string()),
        train_number: Some("4711".to_string()),
    }
}

fn change(stop_id: Option<&str>, event: EventKind, ct: &str, msg_id: &str) -> ChangeRow {
    ChangeRow {
        station: Some("Teststadt".to_string()),
        eva: Some("8000001".to_string()),
        stop_id: stop_id.map(str::to_string),
        scope: Scope::from(event),
        event: Some(event),
        event_ct: decode(ct),
        platform: None,
        line: None,
        path: None,
        msg_id: Some(msg_id.to_string()),
        msg_type: Some("d".to_string()),
        msg_code: None,
        category: None,
        priority: None,
        ts: None,
        from_ts: None,
        to_ts: None,
        ts_tts: None,
        change_time: None,
    }
    .with_derived_change_time()
}

fn stop_message(stop_id: &str, ts: &str) -> ChangeRow {
    ChangeRow {
        scope: Scope::Stop,
        event: None,
        event_ct: None,
        ts: decode(ts),
        ..change(Some(stop_id), EventKind::Arrival, "", "stop-msg")
    }
    .with_derived_change_time()
}

fn matched_ids(rows: &[crate::domain::MergedRow]) -> Vec<Option<&str>> {
    rows.iter().map(|r| r.msg_id_chg.as_deref()).collect()
}

#[test]
fn one_minute_late_within_tolerance() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011001", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 2);
    assert_eq!(merged.len(), 1);
    assert!(merged[0].is_matched());
    assert_eq!(merged[0].delay_min, Some(1));
    assert_eq!(merged[0].changed_ts, Some(at("2401011001")));
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("m1"));
}

#[test]
fn zero_tolerance_rejects_one_minute_gap() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011001", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 0);
    assert_eq!(merged.len(), 1);
    assert!(!merged[0].is_matched());
    assert_eq!(merged[0].delay_min, None);
    assert_eq!(merged[0].changed_ts, None);
    assert_eq!(merged[0].msg_id_chg, None);
    assert_eq!(merged[0].event_ct_chg, None);
}

#[test]
fn zero_tolerance_accepts_exact_match() {
    let plans = vec![plan(Some("s1"), EventKind::Departure, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Departure, "2401011000", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 0);
    assert_eq!(merged[0].delay_min, Some(0));
}

#[test]
fn tolerance_is_inclusive() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011002", "m1")];

    assert!(merge_with_tolerance(&plans, &changes, 2)[0].is_matched());
    assert!(!merge_with_tolerance(&plans, &changes, 1)[0].is_matched());
}

#[test]
fn early_events_have_negative_delay() {
    let plans = vec![plan(Some("s1"), EventKind::Departure, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Departure, "2401010958", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].delay_min, Some(-2));
}

#[test]
fn missing_stop_ids_fall_back_to_ungrouped() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![change(None, EventKind::Arrival, "2401011001", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 2);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("m1"));
    assert_eq!(merged[0].stop_id_chg, None);
}

#[test]
fn plan_without_stop_ids_falls_back_to_ungrouped() {
    let plans = vec![plan(None, EventKind::Arrival, "2401011000")];
    let changes = vec![change(Some("s9"), EventKind::Arrival, "2401011001", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 2);
    assert_eq!(merged[0].stop_id_chg.as_deref(), Some("s9"));
}

#[test]
fn strict_grouping_never_matches_without_ids() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![change(None, EventKind::Arrival, "2401011001", "m1")];

    let config = MergeConfig::new(2).with_grouping(Grouping::ByStopId);
    let merged = merge(&plans, &changes, &config);
    assert!(!merged[0].is_matched());
}

#[test]
fn grouping_prevents_cross_train_matches() {
    let plans = vec![plan(Some("a"), EventKind::Arrival, "2401011000")];
    let changes = vec![
        change(Some("b"), EventKind::Arrival, "2401011000", "other-train"),
        change(Some("a"), EventKind::Arrival, "2401011003", "this-train"),
    ];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("this-train"));
    assert_eq!(merged[0].delay_min, Some(3));

    let config = MergeConfig::new(5).with_grouping(Grouping::Ungrouped);
    let merged = merge(&plans, &changes, &config);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("other-train"));
    assert_eq!(merged[0].delay_min, Some(0));
}

#[test]
fn event_types_are_matched_separately() {
    let plans = vec![plan(Some("s1"), EventKind::Departure, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011000", "arrival-change")];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged.len(), 1);
    assert!(!merged[0].is_matched());
}

#[test]
fn stop_level_messages_never_match() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![stop_message("s1", "2401011000")];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert!(!merged[0].is_matched());
}

#[test]
fn arrivals_come_before_departures_in_plan_order() {
    let plans = vec![
        plan(Some("s1"), EventKind::Departure, "2401011000"),
        plan(Some("s2"), EventKind::Arrival, "2401011010"),
        plan(Some("s3"), EventKind::Departure, "2401011020"),
        plan(Some("s4"), EventKind::Arrival, "2401011030"),
    ];

    let merged = merge_with_tolerance(&plans, &[], 2);
    let order: Vec<_> = merged
        .iter()
        .map(|r| (r.event, r.stop_id.as_deref().unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            (EventKind::Arrival, "s2"),
            (EventKind::Arrival, "s4"),
            (EventKind::Departure, "s1"),
            (EventKind::Departure, "s3"),
        ]
    );
    assert!(merged.iter().all(|r| !r.is_matched()));
}

#[test]
fn equidistant_candidates_prefer_the_earlier() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![
        change(Some("s1"), EventKind::Arrival, "2401011002", "later"),
        change(Some("s1"), EventKind::Arrival, "2401010958", "earlier"),
    ];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("earlier"));
    assert_eq!(merged[0].delay_min, Some(-2));
}

#[test]
fn identical_change_times_prefer_the_last_row() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![
        change(Some("s1"), EventKind::Arrival, "2401011001", "first"),
        change(Some("s1"), EventKind::Arrival, "2401011001", "second"),
    ];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("second"));
}

#[test]
fn nearest_candidate_wins() {
    let plans = vec![
        plan(Some("s1"), EventKind::Arrival, "2401011000"),
        plan(Some("s1"), EventKind::Arrival, "2401011030"),
    ];
    let changes = vec![
        change(Some("s1"), EventKind::Arrival, "2401010950", "far"),
        change(Some("s1"), EventKind::Arrival, "2401011004", "near"),
        change(Some("s1"), EventKind::Arrival, "2401011029", "second"),
    ];

    let merged = merge_with_tolerance(&plans, &changes, 15);
    assert_eq!(matched_ids(&merged), vec![Some("near"), Some("second")]);
    assert_eq!(merged[1].delay_min, Some(-1));
}

#[test]
fn plan_rows_without_time_are_kept_unmatched() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "garbage")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011001", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 60);
    assert_eq!(merged.len(), 1);
    assert!(!merged[0].is_matched());
    assert_eq!(merged[0].planned_ts, None);
}

#[test]
fn change_rows_without_time_are_ignored() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let changes = vec![
        change(Some("s1"), EventKind::Arrival, "", "untimed"),
        change(Some("s1"), EventKind::Arrival, "2401011004", "timed"),
    ];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].msg_id_chg.as_deref(), Some("timed"));
}

#[test]
fn changed_ts_falls_back_to_message_ts() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let mut row = change(Some("s1"), EventKind::Arrival, "", "m1");
    row.ts = decode("2401011003");
    let changes = vec![row.with_derived_change_time()];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged[0].event_ct_chg, None);
    assert_eq!(merged[0].changed_ts, Some(at("2401011003")));
    assert_eq!(merged[0].delay_min, Some(3));
}

#[test]
fn platform_actual_prefers_change_platform() {
    let plans = vec![
        plan(Some("s1"), EventKind::Arrival, "2401011000"),
        plan(Some("s2"), EventKind::Arrival, "2401011000"),
        plan(Some("s3"), EventKind::Arrival, "2401011000"),
    ];
    let mut moved = change(Some("s1"), EventKind::Arrival, "2401011001", "moved");
    moved.platform = Some("7".to_string());
    let same = change(Some("s2"), EventKind::Arrival, "2401011001", "same");
    let changes = vec![moved, same];

    let merged = merge_with_tolerance(&plans, &changes, 2);
    let platforms: Vec<_> = merged
        .iter()
        .map(|r| r.platform_actual.as_deref())
        .collect();
    // Matched with a platform, matched without one, unmatched.
    assert_eq!(platforms, vec![Some("7"), Some("1"), Some("1")]);
    assert_eq!(merged[0].platform_chg.as_deref(), Some("7"));
    assert_eq!(merged[1].platform_chg, None);
}

#[test]
fn plan_rows_without_event_are_left_out() {
    let mut unknown = plan(Some("s1"), EventKind::Arrival, "2401011000");
    unknown.event = None;
    let plans = vec![unknown, plan(Some("s1"), EventKind::Departure, "2401011000")];
    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011000", "m1")];

    let merged = merge_with_tolerance(&plans, &changes, 5);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].event, EventKind::Departure);
    assert!(!merged[0].is_matched());
}

#[test]
fn change_side_keeps_station_and_eva() {
    let plans = vec![plan(Some("s1"), EventKind::Arrival, "2401011000")];
    let mut other = change(Some("s9"), EventKind::Arrival, "2401011001", "m1");
    other.station = Some("Nachbarort".to_string());
    other.eva = Some("8000002".to_string());

    let config = MergeConfig::new(2).with_grouping(Grouping::Ungrouped);
    let merged = merge(&plans, &[other], &config);
    assert_eq!(merged[0].eva.as_deref(), Some("8000001"));
    assert_eq!(merged[0].eva_chg.as_deref(), Some("8000002"));
    assert_eq!(merged[0].station_chg.as_deref(), Some("Nachbarort"));

    let unmatched = merge_with_tolerance(&plans, &[], 2);
    assert_eq!(unmatched[0].eva_chg, None);
    assert_eq!(unmatched[0].station_chg, None);
}

#[test]
fn empty_inputs() {
    assert!(merge_with_tolerance(&[], &[], 2).is_empty());

    let changes = vec![change(Some("s1"), EventKind::Arrival, "2401011001", "m1")];
    assert!(merge_with_tolerance(&[], &changes, 2).is_empty());
}

#[test]
fn parsed_documents_end_to_end() {
    let plan_xml = r#"<timetable station="Teststadt">
            <s id="1" eva="asdf">
                <tl c="RE" n="4711"/>
                <ar pt="2401011005" pp="2"/>
            </s>
        </timetable>"#;
    let changes_xml = r#"<timetable station="Teststadt">
            <s id="1" eva="asdf">
                <ar ct="2401011008" cp="3">
                    <m id="r1" t="d" c="43" ts="2401011000"/>
                </ar>
            </s>
        </timetable>"#;

    let plans = parse_plan(plan_xml).unwrap();
    let changes = parse_changes(changes_xml).unwrap();
    let merged = merge_with_tolerance(&plans, &changes, 5);

    assert_eq!(merged.len(), 1);
    let row = &merged[0];
    assert_eq!(row.stop_id.as_deref(), Some("1"));
    assert_eq!(row.eva.as_deref(), Some("asdf"));
    assert_eq!(row.event, EventKind::Arrival);
    assert_eq!(row.planned_ts, Some(at("2401011005")));
    assert_eq!(row.changed_ts, Some(at("2401011008")));
    assert_eq!(row.delay_min, Some(3));
    assert_eq!(row.platform_planned.as_deref(), Some("2"));
    assert_eq!(row.platform_actual.as_deref(), Some("3"));
    assert_eq!(row.msg_code_chg.as_deref(), Some("43"));
    assert_eq!(row.train_number.as_deref(), Some("4711"));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn code(minutes_after_nine: u32) -> String {
        format!("240101{:02}{:02}", 9 + minutes_after_nine / 60, minutes_after_nine % 60)
    }

    fn arb_event() -> impl Strategy<Value = EventKind> {
        prop_oneof![Just(EventKind::Arrival), Just(EventKind::Departure)]
    }

    fn arb_stop() -> impl Strategy<Value = Option<String>> {
        prop::option::weighted(0.8, "[ab]".prop_map(String::from))
    }

    prop_compose! {
        fn arb_plan()(stop in arb_stop(), event in arb_event(), m in 0u32..120) -> PlanRow {
            plan(stop.as_deref(), event, &code(m))
        }
    }

    prop_compose! {
        fn arb_change()(stop in arb_stop(), event in arb_event(), m in 0u32..120) -> ChangeRow {
            change(stop.as_deref(), event, &code(m), "m")
        }
    }

    proptest! {
        /// Every plan row is emitted exactly once.
        #[test]
        fn one_output_row_per_plan_row(
            plans in prop::collection::vec(arb_plan(), 0..20),
            changes in prop::collection::vec(arb_change(), 0..20),
            tolerance in 0u32..30,
        ) {
            let merged = merge_with_tolerance(&plans, &changes, tolerance);
            prop_assert_eq!(merged.len(), plans.len());
        }

        /// Matches respect event type and tolerance.
        #[test]
        fn matches_stay_within_tolerance(
            plans in prop::collection::vec(arb_plan(), 0..20),
            changes in prop::collection::vec(arb_change(), 0..20),
            tolerance in 0u32..30,
        ) {
            for row in merge_with_tolerance(&plans, &changes, tolerance) {
                if row.is_matched() {
                    prop_assert_eq!(row.scope_chg, Some(Scope::from(row.event)));
                    let delay = row.delay_min.unwrap();
                    prop_assert!(delay.unsigned_abs() <= u64::from(tolerance));
                } else {
                    prop_assert_eq!(row.delay_min, None);
                }
            }
        }

        /// No change row closer than the chosen one exists for the same
        /// event type when matching ungrouped.
        #[test]
        fn ungrouped_match_is_nearest(
            plans in prop::collection::vec(arb_plan(), 1..10),
            changes in prop::collection::vec(arb_change(), 1..20),
        ) {
            let config = MergeConfig::new(300).with_grouping(Grouping::Ungrouped);
            for row in merge(&plans, &changes, &config) {
                let planned = row.planned_ts.unwrap();
                let best = changes
                    .iter()
                    .filter(|c| c.event == Some(row.event))
                    .filter_map(|c| c.change_time)
                    .map(|t| t.signed_duration_since(planned).num_minutes().abs())
                    .min();
                let got = row.delay_min.map(i64::abs);
                prop_assert_eq!(got, best);
            }
        }
    }
}
