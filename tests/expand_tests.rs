use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use timephased::{
    Normaliser, NormaliserConfig, ProjectCalendar, ResourceAssignment, TimeSpan,
    TimephasedWorkContainer, UnitDefaults, WorkCalendar, WorkDuration, WorkingRange,
    expand_assignment, expand_days, is_split,
};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn eight_hour_calendar() -> WorkCalendar {
    WorkCalendar::weekdays(WorkingRange::hm(8, 0, 16, 0).unwrap())
}

fn hours(start: NaiveDateTime, finish: NaiveDateTime, amount: f64) -> TimeSpan {
    TimeSpan::new(start, finish, WorkDuration::hours(amount)).unwrap()
}

fn total_minutes(spans: &[TimeSpan]) -> f64 {
    let defaults = UnitDefaults::default();
    spans
        .iter()
        .map(|span| span.total_amount().to_minutes(&defaults))
        .sum()
}

fn compacting() -> Normaliser {
    Normaliser::new(NormaliserConfig {
        compact_runs: true,
        ..NormaliserConfig::default()
    })
}

#[test]
fn partial_day_gets_padding_on_both_sides() {
    let data = hours(at(2025, 1, 7, 10, 0), at(2025, 1, 7, 14, 0), 4.0);
    let expanded = expand_days(&eight_hour_calendar(), &[data], None, None);
    assert_eq!(
        expanded,
        vec![
            hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 10, 0), 0.0),
            data,
            hours(at(2025, 1, 7, 14, 0), at(2025, 1, 7, 16, 0), 0.0),
        ]
    );
}

#[test]
fn weekend_gap_emits_nothing() {
    let gap = hours(at(2025, 1, 10, 16, 0), at(2025, 1, 13, 8, 0), 0.0);
    let expanded = expand_days(&eight_hour_calendar(), &[gap], None, None);
    assert!(expanded
        .iter()
        .all(|span| eight_hour_calendar().is_working_date(span.start_day())));
    assert!(expanded.is_empty());
}

#[test]
fn compacted_series_expands_back_to_daily_entries() {
    let cal = eight_hour_calendar();
    let raw = hours(at(2025, 1, 6, 8, 0), at(2025, 1, 10, 16, 0), 40.0);

    let compacted = compacting().normalise(&cal, vec![raw]);
    assert_eq!(compacted.len(), 1);
    assert_eq!(compacted[0].amount_per_day(), WorkDuration::hours(8.0));

    let daily = Normaliser::default().normalise(&cal, vec![raw]);
    assert_eq!(daily.len(), 5);
    assert_eq!(expand_days(&cal, &compacted, None, None), daily);
}

#[test]
fn progress_boundary_is_padded_once() {
    let calendar: Arc<dyn ProjectCalendar> = Arc::new(eight_hour_calendar());
    // Work stopped at 11:00 Tuesday, resumes at 11:00
    let complete = vec![
        hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 8.0),
        hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 11, 0), 3.0),
    ];
    let planned = vec![
        hours(at(2025, 1, 7, 11, 0), at(2025, 1, 7, 16, 0), 5.0),
        hours(at(2025, 1, 8, 8, 0), at(2025, 1, 8, 16, 0), 8.0),
    ];
    let assignment = ResourceAssignment::new(
        1,
        1,
        1,
        TimephasedWorkContainer::from_canonical(Arc::clone(&calendar), planned.clone()),
        TimephasedWorkContainer::from_canonical(calendar, complete.clone()),
    );

    let expanded = assignment.expand();
    assert_eq!(expanded.complete, complete);
    assert_eq!(expanded.planned, planned);
    assert!(!assignment.is_split());
    assert_eq!(assignment.splits(), None);
}

#[test]
fn gap_between_series_is_split() {
    let calendar: Arc<dyn ProjectCalendar> = Arc::new(eight_hour_calendar());
    let complete = vec![
        hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 8.0),
        hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 16, 0), 0.0),
    ];
    let planned = vec![hours(at(2025, 1, 8, 8, 0), at(2025, 1, 8, 16, 0), 8.0)];
    let assignment = ResourceAssignment::new(
        2,
        1,
        1,
        TimephasedWorkContainer::from_canonical(Arc::clone(&calendar), planned),
        TimephasedWorkContainer::from_canonical(calendar, complete),
    );

    assert!(assignment.is_split());
    let splits = assignment.splits().unwrap();
    assert_eq!(splits.ranges.len(), 3);
    assert_eq!(splits.complete_through, Some(at(2025, 1, 7, 16, 0)));
}

#[test]
fn compaction_keeps_a_day_without_data_empty() {
    let cal = eight_hour_calendar();
    // nothing recorded for Tuesday
    let raw = vec![
        hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 8.0),
        hours(at(2025, 1, 8, 8, 0), at(2025, 1, 8, 16, 0), 8.0),
    ];

    let compacted = compacting().normalise(&cal, raw.clone());
    assert_eq!(compacted, raw);

    let expanded = expand_days(&cal, &compacted, None, None);
    assert_eq!(expanded, raw);
    assert_eq!(total_minutes(&expanded), 960.0);
}

#[test]
fn calendar_consistent_series_round_trips() {
    let calendar: Arc<dyn ProjectCalendar> = Arc::new(eight_hour_calendar());
    let complete = vec![
        hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 8.0),
        hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 11, 0), 3.0),
    ];
    let planned = vec![
        hours(at(2025, 1, 7, 11, 0), at(2025, 1, 7, 16, 0), 5.0),
        hours(at(2025, 1, 8, 8, 0), at(2025, 1, 8, 16, 0), 8.0),
        hours(at(2025, 1, 9, 8, 0), at(2025, 1, 9, 12, 0), 4.0),
    ];
    // remaining work arrives as one raw span from Tuesday 11:00 to Thursday noon
    let planned_raw = hours(at(2025, 1, 7, 11, 0), at(2025, 1, 9, 12, 0), 17.0);

    let normaliser = Normaliser::default();
    let canonical_planned = normaliser.normalise(calendar.as_ref(), vec![planned_raw]);
    let canonical_complete = normaliser.normalise(calendar.as_ref(), complete.clone());
    assert_eq!(canonical_planned, planned);
    assert_eq!(canonical_complete, complete);

    let expanded = expand_assignment(calendar.as_ref(), &canonical_planned, &canonical_complete);
    assert_eq!(expanded.complete, complete);

    let mut padded = planned.clone();
    padded.push(hours(at(2025, 1, 9, 12, 0), at(2025, 1, 9, 16, 0), 0.0));
    assert_eq!(expanded.planned, padded);
    assert_eq!(total_minutes(&expanded.planned), total_minutes(&planned));
}

#[test]
fn all_non_working_calendar_passes_work_through() {
    let cal = WorkCalendar::custom(
        Vec::<Weekday>::new(),
        [WorkingRange::hm(8, 0, 16, 0).unwrap()],
        Vec::<NaiveDate>::new(),
    )
    .unwrap();
    let raw = vec![
        hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 0.0),
        hours(at(2025, 1, 7, 8, 0), at(2025, 1, 8, 16, 0), 16.0),
        hours(at(2025, 1, 9, 10, 0), at(2025, 1, 9, 12, 0), 2.0),
    ];

    let canonical = Normaliser::default().normalise(&cal, raw.clone());
    assert_eq!(canonical, raw[1..].to_vec());
    assert_eq!(total_minutes(&canonical), total_minutes(&raw));

    let expanded = expand_days(&cal, &canonical, None, None);
    assert_eq!(expanded, vec![raw[2]]);
    assert!(!is_split(&cal, &canonical, &[]));
    assert!(!is_split(&cal, &raw, &[]));
}
