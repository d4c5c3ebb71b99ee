//! Write path: re-expands a canonical series into calendar-bounded spans with
//! explicit zero-work padding, the shape file formats expect.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::assignment::SeriesKind;
use crate::calendar::ProjectCalendar;
use crate::duration::{TimeUnit, UnitDefaults};
use crate::span::TimeSpan;

/// Both series of one assignment after expansion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedSeries {
    pub planned: Vec<TimeSpan>,
    pub complete: Vec<TimeSpan>,
}

/// Expands the planned and complete series of one assignment. The planned
/// series looks back at the last complete span and the complete series looks
/// ahead at the first planned span, so padding is not duplicated at the
/// progress boundary.
pub fn expand_assignment<C>(calendar: &C, planned: &[TimeSpan], complete: &[TimeSpan]) -> ExpandedSeries
where
    C: ProjectCalendar + ?Sized,
{
    ExpandedSeries {
        planned: expand_days(calendar, planned, None, complete.last()),
        complete: expand_days(calendar, complete, planned.first(), None),
    }
}

/// Expands one series.
///
/// `first_planned` bounds padding after the last span of a complete series,
/// `last_complete` bounds padding before the first span of a planned series.
pub fn expand_days<C>(
    calendar: &C,
    spans: &[TimeSpan],
    first_planned: Option<&TimeSpan>,
    last_complete: Option<&TimeSpan>,
) -> Vec<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    let mut result = Vec::with_capacity(spans.len() * 3);
    for span in spans {
        if span.is_single_day() {
            expand_single_day(calendar, span, first_planned, last_complete, &mut result);
        } else {
            expand_multi_day(calendar, span, &mut result);
        }
    }
    result
}

fn expand_single_day<C>(
    calendar: &C,
    span: &TimeSpan,
    first_planned: Option<&TimeSpan>,
    last_complete: Option<&TimeSpan>,
    result: &mut Vec<TimeSpan>,
) where
    C: ProjectCalendar + ?Sized,
{
    let day = span.start_day();
    let unit = span.total_amount().unit();

    if let Some(day_start) = calendar.day_start(day) {
        if span.start() > day_start {
            let padding_start = match last_complete {
                Some(last) if last.finish() == span.start() => None,
                Some(last) if last.finish_day() == day => Some(last.finish()),
                _ => Some(day_start),
            };
            if let Some(padding) = padding_start
                .filter(|start| *start < span.start())
                .and_then(|start| TimeSpan::padding(start, span.start(), unit).ok())
            {
                result.push(padding);
            }
        }
    }

    result.push(*span);

    if let Some(day_finish) = calendar.day_finish(day) {
        if span.finish() < day_finish {
            let padding_finish = match first_planned {
                Some(first) if first.start() == span.finish() => None,
                Some(first) if first.start_day() == span.finish_day() => Some(first.start()),
                _ => Some(day_finish),
            };
            if let Some(padding) = padding_finish
                .filter(|finish| *finish > span.finish())
                .and_then(|finish| TimeSpan::padding(span.finish(), finish, unit).ok())
            {
                result.push(padding);
            }
        }
    }
}

/// One span per working day covered, each carrying `amount_per_day`.
/// Non-working days produce nothing.
fn expand_multi_day<C>(calendar: &C, span: &TimeSpan, result: &mut Vec<TimeSpan>)
where
    C: ProjectCalendar + ?Sized,
{
    let per_day = span.amount_per_day();
    let last_day = span.finish_day();
    let mut current = span.start_day();

    while current <= last_day {
        if calendar.is_working_date(current) {
            if let (Some(day_start), Some(day_finish)) =
                (calendar.day_start(current), calendar.day_finish(current))
            {
                let window_start = day_start.max(span.start());
                let window_finish = day_finish.min(span.finish());
                if window_finish > window_start {
                    if let Ok(day_span) = TimeSpan::new(window_start, window_finish, per_day) {
                        result.push(day_span);
                    }
                }
            }
        }
        current = current + Duration::days(1);
    }
}

/// One expanded span as a file format stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimephasedRecord {
    pub assignment_id: i32,
    pub kind: SeriesKind,
    /// MS Project timephased data type: 1 remaining (planned), 2 actual (complete).
    pub type_code: u8,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub amount: f64,
    pub unit: TimeUnit,
}

impl TimephasedRecord {
    pub fn from_span(
        assignment_id: i32,
        kind: SeriesKind,
        span: &TimeSpan,
        unit: TimeUnit,
        defaults: &UnitDefaults,
    ) -> Self {
        Self {
            assignment_id,
            kind,
            type_code: kind.type_code(),
            start: span.start(),
            finish: span.finish(),
            amount: span.total_amount().convert_to(unit, defaults).amount(),
            unit,
        }
    }

    /// The amount as an ISO-8601 duration, e.g. `PT8H0M0S`.
    pub fn iso_duration(&self, defaults: &UnitDefaults) -> String {
        let minutes = crate::duration::WorkDuration::new(self.amount, self.unit).to_minutes(defaults);
        let total_seconds = (minutes * 60.0).round() as i64;
        let hours = total_seconds / 3600;
        let mins = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;
        format!("PT{hours}H{mins}M{secs}S")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{WorkCalendar, WorkingRange};
    use crate::duration::WorkDuration;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn calendar() -> WorkCalendar {
        WorkCalendar::weekdays(WorkingRange::hm(8, 0, 16, 0).unwrap())
    }

    fn hours(start: NaiveDateTime, finish: NaiveDateTime, amount: f64) -> TimeSpan {
        TimeSpan::new(start, finish, WorkDuration::hours(amount)).unwrap()
    }

    #[test]
    fn partial_day_is_padded_on_both_sides() {
        let tuesday = hours(at(2025, 1, 7, 10, 0), at(2025, 1, 7, 14, 0), 4.0);
        let expanded = expand_days(&calendar(), &[tuesday], None, None);

        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0], hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 10, 0), 0.0));
        assert_eq!(expanded[1], tuesday);
        assert_eq!(expanded[2], hours(at(2025, 1, 7, 14, 0), at(2025, 1, 7, 16, 0), 0.0));
    }

    #[test]
    fn full_day_needs_no_padding() {
        let monday = hours(at(2025, 1, 6, 8, 0), at(2025, 1, 6, 16, 0), 8.0);
        assert_eq!(expand_days(&calendar(), &[monday], None, None), vec![monday]);
    }

    #[test]
    fn adjoining_complete_span_suppresses_start_padding() {
        let complete = hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 11, 0), 3.0);
        let planned = hours(at(2025, 1, 7, 11, 0), at(2025, 1, 7, 16, 0), 5.0);
        let expanded = expand_assignment(&calendar(), &[planned], &[complete]);

        assert_eq!(expanded.planned, vec![planned]);
        assert_eq!(expanded.complete, vec![complete]);
    }

    #[test]
    fn same_day_neighbour_shortens_padding() {
        let complete = hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 10, 0), 2.0);
        let planned = hours(at(2025, 1, 7, 12, 0), at(2025, 1, 7, 16, 0), 4.0);
        let expanded = expand_assignment(&calendar(), &[planned], &[complete]);

        assert_eq!(
            expanded.planned,
            vec![
                hours(at(2025, 1, 7, 10, 0), at(2025, 1, 7, 12, 0), 0.0),
                planned,
            ]
        );
        assert_eq!(
            expanded.complete,
            vec![
                complete,
                hours(at(2025, 1, 7, 10, 0), at(2025, 1, 7, 12, 0), 0.0),
            ]
        );
    }

    #[test]
    fn multi_day_span_skips_weekend() {
        // Friday 16:00 through Monday 08:00 touches no working time
        let span = hours(at(2025, 1, 10, 16, 0), at(2025, 1, 13, 8, 0), 0.0);
        let expanded = expand_days(&calendar(), &[span], None, None);
        assert!(expanded.is_empty());
    }

    #[test]
    fn multi_day_run_expands_per_day() {
        // Thursday through Tuesday, 8h per working day
        let run = hours(at(2025, 1, 9, 8, 0), at(2025, 1, 14, 16, 0), 32.0)
            .with_amount_per_day(WorkDuration::hours(8.0));
        let expanded = expand_days(&calendar(), &[run], None, None);

        let days: Vec<u32> = expanded
            .iter()
            .map(|span| chrono::Datelike::day(&span.start_day()))
            .collect();
        assert_eq!(days, vec![9, 10, 13, 14]);
        assert!(expanded
            .iter()
            .all(|span| span.total_amount() == WorkDuration::hours(8.0)));
    }

    #[test]
    fn record_formats_iso_duration() {
        let defaults = UnitDefaults::default();
        let span = hours(at(2025, 1, 7, 8, 0), at(2025, 1, 7, 16, 0), 7.5);
        let record =
            TimephasedRecord::from_span(3, SeriesKind::Complete, &span, TimeUnit::Hours, &defaults);
        assert_eq!(record.type_code, 2);
        assert_eq!(record.iso_duration(&defaults), "PT7H30M0S");
    }
}
