use crate::calendar::ProjectCalendar;
use crate::span::TimeSpan;

/// Clamps each span to the working window of its day.
///
/// A span carrying work is only pulled in when it starts before the day's
/// working start or finishes after its working finish. A zero-work span is
/// snapped to the calendar boundary whenever it differs from it.
pub fn validate_same_day<C>(calendar: &C, spans: Vec<TimeSpan>) -> Vec<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    spans
        .into_iter()
        .map(|span| clamp_to_working_day(calendar, span))
        .collect()
}

fn clamp_to_working_day<C>(calendar: &C, span: TimeSpan) -> TimeSpan
where
    C: ProjectCalendar + ?Sized,
{
    let zero = span.is_zero();
    let mut start = span.start();
    let mut finish = span.finish();

    if let Some(day_start) = calendar.day_start(span.start_day()) {
        if (zero && start != day_start) || start < day_start {
            start = day_start;
        }
    }

    if let Some(day_finish) = calendar.day_finish(span.finish_day()) {
        if (zero && finish != day_finish) || finish > day_finish {
            finish = day_finish;
        }
    }

    if start > finish {
        start = finish;
    }

    span.with_bounds(start, finish).unwrap_or(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{WorkCalendar, WorkingRange};
    use crate::duration::WorkDuration;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn calendar() -> WorkCalendar {
        WorkCalendar::weekdays(WorkingRange::hm(8, 0, 16, 0).unwrap())
    }

    fn span(start: NaiveDateTime, finish: NaiveDateTime, minutes: f64) -> TimeSpan {
        TimeSpan::new(start, finish, WorkDuration::minutes(minutes)).unwrap()
    }

    #[test]
    fn working_span_inside_hours_is_untouched() {
        let inside = span(at(2025, 1, 7, 10, 0), at(2025, 1, 7, 14, 0), 240.0);
        assert_eq!(validate_same_day(&calendar(), vec![inside]), vec![inside]);
    }

    #[test]
    fn working_span_is_clamped_never_widened() {
        let wide = span(at(2025, 1, 7, 6, 0), at(2025, 1, 7, 18, 0), 480.0);
        let clamped = validate_same_day(&calendar(), vec![wide]);
        assert_eq!(clamped[0].start(), at(2025, 1, 7, 8, 0));
        assert_eq!(clamped[0].finish(), at(2025, 1, 7, 16, 0));
        assert_eq!(clamped[0].total_amount(), WorkDuration::minutes(480.0));
    }

    #[test]
    fn zero_span_snaps_to_calendar_boundaries() {
        let marker = span(at(2025, 1, 7, 9, 30), at(2025, 1, 7, 15, 0), 0.0);
        let snapped = validate_same_day(&calendar(), vec![marker]);
        assert_eq!(snapped[0].start(), at(2025, 1, 7, 8, 0));
        assert_eq!(snapped[0].finish(), at(2025, 1, 7, 16, 0));
    }

    #[test]
    fn non_working_day_is_left_alone() {
        let weekend = span(at(2025, 1, 11, 9, 0), at(2025, 1, 11, 11, 0), 120.0);
        assert_eq!(validate_same_day(&calendar(), vec![weekend]), vec![weekend]);
    }

    #[test]
    fn span_after_hours_does_not_invert() {
        let late = span(at(2025, 1, 7, 18, 0), at(2025, 1, 7, 19, 0), 60.0);
        let clamped = validate_same_day(&calendar(), vec![late]);
        assert!(clamped[0].start() <= clamped[0].finish());
        assert_eq!(clamped[0].finish(), at(2025, 1, 7, 16, 0));
    }
}
