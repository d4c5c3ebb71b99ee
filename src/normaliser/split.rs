use crate::calendar::ProjectCalendar;
use crate::duration::{WorkDuration, round_to};
use crate::span::TimeSpan;

/// Breaks every span crossing a day boundary into single-day spans, pro-rating
/// work by the calendar working minutes each day covers.
///
/// A multi-day span with no calendar work at all cannot be pro-rated and is
/// passed through unsplit.
pub fn split_days<C>(calendar: &C, spans: Vec<TimeSpan>, rounding_places: u32) -> Vec<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    let mut result = Vec::with_capacity(spans.len());
    for span in spans {
        let mut pending = Some(span);
        while let Some(current) = pending.take() {
            if current.is_single_day() {
                result.push(current);
                continue;
            }
            match split_first_day(calendar, &current, rounding_places) {
                Some((first, remainder)) => {
                    result.extend(first);
                    pending = remainder;
                }
                None => {
                    tracing::debug!(
                        start = %current.start(),
                        finish = %current.finish(),
                        "no calendar work across span, keeping it unsplit"
                    );
                    result.push(current);
                }
            }
        }
    }
    result
}

/// Returns the first-day portion (absent on a non-working start day) and the
/// remainder (absent once no working time is left before the finish).
/// `None` when the span covers no calendar work.
fn split_first_day<C>(
    calendar: &C,
    span: &TimeSpan,
    rounding_places: u32,
) -> Option<(Option<TimeSpan>, Option<TimeSpan>)>
where
    C: ProjectCalendar + ?Sized,
{
    let calendar_work = calendar.work_minutes(span.start(), span.finish());
    if calendar_work <= 0.0 {
        return None;
    }

    let defaults = calendar.unit_defaults();
    let total = span.total_amount();
    let start = span.start();
    let day = span.start_day();

    let first_day_finish = if calendar.is_working_date(day) {
        calendar.day_finish(day).filter(|finish| *finish > start)
    } else {
        None
    };

    let (first, split_finish, split_amount) = match first_day_finish {
        Some(day_finish) => {
            let minutes = calendar.work_minutes(start, day_finish) * total.amount() / calendar_work;
            let amount = WorkDuration::new(round_to(minutes, rounding_places), total.unit());
            let first = TimeSpan::new(start, day_finish, amount).ok();
            (first, day_finish, amount)
        }
        None => (None, start, WorkDuration::zero(total.unit())),
    };

    let remainder = calendar
        .next_work_start(split_finish)
        .filter(|next| *next <= span.finish())
        .and_then(|next| {
            TimeSpan::new(next, span.finish(), total.minus(&split_amount, &defaults)).ok()
        })
        .map(|remainder| remainder.with_amount_per_day(span.amount_per_day()));

    Some((first, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{WorkCalendar, WorkingRange};
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
    fn splits_monday_to_wednesday_into_three_days() {
        let raw = span(at(2025, 1, 6, 8, 0), at(2025, 1, 8, 16, 0), 1440.0);
        let split = split_days(&calendar(), vec![raw], 2);

        assert_eq!(split.len(), 3);
        assert_eq!(split[0].start(), at(2025, 1, 6, 8, 0));
        assert_eq!(split[0].finish(), at(2025, 1, 6, 16, 0));
        assert_eq!(split[1].start(), at(2025, 1, 7, 8, 0));
        assert_eq!(split[1].finish(), at(2025, 1, 7, 16, 0));
        assert_eq!(split[2].start(), at(2025, 1, 8, 8, 0));
        assert_eq!(split[2].finish(), at(2025, 1, 8, 16, 0));
        for piece in &split {
            assert_eq!(piece.total_amount(), WorkDuration::minutes(480.0));
        }
    }

    #[test]
    fn weekend_start_emits_no_first_day() {
        // Saturday 10:00 to Monday 12:00
        let raw = span(at(2025, 1, 4, 10, 0), at(2025, 1, 6, 12, 0), 240.0);
        let split = split_days(&calendar(), vec![raw], 2);

        assert_eq!(split.len(), 1);
        assert_eq!(split[0].start(), at(2025, 1, 6, 8, 0));
        assert_eq!(split[0].finish(), at(2025, 1, 6, 12, 0));
        assert_eq!(split[0].total_amount(), WorkDuration::minutes(240.0));
    }

    #[test]
    fn uneven_work_is_rounded_to_two_places() {
        let raw = span(at(2025, 1, 6, 8, 0), at(2025, 1, 8, 16, 0), 1000.0);
        let split = split_days(&calendar(), vec![raw], 2);

        assert_eq!(split.len(), 3);
        assert_eq!(split[0].total_amount().amount(), 333.33);
        let total: f64 = split.iter().map(|s| s.total_amount().amount()).sum();
        assert!((total - 1000.0).abs() < 0.02);
    }

    #[test]
    fn span_without_calendar_work_is_kept_unsplit() {
        // Saturday to Sunday: nothing to pro-rate against
        let raw = span(at(2025, 1, 4, 8, 0), at(2025, 1, 5, 16, 0), 60.0);
        let split = split_days(&calendar(), vec![raw], 2);
        assert_eq!(split, vec![raw]);
    }

    #[test]
    fn midnight_finish_stays_on_previous_day() {
        let raw = span(at(2025, 1, 6, 8, 0), at(2025, 1, 7, 0, 0), 480.0);
        let split = split_days(&calendar(), vec![raw], 2);
        assert_eq!(split, vec![raw]);
    }

    #[test]
    fn remainder_keeps_original_amount_per_day() {
        let raw = span(at(2025, 1, 6, 8, 0), at(2025, 1, 7, 16, 0), 960.0)
            .with_amount_per_day(WorkDuration::minutes(480.0));
        let split = split_days(&calendar(), vec![raw], 2);
        assert_eq!(split.len(), 2);
        assert_eq!(split[1].amount_per_day(), WorkDuration::minutes(480.0));
    }
}
