//! Timescale segmentation: how much of a canonical series falls in each bucket
//! of a reporting timescale.

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::calendar::ProjectCalendar;
use crate::duration::{TimeUnit, WorkDuration};
use crate::span::{DateRange, TimeSpan};

/// Work per range, pro-rated by the calendar working minutes each range shares
/// with a span. A span with work but no calendar time is attributed whole to
/// the range holding its start.
pub fn segment_work<C>(
    calendar: &C,
    series: &[TimeSpan],
    ranges: &[DateRange],
    unit: TimeUnit,
) -> Vec<WorkDuration>
where
    C: ProjectCalendar + ?Sized,
{
    let defaults = calendar.unit_defaults();
    ranges
        .iter()
        .map(|range| {
            let minutes: f64 = series
                .iter()
                .filter(|span| !span.is_zero())
                .map(|span| {
                    let span_minutes = span.total_amount().to_minutes(&defaults);
                    let span_work = calendar.work_minutes(span.start(), span.finish());
                    if span_work <= 0.0 {
                        return if range.contains(span.start()) {
                            span_minutes
                        } else {
                            0.0
                        };
                    }
                    let overlap_start = range.start.max(span.start());
                    let overlap_finish = range.finish.min(span.finish());
                    if overlap_finish <= overlap_start {
                        return 0.0;
                    }
                    span_minutes * calendar.work_minutes(overlap_start, overlap_finish) / span_work
                })
                .sum();
            WorkDuration::minutes(minutes)
                .convert_to(unit, &defaults)
                .rounded(2)
        })
        .collect()
}

/// `days` consecutive midnight-to-midnight buckets starting at `start`.
pub fn daily_ranges(start: NaiveDate, days: u32) -> Vec<DateRange> {
    ranges_of(start, Duration::days(1), days)
}

/// `weeks` consecutive seven-day buckets starting at `start`.
pub fn weekly_ranges(start: NaiveDate, weeks: u32) -> Vec<DateRange> {
    ranges_of(start, Duration::weeks(1), weeks)
}

/// Stops early, with a warning, once a bucket would pass the last
/// representable date.
fn ranges_of(start: NaiveDate, step: Duration, count: u32) -> Vec<DateRange> {
    let mut ranges = Vec::new();
    let mut bucket_start = start.and_time(NaiveTime::MIN);
    for _ in 0..count {
        let Some(bucket_finish) = bucket_start.checked_add_signed(step) else {
            tracing::warn!(
                requested = count,
                built = ranges.len(),
                "timescale runs past the last date"
            );
            break;
        };
        ranges.push(DateRange::new(bucket_start, bucket_finish));
        bucket_start = bucket_finish;
    }
    ranges
}
