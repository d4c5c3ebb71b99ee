use serde::{Deserialize, Serialize};

use crate::calendar::ProjectCalendar;
use crate::span::{DateRange, TimeSpan};
use chrono::NaiveDateTime;

/// True when either series holds an explicit zero-work span over time the
/// calendar considers working, i.e. the assignment's work is interrupted.
pub fn is_split<C>(calendar: &C, planned: &[TimeSpan], complete: &[TimeSpan]) -> bool
where
    C: ProjectCalendar + ?Sized,
{
    planned.iter().chain(complete).any(|span| {
        span.is_zero() && calendar.work_minutes(span.start(), span.finish()) > 0.0
    })
}

/// Alternating worked and idle ranges of a split task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSplits {
    pub ranges: Vec<DateRange>,
    /// Finish of the last completed span, if any work is complete.
    pub complete_through: Option<NaiveDateTime>,
}

/// Builds split ranges from the canonical complete and planned series.
///
/// Adjacent spans that both carry work fuse into one range. When the last
/// complete span and the first planned span both carry work they form a single
/// range across the progress boundary. Fewer than three ranges is not a split.
pub fn task_splits(complete: &[TimeSpan], planned: &[TimeSpan]) -> Option<TaskSplits> {
    let mut ranges: Vec<DateRange> = Vec::new();

    let mut previous: Option<&TimeSpan> = None;
    for span in complete {
        extend_ranges(&mut ranges, previous, span);
        previous = Some(span);
    }

    let mut carried_start = match (complete.last(), planned.first()) {
        (Some(last), Some(first)) if !last.is_zero() && !first.is_zero() => {
            ranges.pop().map(|range| range.start)
        }
        _ => None,
    };

    previous = None;
    for span in planned {
        match carried_start.take() {
            Some(start) => ranges.push(DateRange::new(start, span.finish())),
            None => extend_ranges(&mut ranges, previous, span),
        }
        previous = Some(span);
    }

    if ranges.len() > 2 {
        Some(TaskSplits {
            ranges,
            complete_through: complete.last().map(TimeSpan::finish),
        })
    } else {
        None
    }
}

fn extend_ranges(ranges: &mut Vec<DateRange>, previous: Option<&TimeSpan>, span: &TimeSpan) {
    let fuse = previous.is_some_and(|previous| !previous.is_zero()) && !span.is_zero();
    match ranges.last_mut() {
        Some(last) if fuse => last.finish = span.finish(),
        _ => ranges.push(DateRange::new(span.start(), span.finish())),
    }
}
