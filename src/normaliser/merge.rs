use crate::calendar::ProjectCalendar;
use crate::duration::UnitDefaults;
use crate::span::TimeSpan;

/// Collapses single-day fragments so each working day keeps at most one
/// informative entry.
///
/// Against the previously accepted span on the same day: a zero-work fragment
/// after real work is dropped, two working fragments fuse, and otherwise the
/// later fragment replaces the earlier one. Spans with neither work nor
/// calendar time are discarded.
pub fn merge_same_day<C>(calendar: &C, spans: Vec<TimeSpan>, defaults: &UnitDefaults) -> Vec<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    let mut result: Vec<TimeSpan> = Vec::with_capacity(spans.len());
    for current in spans {
        let same_day = result
            .last()
            .filter(|previous| previous.start_day() == current.start_day())
            .map(|previous| !previous.is_zero());

        let accepted = match same_day {
            Some(true) if current.is_zero() => continue,
            Some(previous_has_work) => match result.pop() {
                Some(previous) if previous_has_work => previous.merged_with(&current, defaults),
                _ => current,
            },
            None => current,
        };
        let accepted = accepted.with_amount_per_day(accepted.total_amount());

        let calendar_work = calendar.work_minutes(accepted.start(), accepted.finish());
        if calendar_work <= 0.0 && accepted.is_zero() {
            continue;
        }
        result.push(accepted);
    }
    result
}

/// Fuses consecutive spans whose daily work matches, within `tolerance`
/// minutes, into one multi-day span. `amount_per_day` keeps the daily rate.
///
/// Spans only join a run when the calendar has no working time between them,
/// so a working day without data always breaks the run.
pub fn merge_same_work<C>(
    calendar: &C,
    spans: Vec<TimeSpan>,
    tolerance: f64,
    defaults: &UnitDefaults,
) -> Vec<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    let mut result: Vec<TimeSpan> = Vec::with_capacity(spans.len());
    for current in spans {
        let run = result
            .last()
            .filter(|previous| {
                previous
                    .amount_per_day()
                    .approx_eq(&current.total_amount(), tolerance, defaults)
            })
            .filter(|previous| calendar.work_minutes(previous.finish(), current.start()) <= 0.0)
            .and_then(|previous| {
                let total = previous.total_amount().plus(&current.total_amount(), defaults);
                TimeSpan::new(previous.start(), current.finish(), total).ok()
            })
            .map(|run| run.with_amount_per_day(current.total_amount()));

        match run {
            Some(run) => {
                result.pop();
                result.push(run);
            }
            None => result.push(current.with_amount_per_day(current.total_amount())),
        }
    }
    result
}
