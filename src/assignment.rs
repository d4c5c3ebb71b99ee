use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::ProjectCalendar;
use crate::duration::{TimeUnit, WorkDuration};
use crate::error::{TimephasedError, TimephasedResult};
use crate::expand::{ExpandedSeries, TimephasedRecord, expand_assignment};
use crate::normaliser::Normaliser;
use crate::span::TimeSpan;
use crate::splits::{TaskSplits, is_split, task_splits};

/// Which side of the progress boundary a series describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Planned,
    Complete,
}

impl SeriesKind {
    pub fn type_code(&self) -> u8 {
        match self {
            SeriesKind::Planned => 1,
            SeriesKind::Complete => 2,
        }
    }

    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(SeriesKind::Planned),
            2 => Some(SeriesKind::Complete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Planned => "planned",
            SeriesKind::Complete => "complete",
        }
    }
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeriesKind {
    type Err = TimephasedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" | "remaining" | "1" => Ok(SeriesKind::Planned),
            "complete" | "actual" | "2" => Ok(SeriesKind::Complete),
            other => Err(TimephasedError::InvalidSeriesKind(other.to_string())),
        }
    }
}

/// Raw work spans that normalise against their calendar on first read.
#[derive(Clone)]
pub struct TimephasedWorkContainer {
    calendar: Arc<dyn ProjectCalendar>,
    normaliser: Normaliser,
    raw: Vec<TimeSpan>,
    canonical: OnceLock<Vec<TimeSpan>>,
}

impl TimephasedWorkContainer {
    pub fn new(
        calendar: Arc<dyn ProjectCalendar>,
        normaliser: Normaliser,
        raw: Vec<TimeSpan>,
    ) -> Self {
        Self {
            calendar,
            normaliser,
            raw,
            canonical: OnceLock::new(),
        }
    }

    /// Wraps a series that is already canonical, e.g. one loaded from storage.
    pub fn from_canonical(calendar: Arc<dyn ProjectCalendar>, spans: Vec<TimeSpan>) -> Self {
        Self {
            calendar,
            normaliser: Normaliser::default(),
            raw: Vec::new(),
            canonical: OnceLock::from(spans),
        }
    }

    pub fn data(&self) -> &[TimeSpan] {
        self.canonical.get_or_init(|| {
            self.normaliser
                .normalise(self.calendar.as_ref(), self.raw.clone())
        })
    }

    pub fn has_data(&self) -> bool {
        match self.canonical.get() {
            Some(spans) => !spans.is_empty(),
            None => !self.raw.is_empty(),
        }
    }

    pub fn is_normalised(&self) -> bool {
        self.canonical.get().is_some()
    }

    pub fn raw(&self) -> &[TimeSpan] {
        &self.raw
    }

    pub fn calendar(&self) -> &Arc<dyn ProjectCalendar> {
        &self.calendar
    }
}

impl fmt::Debug for TimephasedWorkContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimephasedWorkContainer")
            .field("raw", &self.raw.len())
            .field("canonical", &self.canonical.get().map(Vec::len))
            .finish()
    }
}

/// A resource's work on a task, split into completed and still-planned series.
#[derive(Debug, Clone)]
pub struct ResourceAssignment {
    pub id: i32,
    pub task_id: i32,
    pub resource_id: i32,
    planned: TimephasedWorkContainer,
    complete: TimephasedWorkContainer,
}

impl ResourceAssignment {
    pub fn new(
        id: i32,
        task_id: i32,
        resource_id: i32,
        planned: TimephasedWorkContainer,
        complete: TimephasedWorkContainer,
    ) -> Self {
        Self {
            id,
            task_id,
            resource_id,
            planned,
            complete,
        }
    }

    pub fn from_snapshot(calendar: Arc<dyn ProjectCalendar>, snapshot: AssignmentSnapshot) -> Self {
        Self {
            id: snapshot.id,
            task_id: snapshot.task_id,
            resource_id: snapshot.resource_id,
            planned: TimephasedWorkContainer::from_canonical(Arc::clone(&calendar), snapshot.planned),
            complete: TimephasedWorkContainer::from_canonical(calendar, snapshot.complete),
        }
    }

    pub fn planned(&self) -> &[TimeSpan] {
        self.planned.data()
    }

    pub fn complete(&self) -> &[TimeSpan] {
        self.complete.data()
    }

    pub fn series(&self, kind: SeriesKind) -> &[TimeSpan] {
        match kind {
            SeriesKind::Planned => self.planned(),
            SeriesKind::Complete => self.complete(),
        }
    }

    pub fn calendar(&self) -> &Arc<dyn ProjectCalendar> {
        self.planned.calendar()
    }

    pub fn has_timephased_data(&self) -> bool {
        self.planned.has_data() || self.complete.has_data()
    }

    pub fn is_split(&self) -> bool {
        is_split(self.calendar().as_ref(), self.planned(), self.complete())
    }

    pub fn splits(&self) -> Option<TaskSplits> {
        task_splits(self.complete(), self.planned())
    }

    pub fn expand(&self) -> ExpandedSeries {
        expand_assignment(self.calendar().as_ref(), self.planned(), self.complete())
    }

    /// Expanded spans of both series as storable records, complete first.
    pub fn records(&self, unit: TimeUnit) -> Vec<TimephasedRecord> {
        let defaults = self.calendar().unit_defaults();
        let expanded = self.expand();
        let complete = expanded.complete.iter().map(|span| {
            TimephasedRecord::from_span(self.id, SeriesKind::Complete, span, unit, &defaults)
        });
        let planned = expanded.planned.iter().map(|span| {
            TimephasedRecord::from_span(self.id, SeriesKind::Planned, span, unit, &defaults)
        });
        complete.chain(planned).collect()
    }

    pub fn snapshot(&self) -> AssignmentSnapshot {
        AssignmentSnapshot {
            id: self.id,
            task_id: self.task_id,
            resource_id: self.resource_id,
            planned: self.planned().to_vec(),
            complete: self.complete().to_vec(),
        }
    }
}

/// Raw planned span for an assignment that has remaining work but no
/// timephased data: starts at the first working instant at or after `start`
/// and runs until the calendar has supplied `remaining` work.
pub fn default_planned_span<C>(
    calendar: &C,
    start: NaiveDateTime,
    remaining: WorkDuration,
) -> TimephasedResult<TimeSpan>
where
    C: ProjectCalendar + ?Sized,
{
    if remaining.amount() < 0.0 {
        return Err(TimephasedError::InvalidCalendar(format!(
            "remaining work {remaining} is negative"
        )));
    }
    let start = calendar.next_work_start(start).unwrap_or(start);
    let finish = calendar.date(start, remaining, true);
    TimeSpan::new(start, finish, remaining)
}

/// Canonical series of one assignment, detached from its calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub id: i32,
    pub task_id: i32,
    pub resource_id: i32,
    #[serde(default)]
    pub planned: Vec<TimeSpan>,
    #[serde(default)]
    pub complete: Vec<TimeSpan>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{WorkCalendar, WorkingRange};
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn calendar() -> Arc<dyn ProjectCalendar> {
        Arc::new(WorkCalendar::weekdays(WorkingRange::hm(8, 0, 16, 0).unwrap()))
    }

    #[test]
    fn series_kind_codes_round_trip() {
        assert_eq!(SeriesKind::Planned.type_code(), 1);
        assert_eq!(SeriesKind::from_type_code(2), Some(SeriesKind::Complete));
        assert_eq!(SeriesKind::from_type_code(9), None);
        assert_eq!("actual".parse::<SeriesKind>(), Ok(SeriesKind::Complete));
        assert_eq!(
            "later".parse::<SeriesKind>(),
            Err(TimephasedError::InvalidSeriesKind("later".into()))
        );
    }

    #[test]
    fn container_normalises_on_first_read_only() {
        let raw = TimeSpan::new(
            at(2025, 1, 6, 8, 0),
            at(2025, 1, 8, 16, 0),
            WorkDuration::hours(24.0),
        )
        .unwrap();
        let container = TimephasedWorkContainer::new(calendar(), Normaliser::default(), vec![raw]);

        assert!(!container.is_normalised());
        assert!(container.has_data());
        let first = container.data().as_ptr();
        assert_eq!(container.data().len(), 3);
        assert!(container.is_normalised());
        assert_eq!(container.data().as_ptr(), first);
        assert_eq!(container.raw(), &[raw]);
    }

    #[test]
    fn canonical_container_is_not_renormalised() {
        let span = TimeSpan::new(
            at(2025, 1, 6, 8, 0),
            at(2025, 1, 7, 16, 0),
            WorkDuration::hours(16.0),
        )
        .unwrap();
        let container = TimephasedWorkContainer::from_canonical(calendar(), vec![span]);
        assert!(container.is_normalised());
        assert_eq!(container.data(), &[span]);
        assert!(container.raw().is_empty());
    }

    #[test]
    fn default_planned_span_covers_remaining_work() {
        let cal = WorkCalendar::weekdays(WorkingRange::hm(8, 0, 16, 0).unwrap());
        // Friday 12:00 with 8h left runs into Monday noon
        let span =
            default_planned_span(&cal, at(2025, 1, 10, 12, 0), WorkDuration::hours(8.0)).unwrap();
        assert_eq!(span.start(), at(2025, 1, 10, 12, 0));
        assert_eq!(span.finish(), at(2025, 1, 13, 12, 0));
        assert_eq!(span.total_amount(), WorkDuration::hours(8.0));
    }

    #[test]
    fn assignment_snapshot_keeps_canonical_series() {
        let planned_raw = TimeSpan::new(
            at(2025, 1, 6, 8, 0),
            at(2025, 1, 7, 16, 0),
            WorkDuration::hours(16.0),
        )
        .unwrap();
        let assignment = ResourceAssignment::new(
            7,
            1,
            3,
            TimephasedWorkContainer::new(calendar(), Normaliser::default(), vec![planned_raw]),
            TimephasedWorkContainer::new(calendar(), Normaliser::default(), Vec::new()),
        );

        let snapshot = assignment.snapshot();
        assert_eq!(snapshot.planned.len(), 2);
        assert!(snapshot.complete.is_empty());

        let restored = ResourceAssignment::from_snapshot(calendar(), snapshot.clone());
        assert_eq!(restored.snapshot(), snapshot);
        assert!(!restored.is_split());
        assert_eq!(restored.splits(), None);
    }
}
