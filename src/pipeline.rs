//! Read and write pipelines over many assignments. Each assignment is
//! independent, so both directions fan out across the rayon pool.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assignment::{ResourceAssignment, SeriesKind, TimephasedWorkContainer};
use crate::calendar::ProjectCalendar;
use crate::duration::{TimeUnit, WorkDuration};
use crate::error::TimephasedResult;
use crate::expand::TimephasedRecord;
use crate::normaliser::Normaliser;
use crate::span::TimeSpan;

/// One raw timephased entry as a file format delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWorkRecord {
    pub assignment_id: i32,
    pub task_id: i32,
    pub resource_id: i32,
    pub kind: SeriesKind,
    pub start: NaiveDateTime,
    pub finish: NaiveDateTime,
    pub amount: WorkDuration,
}

impl RawWorkRecord {
    pub fn to_span(&self) -> TimephasedResult<TimeSpan> {
        TimeSpan::new(self.start, self.finish, self.amount)
    }
}

/// Parsed records plus how many input rows could not be used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecordBatch {
    pub records: Vec<RawWorkRecord>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub records_read: usize,
    pub records_skipped: usize,
    pub assignments: usize,
    pub canonical_spans: usize,
}

#[derive(Default)]
struct AssignmentGroup {
    task_id: i32,
    resource_id: i32,
    planned: Vec<TimeSpan>,
    complete: Vec<TimeSpan>,
}

/// Groups raw records per assignment and normalises every assignment in
/// parallel. Records whose bounds are inverted are skipped and counted.
pub fn build_assignments(
    calendar: &Arc<dyn ProjectCalendar>,
    normaliser: &Normaliser,
    batch: RawRecordBatch,
) -> (Vec<ResourceAssignment>, ImportSummary) {
    let mut summary = ImportSummary {
        records_read: batch.records.len() + batch.skipped,
        records_skipped: batch.skipped,
        ..ImportSummary::default()
    };

    let mut groups: BTreeMap<i32, AssignmentGroup> = BTreeMap::new();
    for record in batch.records {
        let span = match record.to_span() {
            Ok(span) => span,
            Err(err) => {
                tracing::warn!(assignment = record.assignment_id, %err, "skipping raw record");
                summary.records_skipped += 1;
                continue;
            }
        };
        let group = groups.entry(record.assignment_id).or_default();
        group.task_id = record.task_id;
        group.resource_id = record.resource_id;
        match record.kind {
            SeriesKind::Planned => group.planned.push(span),
            SeriesKind::Complete => group.complete.push(span),
        }
    }

    let assignments: Vec<ResourceAssignment> = groups
        .into_par_iter()
        .map(|(id, mut group)| {
            group.planned.sort_by_key(TimeSpan::start);
            group.complete.sort_by_key(TimeSpan::start);
            let assignment = ResourceAssignment::new(
                id,
                group.task_id,
                group.resource_id,
                TimephasedWorkContainer::new(Arc::clone(calendar), normaliser.clone(), group.planned),
                TimephasedWorkContainer::new(Arc::clone(calendar), normaliser.clone(), group.complete),
            );
            // force normalisation on this worker
            assignment.planned();
            assignment.complete();
            assignment
        })
        .collect();

    summary.assignments = assignments.len();
    summary.canonical_spans = assignments
        .iter()
        .map(|assignment| assignment.planned().len() + assignment.complete().len())
        .sum();

    tracing::info!(
        read = summary.records_read,
        skipped = summary.records_skipped,
        assignments = summary.assignments,
        spans = summary.canonical_spans,
        "imported timephased work"
    );
    (assignments, summary)
}

/// Expands every assignment in parallel; records keep assignment order.
pub fn export_records(assignments: &[ResourceAssignment], unit: TimeUnit) -> Vec<TimephasedRecord> {
    let per_assignment: Vec<Vec<TimephasedRecord>> = assignments
        .par_iter()
        .map(|assignment| assignment.records(unit))
        .collect();
    let records: Vec<TimephasedRecord> = per_assignment.into_iter().flatten().collect();
    tracing::info!(
        assignments = assignments.len(),
        records = records.len(),
        "exported timephased work"
    );
    records
}
