use super::{PersistenceError, PersistenceResult};
use crate::assignment::{AssignmentSnapshot, ResourceAssignment, SeriesKind};
use crate::calendar::{ProjectCalendar, WorkCalendar, WorkCalendarConfig};
use crate::duration::{TimeUnit, UnitDefaults, WorkDuration};
use crate::expand::TimephasedRecord;
use crate::pipeline::{RawRecordBatch, RawWorkRecord};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Canonical assignments plus the calendar they were normalised against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<WorkCalendarConfig>,
    pub assignments: Vec<AssignmentSnapshot>,
}

impl ProjectSnapshot {
    pub fn from_assignments(
        assignments: &[ResourceAssignment],
        calendar: Option<WorkCalendarConfig>,
    ) -> PersistenceResult<Self> {
        let assignments: Vec<AssignmentSnapshot> =
            assignments.iter().map(ResourceAssignment::snapshot).collect();
        super::validate_snapshots(&assignments)?;
        Ok(Self {
            calendar,
            assignments,
        })
    }

    /// Rebuilds the assignments against the stored calendar, or `fallback`
    /// when the snapshot carries none.
    pub fn into_assignments(
        self,
        fallback: Arc<dyn ProjectCalendar>,
    ) -> PersistenceResult<Vec<ResourceAssignment>> {
        super::validate_snapshots(&self.assignments)?;
        let calendar: Arc<dyn ProjectCalendar> = match self.calendar {
            Some(config) => Arc::new(WorkCalendar::from_config(&config)?),
            None => fallback,
        };
        Ok(self
            .assignments
            .into_iter()
            .map(|snapshot| ResourceAssignment::from_snapshot(Arc::clone(&calendar), snapshot))
            .collect())
    }
}

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &ProjectSnapshot,
    path: P,
) -> PersistenceResult<()> {
    super::validate_snapshots(&snapshot.assignments)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ProjectSnapshot> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    super::validate_snapshots(&snapshot.assignments)?;
    Ok(snapshot)
}

#[derive(Default, Serialize, Deserialize)]
struct RawCsvRecord {
    assignment_id: i32,
    task_id: i32,
    resource_id: i32,
    kind: String,
    start: String,
    finish: String,
    amount: f64,
    #[serde(default)]
    unit: String,
}

impl RawCsvRecord {
    fn into_raw(self) -> PersistenceResult<RawWorkRecord> {
        let kind: SeriesKind = self.kind.parse()?;
        let unit = if self.unit.trim().is_empty() {
            TimeUnit::Hours
        } else {
            self.unit.parse()?
        };
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(PersistenceError::InvalidData(format!(
                "invalid amount {}",
                self.amount
            )));
        }
        Ok(RawWorkRecord {
            assignment_id: self.assignment_id,
            task_id: self.task_id,
            resource_id: self.resource_id,
            kind,
            start: parse_datetime(&self.start)?,
            finish: parse_datetime(&self.finish)?,
            amount: WorkDuration::new(self.amount, unit),
        })
    }
}

/// Reads raw timephased rows. Rows that fail to deserialize or parse are
/// logged and counted rather than aborting the import.
pub fn read_raw_records<R: Read>(reader: R) -> PersistenceResult<RawRecordBatch> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut batch = RawRecordBatch::default();
    for (row_idx, row) in reader.deserialize::<RawCsvRecord>().enumerate() {
        let parsed = row
            .map_err(PersistenceError::from)
            .and_then(RawCsvRecord::into_raw);
        match parsed {
            Ok(record) => batch.records.push(record),
            Err(err) => {
                tracing::warn!(row = row_idx + 1, %err, "skipping malformed timephased row");
                batch.skipped += 1;
            }
        }
    }
    Ok(batch)
}

pub fn load_raw_records_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<RawRecordBatch> {
    let file = File::open(path)?;
    read_raw_records(file)
}

#[derive(Serialize)]
struct RecordCsvRow {
    assignment_id: i32,
    kind: String,
    type_code: u8,
    start: String,
    finish: String,
    amount: f64,
    unit: String,
    duration: String,
}

impl RecordCsvRow {
    fn from_record(record: &TimephasedRecord, defaults: &UnitDefaults) -> Self {
        Self {
            assignment_id: record.assignment_id,
            kind: record.kind.to_string(),
            type_code: record.type_code,
            start: format_datetime(record.start),
            finish: format_datetime(record.finish),
            amount: record.amount,
            unit: record.unit.to_string(),
            duration: record.iso_duration(defaults),
        }
    }
}

pub fn save_records_to_csv<P: AsRef<Path>>(
    records: &[TimephasedRecord],
    defaults: &UnitDefaults,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(RecordCsvRow::from_record(record, defaults))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_records_to_json<P: AsRef<Path>>(
    records: &[TimephasedRecord],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, records)?;
    Ok(())
}

pub(crate) fn format_datetime(instant: NaiveDateTime) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S").to_string()
}

pub(crate) fn parse_datetime(input: &str) -> PersistenceResult<NaiveDateTime> {
    let trimmed = input.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| PersistenceError::InvalidData(format!("invalid datetime '{input}'")))
}
