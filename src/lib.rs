pub mod assignment;
pub mod calendar;
pub mod config;
pub mod duration;
pub mod error;
pub mod expand;
pub mod frame;
pub mod normaliser;
pub mod persistence;
pub mod pipeline;
pub mod segment;
pub mod span;
pub mod splits;

pub use assignment::{
    AssignmentSnapshot, ResourceAssignment, SeriesKind, TimephasedWorkContainer,
    default_planned_span,
};
pub use calendar::{CalendarException, ProjectCalendar, WorkCalendar, WorkCalendarConfig, WorkingRange};
pub use config::NormaliserConfig;
pub use duration::{TimeUnit, UnitDefaults, WorkDuration};
pub use error::{TimephasedError, TimephasedResult};
pub use expand::{ExpandedSeries, TimephasedRecord, expand_assignment, expand_days};
pub use frame::{daily_totals, series_from_dataframe, series_to_dataframe};
pub use normaliser::{
    CompactingHooks, Normaliser, NormaliserHooks, StandardHooks, convert_units, merge_same_day,
    merge_same_work, split_days, validate_same_day,
};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteAssignmentStore;
pub use persistence::{
    AssignmentStore, PersistenceError, PersistenceResult, ProjectSnapshot,
    load_raw_records_from_csv, load_snapshot_from_json, read_raw_records, save_records_to_csv,
    save_records_to_json, save_snapshot_to_json,
};
pub use pipeline::{ImportSummary, RawRecordBatch, RawWorkRecord, build_assignments, export_records};
pub use segment::{daily_ranges, segment_work, weekly_ranges};
pub use span::{DateRange, TimeSpan};
pub use splits::{TaskSplits, is_split, task_splits};
