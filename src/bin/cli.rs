use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use polars::prelude::{AnyValue, DataFrame};
use tracing_subscriber::EnvFilter;

use timephased::{
    NormaliserConfig, Normaliser, ProjectCalendar, ProjectSnapshot, ResourceAssignment,
    SeriesKind, TimeUnit, WorkCalendar, WorkCalendarConfig, build_assignments, daily_ranges,
    export_records, load_raw_records_from_csv, load_snapshot_from_json, save_records_to_csv,
    save_records_to_json, save_snapshot_to_json, segment_work, series_to_dataframe,
    weekly_ranges,
};

/// Normalise, expand and inspect timephased resource work.
#[derive(Debug, Parser)]
#[command(name = "timephased", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a normaliser config file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to a calendar definition (WorkCalendarConfig JSON).
    #[arg(long, global = true)]
    calendar: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Normalise raw timephased rows from CSV into canonical per-day series.
    Normalise {
        /// Raw rows: assignment_id,task_id,resource_id,kind,start,finish,amount,unit
        #[arg(long)]
        input: PathBuf,

        /// Write the canonical assignments to this JSON snapshot.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the canonical series as tables.
        #[arg(long)]
        show: bool,
    },

    /// Expand a snapshot into padded records for export.
    Expand {
        #[arg(long)]
        snapshot: PathBuf,

        /// Destination file; `.json` writes JSON, anything else CSV.
        #[arg(long)]
        output: PathBuf,

        /// Unit the exported amounts are written in.
        #[arg(long, default_value = "hours")]
        unit: TimeUnit,
    },

    /// Report which assignments in a snapshot are split.
    DetectSplits {
        #[arg(long)]
        snapshot: PathBuf,
    },

    /// Sum one assignment's work into day or week buckets.
    Segment {
        #[arg(long)]
        snapshot: PathBuf,

        #[arg(long)]
        assignment: i32,

        #[arg(long, value_enum, default_value = "planned")]
        kind: KindArg,

        /// First bucket date (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Number of buckets.
        #[arg(long, default_value_t = 7)]
        count: u32,

        /// Use week buckets instead of day buckets.
        #[arg(long)]
        weekly: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Planned,
    Complete,
}

impl From<KindArg> for SeriesKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Planned => SeriesKind::Planned,
            KindArg::Complete => SeriesKind::Complete,
        }
    }
}

fn load_calendar_config(path: Option<&Path>) -> Result<WorkCalendarConfig> {
    let Some(path) = path else {
        return Ok(WorkCalendarConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read calendar {}", path.display()))?;
    serde_json::from_str(&contents).context("invalid calendar definition")
}

fn load_assignments(snapshot: &Path, calendar: Option<&Path>) -> Result<Vec<ResourceAssignment>> {
    let fallback: Arc<dyn ProjectCalendar> = Arc::new(
        WorkCalendar::from_config(&load_calendar_config(calendar)?)
            .context("invalid calendar definition")?,
    );
    let snapshot = load_snapshot_from_json(snapshot)
        .with_context(|| format!("failed to load snapshot {}", snapshot.display()))?;
    Ok(snapshot.into_assignments(fallback)?)
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| match col.get(row_idx) {
                Ok(AnyValue::Null) | Err(_) => String::new(),
                Ok(AnyValue::String(s)) => s.to_string(),
                Ok(av) => av.to_string(),
            })
            .collect();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push_str(&format!(" {value:<width$} |", width = widths[ci]));
        }
        line
    };

    let mut out = vec![sep.clone(), render_row(&col_names), sep.clone()];
    for row in &cells {
        out.push(render_row(row));
    }
    out.push(sep);
    out.join("\n")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = NormaliserConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Normalise {
            input,
            output,
            show,
        } => {
            let calendar_config = load_calendar_config(cli.calendar.as_deref())?;
            let calendar: Arc<dyn ProjectCalendar> = Arc::new(
                WorkCalendar::from_config(&calendar_config).context("invalid calendar definition")?,
            );
            let batch = load_raw_records_from_csv(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let (assignments, summary) =
                build_assignments(&calendar, &Normaliser::new(config), batch);

            println!(
                "read {} rows, skipped {}, {} assignments, {} canonical spans",
                summary.records_read,
                summary.records_skipped,
                summary.assignments,
                summary.canonical_spans
            );

            if show {
                for assignment in &assignments {
                    for kind in [SeriesKind::Complete, SeriesKind::Planned] {
                        let series = assignment.series(kind);
                        if series.is_empty() {
                            continue;
                        }
                        println!("assignment {} ({kind})", assignment.id);
                        println!("{}", render_df_as_text_table(&series_to_dataframe(series)?));
                    }
                }
            }

            if let Some(output) = output {
                let snapshot = ProjectSnapshot::from_assignments(&assignments, Some(calendar_config))?;
                save_snapshot_to_json(&snapshot, &output)
                    .with_context(|| format!("failed to write {}", output.display()))?;
                println!("snapshot written to {}", output.display());
            }
        }
        Commands::Expand {
            snapshot,
            output,
            unit,
        } => {
            let assignments = load_assignments(&snapshot, cli.calendar.as_deref())?;
            let records = export_records(&assignments, unit);
            let is_json = output
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json {
                save_records_to_json(&records, &output)?;
            } else {
                let defaults = assignments
                    .first()
                    .map(|assignment| assignment.calendar().unit_defaults())
                    .unwrap_or_default();
                save_records_to_csv(&records, &defaults, &output)?;
            }
            println!("{} records written to {}", records.len(), output.display());
        }
        Commands::DetectSplits { snapshot } => {
            let assignments = load_assignments(&snapshot, cli.calendar.as_deref())?;
            for assignment in &assignments {
                match assignment.splits() {
                    Some(splits) => println!(
                        "assignment {}: split into {} ranges",
                        assignment.id,
                        splits.ranges.len()
                    ),
                    None if assignment.is_split() => {
                        println!("assignment {}: split", assignment.id)
                    }
                    None => println!("assignment {}: not split", assignment.id),
                }
            }
        }
        Commands::Segment {
            snapshot,
            assignment,
            kind,
            start,
            count,
            weekly,
        } => {
            let assignments = load_assignments(&snapshot, cli.calendar.as_deref())?;
            let Some(target) = assignments.iter().find(|a| a.id == assignment) else {
                bail!("assignment {assignment} not found in {}", snapshot.display());
            };
            let ranges = if weekly {
                weekly_ranges(start, count)
            } else {
                daily_ranges(start, count)
            };
            let buckets = segment_work(
                target.calendar().as_ref(),
                target.series(kind.into()),
                &ranges,
                config.storage_unit,
            );
            for (range, amount) in ranges.iter().zip(buckets) {
                println!("{}\t{amount}", range.start.date());
            }
        }
    }

    Ok(())
}
