use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use polars::prelude::PlSmallStr;

use crate::duration::{TimeUnit, WorkDuration};
use crate::error::TimephasedError;
use crate::span::TimeSpan;

fn datetime_dtype() -> DataType {
    DataType::Datetime(polars::prelude::TimeUnit::Milliseconds, None)
}

/// A canonical series as a DataFrame with columns `start`, `finish`, `day`,
/// `total_amount`, `amount_per_day` and `unit`.
pub fn series_to_dataframe(series: &[TimeSpan]) -> PolarsResult<DataFrame> {
    let starts: Vec<i64> = series
        .iter()
        .map(|span| datetime_to_millis(span.start()))
        .collect();
    let finishes: Vec<i64> = series
        .iter()
        .map(|span| datetime_to_millis(span.finish()))
        .collect();
    let days: Vec<i32> = series
        .iter()
        .map(|span| date_to_i32(span.start_day()))
        .collect();
    let totals: Vec<f64> = series
        .iter()
        .map(|span| span.total_amount().amount())
        .collect();
    let per_day: Vec<f64> = series
        .iter()
        .map(|span| span.amount_per_day().amount())
        .collect();
    let units: Vec<&str> = series
        .iter()
        .map(|span| span.total_amount().unit().as_str())
        .collect();

    let columns = vec![
        Series::new(PlSmallStr::from_static("start"), starts)
            .cast(&datetime_dtype())?
            .into_column(),
        Series::new(PlSmallStr::from_static("finish"), finishes)
            .cast(&datetime_dtype())?
            .into_column(),
        Series::new(PlSmallStr::from_static("day"), days)
            .cast(&DataType::Date)?
            .into_column(),
        Series::new(PlSmallStr::from_static("total_amount"), totals).into_column(),
        Series::new(PlSmallStr::from_static("amount_per_day"), per_day).into_column(),
        Series::new(PlSmallStr::from_static("unit"), units).into_column(),
    ];
    DataFrame::new(columns)
}

pub fn series_from_dataframe(df: &DataFrame) -> PolarsResult<Vec<TimeSpan>> {
    let starts = df.column("start")?.cast(&DataType::Int64)?;
    let finishes = df.column("finish")?.cast(&DataType::Int64)?;
    let starts = starts.i64()?;
    let finishes = finishes.i64()?;
    let totals = df.column("total_amount")?.f64()?;
    let per_day = df.column("amount_per_day")?.f64()?;
    let units = df.column("unit")?.str()?;

    let mut series = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let start = starts
            .get(row_idx)
            .and_then(millis_to_datetime)
            .ok_or_else(|| missing(row_idx, "start"))?;
        let finish = finishes
            .get(row_idx)
            .and_then(millis_to_datetime)
            .ok_or_else(|| missing(row_idx, "finish"))?;
        let unit: TimeUnit = units
            .get(row_idx)
            .ok_or_else(|| missing(row_idx, "unit"))?
            .parse()
            .map_err(|err: TimephasedError| {
                PolarsError::ComputeError(err.to_string().into())
            })?;
        let total = totals.get(row_idx).ok_or_else(|| missing(row_idx, "total_amount"))?;
        let daily = per_day.get(row_idx).unwrap_or(total);

        let span = TimeSpan::new(start, finish, WorkDuration::new(total, unit))
            .map_err(|err| PolarsError::ComputeError(err.to_string().into()))?
            .with_amount_per_day(WorkDuration::new(daily, unit));
        series.push(span);
    }
    Ok(series)
}

/// Work summed per calendar day, ordered by day.
pub fn daily_totals(df: &DataFrame) -> PolarsResult<DataFrame> {
    df.clone()
        .lazy()
        .group_by_stable([col("day")])
        .agg([col("total_amount").sum()])
        .collect()
}

fn missing(row_idx: usize, column: &str) -> PolarsError {
    PolarsError::ComputeError(format!("span row {row_idx} missing {column}").into())
}

fn datetime_to_millis(instant: NaiveDateTime) -> i64 {
    instant.and_utc().timestamp_millis()
}

fn millis_to_datetime(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|instant| instant.naive_utc())
}

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}
