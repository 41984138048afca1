//! Bulk aggregation over the canonical reading table.
//!
//! All functions are pure given the table: deterministic, no hidden state,
//! and independent of row order (grouping keys are `(building, bucket)`).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;

use meterflux_parser::{BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN};

pub const DATE_COLUMN: &str = "date";
pub const WEEK_COLUMN: &str = "week_start";
pub const TOTAL_COLUMN: &str = "total_kwh";
pub const MEAN_COLUMN: &str = "mean_kwh";
pub const MIN_COLUMN: &str = "min_kwh";
pub const MAX_COLUMN: &str = "max_kwh";

pub(crate) fn naive_from_micros(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|dt| dt.naive_utc())
}

pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32
}

pub(crate) fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Duration::days(days as i64)
}

/// Monday of the calendar week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date.week(Weekday::Mon).first_day()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-building daily sums; only days with at least one reading materialize.
pub fn daily_totals(df: &DataFrame) -> PolarsResult<DataFrame> {
    let totals = grouped_totals(df, |date| date)?;
    totals_frame(totals, DATE_COLUMN)
}

/// Per-building weekly sums, bucketed to the Monday starting each week.
pub fn weekly_totals(df: &DataFrame) -> PolarsResult<DataFrame> {
    let totals = grouped_totals(df, week_start)?;
    totals_frame(totals, WEEK_COLUMN)
}

fn grouped_totals<F>(df: &DataFrame, bucket: F) -> PolarsResult<BTreeMap<(String, NaiveDate), f64>>
where
    F: Fn(NaiveDate) -> NaiveDate,
{
    let buildings = df.column(BUILDING_COLUMN)?.str()?;
    let timestamps = df.column(TIMESTAMP_COLUMN)?.datetime()?;
    let kwh = df.column(KWH_COLUMN)?.f64()?;

    let mut totals: BTreeMap<(String, NaiveDate), f64> = BTreeMap::new();
    for idx in 0..df.height() {
        let (Some(building), Some(micros), Some(value)) =
            (buildings.get(idx), timestamps.get(idx), kwh.get(idx))
        else {
            continue;
        };
        let Some(ts) = naive_from_micros(micros) else {
            continue;
        };
        *totals
            .entry((building.to_string(), bucket(ts.date())))
            .or_insert(0.0) += value;
    }
    Ok(totals)
}

fn totals_frame(
    totals: BTreeMap<(String, NaiveDate), f64>,
    bucket_column: &str,
) -> PolarsResult<DataFrame> {
    let mut buildings = Vec::with_capacity(totals.len());
    let mut buckets = Vec::with_capacity(totals.len());
    let mut sums = Vec::with_capacity(totals.len());
    for ((building, bucket), sum) in totals {
        buildings.push(building);
        buckets.push(days_since_epoch(bucket));
        sums.push(sum);
    }

    let bucket_series = Series::new(bucket_column.into(), buckets).cast(&DataType::Date)?;

    DataFrame::new(vec![
        Series::new(BUILDING_COLUMN.into(), buildings).into(),
        bucket_series.into(),
        Series::new(KWH_COLUMN.into(), sums).into(),
    ])
}

#[derive(Debug, Clone, Copy)]
struct KwhStats {
    total: f64,
    count: usize,
    min: f64,
    max: f64,
}

/// Per-building sum/mean/min/max of kwh; mean is rounded to 2 decimal places.
pub fn building_summary(df: &DataFrame) -> PolarsResult<DataFrame> {
    let buildings = df.column(BUILDING_COLUMN)?.str()?;
    let kwh = df.column(KWH_COLUMN)?.f64()?;

    let mut stats: BTreeMap<String, KwhStats> = BTreeMap::new();
    for idx in 0..df.height() {
        let (Some(building), Some(value)) = (buildings.get(idx), kwh.get(idx)) else {
            continue;
        };
        let entry = stats.entry(building.to_string()).or_insert(KwhStats {
            total: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        });
        entry.total += value;
        entry.count += 1;
        entry.min = entry.min.min(value);
        entry.max = entry.max.max(value);
    }

    let mut names = Vec::with_capacity(stats.len());
    let mut totals = Vec::with_capacity(stats.len());
    let mut means = Vec::with_capacity(stats.len());
    let mut mins = Vec::with_capacity(stats.len());
    let mut maxs = Vec::with_capacity(stats.len());
    for (name, entry) in stats {
        names.push(name);
        totals.push(entry.total);
        means.push(round2(entry.total / entry.count as f64));
        mins.push(entry.min);
        maxs.push(entry.max);
    }

    DataFrame::new(vec![
        Series::new(BUILDING_COLUMN.into(), names).into(),
        Series::new(TOTAL_COLUMN.into(), totals).into(),
        Series::new(MEAN_COLUMN.into(), means).into(),
        Series::new(MIN_COLUMN.into(), mins).into(),
        Series::new(MAX_COLUMN.into(), maxs).into(),
    ])
}
