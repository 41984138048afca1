//! Tolerant row normalization: coerce detected columns to canonical types,
//! drop rows that fail coercion, count survivors.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::{ParsedMeterFile, BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN};
use crate::schema::{detect_roles, BuildingSource, ColumnRoles, KwhSource};

static DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

static DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

/// Parses one meter export into canonical rows.
///
/// The reader runs headerless and flexible: the first record that parses at
/// all becomes the header, and corrupt interior lines are skipped rather than
/// failing the file. Rows whose timestamp or quantity cannot be coerced are
/// dropped; zero survivors is not an error at this layer.
pub fn parse_meter_csv(content: &str, filename: &str) -> Result<ParsedMeterFile, ParserError> {
    let mut reader = reader_builder().from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = loop {
        match records.next() {
            Some(Ok(record)) => break record,
            Some(Err(_)) => continue,
            None => return Err(ParserError::MissingHeader),
        }
    };
    let headers: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let roles = detect_roles(&headers, filename);

    let mut rows_read = 0usize;
    let mut buildings: Vec<String> = Vec::new();
    let mut timestamps: Vec<i64> = Vec::new();
    let mut kwh_values: Vec<f64> = Vec::new();

    for record in records {
        rows_read += 1;
        let Ok(record) = record else { continue };
        let Some(ts) = coerce_timestamp(record.get(roles.timestamp)) else {
            continue;
        };
        let Some(kwh) = coerce_kwh(&record, roles.kwh) else {
            continue;
        };
        buildings.push(resolve_building(&record, &roles));
        timestamps.push(ts);
        kwh_values.push(kwh);
    }

    let rows_kept = timestamps.len();
    let df = build_reading_frame(buildings, timestamps, kwh_values)?;

    Ok(ParsedMeterFile {
        df,
        rows_read,
        rows_kept,
    })
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Permissive timestamp coercion; unparseable values become `None`, never an
/// error. Date-only values are taken as midnight.
pub fn coerce_timestamp(value: Option<&str>) -> Option<i64> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.and_utc().timestamp_micros());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_micros());
        }
    }
    None
}

fn coerce_kwh(record: &StringRecord, source: KwhSource) -> Option<f64> {
    match source {
        KwhSource::Zeros => Some(0.0),
        KwhSource::Column(idx) => {
            let trimmed = record.get(idx)?.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
    }
}

fn resolve_building(record: &StringRecord, roles: &ColumnRoles) -> String {
    match &roles.building {
        BuildingSource::Fallback(name) => name.clone(),
        BuildingSource::Column(idx) => match record.get(*idx).map(str::trim) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => roles.fallback_building.clone(),
        },
    }
}

/// Builds a canonical reading frame from typed column vectors. The timestamp
/// column is microseconds since the epoch, cast to a naive datetime.
pub fn build_reading_frame(
    buildings: Vec<String>,
    timestamps: Vec<i64>,
    kwh: Vec<f64>,
) -> Result<DataFrame, PolarsError> {
    let ts_series = Series::new(TIMESTAMP_COLUMN.into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    DataFrame::new(vec![
        Series::new(BUILDING_COLUMN.into(), buildings).into(),
        ts_series.into(),
        Series::new(KWH_COLUMN.into(), kwh).into(),
    ])
}
