//! Flat-file artifacts: cleaned readings, building summary, text report.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use meterflux_parser::{BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN};

use crate::aggregate::naive_from_micros;
use crate::buildings::BuildingTotals;
use crate::error::{PipelineError, Result};

pub const CLEANED_FILE: &str = "cleaned_energy_data.csv";
pub const SUMMARY_CSV_FILE: &str = "building_summary.csv";
pub const SUMMARY_TEXT_FILE: &str = "summary.txt";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CleanedRow {
    building: String,
    timestamp: String,
    kwh: f64,
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    building: &'a str,
    total_kwh: f64,
    peak_timestamp: String,
    peak_kwh: String,
}

/// Writes the canonical table as `building,timestamp,kwh` with ISO-8601
/// second-precision timestamps.
pub fn write_cleaned_table(df: &DataFrame, path: &Path) -> Result<()> {
    let buildings = df.column(BUILDING_COLUMN)?.str()?;
    let timestamps = df.column(TIMESTAMP_COLUMN)?.datetime()?;
    let kwh = df.column(KWH_COLUMN)?.f64()?;

    let mut writer = csv::Writer::from_path(path)?;
    for idx in 0..df.height() {
        let (Some(building), Some(micros), Some(value)) =
            (buildings.get(idx), timestamps.get(idx), kwh.get(idx))
        else {
            continue;
        };
        let Some(ts) = naive_from_micros(micros) else {
            continue;
        };
        writer.serialize(CleanedRow {
            building: building.to_string(),
            timestamp: ts.format(TIMESTAMP_FORMAT).to_string(),
            kwh: value,
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = df.height(), "wrote cleaned data");
    Ok(())
}

/// Reads a cleaned-data export back into `(building, timestamp, kwh)`
/// triples. Counterpart of [`write_cleaned_table`].
pub fn read_cleaned_table(path: &Path) -> Result<Vec<(String, NaiveDateTime, f64)>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: CleanedRow = record?;
        let ts = NaiveDateTime::parse_from_str(&row.timestamp, TIMESTAMP_FORMAT).map_err(|err| {
            PipelineError::Processing(format!("bad timestamp '{}': {err}", row.timestamp))
        })?;
        rows.push((row.building, ts, row.kwh));
    }
    Ok(rows)
}

/// Writes the per-building summary. Absent peaks serialize as empty fields.
pub fn write_building_summary(summary: &[BuildingTotals], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in summary {
        writer.serialize(SummaryRow {
            building: &row.building,
            total_kwh: row.total_kwh,
            peak_timestamp: row
                .peak_timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            peak_kwh: row
                .peak_kwh
                .map(|value| value.to_string())
                .unwrap_or_default(),
        })?;
    }
    writer.flush()?;
    info!(path = %path.display(), buildings = summary.len(), "wrote building summary");
    Ok(())
}

/// Headline quantities for the text report.
#[derive(Debug, Clone, PartialEq)]
pub struct CampusReport {
    pub total_kwh: f64,
    pub top_building: Option<(String, f64)>,
    pub peak_reading: Option<(NaiveDateTime, f64)>,
}

/// Computes the report quantities from the canonical table and the
/// per-building totals.
pub fn campus_report(df: &DataFrame, summary: &[BuildingTotals]) -> Result<CampusReport> {
    let timestamps = df.column(TIMESTAMP_COLUMN)?.datetime()?;
    let kwh = df.column(KWH_COLUMN)?.f64()?;

    let total_kwh = kwh.sum().unwrap_or(0.0);

    let top_building = summary
        .iter()
        .max_by(|a, b| {
            a.total_kwh
                .partial_cmp(&b.total_kwh)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|row| (row.building.clone(), row.total_kwh));

    let mut peak: Option<(i64, f64)> = None;
    for idx in 0..df.height() {
        let (Some(micros), Some(value)) = (timestamps.get(idx), kwh.get(idx)) else {
            continue;
        };
        match peak {
            Some((_, best)) if value <= best => {}
            _ => peak = Some((micros, value)),
        }
    }
    let peak_reading =
        peak.and_then(|(micros, value)| naive_from_micros(micros).map(|ts| (ts, value)));

    Ok(CampusReport {
        total_kwh,
        top_building,
        peak_reading,
    })
}

pub fn write_text_report(report: &CampusReport, path: &Path) -> Result<()> {
    let mut out = String::new();
    out.push_str("Campus Energy Summary\n");
    out.push_str("=====================\n\n");
    out.push_str(&format!(
        "Total campus consumption (kWh): {:.2}\n",
        report.total_kwh
    ));
    if let Some((building, total)) = &report.top_building {
        out.push_str(&format!(
            "Highest-consuming building: {building} ({total:.2} kWh)\n"
        ));
    }
    if let Some((ts, value)) = &report.peak_reading {
        out.push_str(&format!(
            "Peak single reading: {value:.2} kWh at {}\n",
            ts.format(TIMESTAMP_FORMAT)
        ));
    }
    out.push('\n');
    out.push_str("Notes:\n");
    out.push_str("- Data aggregated from multiple building CSV files\n");
    out.push_str("- Summary includes daily and weekly aggregations\n");

    fs::write(path, out)?;
    info!(path = %path.display(), "wrote text report");
    Ok(())
}
