use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use polars::prelude::*;

use meterflux_core::buildings::BuildingManager;
use meterflux_core::outputs::{
    campus_report, read_cleaned_table, write_building_summary, write_cleaned_table,
    write_text_report,
};
use meterflux_parser::build_reading_frame;

fn ts(y: i32, m: u32, d: u32, h: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn micros(y: i32, m: u32, d: u32, h: u32) -> i64 {
    ts(y, m, d, h).and_utc().timestamp_micros()
}

fn sample() -> DataFrame {
    build_reading_frame(
        vec!["A".to_string(), "A".to_string(), "B".to_string()],
        vec![
            micros(2024, 1, 1, 8),
            micros(2024, 1, 2, 8),
            micros(2024, 1, 1, 9),
        ],
        vec![10.0, 20.0, 50.0],
    )
    .expect("failed to build table")
}

fn scratch_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("meterflux-outputs-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("failed to create scratch dir");
    dir.join(name)
}

#[test]
fn cleaned_table_round_trips() {
    let df = sample();
    let path = scratch_file("cleaned.csv");

    write_cleaned_table(&df, &path).expect("write failed");
    let rows = read_cleaned_table(&path).expect("read failed");

    assert_eq!(
        rows,
        vec![
            ("A".to_string(), ts(2024, 1, 1, 8), 10.0),
            ("A".to_string(), ts(2024, 1, 2, 8), 20.0),
            ("B".to_string(), ts(2024, 1, 1, 9), 50.0),
        ]
    );

    let _ = fs::remove_file(&path);
}

#[test]
fn building_summary_serializes_absent_peaks_as_empty() {
    let mut manager = BuildingManager::new();
    manager.ingest_from_table(&sample()).expect("ingest failed");
    let mut summary = manager.summary();
    // Force the defensive branch: a building with no peak on record.
    summary[0].peak_timestamp = None;
    summary[0].peak_kwh = None;

    let path = scratch_file("summary.csv");
    write_building_summary(&summary, &path).expect("write failed");

    let content = fs::read_to_string(&path).expect("read failed");
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("building,total_kwh,peak_timestamp,peak_kwh")
    );
    assert_eq!(lines.next(), Some("A,30.0,,"));
    assert_eq!(lines.next(), Some("B,50.0,2024-01-01T09:00:00,50"));

    let _ = fs::remove_file(&path);
}

#[test]
fn campus_report_finds_totals_and_peaks() {
    let df = sample();
    let mut manager = BuildingManager::new();
    manager.ingest_from_table(&df).expect("ingest failed");

    let report = campus_report(&df, &manager.summary()).expect("report failed");
    assert_eq!(report.total_kwh, 80.0);
    assert_eq!(report.top_building, Some(("B".to_string(), 50.0)));
    assert_eq!(report.peak_reading, Some((ts(2024, 1, 1, 9), 50.0)));
}

#[test]
fn text_report_contains_headline_quantities() {
    let df = sample();
    let mut manager = BuildingManager::new();
    manager.ingest_from_table(&df).expect("ingest failed");
    let report = campus_report(&df, &manager.summary()).expect("report failed");

    let path = scratch_file("summary.txt");
    write_text_report(&report, &path).expect("write failed");

    let content = fs::read_to_string(&path).expect("read failed");
    assert!(content.starts_with("Campus Energy Summary"));
    assert!(content.contains("Total campus consumption (kWh): 80.00"));
    assert!(content.contains("Highest-consuming building: B (50.00 kWh)"));
    assert!(content.contains("Peak single reading: 50.00 kWh at 2024-01-01T09:00:00"));

    let _ = fs::remove_file(&path);
}
