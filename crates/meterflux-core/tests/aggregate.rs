use chrono::NaiveDate;
use polars::prelude::*;

use meterflux_core::aggregate::{
    building_summary, daily_totals, weekly_totals, DATE_COLUMN, MEAN_COLUMN, TOTAL_COLUMN,
    WEEK_COLUMN,
};
use meterflux_parser::{build_reading_frame, BUILDING_COLUMN, KWH_COLUMN};

fn micros(y: i32, m: u32, d: u32, h: u32) -> i64 {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_micros()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days(date: NaiveDate) -> i32 {
    (date - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32
}

fn table(rows: &[(&str, i64, f64)]) -> DataFrame {
    build_reading_frame(
        rows.iter().map(|(b, _, _)| b.to_string()).collect(),
        rows.iter().map(|(_, ts, _)| *ts).collect(),
        rows.iter().map(|(_, _, kwh)| *kwh).collect(),
    )
    .expect("failed to build table")
}

#[test]
fn daily_totals_sum_per_building_and_day() {
    let df = table(&[
        ("A", micros(2024, 1, 1, 8), 10.0),
        ("A", micros(2024, 1, 1, 20), 20.0),
        ("A", micros(2024, 1, 3, 8), 5.0),
        ("B", micros(2024, 1, 1, 9), 7.0),
    ]);

    let daily = daily_totals(&df).expect("daily totals failed");
    assert_eq!(daily.height(), 3);

    let buildings = daily.column(BUILDING_COLUMN).unwrap().str().unwrap();
    let dates = daily.column(DATE_COLUMN).unwrap().date().unwrap();
    let kwh = daily.column(KWH_COLUMN).unwrap().f64().unwrap();

    assert_eq!(buildings.get(0), Some("A"));
    assert_eq!(dates.get(0), Some(days(date(2024, 1, 1))));
    assert_eq!(kwh.get(0), Some(30.0));

    // Day with no readings (Jan 2) is not materialized.
    assert_eq!(dates.get(1), Some(days(date(2024, 1, 3))));
    assert_eq!(kwh.get(1), Some(5.0));

    assert_eq!(buildings.get(2), Some("B"));
    assert_eq!(kwh.get(2), Some(7.0));
}

#[test]
fn weekly_totals_bucket_to_monday() {
    // 2024-01-01 is a Monday; Jan 3 (Wed) and Jan 7 (Sun) share its week,
    // Jan 8 (Mon) starts the next one.
    let df = table(&[
        ("A", micros(2024, 1, 3, 8), 1.0),
        ("A", micros(2024, 1, 7, 8), 2.0),
        ("A", micros(2024, 1, 8, 8), 4.0),
    ]);

    let weekly = weekly_totals(&df).expect("weekly totals failed");
    assert_eq!(weekly.height(), 2);

    let weeks = weekly.column(WEEK_COLUMN).unwrap().date().unwrap();
    let kwh = weekly.column(KWH_COLUMN).unwrap().f64().unwrap();

    assert_eq!(weeks.get(0), Some(days(date(2024, 1, 1))));
    assert_eq!(kwh.get(0), Some(3.0));
    assert_eq!(weeks.get(1), Some(days(date(2024, 1, 8))));
    assert_eq!(kwh.get(1), Some(4.0));
}

#[test]
fn building_summary_computes_stats_with_rounded_mean() {
    let df = table(&[
        ("A", micros(2024, 1, 1, 8), 1.0),
        ("A", micros(2024, 1, 2, 8), 2.0),
        ("A", micros(2024, 1, 3, 8), 2.0),
    ]);

    let summary = building_summary(&df).expect("summary failed");
    assert_eq!(summary.height(), 1);

    let totals = summary.column(TOTAL_COLUMN).unwrap().f64().unwrap();
    let means = summary.column(MEAN_COLUMN).unwrap().f64().unwrap();

    assert_eq!(totals.get(0), Some(5.0));
    // 5/3 = 1.666..., rounded to 2 decimal places.
    assert_eq!(means.get(0), Some(1.67));
}

#[test]
fn aggregation_is_order_independent() {
    let rows = [
        ("B", micros(2024, 1, 2, 9), 8.0),
        ("A", micros(2024, 1, 1, 8), 10.0),
        ("A", micros(2024, 1, 2, 8), 20.0),
        ("B", micros(2024, 1, 1, 9), 7.0),
    ];
    let mut reversed = rows;
    reversed.reverse();

    let forward = table(&rows);
    let backward = table(&reversed);

    assert!(daily_totals(&forward)
        .unwrap()
        .equals(&daily_totals(&backward).unwrap()));
    assert!(weekly_totals(&forward)
        .unwrap()
        .equals(&weekly_totals(&backward).unwrap()));
    assert!(building_summary(&forward)
        .unwrap()
        .equals(&building_summary(&backward).unwrap()));
}

#[test]
fn summary_sorted_by_total_identifies_highest_consumer() {
    let df = table(&[
        ("A", micros(2024, 1, 1, 8), 10.0),
        ("A", micros(2024, 1, 2, 8), 20.0),
        ("B", micros(2024, 1, 1, 9), 50.0),
    ]);

    let summary = building_summary(&df).expect("summary failed");
    let sorted = summary
        .sort(
            [TOTAL_COLUMN],
            SortMultipleOptions::default().with_order_descending(true),
        )
        .expect("sort failed");

    let buildings = sorted.column(BUILDING_COLUMN).unwrap().str().unwrap();
    let totals = sorted.column(TOTAL_COLUMN).unwrap().f64().unwrap();
    assert_eq!(buildings.get(0), Some("B"));
    assert_eq!(totals.get(0), Some(50.0));
    assert_eq!(buildings.get(1), Some("A"));
    assert_eq!(totals.get(1), Some(30.0));
}

#[test]
fn empty_table_aggregates_to_empty_frames() {
    let df = table(&[]);
    assert_eq!(daily_totals(&df).unwrap().height(), 0);
    assert_eq!(weekly_totals(&df).unwrap().height(), 0);
    assert_eq!(building_summary(&df).unwrap().height(), 0);
}
