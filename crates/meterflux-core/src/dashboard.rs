//! Multi-panel dashboard rendering.
//!
//! Three stacked panels: daily trend per building, average weekly
//! consumption per building, and peak single readings. Data prep is kept
//! separate from drawing so it can be tested without a rendering backend.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use polars::prelude::*;

use meterflux_parser::{BUILDING_COLUMN, KWH_COLUMN};

use crate::aggregate::{date_from_days, DATE_COLUMN};
use crate::error::{PipelineError, Result};

pub const DASHBOARD_FILE: &str = "dashboard.png";

const PANEL_CAPTION_FONT: (&str, u32) = ("sans-serif", 22);

fn render_err<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::Render(err.to_string())
}

/// Ordered daily points per building, from the daily-totals frame.
fn daily_series_by_building(daily: &DataFrame) -> Result<BTreeMap<String, Vec<(NaiveDate, f64)>>> {
    let buildings = daily.column(BUILDING_COLUMN)?.str()?;
    let dates = daily.column(DATE_COLUMN)?.date()?;
    let kwh = daily.column(KWH_COLUMN)?.f64()?;

    let mut series: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for idx in 0..daily.height() {
        let (Some(building), Some(days), Some(value)) =
            (buildings.get(idx), dates.get(idx), kwh.get(idx))
        else {
            continue;
        };
        series
            .entry(building.to_string())
            .or_default()
            .push((date_from_days(days), value));
    }
    for points in series.values_mut() {
        points.sort_by_key(|(date, _)| *date);
    }
    Ok(series)
}

/// Mean weekly consumption per building, from the weekly-totals frame.
fn weekly_means_by_building(weekly: &DataFrame) -> Result<Vec<(String, f64)>> {
    let buildings = weekly.column(BUILDING_COLUMN)?.str()?;
    let kwh = weekly.column(KWH_COLUMN)?.f64()?;

    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for idx in 0..weekly.height() {
        let (Some(building), Some(value)) = (buildings.get(idx), kwh.get(idx)) else {
            continue;
        };
        let entry = sums.entry(building.to_string()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    Ok(sums
        .into_iter()
        .map(|(name, (sum, count))| (name, sum / count as f64))
        .collect())
}

/// Highest single reading per building, from the canonical table.
fn peaks_by_building(table: &DataFrame) -> Result<Vec<(String, f64)>> {
    let buildings = table.column(BUILDING_COLUMN)?.str()?;
    let kwh = table.column(KWH_COLUMN)?.f64()?;

    let mut peaks: BTreeMap<String, f64> = BTreeMap::new();
    for idx in 0..table.height() {
        let (Some(building), Some(value)) = (buildings.get(idx), kwh.get(idx)) else {
            continue;
        };
        let entry = peaks.entry(building.to_string()).or_insert(f64::NEG_INFINITY);
        if value > *entry {
            *entry = value;
        }
    }
    Ok(peaks.into_iter().collect())
}

/// Renders the three-panel dashboard PNG.
pub fn render_dashboard(
    table: &DataFrame,
    daily: &DataFrame,
    weekly: &DataFrame,
    path: &Path,
) -> Result<()> {
    let daily_series = daily_series_by_building(daily)?;
    let weekly_means = weekly_means_by_building(weekly)?;
    let peaks = peaks_by_building(table)?;

    let root = BitMapBackend::new(path, (1200, 1400)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;
    let panels = root.split_evenly((3, 1));

    draw_daily_panel(&panels[0], &daily_series)?;
    draw_weekly_panel(&panels[1], &weekly_means)?;
    draw_peak_panel(&panels[2], &peaks)?;

    root.present().map_err(render_err)?;
    Ok(())
}

fn draw_daily_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &BTreeMap<String, Vec<(NaiveDate, f64)>>,
) -> Result<()> {
    let points = series.values().flatten();
    let mut x_min: Option<NaiveDate> = None;
    let mut x_max: Option<NaiveDate> = None;
    let mut y_max = 0f64;
    for (date, value) in points {
        x_min = Some(x_min.map_or(*date, |d| d.min(*date)));
        x_max = Some(x_max.map_or(*date, |d| d.max(*date)));
        y_max = y_max.max(*value);
    }
    let (Some(x_min), Some(mut x_max)) = (x_min, x_max) else {
        return Ok(());
    };
    if x_max == x_min {
        x_max = x_max + chrono::Duration::days(1);
    }
    let y_max = padded(y_max);

    let mut chart = ChartBuilder::on(area)
        .caption("Daily Consumption Trend (kWh)", PANEL_CAPTION_FONT)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .y_desc("kWh")
        .draw()
        .map_err(render_err)?;

    for (idx, (name, points)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).mix(1.0);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), &color))
            .map_err(render_err)?
            .label(name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_err)?;
    Ok(())
}

fn draw_weekly_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    means: &[(String, f64)],
) -> Result<()> {
    if means.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = means.iter().map(|(name, _)| name.clone()).collect();
    let y_max = padded(means.iter().fold(0f64, |acc, (_, mean)| acc.max(*mean)));

    let mut chart = ChartBuilder::on(area)
        .caption("Average Weekly Consumption per Building", PANEL_CAPTION_FONT)
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..means.len() as u32).into_segmented(), 0f64..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Avg kWh per week")
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => names
                .get(*idx as usize)
                .cloned()
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BLUE.mix(0.6).filled())
                .data(
                    means
                        .iter()
                        .enumerate()
                        .map(|(idx, (_, mean))| (idx as u32, *mean)),
                ),
        )
        .map_err(render_err)?;
    Ok(())
}

fn draw_peak_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    peaks: &[(String, f64)],
) -> Result<()> {
    if peaks.is_empty() {
        return Ok(());
    }
    let names: Vec<String> = peaks.iter().map(|(name, _)| name.clone()).collect();
    let y_max = padded(peaks.iter().fold(0f64, |acc, (_, peak)| acc.max(*peak)));

    let mut chart = ChartBuilder::on(area)
        .caption(
            "Peak Single-Measurement Consumption by Building",
            PANEL_CAPTION_FONT,
        )
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d((0u32..peaks.len() as u32).into_segmented(), 0f64..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("kWh")
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(idx) | SegmentValue::Exact(idx) => names
                .get(*idx as usize)
                .cloned()
                .unwrap_or_default(),
            SegmentValue::Last => String::new(),
        })
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(peaks.iter().enumerate().map(|(idx, (_, peak))| {
            Circle::new((SegmentValue::CenterOf(idx as u32), *peak), 6, RED.filled())
        }))
        .map_err(render_err)?;
    Ok(())
}

fn padded(y_max: f64) -> f64 {
    if y_max <= 0.0 {
        1.0
    } else {
        y_max * 1.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{daily_totals, weekly_totals};
    use chrono::NaiveDate;
    use meterflux_parser::build_reading_frame;

    fn micros(y: i32, m: u32, d: u32, h: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_micros()
    }

    fn sample_table() -> DataFrame {
        build_reading_frame(
            vec![
                "A".to_string(),
                "A".to_string(),
                "A".to_string(),
                "B".to_string(),
            ],
            vec![
                micros(2024, 1, 1, 8),
                micros(2024, 1, 1, 20),
                micros(2024, 1, 9, 8),
                micros(2024, 1, 2, 8),
            ],
            vec![10.0, 20.0, 30.0, 50.0],
        )
        .unwrap()
    }

    #[test]
    fn daily_series_groups_and_orders_points() {
        let daily = daily_totals(&sample_table()).unwrap();
        let series = daily_series_by_building(&daily).unwrap();

        let a = &series["A"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0], (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 30.0));
        assert_eq!(a[1], (NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(), 30.0));
        assert_eq!(series["B"].len(), 1);
    }

    #[test]
    fn weekly_means_average_across_weeks() {
        let weekly = weekly_totals(&sample_table()).unwrap();
        let means = weekly_means_by_building(&weekly).unwrap();

        // A: 30 in week of Jan 1 + 30 in week of Jan 8 -> mean 30.
        assert_eq!(means, vec![("A".to_string(), 30.0), ("B".to_string(), 50.0)]);
    }

    #[test]
    fn peaks_take_the_highest_single_reading() {
        let peaks = peaks_by_building(&sample_table()).unwrap();
        assert_eq!(peaks, vec![("A".to_string(), 30.0), ("B".to_string(), 50.0)]);
    }
}
