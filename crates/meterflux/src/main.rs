// crates/meterflux/src/main.rs

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::Table;
use polars::prelude::DataFrame;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meterflux_core::aggregate::{
    building_summary, daily_totals, weekly_totals, MAX_COLUMN, MEAN_COLUMN, MIN_COLUMN,
    TOTAL_COLUMN,
};
use meterflux_core::buildings::BuildingManager;
use meterflux_core::dashboard::{render_dashboard, DASHBOARD_FILE};
use meterflux_core::ingestion::ingest_directory;
use meterflux_core::outputs::{
    campus_report, write_building_summary, write_cleaned_table, write_text_report, CLEANED_FILE,
    SUMMARY_CSV_FILE, SUMMARY_TEXT_FILE,
};
use meterflux_parser::BUILDING_COLUMN;

/// Campus energy meter ingestion and reporting.
#[derive(Parser, Debug)]
#[command(author, version, about = "Campus energy meter ingestion and reporting", long_about = None)]
struct Cli {
    /// Directory containing the raw *.csv meter exports.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory the artifacts are written to.
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,

    /// Skip rendering the dashboard image.
    #[arg(long)]
    no_dashboard: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(dir = %cli.data_dir.display(), "starting ingestion");
    let outcome = ingest_directory(&cli.data_dir)?;

    let failed = outcome.failed_files();
    if !failed.is_empty() {
        warn!(count = failed.len(), files = ?failed, "some files failed to load");
    }

    if outcome.is_empty() {
        info!("no valid data ingested, nothing to do");
        return Ok(());
    }

    info!(rows = outcome.table.height(), "computing aggregates");
    let daily = daily_totals(&outcome.table).context("daily totals failed")?;
    let weekly = weekly_totals(&outcome.table).context("weekly totals failed")?;
    let summary = building_summary(&outcome.table).context("building summary failed")?;

    let mut manager = BuildingManager::new();
    manager
        .ingest_from_table(&outcome.table)
        .context("building manager ingestion failed")?;
    let totals = manager.summary();

    print_summary(&summary).context("summary rendering failed")?;

    fs::create_dir_all(&cli.out_dir).context("failed to create output directory")?;
    let report = campus_report(&outcome.table, &totals)?;
    write_cleaned_table(&outcome.table, &cli.out_dir.join(CLEANED_FILE))?;
    write_building_summary(&totals, &cli.out_dir.join(SUMMARY_CSV_FILE))?;
    write_text_report(&report, &cli.out_dir.join(SUMMARY_TEXT_FILE))?;

    if !cli.no_dashboard {
        match render_dashboard(
            &outcome.table,
            &daily,
            &weekly,
            &cli.out_dir.join(DASHBOARD_FILE),
        ) {
            Ok(()) => info!("dashboard rendered"),
            Err(err) => warn!(error = %err, "dashboard rendering failed, skipping"),
        }
    }

    info!(dir = %cli.out_dir.display(), "all artifacts written");
    Ok(())
}

/// Prints the aggregator's per-building summary, highest total first.
fn print_summary(summary: &DataFrame) -> Result<()> {
    let buildings = summary.column(BUILDING_COLUMN)?.str()?;
    let totals = summary.column(TOTAL_COLUMN)?.f64()?;
    let means = summary.column(MEAN_COLUMN)?.f64()?;
    let mins = summary.column(MIN_COLUMN)?.f64()?;
    let maxs = summary.column(MAX_COLUMN)?.f64()?;

    let mut rows: Vec<(&str, f64, f64, f64, f64)> = Vec::with_capacity(summary.height());
    for idx in 0..summary.height() {
        let (Some(building), Some(total), Some(mean), Some(min), Some(max)) = (
            buildings.get(idx),
            totals.get(idx),
            means.get(idx),
            mins.get(idx),
            maxs.get(idx),
        ) else {
            continue;
        };
        rows.push((building, total, mean, min, max));
    }
    rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut table = Table::new();
    table.set_header(vec![
        "building", "total_kwh", "mean_kwh", "min_kwh", "max_kwh",
    ]);
    for (building, total, mean, min, max) in rows {
        table.add_row(vec![
            building.to_string(),
            format!("{total:.2}"),
            format!("{mean:.2}"),
            format!("{min:.2}"),
            format!("{max:.2}"),
        ]);
    }
    println!("{table}");
    Ok(())
}
