//! Source-file discovery and the per-file ingestion loop.
//!
//! Every file is processed independently: a file that cannot be read or that
//! yields zero valid rows is recorded and skipped, never aborting the run.
//! The surviving frames are merged and sorted into the canonical table. An
//! empty outcome (missing directory, no matching files, all files failed) is
//! a defined terminal state, not an error.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{info, warn};

use meterflux_parser::{build_reading_frame, parse_meter_csv, TIMESTAMP_COLUMN};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Parsed,
    /// Could not be read or decoded at all.
    Unreadable { reason: String },
    /// Read fine but produced zero valid rows after normalization.
    EmptyAfterParse,
}

impl FileStatus {
    pub fn is_failure(&self) -> bool {
        !matches!(self, FileStatus::Parsed)
    }
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub status: FileStatus,
    pub rows_read: usize,
    pub rows_kept: usize,
}

#[derive(Debug)]
pub struct IngestionOutcome {
    /// Canonical reading table, sorted ascending by timestamp. Empty (zero
    /// rows, canonical schema) when no usable data exists anywhere.
    pub table: DataFrame,
    pub reports: Vec<FileReport>,
}

impl IngestionOutcome {
    pub fn is_empty(&self) -> bool {
        self.table.height() == 0
    }

    /// Paths recorded as failed, for diagnostics.
    pub fn failed_files(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|report| report.status.is_failure())
            .map(|report| report.path.as_str())
            .collect()
    }
}

/// Non-recursive `*.csv` discovery, sorted for deterministic report order.
/// A missing directory yields an empty list.
pub fn discover_csv_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        warn!(dir = %data_dir.display(), "data directory not found");
        return Ok(Vec::new());
    }

    let pattern = data_dir.join("*.csv");
    let pattern_str = pattern.to_str().ok_or_else(|| {
        PipelineError::Processing(format!("non-UTF-8 path pattern: {}", pattern.display()))
    })?;

    let mut files: Vec<PathBuf> = glob::glob(pattern_str)?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Runs the whole ingestion pass over a directory.
pub fn ingest_directory(data_dir: &Path) -> Result<IngestionOutcome> {
    let files = discover_csv_files(data_dir)?;
    if files.is_empty() {
        info!(dir = %data_dir.display(), "no csv files to ingest");
        return Ok(IngestionOutcome {
            table: empty_table()?,
            reports: Vec::new(),
        });
    }

    let mut frames: Vec<DataFrame> = Vec::new();
    let mut reports: Vec<FileReport> = Vec::new();

    for path in &files {
        let (report, frame) = ingest_file(path);
        if let Some(df) = frame {
            frames.push(df);
        }
        reports.push(report);
    }

    let table = merge_frames(frames)?;
    Ok(IngestionOutcome { table, reports })
}

fn ingest_file(path: &Path) -> (FileReport, Option<DataFrame>) {
    let display_path = path.display().to_string();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(display_path.as_str())
        .to_string();

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(file = %display_path, error = %err, "failed to read file");
            return (
                FileReport {
                    path: display_path,
                    status: FileStatus::Unreadable {
                        reason: err.to_string(),
                    },
                    rows_read: 0,
                    rows_kept: 0,
                },
                None,
            );
        }
    };

    let parsed = match parse_meter_csv(&content, &filename) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(file = %display_path, error = %err, "failed to parse file");
            return (
                FileReport {
                    path: display_path,
                    status: FileStatus::Unreadable {
                        reason: err.to_string(),
                    },
                    rows_read: 0,
                    rows_kept: 0,
                },
                None,
            );
        }
    };

    if parsed.rows_kept == 0 {
        warn!(file = %display_path, rows_read = parsed.rows_read, "no valid rows after normalization, skipping");
        return (
            FileReport {
                path: display_path,
                status: FileStatus::EmptyAfterParse,
                rows_read: parsed.rows_read,
                rows_kept: 0,
            },
            None,
        );
    }

    info!(file = %display_path, rows_read = parsed.rows_read, rows_kept = parsed.rows_kept, "loaded file");
    (
        FileReport {
            path: display_path,
            status: FileStatus::Parsed,
            rows_read: parsed.rows_read,
            rows_kept: parsed.rows_kept,
        },
        Some(parsed.df),
    )
}

fn merge_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let merged = match frames.len() {
        0 => return empty_table(),
        1 => {
            let mut frames = frames;
            frames.remove(0)
        }
        _ => {
            let mut iter = frames.into_iter();
            let mut combined = iter.next().unwrap();
            for df in iter {
                combined.vstack_mut(&df)?;
            }
            combined
        }
    };

    let sorted = merged.sort([TIMESTAMP_COLUMN], SortMultipleOptions::default())?;
    Ok(sorted)
}

/// Zero-row table with the canonical schema.
pub fn empty_table() -> Result<DataFrame> {
    Ok(build_reading_frame(Vec::new(), Vec::new(), Vec::new())?)
}
