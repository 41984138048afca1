//! Heuristic column-role detection.
//!
//! Source exports disagree on header naming and column order, so roles are
//! resolved by scanning normalized header names against ordered candidate
//! lists, with positional fallbacks when nothing matches. Detection never
//! fails: every table gets a deterministic role assignment.

use std::path::Path;

pub const TIMESTAMP_CANDIDATES: [&str; 5] = ["timestamp", "time", "datetime", "date", "ts"];
pub const KWH_CANDIDATES: [&str; 5] = ["kwh", "energy", "consumption", "usage", "meter"];
pub const BUILDING_CANDIDATES: [&str; 3] = ["building", "site", "facility"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KwhSource {
    Column(usize),
    /// Single-column tables get a synthesized all-zero quantity.
    Zeros,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildingSource {
    Column(usize),
    /// No building column; every row takes the filename-derived name.
    Fallback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub timestamp: usize,
    pub kwh: KwhSource,
    pub building: BuildingSource,
    /// Filename-derived name, also substituted for blank building cells.
    pub fallback_building: String,
}

/// Maps a header row and source filename to a role assignment.
///
/// Leftmost column wins for every role; candidate list order never overrides
/// column order.
pub fn detect_roles(headers: &[String], filename: &str) -> ColumnRoles {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let timestamp = find_role(&normalized, &TIMESTAMP_CANDIDATES).unwrap_or(0);
    let kwh = match find_role(&normalized, &KWH_CANDIDATES) {
        Some(idx) => KwhSource::Column(idx),
        None if headers.len() > 1 => KwhSource::Column(1),
        None => KwhSource::Zeros,
    };
    let fallback_building = building_from_filename(filename);
    let building = match find_role(&normalized, &BUILDING_CANDIDATES) {
        Some(idx) => BuildingSource::Column(idx),
        None => BuildingSource::Fallback(fallback_building.clone()),
    };

    ColumnRoles {
        timestamp,
        kwh,
        building,
        fallback_building,
    }
}

fn find_role(normalized: &[String], candidates: &[&str]) -> Option<usize> {
    normalized
        .iter()
        .position(|name| candidates.contains(&name.as_str()))
}

/// Filename stem up to the first underscore, e.g. `North_jan.csv` -> `North`.
pub fn building_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let name = stem.split('_').next().unwrap_or(stem);
    if name.is_empty() {
        "unknown".to_string()
    } else {
        name.to_string()
    }
}
