//! Per-building object model over owned reading collections.
//!
//! An alternate aggregation path from the same canonical table: the manager
//! owns one `Building` per name, each building owns its readings. Computes
//! the same per-building quantities as [`crate::aggregate`]; the two paths
//! are cross-checked in the integration tests.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use meterflux_parser::{BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN};

use crate::aggregate::naive_from_micros;

/// Immutable reading value, owned exclusively by its building.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterReading {
    pub ts: NaiveDateTime,
    pub kwh: f64,
}

#[derive(Debug, Clone)]
pub struct Building {
    name: String,
    readings: Vec<MeterReading>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_reading(&mut self, reading: MeterReading) {
        self.readings.push(reading);
    }

    pub fn readings(&self) -> &[MeterReading] {
        &self.readings
    }

    pub fn total(&self) -> f64 {
        self.readings.iter().map(|reading| reading.kwh).sum()
    }

    /// Reading with the highest kwh; ties keep the first one inserted.
    /// `None` when the building owns no readings.
    pub fn peak(&self) -> Option<&MeterReading> {
        let mut best: Option<&MeterReading> = None;
        for reading in &self.readings {
            match best {
                Some(current) if reading.kwh <= current.kwh => {}
                _ => best = Some(reading),
            }
        }
        best
    }

    /// Daily sums from this building's own readings only.
    pub fn daily_series(&self) -> BTreeMap<NaiveDate, f64> {
        let mut series = BTreeMap::new();
        for reading in &self.readings {
            *series.entry(reading.ts.date()).or_insert(0.0) += reading.kwh;
        }
        series
    }
}

/// One summary row per building.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingTotals {
    pub building: String,
    pub total_kwh: f64,
    pub peak_timestamp: Option<NaiveDateTime>,
    pub peak_kwh: Option<f64>,
}

/// Owns the mapping from building name to `Building`; the single entry point
/// that turns the canonical table into per-building form.
#[derive(Debug, Default)]
pub struct BuildingManager {
    buildings: BTreeMap<String, Building>,
}

impl BuildingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every canonical row to its building, creating buildings on
    /// first sight. Rows whose cells fail conversion here are skipped; the
    /// normalizer has already filtered them in practice.
    pub fn ingest_from_table(&mut self, df: &DataFrame) -> PolarsResult<()> {
        let buildings = df.column(BUILDING_COLUMN)?.str()?;
        let timestamps = df.column(TIMESTAMP_COLUMN)?.datetime()?;
        let kwh = df.column(KWH_COLUMN)?.f64()?;

        for idx in 0..df.height() {
            let (Some(name), Some(micros), Some(value)) =
                (buildings.get(idx), timestamps.get(idx), kwh.get(idx))
            else {
                continue;
            };
            let Some(ts) = naive_from_micros(micros) else {
                continue;
            };
            self.buildings
                .entry(name.to_string())
                .or_insert_with(|| Building::new(name))
                .add_reading(MeterReading { ts, kwh: value });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Building> {
        self.buildings.get(name)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// One row per building, name-ordered. Peak fields are `None` for a
    /// building with zero readings (cannot happen via `ingest_from_table`,
    /// but the contract holds regardless).
    pub fn summary(&self) -> Vec<BuildingTotals> {
        self.buildings
            .values()
            .map(|building| {
                let peak = building.peak();
                BuildingTotals {
                    building: building.name().to_string(),
                    total_kwh: building.total(),
                    peak_timestamp: peak.map(|reading| reading.ts),
                    peak_kwh: peak.map(|reading| reading.kwh),
                }
            })
            .collect()
    }
}
