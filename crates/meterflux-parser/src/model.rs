use polars::prelude::DataFrame;

pub const BUILDING_COLUMN: &str = "building";
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const KWH_COLUMN: &str = "kwh";

/// One source file after role detection and row normalization.
///
/// `df` holds only rows that survived coercion, in source order, with the
/// canonical `building`/`timestamp`/`kwh` columns. `rows_read` counts every
/// data record the file yielded, including the ones that were dropped.
#[derive(Debug, Clone)]
pub struct ParsedMeterFile {
    pub df: DataFrame,
    pub rows_read: usize,
    pub rows_kept: usize,
}
