pub mod errors;
pub mod model;
pub mod normalize;
pub mod schema;

pub use errors::ParserError;
pub use model::{ParsedMeterFile, BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN};
pub use normalize::{build_reading_frame, parse_meter_csv};
pub use schema::{detect_roles, BuildingSource, ColumnRoles, KwhSource};
