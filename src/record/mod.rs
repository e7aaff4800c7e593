//! Output records
//!
//! Input points, the output schema, the merger that turns per-source
//! results into one record per point and the final table.

mod point;
mod schema;
mod merger;
mod table;

pub use point::FeaturePoint;
pub use schema::{FieldSpec, OutputSchema};
pub use merger::{Record, RecordMerger};
pub use table::{Table, ID_ATTRIBUTE_COLUMN, ID_COLUMN};
