pub mod errors;
pub mod coordinate;
pub mod raster;
pub mod provider;
pub mod source;
pub mod preprocess;
pub mod reducer;
pub mod record;
pub mod batch;
pub mod config;
pub mod io;
pub mod utils;
pub mod commands;
pub mod api;

#[cfg(test)]
mod tests;

pub use crate::api::FeatureKit;

pub use errors::{ExtractError, ExtractResult};
pub use coordinate::{BoundingBox, Geometry, Point, CoordinateSystem};
pub use provider::{GeoProvider, MemoryProvider};
pub use source::{SourceDefinition, SourceKind, SourceRegistry, ReductionPolicy};
pub use record::{FeaturePoint, OutputSchema, Record, Table};
pub use batch::{BatchOutcome, BatchStatus, RetryPolicy};
