//! File input and output
//!
//! Point readers for GeoJSON and CSV, and CSV sinks for the output table
//! and the failure log.

pub mod points;
pub mod csv_writer;

pub use points::{PointFormat, PointReader};
pub use csv_writer::{write_failures, write_failures_file, write_table, write_table_file};
