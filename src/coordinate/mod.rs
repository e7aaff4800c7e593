//! Coordinate handling for geospatial data
//!
//! This module provides the geometry primitives the extraction pipeline
//! works with: points, bounding boxes, footprint geometries and the
//! conversion of metric scales into coordinate-system units.

mod bbox;
mod point;
mod geometry;
mod transform;
mod crs;

// Re-export key types
pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::geometry::Geometry;
pub use self::transform::ScaleConverter;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
