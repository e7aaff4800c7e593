//! In-memory raster primitives
//!
//! Single-band rasters with explicit per-pixel availability, the images and
//! time-ordered collections built from them, the statistics that reduce
//! pixel values, and the band-math expressions used to derive new bands.

mod region;
mod grid;
mod raster;
mod image;
mod statistic;
mod expression;

pub use region::Region;
pub use grid::GridSpec;
pub use raster::Raster;
pub use image::{Image, ImageCollection};
pub use statistic::Statistic;
pub use expression::Expression;
