//! Geospatial compute provider contract
//!
//! The pipeline never touches raster storage directly. Everything it needs
//! (dataset lookup, collection filtering, compositing, band math and the
//! per-point reductions) goes through [`GeoProvider`]. Backends only have
//! to supply dataset access; the compute operations have in-memory default
//! implementations that a remote backend may override.

mod compute;
mod memory;
mod catalog;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::coordinate::{BoundingBox, Geometry};
use crate::errors::ExtractResult;
use crate::raster::{Expression, Image, ImageCollection, Raster, Statistic};
use crate::source::{AttributeFilter, TemporalFilter};

pub use memory::MemoryProvider;
pub use catalog::Catalog;

/// Result type of provider calls
pub type ProviderResult<T> = ExtractResult<T>;

/// Per-image transformation applied by [`GeoProvider::map_over_collection`]
pub type ImageFn<'f> = dyn Fn(&Image) -> ProviderResult<Image> + Sync + 'f;

/// Backend that stores rasters and evaluates reductions over them
///
/// Implementations must be safe to share between worker threads. Coverage
/// gaps are reported as `Ok(None)`; `Err` is reserved for failed calls
/// (quota, malformed geometry, missing datasets). Rate limiting must be
/// reported as `ExtractError::Throttled` so callers can retry.
pub trait GeoProvider: Send + Sync {
    /// Fetch a single image by dataset id
    fn image(&self, id: &str) -> ProviderResult<Image>;

    /// Fetch an image collection by dataset id
    fn collection(&self, id: &str) -> ProviderResult<ImageCollection>;

    /// Nearest-pixel value at the geometry's representative point
    fn sample_at_point(&self, raster: &Raster, geometry: &Geometry, scale: f64) -> ProviderResult<Option<f64>> {
        compute::sample_at_point(raster, geometry, scale)
    }

    /// Statistic over the pixels inside the geometry's footprint at `scale`
    fn region_statistic(&self, raster: &Raster, geometry: &Geometry, scale: f64,
                        statistic: Statistic, max_pixels: u64) -> ProviderResult<Option<f64>> {
        compute::region_statistic(raster, geometry, scale, statistic, max_pixels)
    }

    /// Keep the images that match every given filter, preserving order
    fn filter_collection(&self, collection: &ImageCollection, bounds: Option<&BoundingBox>,
                         temporal: Option<&TemporalFilter>,
                         attribute: Option<&AttributeFilter>) -> ProviderResult<ImageCollection> {
        Ok(compute::filter_collection(collection, bounds, temporal, attribute))
    }

    /// Apply `f` to every image of the collection
    fn map_over_collection(&self, collection: &ImageCollection, f: &ImageFn<'_>) -> ProviderResult<ImageCollection> {
        compute::map_over_collection(collection, f)
    }

    /// Collapse the time dimension per band and pixel
    ///
    /// The result has one band per input band, named `<band>_<statistic>`.
    fn reduce_collection_to_image(&self, collection: &ImageCollection, bands: &[String],
                                  statistic: Statistic) -> ProviderResult<Image> {
        compute::reduce_collection_to_image(collection, bands, statistic)
    }

    /// Evaluate a band-math expression pixel by pixel
    fn band_math(&self, expression: &Expression, bindings: &BTreeMap<String, Arc<Raster>>) -> ProviderResult<Raster> {
        compute::band_math(expression, bindings)
    }

    /// Merge one band of all images, later images on top
    fn mosaic(&self, collection: &ImageCollection, band: &str) -> ProviderResult<Raster> {
        compute::mosaic(collection, band)
    }
}
