//! Multi-band images and time-ordered image collections

use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::NaiveDate;

use crate::coordinate::BoundingBox;
use super::raster::Raster;

/// A set of named bands acquired together
///
/// Bands are shared behind `Arc` so that selecting or masking bands does
/// not copy untouched pixel data.
#[derive(Debug, Clone, Default)]
pub struct Image {
    /// Identifier of the image within its collection
    pub id: String,
    /// Acquisition date, if the image is part of a time series
    pub date: Option<NaiveDate>,
    /// Image-level metadata (e.g. cloud cover percentage)
    pub properties: BTreeMap<String, f64>,
    bands: BTreeMap<String, Arc<Raster>>,
}

impl Image {
    /// Create an image without bands
    pub fn new(id: &str, date: Option<NaiveDate>) -> Self {
        Image {
            id: id.to_string(),
            date,
            properties: BTreeMap::new(),
            bands: BTreeMap::new(),
        }
    }

    /// Add or replace a band
    pub fn with_band(mut self, name: &str, raster: Raster) -> Self {
        self.bands.insert(name.to_string(), Arc::new(raster));
        self
    }

    /// Add or replace a band that is already shared
    pub fn set_band(&mut self, name: &str, raster: Arc<Raster>) {
        self.bands.insert(name.to_string(), raster);
    }

    /// Add an image-level property
    pub fn with_property(mut self, name: &str, value: f64) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Option<&Arc<Raster>> {
        self.bands.get(name)
    }

    /// Band names in sorted order
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// All bands
    pub fn bands(&self) -> &BTreeMap<String, Arc<Raster>> {
        &self.bands
    }

    /// Keep only the named bands; missing names are skipped
    pub fn select(&self, names: &[String]) -> Image {
        let bands = names.iter()
            .filter_map(|n| self.bands.get(n).map(|r| (n.clone(), Arc::clone(r))))
            .collect();
        Image {
            id: self.id.clone(),
            date: self.date,
            properties: self.properties.clone(),
            bands,
        }
    }

    /// Union of the extents of all bands
    pub fn footprint(&self) -> Option<BoundingBox> {
        self.bands.values()
            .filter(|r| !r.grid().is_empty())
            .map(|r| r.grid().bounds())
            .reduce(|a, b| a.union(&b))
    }
}

/// Ordered sequence of images, usually sorted by acquisition date
#[derive(Debug, Clone, Default)]
pub struct ImageCollection {
    pub id: String,
    images: Vec<Image>,
}

impl ImageCollection {
    /// Create a collection from images, keeping their order
    pub fn new(id: &str, images: Vec<Image>) -> Self {
        ImageCollection { id: id.to_string(), images }
    }

    /// Images in collection order
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Keep only the named bands in every image
    pub fn select(&self, names: &[String]) -> ImageCollection {
        ImageCollection {
            id: self.id.clone(),
            images: self.images.iter().map(|img| img.select(names)).collect(),
        }
    }
}
