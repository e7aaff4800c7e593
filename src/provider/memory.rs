//! Provider backed by rasters held in memory

use std::collections::HashMap;
use std::path::Path;
use log::info;

use crate::errors::{ExtractError, ExtractResult};
use crate::raster::{Image, ImageCollection};
use super::catalog::Catalog;
use super::{GeoProvider, ProviderResult};

/// In-memory dataset store
///
/// Collections are kept sorted by acquisition date so that compositing
/// and mosaicking see a deterministic order.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    images: HashMap<String, Image>,
    collections: HashMap<String, ImageCollection>,
}

impl MemoryProvider {
    /// Create an empty provider
    pub fn new() -> Self {
        MemoryProvider::default()
    }

    /// Load all datasets of a JSON catalog file
    pub fn from_catalog_file<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let catalog = Catalog::from_file(path.as_ref())?;
        let provider = catalog.into_provider()?;
        info!("Loaded catalog {}: {} image(s), {} collection(s)",
              path.as_ref().display(), provider.images.len(), provider.collections.len());
        Ok(provider)
    }

    /// Register a single image under `id`
    pub fn insert_image(&mut self, id: &str, image: Image) {
        self.images.insert(id.to_string(), image);
    }

    /// Register a collection under `id`
    pub fn insert_collection(&mut self, id: &str, images: Vec<Image>) {
        let mut images = images;
        images.sort_by(|a, b| a.date.cmp(&b.date));
        self.collections.insert(id.to_string(), ImageCollection::new(id, images));
    }

    /// Builder-style variant of [`MemoryProvider::insert_image`]
    pub fn with_image(mut self, id: &str, image: Image) -> Self {
        self.insert_image(id, image);
        self
    }

    /// Builder-style variant of [`MemoryProvider::insert_collection`]
    pub fn with_collection(mut self, id: &str, images: Vec<Image>) -> Self {
        self.insert_collection(id, images);
        self
    }
}

impl GeoProvider for MemoryProvider {
    fn image(&self, id: &str) -> ProviderResult<Image> {
        self.images.get(id)
            .cloned()
            .ok_or_else(|| ExtractError::GenericError(format!("Unknown image '{}'", id)))
    }

    fn collection(&self, id: &str) -> ProviderResult<ImageCollection> {
        self.collections.get(id)
            .cloned()
            .ok_or_else(|| ExtractError::GenericError(format!("Unknown image collection '{}'", id)))
    }
}
