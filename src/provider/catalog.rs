//! JSON catalog describing in-memory datasets
//!
//! ```json
//! {
//!   "images": [
//!     { "id": "WORLDCLIM/V1/BIO", "crs": "EPSG:4326", "origin": [10.0, 50.0],
//!       "pixel_size": [0.01, 0.01], "width": 2, "height": 2, "nodata": -9999,
//!       "bands": { "bio01": [81, 83, null, -9999] } }
//!   ],
//!   "collections": [
//!     { "id": "COPERNICUS/S2_SR_HARMONIZED",
//!       "images": [ { "id": "T32UNB_20240301", "date": "2024-03-01",
//!                     "properties": { "CLOUDY_PIXEL_PERCENTAGE": 12.5 }, ... } ] }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::coordinate::CoordinateSystem;
use crate::errors::{ExtractError, ExtractResult};
use crate::raster::{GridSpec, Image, Raster};
use super::memory::MemoryProvider;

/// Parsed catalog file
#[derive(Debug, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    images: Vec<ImageEntry>,
    #[serde(default)]
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    id: String,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    properties: BTreeMap<String, f64>,
    #[serde(default)]
    crs: CoordinateSystem,
    origin: [f64; 2],
    pixel_size: [f64; 2],
    width: u32,
    height: u32,
    #[serde(default)]
    nodata: Option<f64>,
    bands: BTreeMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    id: String,
    images: Vec<ImageEntry>,
}

impl ImageEntry {
    fn into_image(self) -> ExtractResult<Image> {
        let grid = GridSpec::new(self.origin[0], self.origin[1], self.pixel_size[0], self.pixel_size[1],
                                 self.width, self.height, self.crs);

        let mut image = Image::new(&self.id, self.date);
        image.properties = self.properties;

        for (name, values) in self.bands {
            let data = values.into_iter()
                .map(|v| match (v, self.nodata) {
                    (Some(x), Some(nd)) if x == nd => None,
                    (v, _) => v,
                })
                .collect();
            let raster = Raster::new(grid, data).map_err(|e| {
                ExtractError::GenericError(format!("Image '{}', band '{}': {}", self.id, name, e))
            })?;
            image = image.with_band(&name, raster);
        }

        Ok(image)
    }
}

impl Catalog {
    /// Parse a catalog from JSON text
    pub fn from_str(content: &str) -> ExtractResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a catalog from a JSON file
    pub fn from_file(path: &Path) -> ExtractResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Build a provider holding every dataset of the catalog
    pub fn into_provider(self) -> ExtractResult<MemoryProvider> {
        let mut provider = MemoryProvider::new();

        for entry in self.images {
            let id = entry.id.clone();
            provider.insert_image(&id, entry.into_image()?);
        }

        for collection in self.collections {
            let images = collection.images.into_iter()
                .map(ImageEntry::into_image)
                .collect::<ExtractResult<Vec<Image>>>()?;
            provider.insert_collection(&collection.id, images);
        }

        Ok(provider)
    }
}
