//! Temporal compositing into per-statistic rasters

use log::debug;

use crate::errors::{ExtractError, ExtractResult};
use crate::provider::GeoProvider;
use crate::raster::{ImageCollection, Statistic};
use super::PreparedRaster;

/// Collapse a collection into one raster per requested (band, statistic)
///
/// Each statistic is computed independently per band and pixel across the
/// sequence. An empty sequence yields rasters with no available pixels.
pub fn composite(provider: &dyn GeoProvider, source: &str, collection: &ImageCollection,
                 required: &[(String, Statistic)]) -> ExtractResult<Vec<PreparedRaster>> {
    let mut statistics: Vec<Statistic> = required.iter().map(|(_, s)| *s).collect();
    statistics.sort();
    statistics.dedup();

    let mut prepared = Vec::with_capacity(required.len());
    for statistic in statistics {
        let bands: Vec<String> = required.iter()
            .filter(|(_, s)| *s == statistic)
            .map(|(b, _)| b.clone())
            .collect();

        debug!("Compositing {:?} of '{}' with statistic {} over {} image(s)",
               bands, source, statistic, collection.len());
        let image = provider.reduce_collection_to_image(collection, &bands, statistic)?;

        for band in bands {
            let name = format!("{}_{}", band, statistic.label());
            let raster = image.band(&name).cloned().ok_or_else(|| {
                ExtractError::reduction(source, format!("composite is missing band '{}'", name))
            })?;
            prepared.push(PreparedRaster {
                source: source.to_string(),
                band,
                statistic,
                raster,
            });
        }
    }

    Ok(prepared)
}
