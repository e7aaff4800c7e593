//! Pixel-level quality masking
//!
//! Pixels whose classification is one of the excluded classes become
//! unavailable in every band of the image. They are never replaced by a
//! numeric background value.

use std::sync::Arc;
use log::debug;

use crate::raster::Image;
use crate::source::QualityMask;

/// Apply a quality mask to every band of an image
///
/// An image without the classification band is masked entirely, since
/// none of its pixels can be shown to be clear.
pub fn apply_quality_mask(image: &Image, mask: &QualityMask) -> Image {
    let mut masked = image.clone();

    let Some(quality) = image.band(&mask.band) else {
        debug!("Image '{}' has no quality band '{}', masking all pixels", image.id, mask.band);
        for (name, raster) in image.bands() {
            masked.set_band(name, Arc::new(raster.map(|_| None)));
        }
        return masked;
    };

    for (name, raster) in image.bands() {
        // Classification may be stored at a different resolution than the band
        let classes = if raster.grid().same_grid(quality.grid()) {
            Arc::clone(quality)
        } else {
            Arc::new(quality.resample_to(raster.grid()))
        };

        let keep: Vec<bool> = classes.data().iter().map(|c| mask.keeps(*c)).collect();
        masked.set_band(name, Arc::new(raster.masked_by(&keep)));
    }

    masked
}
