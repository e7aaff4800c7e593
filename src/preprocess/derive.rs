//! Derivation of secondary bands through band math

use std::sync::Arc;

use crate::errors::{ExtractError, ExtractResult};
use crate::provider::GeoProvider;
use crate::raster::Image;
use crate::source::DerivedBand;

/// Add derived bands to an image, in declaration order
///
/// Later expressions may use bands derived earlier. Unavailable inputs
/// propagate to unavailable outputs pixel by pixel.
pub fn derive_bands(provider: &dyn GeoProvider, image: &Image, derived: &[DerivedBand]) -> ExtractResult<Image> {
    let mut out = image.clone();

    for band in derived {
        let raster = provider.band_math(&band.expression, out.bands())
            .map_err(|e| ExtractError::GenericError(format!(
                "Deriving '{}' for image '{}': {}", band.name, image.id, e
            )))?;
        out.set_band(&band.name, Arc::new(raster));
    }

    Ok(out)
}
