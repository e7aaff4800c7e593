//! In-memory implementations of the provider compute operations

use std::collections::BTreeMap;
use std::sync::Arc;
use log::debug;
use rayon::prelude::*;

use crate::coordinate::{BoundingBox, Geometry, Point, ScaleConverter};
use crate::errors::ExtractError;
use crate::raster::{Expression, GridSpec, Image, ImageCollection, Raster, Statistic};
use crate::source::{AttributeFilter, TemporalFilter};
use super::{ImageFn, ProviderResult};

/// Scale-to-pixel ratio from which point samples average a window
const COARSE_SCALE_RATIO: f64 = 2.0;

fn malformed(geometry: &Geometry) -> ExtractError {
    ExtractError::GenericError(format!("Malformed geometry: {:?}", geometry))
}

fn invalid_scale(scale: f64) -> ExtractError {
    ExtractError::GenericError(format!("Invalid reduction scale: {}", scale))
}

pub(super) fn sample_at_point(raster: &Raster, geometry: &Geometry, scale: f64) -> ProviderResult<Option<f64>> {
    if !geometry.is_valid() {
        return Err(malformed(geometry));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid_scale(scale));
    }
    let location = geometry.representative_point().ok_or_else(|| malformed(geometry))?;

    let grid = raster.grid();
    if grid.is_empty() {
        return Ok(None);
    }

    let (step_x, step_y) = ScaleConverter::meters_to_units(scale, &grid.crs, &location);
    let coarse = step_x >= grid.pixel_width * COARSE_SCALE_RATIO &&
        step_y >= grid.pixel_height * COARSE_SCALE_RATIO;

    if !coarse {
        return Ok(raster.value_at(&location));
    }

    // Requested scale spans several native pixels: average the cell around the location
    let cell = BoundingBox::from_point_buffer(&location, step_x / 2.0, step_y / 2.0);
    let Some(region) = grid.region_for(&cell) else {
        return Ok(None);
    };

    let mut values: Vec<f64> = region.pixels()
        .filter(|(col, row)| cell.contains(&grid.pixel_center(*col, *row)))
        .filter_map(|(col, row)| raster.get(col, row))
        .collect();

    Ok(Statistic::Mean.reduce(&mut values))
}

pub(super) fn region_statistic(raster: &Raster, geometry: &Geometry, scale: f64,
                               statistic: Statistic, max_pixels: u64) -> ProviderResult<Option<f64>> {
    if !geometry.is_valid() {
        return Err(malformed(geometry));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(invalid_scale(scale));
    }

    let grid = raster.grid();
    if grid.is_empty() {
        return Ok(None);
    }

    let anchor = geometry.representative_point().ok_or_else(|| malformed(geometry))?;
    let bbox = geometry.bounds_in(&grid.crs).ok_or_else(|| malformed(geometry))?;
    if !grid.bounds().intersects(&bbox) {
        return Ok(None);
    }

    // Lattice of scale-sized cells anchored at the raster origin
    let (step_x, step_y) = ScaleConverter::meters_to_units(scale, &grid.crs, &anchor);
    let i0 = ((bbox.min_x - grid.origin_x) / step_x).floor() as i64;
    let i1 = ((bbox.max_x - grid.origin_x) / step_x).ceil() as i64;
    let j0 = ((grid.origin_y - bbox.max_y) / step_y).floor() as i64;
    let j1 = ((grid.origin_y - bbox.min_y) / step_y).ceil() as i64;

    let mut cells: u64 = 0;
    let mut values = Vec::new();
    for j in j0..j1 {
        for i in i0..i1 {
            let center = Point::new(
                grid.origin_x + (i as f64 + 0.5) * step_x,
                grid.origin_y - (j as f64 + 0.5) * step_y,
            );
            if !geometry.contains(&center, &grid.crs) {
                continue;
            }

            cells += 1;
            if cells > max_pixels {
                return Err(ExtractError::GenericError(format!(
                    "Region has more than {} pixels at scale {}m", max_pixels, scale
                )));
            }
            if let Some(v) = raster.value_at(&center) {
                values.push(v);
            }
        }
    }

    debug!("Region reduction: {} cell(s) in footprint, {} valid, statistic {}",
           cells, values.len(), statistic);

    Ok(statistic.reduce(&mut values))
}

pub(super) fn filter_collection(collection: &ImageCollection, bounds: Option<&BoundingBox>,
                                temporal: Option<&TemporalFilter>,
                                attribute: Option<&AttributeFilter>) -> ImageCollection {
    let images: Vec<Image> = collection.images().iter()
        .filter(|img| match bounds {
            Some(b) => img.footprint().map(|f| f.intersects(b)).unwrap_or(false),
            None => true,
        })
        .filter(|img| match temporal {
            Some(t) => img.date.map(|d| t.matches(d)).unwrap_or(false),
            None => true,
        })
        .filter(|img| match attribute {
            Some(a) => a.matches(&img.properties),
            None => true,
        })
        .cloned()
        .collect();

    debug!("Filtered collection '{}': {} of {} image(s) kept",
           collection.id, images.len(), collection.len());

    ImageCollection::new(&collection.id, images)
}

pub(super) fn map_over_collection(collection: &ImageCollection, f: &ImageFn<'_>) -> ProviderResult<ImageCollection> {
    // Indexed parallel collect keeps the collection order
    let images = collection.images()
        .par_iter()
        .map(f)
        .collect::<ProviderResult<Vec<Image>>>()?;
    Ok(ImageCollection::new(&collection.id, images))
}

/// Resample every raster onto the union of their grids
fn align(rasters: &[&Raster]) -> ProviderResult<Option<(GridSpec, Vec<Raster>)>> {
    let grids: Vec<GridSpec> = rasters.iter().map(|r| *r.grid()).collect();
    if grids.iter().all(GridSpec::is_empty) {
        return Ok(None);
    }

    let target = GridSpec::union(&grids).ok_or_else(|| {
        ExtractError::GenericError("Rasters use different coordinate systems".to_string())
    })?;
    let aligned = rasters.iter().map(|r| r.resample_to(&target)).collect();
    Ok(Some((target, aligned)))
}

pub(super) fn reduce_collection_to_image(collection: &ImageCollection, bands: &[String],
                                         statistic: Statistic) -> ProviderResult<Image> {
    let mut image = Image::new(&format!("{}_{}", collection.id, statistic.label()), None);

    for band in bands {
        let name = format!("{}_{}", band, statistic.label());
        let layers: Vec<&Raster> = collection.images().iter()
            .filter_map(|img| img.band(band).map(|r| r.as_ref()))
            .collect();

        let Some((grid, aligned)) = align(&layers)? else {
            debug!("No data for band '{}' in '{}', composite is unavailable", band, collection.id);
            image.set_band(&name, Arc::new(Raster::empty()));
            continue;
        };

        let mut data = Vec::with_capacity(grid.len());
        let mut stack = Vec::with_capacity(aligned.len());
        for idx in 0..grid.len() {
            stack.clear();
            stack.extend(aligned.iter().filter_map(|r| r.data()[idx]));
            data.push(statistic.reduce(&mut stack));
        }

        image.set_band(&name, Arc::new(Raster::new(grid, data)?));
    }

    Ok(image)
}

pub(super) fn band_math(expression: &Expression, bindings: &BTreeMap<String, Arc<Raster>>) -> ProviderResult<Raster> {
    let variables: Vec<String> = expression.variables().into_iter().collect();
    if variables.is_empty() {
        return Err(ExtractError::GenericError(format!(
            "Expression '{}' references no bands", expression
        )));
    }

    let mut inputs = Vec::with_capacity(variables.len());
    for var in &variables {
        let raster = bindings.get(var).ok_or_else(|| {
            ExtractError::GenericError(format!("Band '{}' is not bound for '{}'", var, expression))
        })?;
        inputs.push(raster.as_ref());
    }

    let Some((grid, aligned)) = align(&inputs)? else {
        return Ok(Raster::empty());
    };

    let mut data = Vec::with_capacity(grid.len());
    for idx in 0..grid.len() {
        let lookup = |name: &str| {
            variables.iter()
                .position(|v| v == name)
                .and_then(|pos| aligned[pos].data()[idx])
        };
        data.push(expression.evaluate(&lookup));
    }

    Raster::new(grid, data)
}

pub(super) fn mosaic(collection: &ImageCollection, band: &str) -> ProviderResult<Raster> {
    let layers: Vec<&Raster> = collection.images().iter()
        .filter_map(|img| img.band(band).map(|r| r.as_ref()))
        .collect();

    let Some((grid, aligned)) = align(&layers)? else {
        return Ok(Raster::empty());
    };

    let data = (0..grid.len())
        .map(|idx| aligned.iter().rev().find_map(|r| r.data()[idx]))
        .collect();

    Raster::new(grid, data)
}
