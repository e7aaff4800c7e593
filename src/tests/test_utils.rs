//! Fixtures shared by the unit tests
//!
//! Rasters use a projected system so that one coordinate unit is one metre
//! and scales map directly onto pixel sizes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use chrono::NaiveDate;

use crate::batch::AbortHandle;
use crate::coordinate::{CoordinateSystem, Geometry, Point};
use crate::errors::ExtractError;
use crate::provider::{GeoProvider, MemoryProvider, ProviderResult};
use crate::raster::{GridSpec, Image, ImageCollection, Raster, Statistic};

pub const UTM: CoordinateSystem = CoordinateSystem::UTM(32, true);

/// `width` x `height` grid of `pixel`-metre pixels with its top-left corner at (x, y)
pub fn grid(x: f64, y: f64, pixel: f64, width: u32, height: u32) -> GridSpec {
    GridSpec::new(x, y, pixel, pixel, width, height, UTM)
}

/// 10 x 10 grid of 10 m pixels covering x, y in 0..100
pub fn small_grid() -> GridSpec {
    grid(0.0, 100.0, 10.0, 10, 10)
}

/// Raster whose pixel value is its row-major index
pub fn ramp_raster(grid: GridSpec) -> Raster {
    let values = (0..grid.len()).map(|i| i as f64).collect();
    Raster::from_values(grid, values, None).unwrap()
}

pub fn constant_raster(grid: GridSpec, value: f64) -> Raster {
    Raster::from_values(grid, vec![value; grid.len()], None).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Axis-aligned square polygon with its lower-left corner at (x, y)
pub fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::Polygon(vec![
        Point::new(x, y),
        Point::new(x + size, y),
        Point::new(x + size, y + size),
        Point::new(x, y + size),
        Point::new(x, y),
    ])
}

pub fn point(x: f64, y: f64) -> Geometry {
    Geometry::Point(Point::new(x, y))
}

/// Image with constant-valued bands on `grid`
pub fn constant_image(id: &str, date: Option<NaiveDate>, grid: GridSpec, bands: &[(&str, f64)]) -> Image {
    bands.iter().fold(Image::new(id, date), |img, (name, value)| {
        img.with_band(name, constant_raster(grid, *value))
    })
}

pub fn collection(id: &str, images: Vec<Image>) -> ImageCollection {
    ImageCollection::new(id, images)
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    match actual {
        Some(v) => assert!((v - expected).abs() < 1e-9, "expected {}, got {}", expected, v),
        None => panic!("expected {}, got null", expected),
    }
}

/// Provider wrapper that misbehaves on demand
///
/// Point samples can be throttled a number of times, panic at a given x
/// coordinate, or trigger an abort. Dataset fetches can be throttled too.
/// Region statistics can be made to fail.
pub struct FlakyProvider {
    pub inner: MemoryProvider,
    pub throttles: AtomicUsize,
    pub panic_at_x: Option<f64>,
    pub abort_on_sample: Option<AbortHandle>,
    pub fail_regions: bool,
    pub sample_calls: AtomicUsize,
    /// x of every sampled location, in call order
    pub sampled_x: Mutex<Vec<f64>>,
    pub fetch_throttles: AtomicUsize,
}

impl FlakyProvider {
    pub fn new(inner: MemoryProvider) -> Self {
        FlakyProvider {
            inner,
            throttles: AtomicUsize::new(0),
            panic_at_x: None,
            abort_on_sample: None,
            fail_regions: false,
            sample_calls: AtomicUsize::new(0),
            sampled_x: Mutex::new(Vec::new()),
            fetch_throttles: AtomicUsize::new(0),
        }
    }

    pub fn with_throttles(self, count: usize) -> Self {
        self.throttles.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_fetch_throttles(self, count: usize) -> Self {
        self.fetch_throttles.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.sample_calls.load(Ordering::SeqCst)
    }

    pub fn sampled(&self) -> Vec<f64> {
        self.sampled_x.lock().unwrap().clone()
    }
}

impl GeoProvider for FlakyProvider {
    fn image(&self, id: &str) -> ProviderResult<Image> {
        take_throttle(&self.fetch_throttles)?;
        self.inner.image(id)
    }

    fn collection(&self, id: &str) -> ProviderResult<ImageCollection> {
        take_throttle(&self.fetch_throttles)?;
        self.inner.collection(id)
    }

    fn sample_at_point(&self, raster: &Raster, geometry: &Geometry, scale: f64) -> ProviderResult<Option<f64>> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(p) = geometry.representative_point() {
            self.sampled_x.lock().unwrap().push(p.x);
        }

        if let Some(abort) = &self.abort_on_sample {
            abort.abort();
        }
        if let (Some(x), Some(p)) = (self.panic_at_x, geometry.representative_point()) {
            if (p.x - x).abs() < 1e-9 {
                panic!("simulated provider crash");
            }
        }
        take_throttle(&self.throttles)?;
        self.inner.sample_at_point(raster, geometry, scale)
    }

    fn region_statistic(&self, raster: &Raster, geometry: &Geometry, scale: f64,
                        statistic: Statistic, max_pixels: u64) -> ProviderResult<Option<f64>> {
        if self.fail_regions {
            return Err(ExtractError::GenericError("computation timed out".to_string()));
        }
        self.inner.region_statistic(raster, geometry, scale, statistic, max_pixels)
    }
}

/// Fail with `Throttled` while the counter is positive, decrementing it
fn take_throttle(remaining: &AtomicUsize) -> ProviderResult<()> {
    let throttled = remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if throttled {
        return Err(ExtractError::Throttled("too many requests".to_string()));
    }
    Ok(())
}

/// Provider holding a single-band ramp raster "RAMP" and a constant "DEM"
pub fn ramp_provider() -> MemoryProvider {
    let grid = small_grid();
    MemoryProvider::new()
        .with_image("RAMP", Image::new("RAMP", None).with_band("v", ramp_raster(grid)))
        .with_collection("DEM", vec![constant_image("dem_tile", None, grid, &[("DEM", 250.0)])])
}

pub fn shared(provider: impl GeoProvider + 'static) -> Arc<dyn GeoProvider> {
    Arc::new(provider)
}
