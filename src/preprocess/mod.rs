//! Preprocessing of sources into ready-to-query rasters
//!
//! This is the first of the two extraction phases. Every source is turned
//! into a set of rasters tagged with (source, band, statistic) exactly once
//! per batch; the per-point phase only reads them. A source that cannot be
//! prepared is kept with its failure so that its fields come out null.

mod mask;
mod derive;
mod composite;

use std::sync::Arc;
use std::thread;
use log::{debug, info, warn};

use crate::batch::RetryPolicy;
use crate::coordinate::BoundingBox;
use crate::errors::{ExtractError, ExtractResult};
use crate::provider::GeoProvider;
use crate::raster::{Raster, Statistic};
use crate::source::{OutputBinding, SourceHandle, SourceKind, SourceRegistry};

pub use mask::apply_quality_mask;
pub use derive::derive_bands;
pub use composite::composite;

/// A raster ready for per-point queries
#[derive(Debug, Clone)]
pub struct PreparedRaster {
    pub source: String,
    pub band: String,
    /// `Value` for static rasters, the composite statistic otherwise
    pub statistic: Statistic,
    pub raster: Arc<Raster>,
}

/// All prepared rasters of one source
#[derive(Debug, Clone)]
pub struct PreparedSource {
    pub handle: SourceHandle,
    pub rasters: Vec<PreparedRaster>,
    /// Why preparation failed; such a source has no rasters
    pub failure: Option<String>,
}

impl PreparedSource {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Raster tagged with `band` and `statistic`
    pub fn raster(&self, band: &str, statistic: Statistic) -> Option<&PreparedRaster> {
        self.rasters.iter().find(|r| r.band == band && r.statistic == statistic)
    }

    /// Raster an output binding reads from
    ///
    /// Static sources keep raw bands, so their outputs read the `Value`
    /// raster whatever statistic the reduction applies.
    pub fn raster_for(&self, output: &OutputBinding) -> Option<&PreparedRaster> {
        if self.handle.kind.is_temporal() {
            self.raster(&output.band, output.statistic)
        } else {
            self.raster(&output.band, Statistic::Value)
        }
    }
}

/// Read-only result of the preprocessing phase, shared by all workers
#[derive(Debug, Clone, Default)]
pub struct PreparedSources {
    sources: Vec<PreparedSource>,
}

impl PreparedSources {
    /// Prepared sources in registration order
    pub fn sources(&self) -> &[PreparedSource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Turns registered sources into prepared rasters
pub struct Preprocessor {
    provider: Arc<dyn GeoProvider>,
    retry: RetryPolicy,
}

impl Preprocessor {
    /// Create a preprocessor that computes through `provider`
    pub fn new(provider: Arc<dyn GeoProvider>) -> Self {
        Preprocessor { provider, retry: RetryPolicy::default() }
    }

    /// Backoff applied when the provider throttles a source
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Prepare every registered source
    ///
    /// `bounds` is the extent of all points; it restricts collections whose
    /// source enables spatial filtering. A source that fails, or stays
    /// throttled after every retry, is recorded as failed and the others
    /// are still prepared.
    pub fn prepare(&self, registry: &SourceRegistry, bounds: Option<&BoundingBox>) -> ExtractResult<PreparedSources> {
        info!("Preparing {} source(s)", registry.len());

        let mut sources = Vec::with_capacity(registry.len());
        for handle in registry.sources() {
            let prepared = match self.prepare_with_retry(handle, bounds) {
                Ok(rasters) => {
                    info!("Source '{}' prepared: {} raster(s)", handle.name, rasters.len());
                    PreparedSource { handle: handle.clone(), rasters, failure: None }
                }
                Err(e) => {
                    let e = match e {
                        ExtractError::ReductionFailure { .. } => e,
                        other => ExtractError::reduction(&handle.name, other.to_string()),
                    };
                    warn!("{}; its fields will be null for every point", e);
                    PreparedSource { handle: handle.clone(), rasters: Vec::new(), failure: Some(e.to_string()) }
                }
            };
            sources.push(prepared);
        }

        Ok(PreparedSources { sources })
    }

    fn prepare_with_retry(&self, handle: &SourceHandle, bounds: Option<&BoundingBox>) -> ExtractResult<Vec<PreparedRaster>> {
        let mut attempt = 1;
        loop {
            match self.prepare_source(handle, bounds) {
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(ExtractError::reduction(&handle.name,
                                                           format!("{} (gave up after {} attempt(s))", e, attempt)));
                    }
                    let delay = self.retry.backoff(attempt);
                    debug!("Source '{}' throttled on attempt {}, retrying in {:?}", handle.name, attempt, delay);
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn prepare_source(&self, handle: &SourceHandle, bounds: Option<&BoundingBox>) -> ExtractResult<Vec<PreparedRaster>> {
        let spatial = if handle.filter_bounds { bounds } else { None };

        match handle.kind {
            SourceKind::StaticRaster => {
                let image = self.provider.image(&handle.dataset)?;
                self.static_bands(handle, |band| {
                    image.band(band).cloned().ok_or_else(|| {
                        ExtractError::reduction(&handle.name, format!("dataset '{}' has no band '{}'", handle.dataset, band))
                    })
                })
            }
            SourceKind::Mosaic => {
                let collection = self.provider.collection(&handle.dataset)?;
                let tiles = self.provider.filter_collection(&collection, spatial, None,
                                                            handle.attribute_filter.as_ref())?;
                debug!("Mosaicking {} tile(s) of '{}'", tiles.len(), handle.dataset);
                self.static_bands(handle, |band| Ok(Arc::new(self.provider.mosaic(&tiles, band)?)))
            }
            SourceKind::TimeFilteredCollection => self.prepare_time_series(handle, spatial),
            SourceKind::DerivedComposite => {
                let collection = self.provider.collection(&handle.dataset)?;
                let filtered = self.provider.filter_collection(&collection, spatial, handle.temporal.as_ref(),
                                                               handle.attribute_filter.as_ref())?;
                info!("Source '{}': {} of {} item(s) in {}", handle.name, filtered.len(), collection.len(),
                      handle.temporal.map(|t| t.describe()).unwrap_or_default());
                composite(self.provider.as_ref(), &handle.name, &filtered.select(&handle.bands),
                          &handle.required_rasters())
            }
        }
    }

    /// One `Value` raster per band read by the outputs
    fn static_bands<F>(&self, handle: &SourceHandle, fetch: F) -> ExtractResult<Vec<PreparedRaster>>
    where
        F: Fn(&str) -> ExtractResult<Arc<Raster>>,
    {
        let mut bands: Vec<String> = handle.required_rasters().into_iter().map(|(b, _)| b).collect();
        bands.dedup();

        bands.into_iter()
            .map(|band| {
                let raster = fetch(&band)?;
                Ok(PreparedRaster {
                    source: handle.name.clone(),
                    band,
                    statistic: Statistic::Value,
                    raster,
                })
            })
            .collect()
    }

    fn prepare_time_series(&self, handle: &SourceHandle, spatial: Option<&BoundingBox>) -> ExtractResult<Vec<PreparedRaster>> {
        let collection = self.provider.collection(&handle.dataset)?;
        let filtered = self.provider.filter_collection(&collection, spatial, handle.temporal.as_ref(),
                                                       handle.attribute_filter.as_ref())?;
        info!("Source '{}': {} of {} item(s) pass filters", handle.name, filtered.len(), collection.len());

        let selected = filtered.select(&handle.bands);

        let masked = match &handle.quality {
            Some(mask) => {
                debug!("Masking classes {:?} of band '{}'", mask.exclude, mask.band);
                self.provider.map_over_collection(&selected, &|image| Ok(apply_quality_mask(image, mask)))?
            }
            None => selected,
        };

        let derived = if handle.derived.is_empty() {
            masked
        } else {
            let provider = self.provider.as_ref();
            self.provider.map_over_collection(&masked, &|image| derive_bands(provider, image, &handle.derived))?
        };

        composite(self.provider.as_ref(), &handle.name, &derived, &handle.required_rasters())
    }
}
