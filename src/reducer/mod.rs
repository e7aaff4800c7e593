//! Per-point reduction
//!
//! Second extraction phase: for one point, query every prepared source
//! according to its reduction policy. Failures are contained per source;
//! only throttling escapes, so the caller can retry the whole point.

mod result;

use std::sync::Arc;
use log::{debug, warn};

use crate::errors::{ExtractError, ExtractResult};
use crate::provider::GeoProvider;
use crate::preprocess::{PreparedSource, PreparedSources};
use crate::raster::Statistic;
use crate::record::FeaturePoint;
use crate::source::ReductionPolicy;

pub use result::{ReductionResult, Sample, StatKey};

/// Reduces prepared sources at single points
#[derive(Clone)]
pub struct PointReducer {
    provider: Arc<dyn GeoProvider>,
    prepared: Arc<PreparedSources>,
}

impl PointReducer {
    pub fn new(provider: Arc<dyn GeoProvider>, prepared: Arc<PreparedSources>) -> Self {
        PointReducer { provider, prepared }
    }

    /// Produce exactly one result per prepared source, in source order
    ///
    /// # Errors
    /// Only `Throttled`; every other failure is recorded in the affected
    /// source's result.
    pub fn reduce(&self, point: &FeaturePoint) -> ExtractResult<Vec<ReductionResult>> {
        let mut results = Vec::with_capacity(self.prepared.len());

        for source in self.prepared.sources() {
            if let Some(reason) = &source.failure {
                results.push(ReductionResult::failed(&source.handle.name, Self::output_keys(source), reason.clone()));
                continue;
            }

            match self.reduce_source(source, point) {
                Ok(result) => results.push(result),
                Err(e) if e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!("Point '{}': {}; fields of '{}' set to null", point.id, e, source.handle.name);
                    results.push(ReductionResult::failed(&source.handle.name, Self::output_keys(source), e.to_string()));
                }
            }
        }

        Ok(results)
    }

    fn output_keys(source: &PreparedSource) -> impl Iterator<Item = StatKey> + '_ {
        source.handle.outputs.iter().map(|o| StatKey::new(&o.band, o.statistic))
    }

    fn reduce_source(&self, source: &PreparedSource, point: &FeaturePoint) -> ExtractResult<ReductionResult> {
        let handle = &source.handle;
        let mut result = ReductionResult::new(&handle.name);

        let geometry = match handle.buffer_m {
            Some(radius) if handle.policy.is_regional() => point.geometry.buffered(radius)
                .ok_or_else(|| ExtractError::reduction(&handle.name, "geometry has no coordinates"))?,
            _ => point.geometry.clone(),
        };

        for output in &handle.outputs {
            let key = StatKey::new(&output.band, output.statistic);
            if result.values.contains_key(&key) {
                continue;
            }

            let prepared = source.raster_for(output).ok_or_else(|| {
                ExtractError::reduction(&handle.name, format!("no prepared raster for {}/{}", output.band, output.statistic))
            })?;

            let value = match handle.policy {
                ReductionPolicy::PointSample => {
                    self.provider.sample_at_point(&prepared.raster, &geometry, handle.scale)
                }
                ReductionPolicy::RegionMean | ReductionPolicy::TemporalCompositeThenRegionMean => {
                    self.provider.region_statistic(&prepared.raster, &geometry, handle.scale,
                                                   Statistic::Mean, handle.max_pixels)
                }
            };

            let value = value.map_err(|e| match e {
                ExtractError::Throttled(_) | ExtractError::ReductionFailure { .. } => e,
                other => ExtractError::reduction(&handle.name, other.to_string()),
            })?;

            if value.is_none() {
                debug!("{}", ExtractError::PointOutOfCoverage {
                    source: format!("{} ({}/{})", handle.name, output.band, output.statistic),
                    point_id: point.id.clone(),
                });
            }
            result.values.insert(key, Sample::from_option(value));
        }

        Ok(result)
    }
}
