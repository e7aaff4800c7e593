use std::path::Path;
use std::sync::Arc;
use log::info;

use crate::batch::{AbortHandle, BatchOptions, BatchOrchestrator, BatchOutcome};
use crate::config::PipelineConfig;
use crate::coordinate::BoundingBox;
use crate::errors::ExtractResult;
use crate::io::{PointReader, write_failures_file, write_table_file};
use crate::preprocess::Preprocessor;
use crate::provider::GeoProvider;
use crate::record::{FeaturePoint, OutputSchema, RecordMerger};
use crate::reducer::PointReducer;
use crate::source::SourceRegistry;

/// Main interface to the featurekit library
///
/// Holds a provider and a validated set of sources; every call to
/// [`FeatureKit::extract`] prepares the sources once and then reduces all
/// points in parallel.
pub struct FeatureKit {
    provider: Arc<dyn GeoProvider>,
    registry: SourceRegistry,
    options: BatchOptions,
    id_property: Option<String>,
    abort: AbortHandle,
}

impl FeatureKit {
    /// Create a FeatureKit instance from already registered sources
    pub fn new(provider: Arc<dyn GeoProvider>, registry: SourceRegistry, options: BatchOptions) -> Self {
        FeatureKit {
            provider,
            registry,
            options,
            id_property: None,
            abort: AbortHandle::new(),
        }
    }

    /// Create a FeatureKit instance from a pipeline configuration
    ///
    /// # Errors
    /// Fails when a configured source does not validate.
    pub fn from_config(provider: Arc<dyn GeoProvider>, config: &PipelineConfig) -> ExtractResult<Self> {
        let registry = config.to_registry()?;
        let mut kit = FeatureKit::new(provider, registry, config.batch_options(false));
        kit.id_property = config.pipeline.id_property.clone();
        Ok(kit)
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.options.progress = progress;
        self
    }

    /// Override the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.options.workers = workers;
        self
    }

    /// Output schema of the registered sources
    pub fn schema(&self) -> OutputSchema {
        self.registry.schema()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Handle that stops a running extraction from starting new points
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Extract features for `points`
    ///
    /// # Returns
    /// The ordered table, the failed points and whether the batch completed
    pub fn extract(&self, points: &[FeaturePoint]) -> ExtractResult<BatchOutcome> {
        let bounds = Self::extent(points);
        let prepared = Preprocessor::new(Arc::clone(&self.provider))
            .with_retry(self.options.retry)
            .prepare(&self.registry, bounds.as_ref())?;

        let reducer = PointReducer::new(Arc::clone(&self.provider), Arc::new(prepared));
        let merger = RecordMerger::new(Arc::new(self.registry.schema()));

        BatchOrchestrator::new(reducer, merger, self.options.clone())
            .with_abort_handle(self.abort.clone())
            .extract_all(points)
    }

    /// Read points from a file, extract them and write the CSV table
    ///
    /// # Arguments
    /// * `points_path` - GeoJSON or CSV point file
    /// * `output_path` - Destination of the CSV table
    /// * `failures_path` - Optional destination of the failure log
    pub fn extract_file(&self, points_path: &Path, output_path: &Path,
                        failures_path: Option<&Path>) -> ExtractResult<BatchOutcome> {
        let points = PointReader::new(self.id_property.as_deref()).read_file(points_path)?;
        let outcome = self.extract(&points)?;

        write_table_file(&outcome.table, output_path)?;
        if let Some(path) = failures_path {
            write_failures_file(&outcome.failures, path)?;
        }

        info!("Extraction of {} finished: {:?}", points_path.display(), outcome.status);
        Ok(outcome)
    }

    /// Extent of a point set, used to restrict collections
    pub fn extent(points: &[FeaturePoint]) -> Option<BoundingBox> {
        points.iter()
            .filter_map(|p| p.geometry.bounds())
            .reduce(|a, b| a.union(&b))
    }
}
