//! Feature extraction command
//!
//! Reads a point file, runs every configured source against a catalog of
//! rasters and writes one CSV row per point.

use std::path::PathBuf;
use std::sync::Arc;
use clap::ArgMatches;
use log::{info, warn};

use crate::api::FeatureKit;
use crate::batch::BatchStatus;
use crate::commands::command_traits::Command;
use crate::config::PipelineConfig;
use crate::errors::{ExtractError, ExtractResult};
use crate::provider::MemoryProvider;

/// Command for extracting point features into a CSV table
pub struct ExtractCommand {
    /// GeoJSON or CSV point file
    points_file: PathBuf,
    /// JSON catalog with the raster datasets
    catalog_file: PathBuf,
    /// Destination of the CSV table
    output_file: PathBuf,
    /// Destination of the failure log, if requested
    failures_file: Option<PathBuf>,
    config: PipelineConfig,
    /// Worker count from the command line, overriding the configuration
    workers: Option<usize>,
    progress: bool,
}

impl ExtractCommand {
    /// Create a new extract command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Pipeline configuration to run
    pub fn new(args: &ArgMatches, config: PipelineConfig) -> ExtractResult<Self> {
        let points_file = args.get_one::<String>("points")
            .map(PathBuf::from)
            .ok_or_else(|| ExtractError::GenericError("Missing points file".to_string()))?;
        info!("Points file: {}", points_file.display());

        let catalog_file = args.get_one::<String>("catalog")
            .map(PathBuf::from)
            .ok_or_else(|| ExtractError::GenericError("Missing --catalog for extraction".to_string()))?;
        info!("Catalog: {}", catalog_file.display());

        let output_file = args.get_one::<String>("output")
            .map(PathBuf::from)
            .ok_or_else(|| ExtractError::GenericError("Missing output file path for extraction".to_string()))?;

        let failures_file = args.get_one::<String>("failures").map(PathBuf::from);
        let workers = args.get_one::<usize>("workers").copied();

        Ok(ExtractCommand {
            points_file,
            catalog_file,
            output_file,
            failures_file,
            config,
            workers,
            progress: args.get_flag("progress"),
        })
    }
}

impl Command for ExtractCommand {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn execute(&self) -> ExtractResult<()> {
        let provider = MemoryProvider::from_catalog_file(&self.catalog_file)?;

        let mut kit = FeatureKit::from_config(Arc::new(provider), &self.config)?
            .with_progress(self.progress);
        if let Some(workers) = self.workers {
            kit = kit.with_workers(workers);
        }

        let outcome = kit.extract_file(&self.points_file, &self.output_file, self.failures_file.as_deref())?;

        for failure in &outcome.failures {
            warn!("Point #{} '{}' failed: {}", failure.index, failure.point_id, failure.cause);
        }

        println!("Extracted {} point(s) into {} ({} failed)",
                 outcome.table.len(), self.output_file.display(), outcome.failures.len());
        if let BatchStatus::Aborted { processed } = outcome.status {
            println!("Extraction was aborted after {} point(s)", processed);
        }

        Ok(())
    }
}
