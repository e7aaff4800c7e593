//! Pipeline configuration
//!
//! A pipeline is described in TOML: batch settings under `[pipeline]` and
//! one `[[source]]` table per source. Parsing only checks the shape of the
//! file; [`PipelineConfig::to_registry`] turns it into validated sources.

pub mod presets;

use std::fs;
use std::path::Path;
use chrono::NaiveDate;
use log::debug;
use serde::Deserialize;

use crate::batch::{BatchOptions, RetryPolicy};
use crate::errors::{ExtractError, ExtractResult};
use crate::raster::{Expression, Statistic};
use crate::source::{
    AttributeFilter, QualityMask, ReductionPolicy, SourceDefinition, SourceKind, SourceRegistry,
    TemporalFilter, DEFAULT_PERCENTILES,
};

/// Whole configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// `[pipeline]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Worker threads; 0 lets the thread pool decide
    pub workers: usize,
    /// Point property holding the identifier
    pub id_property: Option<String>,
    /// Percentiles computed for time series unless a source overrides them
    pub percentiles: Vec<u8>,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            workers: 0,
            id_property: None,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            retry: RetryPolicy::default(),
        }
    }
}

/// One `[[source]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub dataset: String,
    pub scale: f64,
    pub policy: ReductionPolicy,
    pub bands: Vec<String>,
    #[serde(default)]
    pub derived: Vec<DerivedConfig>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Inclusive calendar years, `[first, last]`
    pub years: Option<[i32; 2]>,
    pub quality: Option<QualityMask>,
    pub attribute_filter: Option<AttributeFilter>,
    pub filter_bounds: Option<bool>,
    /// Buffer radius in metres for regional reductions
    pub buffer: Option<f64>,
    pub max_pixels: Option<u64>,
    pub percentiles: Option<Vec<u8>>,
    pub outputs: Vec<OutputConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedConfig {
    pub name: String,
    pub expression: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub field: String,
    pub band: String,
    pub statistic: String,
}

impl PipelineConfig {
    /// Parse a configuration from TOML text
    pub fn from_str(content: &str) -> ExtractResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        debug!("Reading pipeline configuration {}", path.as_ref().display());
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Register every configured source, in file order
    ///
    /// # Errors
    /// `InvalidSourceConfig` for the first source that does not validate.
    pub fn to_registry(&self) -> ExtractResult<SourceRegistry> {
        if self.sources.is_empty() {
            return Err(ExtractError::ConfigError("no [[source]] is configured".to_string()));
        }

        let mut registry = SourceRegistry::new();
        for source in &self.sources {
            registry.register_source(source.to_definition(&self.pipeline.percentiles)?)?;
        }
        Ok(registry)
    }

    /// Batch settings of this configuration
    pub fn batch_options(&self, progress: bool) -> BatchOptions {
        BatchOptions {
            workers: self.pipeline.workers,
            retry: self.pipeline.retry,
            progress,
        }
    }
}

impl SourceConfig {
    /// Build the source declaration; `default_percentiles` applies unless
    /// the source lists its own
    pub fn to_definition(&self, default_percentiles: &[u8]) -> ExtractResult<SourceDefinition> {
        let mut def = SourceDefinition::new(&self.name, self.kind, &self.dataset, self.scale, self.policy);
        def.bands = self.bands.clone();
        def.temporal = self.temporal()?;
        def.quality = self.quality.clone();
        def.attribute_filter = self.attribute_filter.clone();
        def.filter_bounds = self.filter_bounds.unwrap_or(true);
        def.buffer_m = self.buffer;
        def.percentiles = self.percentiles.clone().unwrap_or_else(|| default_percentiles.to_vec());
        if let Some(max_pixels) = self.max_pixels {
            def.max_pixels = max_pixels;
        }

        for derived in &self.derived {
            let expression = Expression::parse(&derived.expression).map_err(|e| {
                ExtractError::invalid_source(&self.name, format!("derived band '{}': {}", derived.name, e))
            })?;
            def = def.with_derived(&derived.name, expression);
        }

        for output in &self.outputs {
            let statistic = Statistic::parse(&output.statistic).map_err(|e| {
                ExtractError::invalid_source(&self.name, format!("output '{}': {}", output.field, e))
            })?;
            def = def.with_output(&output.field, &output.band, statistic);
        }

        Ok(def)
    }

    fn temporal(&self) -> ExtractResult<Option<TemporalFilter>> {
        match (self.start, self.end, self.years) {
            (None, None, None) => Ok(None),
            (Some(start), Some(end), None) => Ok(Some(TemporalFilter::DateRange { start, end })),
            (None, None, Some([first, last])) => Ok(Some(TemporalFilter::CalendarYears { first, last })),
            (_, _, Some(_)) => Err(ExtractError::invalid_source(
                &self.name, "use either start/end or years, not both",
            )),
            _ => Err(ExtractError::invalid_source(&self.name, "a date range needs both start and end")),
        }
    }
}
