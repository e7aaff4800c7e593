//! Built-in pipeline configurations

use crate::errors::ExtractResult;
use super::PipelineConfig;

/// TOML text of the default workflow
pub const DEFAULT_WORKFLOW_TOML: &str = include_str!("../../default_workflow.toml");

/// WorldClim bio01..bio19, Copernicus DEM elevation, MODIS GPP/NPP means
/// for 2020-2024 and Sentinel-2 NDVI/EVI statistics for 2024
pub fn default_workflow() -> ExtractResult<PipelineConfig> {
    PipelineConfig::from_str(DEFAULT_WORKFLOW_TOML)
}
