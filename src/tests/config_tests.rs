//! Tests for pipeline configuration and the bundled workflow

use crate::config::presets::default_workflow;
use crate::config::PipelineConfig;
use crate::errors::ExtractError;
use crate::raster::Statistic;
use crate::source::{Comparison, SourceKind, TemporalFilter};
use super::test_utils::date;

const SENTINEL: &str = r#"
[pipeline]
workers = 3

[pipeline.retry]
max_attempts = 2

[[source]]
name = "s2"
kind = "time-filtered-collection"
dataset = "S2"
scale = 10.0
policy = "point-sample"
start = "2024-01-01"
end = "2025-01-01"
bands = ["B4", "B8", "SCL"]
quality = { band = "SCL", exclude = [8, 9] }
attribute_filter = { property = "CLOUDY_PIXEL_PERCENTAGE", op = "lt", value = 40.0 }
derived = [{ name = "NDVI", expression = "(B8 - B4) / (B8 + B4)" }]
outputs = [
    { field = "NDVI_Mean", band = "NDVI", statistic = "mean" },
    { field = "NDVI_Q3", band = "NDVI", statistic = "p75" },
]
"#;

#[test]
fn test_bundled_workflow() {
    let config = default_workflow().unwrap();
    let registry = config.to_registry().unwrap();

    let names: Vec<&str> = registry.sources().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["worldclim", "dem", "terranet", "sentinel2"]);

    let schema = registry.schema();
    assert_eq!(schema.len(), 32);
    assert_eq!(schema.fields()[0].name, "Annual_Mean_Temperature");
    assert_eq!(schema.fields()[18].name, "Precipitation_of_Coldest_Quarter");
    assert_eq!(schema.index_of("Elevation"), Some(19));
    assert_eq!(schema.index_of("GPP_mean_2020-2024"), Some(20));
    assert_eq!(schema.index_of("NDVI_Q1"), Some(24));
    assert_eq!(schema.fields()[31].name, "EVI_Q3");

    let modis = registry.get("terranet").unwrap();
    assert_eq!(modis.kind, SourceKind::DerivedComposite);
    assert_eq!(modis.temporal, Some(TemporalFilter::CalendarYears { first: 2020, last: 2024 }));
    assert_eq!(modis.max_pixels, 10_000);

    let s2 = registry.get("sentinel2").unwrap();
    assert_eq!(s2.temporal, Some(TemporalFilter::DateRange { start: date(2024, 1, 1), end: date(2025, 1, 1) }));
    assert_eq!(s2.derived.len(), 2);
    assert_eq!(s2.percentiles, vec![25, 50, 75]);
}

#[test]
fn test_parse_source_table() {
    let config = PipelineConfig::from_str(SENTINEL).unwrap();
    let options = config.batch_options(false);
    assert_eq!(options.workers, 3);
    assert_eq!(options.retry.max_attempts, 2);
    // Unset retry keys keep their defaults
    assert_eq!(options.retry.initial_backoff_ms, 200);

    let registry = config.to_registry().unwrap();
    let s2 = registry.get("s2").unwrap();
    assert_eq!(s2.quality.as_ref().map(|q| q.exclude.clone()), Some(vec![8, 9]));
    let filter = s2.attribute_filter.as_ref().unwrap();
    assert_eq!(filter.op, Comparison::Lt);
    assert_eq!(filter.value, 40.0);
    assert!(s2.filter_bounds);
    assert_eq!(s2.outputs[1].statistic, Statistic::Percentile(75));
}

#[test]
fn test_years_and_dates_are_exclusive() {
    let text = SENTINEL.replace("start = \"2024-01-01\"", "start = \"2024-01-01\"\nyears = [2020, 2024]");
    let config = PipelineConfig::from_str(&text).unwrap();

    match config.to_registry() {
        Err(ExtractError::InvalidSourceConfig { source, .. }) => assert_eq!(source, "s2"),
        other => panic!("expected InvalidSourceConfig, got {:?}", other.map(|r| r.len())),
    }
}

#[test]
fn test_unknown_statistic_is_rejected() {
    let text = SENTINEL.replace("statistic = \"p75\"", "statistic = \"median\"");
    let config = PipelineConfig::from_str(&text).unwrap();
    assert!(matches!(config.to_registry(), Err(ExtractError::InvalidSourceConfig { .. })));
}

#[test]
fn test_percentile_must_be_configured() {
    let text = SENTINEL.replace("statistic = \"p75\"", "statistic = \"p90\"");
    let config = PipelineConfig::from_str(&text).unwrap();
    assert!(matches!(config.to_registry(), Err(ExtractError::InvalidSourceConfig { .. })));

    let text = text.replace("bands = [\"B4\"", "percentiles = [90]\nbands = [\"B4\"");
    let config = PipelineConfig::from_str(&text).unwrap();
    assert!(config.to_registry().is_ok());
}

#[test]
fn test_unknown_keys_are_rejected() {
    let text = SENTINEL.replace("scale = 10.0", "scale = 10.0\nresolution = 10");
    assert!(PipelineConfig::from_str(&text).is_err());
}

#[test]
fn test_empty_configuration() {
    let config = PipelineConfig::from_str("[pipeline]\nworkers = 2\n").unwrap();
    assert!(matches!(config.to_registry(), Err(ExtractError::ConfigError(_))));
}
