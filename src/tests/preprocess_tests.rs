//! Tests for masking, band derivation, compositing and source preparation

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::batch::RetryPolicy;
use crate::preprocess::{apply_quality_mask, composite, derive_bands, Preprocessor};
use crate::provider::MemoryProvider;
use crate::raster::{Expression, Image, Raster, Statistic};
use crate::source::{
    DerivedBand, QualityMask, ReductionPolicy, SourceDefinition, SourceKind, SourceRegistry, TemporalFilter,
};
use super::test_utils::{collection, constant_image, date, grid, ramp_provider, shared, small_grid, FlakyProvider};

fn scl_mask() -> QualityMask {
    QualityMask { band: "SCL".to_string(), exclude: vec![8, 9] }
}

#[test]
fn test_quality_mask_hides_excluded_classes_in_all_bands() {
    let g = grid(0.0, 10.0, 10.0, 3, 1);
    let image = Image::new("img", None)
        .with_band("B4", Raster::new(g, vec![Some(0.1), Some(0.2), Some(0.3)]).unwrap())
        .with_band("SCL", Raster::new(g, vec![Some(4.0), Some(9.0), None]).unwrap());

    let masked = apply_quality_mask(&image, &scl_mask());

    assert_eq!(masked.band("B4").unwrap().data(), &[Some(0.1), None, None]);
    assert_eq!(masked.band("SCL").unwrap().data(), &[Some(4.0), None, None]);
    // The input is untouched
    assert_eq!(image.band("B4").unwrap().valid_count(), 3);
}

#[test]
fn test_quality_mask_resamples_classification() {
    let fine = grid(0.0, 20.0, 10.0, 2, 2);
    let coarse = grid(0.0, 20.0, 20.0, 1, 1);
    let image = Image::new("img", None)
        .with_band("B4", Raster::new(fine, vec![Some(1.0); 4]).unwrap())
        .with_band("SCL", Raster::new(coarse, vec![Some(8.0)]).unwrap());

    let masked = apply_quality_mask(&image, &scl_mask());
    assert_eq!(masked.band("B4").unwrap().valid_count(), 0);
}

#[test]
fn test_missing_quality_band_masks_everything() {
    let image = constant_image("img", None, small_grid(), &[("B4", 0.2), ("B8", 0.6)]);
    let masked = apply_quality_mask(&image, &scl_mask());

    assert_eq!(masked.band("B4").unwrap().valid_count(), 0);
    assert_eq!(masked.band("B8").unwrap().valid_count(), 0);
}

#[test]
fn test_derive_bands_in_order() {
    let provider = MemoryProvider::new();
    let image = constant_image("img", None, small_grid(), &[("B4", 0.25), ("B8", 0.75)]);
    let derived = vec![
        DerivedBand { name: "NDVI".to_string(), expression: Expression::normalized_difference("B8", "B4").unwrap() },
        DerivedBand { name: "NDVI2".to_string(), expression: Expression::parse("NDVI * 2").unwrap() },
    ];

    let out = derive_bands(&provider, &image, &derived).unwrap();
    assert_eq!(out.band("NDVI").unwrap().get(3, 3), Some(0.5));
    assert_eq!(out.band("NDVI2").unwrap().get(3, 3), Some(1.0));
    assert_eq!(out.band_names().count(), 4);
}

#[test]
fn test_composite_tags_rasters() {
    let provider = MemoryProvider::new();
    let g = small_grid();
    let coll = collection("S2", vec![
        constant_image("a", Some(date(2024, 1, 1)), g, &[("NDVI", 0.2)]),
        constant_image("b", Some(date(2024, 2, 1)), g, &[("NDVI", 0.4)]),
    ]);
    let required = vec![("NDVI".to_string(), Statistic::Mean), ("NDVI".to_string(), Statistic::Percentile(50))];

    let prepared = composite(&provider, "s2", &coll, &required).unwrap();
    assert_eq!(prepared.len(), 2);

    let mean = prepared.iter().find(|p| p.statistic == Statistic::Mean).unwrap();
    assert_eq!(mean.band, "NDVI");
    assert_eq!(mean.source, "s2");
    let v = mean.raster.get(0, 0).unwrap();
    assert!((v - 0.3).abs() < 1e-12);
}

fn s2_definition() -> SourceDefinition {
    SourceDefinition::new("s2", SourceKind::TimeFilteredCollection, "S2", 10.0, ReductionPolicy::PointSample)
        .with_bands(&["B4", "B8", "SCL"])
        .with_temporal(TemporalFilter::DateRange { start: date(2024, 1, 1), end: date(2025, 1, 1) })
        .with_quality("SCL", &[8, 9])
        .with_derived("NDVI", Expression::normalized_difference("B8", "B4").unwrap())
        .with_output("NDVI_Mean", "NDVI", Statistic::Mean)
        .with_output("NDVI_Std", "NDVI", Statistic::StdDev)
}

#[test]
fn test_prepare_time_series_masks_before_compositing() {
    let g = small_grid();
    let provider = MemoryProvider::new().with_collection("S2", vec![
        constant_image("clear", Some(date(2024, 3, 1)), g, &[("B4", 0.25), ("B8", 0.75), ("SCL", 4.0)]),
        constant_image("cloud", Some(date(2024, 4, 1)), g, &[("B4", 0.1), ("B8", 0.9), ("SCL", 9.0)]),
        constant_image("old", Some(date(2023, 4, 1)), g, &[("B4", 0.5), ("B8", 0.5), ("SCL", 4.0)]),
    ]);
    let mut registry = SourceRegistry::new();
    registry.register_source(s2_definition()).unwrap();

    let prepared = Preprocessor::new(shared(provider)).prepare(&registry, None).unwrap();
    let source = &prepared.sources()[0];

    assert_eq!(source.rasters.len(), 2);
    assert_eq!(source.raster("NDVI", Statistic::Mean).unwrap().raster.get(0, 0), Some(0.5));
    assert_eq!(source.raster("NDVI", Statistic::StdDev).unwrap().raster.get(0, 0), Some(0.0));
}

#[test]
fn test_prepare_with_no_matching_images_yields_unavailable_rasters() {
    let provider = MemoryProvider::new().with_collection("S2", vec![
        constant_image("old", Some(date(2020, 4, 1)), small_grid(), &[("B4", 0.5), ("B8", 0.5), ("SCL", 4.0)]),
    ]);
    let mut registry = SourceRegistry::new();
    registry.register_source(s2_definition()).unwrap();

    let prepared = Preprocessor::new(shared(provider)).prepare(&registry, None).unwrap();
    let raster = &prepared.sources()[0].raster("NDVI", Statistic::Mean).unwrap().raster;
    assert_eq!(raster.valid_count(), 0);
}

#[test]
fn test_prepare_static_and_mosaic_sources() {
    let mut registry = SourceRegistry::new();
    registry.register_source(
        SourceDefinition::new("ramp", SourceKind::StaticRaster, "RAMP", 10.0, ReductionPolicy::PointSample)
            .with_bands(&["v"])
            .with_output("V", "v", Statistic::Value),
    ).unwrap();
    registry.register_source(
        SourceDefinition::new("dem", SourceKind::Mosaic, "DEM", 10.0, ReductionPolicy::RegionMean)
            .with_bands(&["DEM"])
            .with_output("Elevation", "DEM", Statistic::Mean),
    ).unwrap();

    let prepared = Preprocessor::new(shared(ramp_provider())).prepare(&registry, None).unwrap();
    assert_eq!(prepared.len(), 2);

    let dem = &prepared.sources()[1];
    let output = &dem.handle.outputs[0];
    let raster = dem.raster_for(output).unwrap();
    assert_eq!(raster.statistic, Statistic::Value);
    assert_eq!(raster.raster.get(0, 0), Some(250.0));
}

#[test]
fn test_missing_dataset_fails_only_its_source() {
    let mut registry = SourceRegistry::new();
    registry.register_source(
        SourceDefinition::new("bio", SourceKind::StaticRaster, "WORLDCLIM/V1/BIO", 30.0, ReductionPolicy::PointSample)
            .with_bands(&["bio01"])
            .with_output("T", "bio01", Statistic::Value),
    ).unwrap();
    registry.register_source(
        SourceDefinition::new("ramp", SourceKind::StaticRaster, "RAMP", 10.0, ReductionPolicy::PointSample)
            .with_bands(&["v"])
            .with_output("V", "v", Statistic::Value),
    ).unwrap();

    let prepared = Preprocessor::new(shared(ramp_provider())).prepare(&registry, None).unwrap();
    assert_eq!(prepared.len(), 2);

    let bio = &prepared.sources()[0];
    assert!(bio.is_failed());
    assert!(bio.rasters.is_empty());
    assert!(bio.failure.as_deref().unwrap().contains("Unknown image 'WORLDCLIM/V1/BIO'"));

    let ramp = &prepared.sources()[1];
    assert!(!ramp.is_failed());
    assert_eq!(ramp.rasters.len(), 1);
}

fn dem_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register_source(
        SourceDefinition::new("dem", SourceKind::Mosaic, "DEM", 10.0, ReductionPolicy::RegionMean)
            .with_bands(&["DEM"])
            .with_output("Elevation", "DEM", Statistic::Mean),
    ).unwrap();
    registry
}

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy { max_attempts, initial_backoff_ms: 1, max_backoff_ms: 2 }
}

#[test]
fn test_throttled_fetch_is_retried() {
    let provider = Arc::new(FlakyProvider::new(ramp_provider()).with_fetch_throttles(2));
    let prepared = Preprocessor::new(provider.clone())
        .with_retry(quick_retry(3))
        .prepare(&dem_registry(), None)
        .unwrap();

    let dem = &prepared.sources()[0];
    assert!(!dem.is_failed());
    assert_eq!(dem.rasters[0].raster.get(0, 0), Some(250.0));
    assert_eq!(provider.fetch_throttles.load(Ordering::SeqCst), 0);
}

#[test]
fn test_persistent_throttling_fails_the_source() {
    let provider = Arc::new(FlakyProvider::new(ramp_provider()).with_fetch_throttles(10));
    let prepared = Preprocessor::new(provider.clone())
        .with_retry(quick_retry(2))
        .prepare(&dem_registry(), None)
        .unwrap();

    let failure = prepared.sources()[0].failure.as_deref().unwrap();
    assert!(failure.contains("gave up after 2 attempt(s)"), "{}", failure);
    assert_eq!(provider.fetch_throttles.load(Ordering::SeqCst), 8);
}
