//! End-to-end extraction with the bundled workflow

use std::fs;
use std::io::Write;
use std::sync::Arc;
use chrono::NaiveDate;
use serde_json::json;

use featurekit::config::presets::{default_workflow, DEFAULT_WORKFLOW_TOML};
use featurekit::config::PipelineConfig;
use featurekit::io::write_table;
use featurekit::raster::{GridSpec, Image, Raster};
use featurekit::batch::BatchOptions;
use featurekit::raster::Statistic;
use featurekit::{
    BatchStatus, CoordinateSystem, FeatureKit, FeaturePoint, GeoProvider, Geometry, MemoryProvider, Point,
    ReductionPolicy, SourceDefinition, SourceKind, SourceRegistry,
};

const UTM: CoordinateSystem = CoordinateSystem::UTM(32, true);

fn grid(x: f64, pixel: f64, width: u32, height: u32) -> GridSpec {
    GridSpec::new(x, 10_000.0, pixel, pixel, width, height, UTM)
}

fn constant_image(id: &str, date: Option<NaiveDate>, grid: GridSpec, bands: &[(&str, f64)]) -> Image {
    bands.iter().fold(Image::new(id, date), |img, (name, value)| {
        let raster = Raster::from_values(grid, vec![*value; grid.len()], None).unwrap();
        img.with_band(name, raster)
    })
}

fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn s2_scene(id: &str, date: Option<NaiveDate>, cloud: f64, b8: f64, b4: f64, scl: f64) -> Image {
    constant_image(id, date, grid(0.0, 100.0, 100, 100),
                   &[("B2", 0.05), ("B4", b4), ("B8", b8), ("SCL", scl)])
        .with_property("CLOUDY_PIXEL_PERCENTAGE", cloud)
}

/// Datasets of the bundled workflow over a 10 km square
///
/// The DEM only covers x < 5000. MODIS GPP averages 300 over 2020-2024,
/// NPP half of that. Three clear 2024 Sentinel-2 scenes give NDVI 0.5,
/// 0.75 and 0.25; the masked, cloudy and 2023 scenes would give 0.8.
fn provider() -> MemoryProvider {
    let bio: Vec<(String, f64)> = (1..=19).map(|i| (format!("bio{:02}", i), i as f64 * 10.0)).collect();
    let bio_refs: Vec<(&str, f64)> = bio.iter().map(|(n, v)| (n.as_str(), *v)).collect();
    let worldclim = constant_image("WORLDCLIM/V1/BIO", None, grid(0.0, 1000.0, 10, 10), &bio_refs);

    let dem = vec![
        constant_image("dem_west", None, grid(0.0, 50.0, 50, 200), &[("DEM", 250.0)]),
        constant_image("dem_east", None, grid(2500.0, 50.0, 50, 200), &[("DEM", 250.0)]),
    ];

    let gpp = [(2019, 1000.0), (2020, 100.0), (2021, 200.0), (2022, 300.0), (2023, 400.0), (2024, 500.0), (2025, 9999.0)];
    let modis = gpp.iter()
        .map(|(year, v)| constant_image(&format!("modis_{}", year), ymd(*year, 1, 1), grid(0.0, 500.0, 20, 20),
                                        &[("Gpp", *v), ("Npp", v / 2.0)]))
        .collect();

    let s2 = vec![
        s2_scene("s2_a", ymd(2024, 3, 1), 10.0, 0.6, 0.2, 4.0),
        s2_scene("s2_b", ymd(2024, 6, 1), 5.0, 0.7, 0.1, 4.0),
        s2_scene("s2_c", ymd(2024, 9, 1), 20.0, 0.5, 0.3, 4.0),
        s2_scene("s2_shadow", ymd(2024, 7, 1), 10.0, 0.9, 0.1, 9.0),
        s2_scene("s2_cloudy", ymd(2024, 8, 1), 80.0, 0.9, 0.1, 4.0),
        s2_scene("s2_old", ymd(2023, 6, 1), 10.0, 0.9, 0.1, 4.0),
    ];

    MemoryProvider::new()
        .with_image("WORLDCLIM/V1/BIO", worldclim)
        .with_collection("COPERNICUS/DEM/GLO30", dem)
        .with_collection("MODIS/061/MOD17A3HGF", modis)
        .with_collection("COPERNICUS/S2_SR_HARMONIZED", s2)
}

fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::Polygon(vec![
        Point::new(x, y),
        Point::new(x + size, y),
        Point::new(x + size, y + size),
        Point::new(x, y + size),
        Point::new(x, y),
    ])
}

fn points() -> Vec<FeaturePoint> {
    vec![
        FeaturePoint::new("P1", square(1150.0, 5150.0, 200.0)).with_attribute("LC", json!("forest")),
        FeaturePoint::new("P2", square(7150.0, 5150.0, 200.0))
            .with_attribute("LC", json!("crop"))
            .with_attribute("Elevation", json!(512)),
        FeaturePoint::new("P3", Geometry::Point(Point::new(3000.0, 3000.0))).with_attribute("LC", json!("grass")),
    ]
}

fn kit(workers: usize) -> FeatureKit {
    let provider: Arc<dyn GeoProvider> = Arc::new(provider());
    FeatureKit::from_config(provider, &default_workflow().unwrap())
        .unwrap()
        .with_workers(workers)
}

fn assert_close(actual: Option<f64>, expected: f64) {
    match actual {
        Some(v) => assert!((v - expected).abs() < 1e-9, "expected {}, got {}", expected, v),
        None => panic!("expected {}, got null", expected),
    }
}

fn evi(b8: f64, b4: f64) -> f64 {
    2.5 * ((b8 - b4) / (b8 + 6.0 * b4 - 7.5 * 0.05 + 1.0))
}

#[test]
fn test_bundled_workflow_end_to_end() {
    let kit = kit(2);
    let schema = kit.schema();
    let outcome = kit.extract(&points()).unwrap();

    assert_eq!(outcome.status, BatchStatus::Completed);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.table.len(), 3);

    let ids: Vec<&str> = outcome.table.records.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["P1", "P2", "P3"]);

    let header = outcome.table.header();
    assert_eq!(header.len(), 2 + 32);
    assert_eq!(&header[..3], &["id", "LC", "Annual_Mean_Temperature"]);

    let p1 = &outcome.table.records[0];
    let field = |record: &featurekit::Record, name: &str| record.field(&schema, name);

    assert_close(field(p1, "Annual_Mean_Temperature"), 10.0);
    assert_close(field(p1, "Precipitation_of_Coldest_Quarter"), 190.0);
    assert_close(field(p1, "Elevation"), 250.0);
    assert_close(field(p1, "GPP_mean_2020-2024"), 300.0);
    assert_close(field(p1, "NPP_mean_2020-2024"), 150.0);

    assert_close(field(p1, "NDVI_Mean"), 0.5);
    assert_close(field(p1, "NDVI_Std"), (0.125f64 / 3.0).sqrt());
    assert_close(field(p1, "NDVI_Q1"), 0.375);
    assert_close(field(p1, "NDVI_Q2"), 0.5);
    assert_close(field(p1, "NDVI_Q3"), 0.625);
    assert_close(field(p1, "EVI_Mean"), (evi(0.6, 0.2) + evi(0.7, 0.1) + evi(0.5, 0.3)) / 3.0);

    // Outside the DEM: elevation is null, the rest is populated
    let p2 = &outcome.table.records[1];
    assert_eq!(field(p2, "Elevation"), None);
    assert_close(field(p2, "GPP_mean_2020-2024"), 300.0);
    assert_close(field(p2, "NDVI_Q2"), 0.5);

    // A bare point has no footprint for regional sources
    let p3 = &outcome.table.records[2];
    assert_eq!(field(p3, "Elevation"), None);
    assert_eq!(field(p3, "GPP_mean_2020-2024"), None);
    assert_eq!(field(p3, "NPP_mean_2020-2024"), None);
    assert_close(field(p3, "Temperature_Seasonality"), 40.0);
    assert_close(field(p3, "NDVI_Mean"), 0.5);

    let rows: Vec<Vec<String>> = outcome.table.rows().collect();
    let elevation = header.iter().position(|h| h == "Elevation").unwrap();
    assert_eq!(rows[0][elevation], "250");
    // Null elevation keeps the input attribute of the same name
    assert_eq!(rows[1][elevation], "512");
    assert_eq!(rows[2][elevation], "");
}

#[test]
fn test_output_is_deterministic() {
    let render = |workers: usize| {
        let outcome = kit(workers).extract(&points()).unwrap();
        let mut out = Vec::new();
        write_table(&outcome.table, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    };

    let first = render(1);
    assert_eq!(first, render(1));
    assert_eq!(first, render(4));
}

#[test]
fn test_extract_file() {
    let dir = tempfile::tempdir().unwrap();
    let points_path = dir.path().join("points.geojson");
    let output_path = dir.path().join("features.csv");
    let failures_path = dir.path().join("failures.csv");

    let collection = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "id": "north",
              "geometry": { "type": "Polygon",
                            "coordinates": [[[1150, 5150], [1350, 5150], [1350, 5350], [1150, 5350], [1150, 5150]]] },
              "properties": { "LC": "forest" } },
            { "type": "Feature", "id": "south",
              "geometry": { "type": "Point", "coordinates": [3000, 3000] },
              "properties": { "LC": "grass" } }
        ]
    });
    let mut file = fs::File::create(&points_path).unwrap();
    write!(file, "{}", collection).unwrap();
    drop(file);

    let outcome = kit(0).extract_file(&points_path, &output_path, Some(&failures_path)).unwrap();
    assert!(outcome.is_complete());

    let csv = fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("id,LC,Annual_Mean_Temperature,"));
    assert!(lines[1].starts_with("north,forest,10,"));
    assert!(lines[2].starts_with("south,grass,10,"));

    assert_eq!(fs::read_to_string(&failures_path).unwrap(), "index,id,cause\n");
}

#[test]
fn test_unavailable_dataset_only_nulls_its_fields() {
    let mut registry = SourceRegistry::new();
    registry.register_source(
        SourceDefinition::new("worldclim", SourceKind::StaticRaster, "WORLDCLIM/V1/BIO", 1000.0,
                              ReductionPolicy::PointSample)
            .with_bands(&["bio01"])
            .with_output("Annual_Mean_Temperature", "bio01", Statistic::Value),
    ).unwrap();
    registry.register_source(
        SourceDefinition::new("soil", SourceKind::StaticRaster, "SOILGRIDS/NOT_LOADED", 250.0,
                              ReductionPolicy::PointSample)
            .with_bands(&["clay"])
            .with_output("Clay", "clay", Statistic::Value),
    ).unwrap();

    let kit = FeatureKit::new(Arc::new(provider()), registry, BatchOptions::default());
    let schema = kit.schema();
    let outcome = kit.extract(&points()).unwrap();

    assert_eq!(outcome.status, BatchStatus::Completed);
    assert!(outcome.failures.is_empty());
    for record in &outcome.table.records {
        assert_close(record.field(&schema, "Annual_Mean_Temperature"), 10.0);
        assert_eq!(record.field(&schema, "Clay"), None);
    }
}

#[test]
fn test_buffered_workflow_gives_points_regional_values() {
    let text = DEFAULT_WORKFLOW_TOML.replace("# buffer = ", "buffer = ");
    let config = PipelineConfig::from_str(&text).unwrap();
    let registry = config.to_registry().unwrap();
    assert_eq!(registry.get("dem").unwrap().buffer_m, Some(30.0));
    assert_eq!(registry.get("terranet").unwrap().buffer_m, Some(500.0));

    let kit = FeatureKit::from_config(Arc::new(provider()), &config).unwrap();
    let schema = kit.schema();
    let outcome = kit.extract(&points()).unwrap();

    let p3 = &outcome.table.records[2];
    assert_close(p3.field(&schema, "Elevation"), 250.0);
    assert_close(p3.field(&schema, "GPP_mean_2020-2024"), 300.0);
    assert_close(p3.field(&schema, "NPP_mean_2020-2024"), 150.0);
    // Buffers only widen the footprint, P2 is still outside the DEM
    assert_eq!(outcome.table.records[1].field(&schema, "Elevation"), None);
}
