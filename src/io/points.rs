//! Readers for input point sets
//!
//! Two formats are understood: GeoJSON feature collections with Point or
//! Polygon geometries, and CSV files with `x`/`y` columns.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use csv::ReaderBuilder;
use log::{debug, info};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::coordinate::{Geometry, Point};
use crate::errors::{ExtractError, ExtractResult};
use crate::record::{FeaturePoint, ID_COLUMN};

/// Supported point file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointFormat {
    GeoJson,
    Csv,
}

impl PointFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> ExtractResult<Self> {
        let ext = path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "geojson" | "json" => Ok(PointFormat::GeoJson),
            "csv" => Ok(PointFormat::Csv),
            _ => Err(ExtractError::GenericError(format!(
                "Cannot tell the format of '{}'; use .geojson, .json or .csv", path.display()
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    geometry: Option<GeometryJson>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeometryJson {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
}

/// Reads point sets, resolving identifiers from a configurable property
#[derive(Debug, Clone, Default)]
pub struct PointReader {
    id_property: Option<String>,
}

impl PointReader {
    /// `id_property` names the attribute holding point identifiers
    pub fn new(id_property: Option<&str>) -> Self {
        PointReader { id_property: id_property.map(str::to_string) }
    }

    /// Read a point file, choosing the format from its extension
    pub fn read_file<P: AsRef<Path>>(&self, path: P) -> ExtractResult<Vec<FeaturePoint>> {
        let path = path.as_ref();
        let format = PointFormat::from_path(path)?;
        let file = File::open(path)?;

        let points = match format {
            PointFormat::GeoJson => self.read_geojson(file)?,
            PointFormat::Csv => self.read_csv(file)?,
        };

        info!("Read {} point(s) from {}", points.len(), path.display());
        Ok(points)
    }

    /// Read a GeoJSON FeatureCollection
    ///
    /// Identifiers come from the id property, then the feature `id`, then
    /// the feature's position. Properties are kept as attributes, except an
    /// `id` property that supplied the identifier.
    pub fn read_geojson<R: Read>(&self, reader: R) -> ExtractResult<Vec<FeaturePoint>> {
        let collection: FeatureCollection = serde_json::from_reader(reader)?;

        collection.features.into_iter()
            .enumerate()
            .map(|(index, feature)| {
                let geometry = match feature.geometry {
                    Some(g) => convert_geometry(g).map_err(|e| {
                        ExtractError::GenericError(format!("Feature {}: {}", index, e))
                    })?,
                    None => {
                        return Err(ExtractError::GenericError(format!("Feature {} has no geometry", index)));
                    }
                };

                let mut attributes: Vec<(String, Value)> = feature.properties.unwrap_or_default().into_iter().collect();

                let from_property = self.id_property.as_ref()
                    .and_then(|prop| attributes.iter().find(|(k, _)| k == prop))
                    .and_then(|(_, v)| value_to_id(v));
                if from_property.is_some() && self.id_property.as_deref() == Some(ID_COLUMN) {
                    attributes.retain(|(k, _)| k != ID_COLUMN);
                }

                let id = from_property
                    .or_else(|| feature.id.as_ref().and_then(value_to_id))
                    .unwrap_or_else(|| index.to_string());

                Ok(FeaturePoint { id, geometry, attributes })
            })
            .collect()
    }

    /// Read a CSV file with `x` and `y` columns
    ///
    /// The identifier column is the id property if given, otherwise `id`;
    /// without one, row positions are used. Other columns become text
    /// attributes, empty cells become null. An identifier column named `id`
    /// is not repeated as an attribute.
    pub fn read_csv<R: Read>(&self, reader: R) -> ExtractResult<Vec<FeaturePoint>> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers()?.clone();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let x_col = column("x").ok_or_else(|| ExtractError::GenericError("CSV points need an 'x' column".to_string()))?;
        let y_col = column("y").ok_or_else(|| ExtractError::GenericError("CSV points need a 'y' column".to_string()))?;
        let id_col = column(self.id_property.as_deref().unwrap_or(ID_COLUMN));

        debug!("CSV point columns: x={}, y={}, id={:?}", x_col, y_col, id_col);

        let mut points = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let coordinate = |col: usize, axis: &str| -> ExtractResult<f64> {
                let cell = row.get(col).unwrap_or_default();
                cell.parse::<f64>().map_err(|_| {
                    ExtractError::GenericError(format!("Row {}: invalid {} coordinate '{}'", index + 1, axis, cell))
                })
            };
            let location = Point::new(coordinate(x_col, "x")?, coordinate(y_col, "y")?);

            let id = id_col.and_then(|c| row.get(c))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());

            let attributes = headers.iter()
                .zip(row.iter())
                .enumerate()
                .filter(|(col, (name, _))| {
                    *col != x_col && *col != y_col && !(id_col == Some(*col) && *name == ID_COLUMN)
                })
                .map(|(_, (name, cell))| {
                    let value = if cell.is_empty() { Value::Null } else { Value::String(cell.to_string()) };
                    (name.to_string(), value)
                })
                .collect();

            points.push(FeaturePoint { id, geometry: Geometry::Point(location), attributes });
        }

        Ok(points)
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_point(coords: &[f64]) -> Result<Point, String> {
    match coords {
        [x, y, ..] => Ok(Point::new(*x, *y)),
        _ => Err(format!("position needs two coordinates, got {}", coords.len())),
    }
}

fn convert_geometry(geometry: GeometryJson) -> Result<Geometry, String> {
    match geometry {
        GeometryJson::Point { coordinates } => Ok(Geometry::Point(to_point(&coordinates)?)),
        GeometryJson::Polygon { coordinates } => {
            let outer = coordinates.first().ok_or_else(|| "polygon has no rings".to_string())?;
            let ring = outer.iter()
                .map(|c| to_point(c))
                .collect::<Result<Vec<Point>, String>>()?;
            Ok(Geometry::Polygon(ring))
        }
    }
}
