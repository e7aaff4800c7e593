use serde_json::Value;

use crate::coordinate::Geometry;

/// An input point: identifier, geometry and the attributes carried through
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePoint {
    pub id: String,
    pub geometry: Geometry,
    /// Input attributes in input order
    pub attributes: Vec<(String, Value)>,
}

impl FeaturePoint {
    pub fn new(id: &str, geometry: Geometry) -> Self {
        FeaturePoint {
            id: id.to_string(),
            geometry,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.push((name.to_string(), value));
        self
    }

    /// Attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}
