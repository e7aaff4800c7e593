use std::sync::Arc;
use log::trace;

use crate::reducer::{ReductionResult, StatKey};
use super::point::FeaturePoint;
use super::schema::OutputSchema;

/// Output row for one input point
///
/// `values` is `None` when extraction of the point failed as a whole; the
/// point is still emitted with its attributes and every field null.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub point: FeaturePoint,
    pub values: Option<Vec<Option<f64>>>,
}

impl Record {
    /// Row for a point whose extraction failed
    pub fn failed(point: FeaturePoint) -> Self {
        Record { point, values: None }
    }

    pub fn id(&self) -> &str {
        &self.point.id
    }

    pub fn is_extracted(&self) -> bool {
        self.values.is_some()
    }

    /// Value of the field at `index` in the schema
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.as_ref().and_then(|v| v.get(index).copied().flatten())
    }

    /// Value of a field by name
    pub fn field(&self, schema: &OutputSchema, name: &str) -> Option<f64> {
        schema.index_of(name).and_then(|idx| self.value(idx))
    }
}

/// Combines per-source results into one record per point
#[derive(Debug, Clone)]
pub struct RecordMerger {
    schema: Arc<OutputSchema>,
}

impl RecordMerger {
    pub fn new(schema: Arc<OutputSchema>) -> Self {
        RecordMerger { schema }
    }

    pub fn schema(&self) -> &Arc<OutputSchema> {
        &self.schema
    }

    /// Every schema field gets exactly one value; fields without a matching
    /// result are null
    pub fn merge(&self, point: &FeaturePoint, results: &[ReductionResult]) -> Record {
        let values = self.schema.fields().iter()
            .map(|field| {
                results.iter()
                    .find(|r| r.source == field.source)
                    .and_then(|r| r.get(&StatKey::new(&field.band, field.statistic)).value())
            })
            .collect::<Vec<_>>();

        trace!("Merged point '{}': {} of {} field(s) set", point.id,
               values.iter().filter(|v| v.is_some()).count(), values.len());

        Record { point: point.clone(), values: Some(values) }
    }
}
