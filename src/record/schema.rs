use crate::raster::Statistic;
use crate::source::SourceHandle;

/// One output column: which source, band and statistic fill it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub source: String,
    pub band: String,
    pub statistic: Statistic,
}

/// Ordered list of output fields of a batch
///
/// Order is source registration order, then output declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    fields: Vec<FieldSpec>,
}

impl OutputSchema {
    pub fn from_sources(sources: &[SourceHandle]) -> Self {
        let fields = sources.iter()
            .flat_map(|source| {
                source.outputs.iter().map(move |output| FieldSpec {
                    name: output.field.clone(),
                    source: source.name.clone(),
                    band: output.band.clone(),
                    statistic: output.statistic,
                })
            })
            .collect();
        OutputSchema { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
