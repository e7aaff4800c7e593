use std::sync::Arc;
use serde_json::Value;

use super::merger::Record;
use super::schema::OutputSchema;

/// Name of the identifier column
pub const ID_COLUMN: &str = "id";

/// Header of an input attribute that is itself named `id`
pub const ID_ATTRIBUTE_COLUMN: &str = "id_attribute";

/// Extraction output: one record per input point, in input order
#[derive(Debug, Clone)]
pub struct Table {
    pub schema: Arc<OutputSchema>,
    /// Input attribute names in first-seen order, without field names
    ///
    /// An attribute named `id` is kept here; [`Table::header`] writes it
    /// as `id_attribute` next to the identifier column.
    pub attribute_columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(schema: Arc<OutputSchema>, records: Vec<Record>) -> Self {
        let mut attribute_columns: Vec<String> = Vec::new();
        for record in &records {
            for (name, _) in &record.point.attributes {
                if schema.index_of(name).is_some() {
                    continue;
                }
                if !attribute_columns.contains(name) {
                    attribute_columns.push(name.clone());
                }
            }
        }

        Table { schema, attribute_columns, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column names: id, attributes, then schema fields
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![ID_COLUMN.to_string()];
        header.extend(self.attribute_columns.iter().map(|name| {
            if name == ID_COLUMN { ID_ATTRIBUTE_COLUMN.to_string() } else { name.clone() }
        }));
        header.extend(self.schema.names().map(str::to_string));
        header
    }

    /// Cells of one record as text; null is the empty string
    ///
    /// A field that shares its name with an input attribute shows the
    /// extracted value, and falls back to the attribute when the value is
    /// null.
    pub fn row(&self, record: &Record) -> Vec<String> {
        let mut row = Vec::with_capacity(1 + self.attribute_columns.len() + self.schema.len());
        row.push(record.point.id.clone());

        for column in &self.attribute_columns {
            row.push(record.point.attribute(column).map(format_attribute).unwrap_or_default());
        }

        for (idx, field) in self.schema.fields().iter().enumerate() {
            let cell = match record.value(idx) {
                Some(v) => format_value(v),
                None => record.point.attribute(&field.name).map(format_attribute).unwrap_or_default(),
            };
            row.push(cell);
        }

        row
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.records.iter().map(move |r| self.row(r))
    }
}

fn format_value(value: f64) -> String {
    format!("{}", value)
}

fn format_attribute(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
