//! Row and chunk shapes exchanged between producers and consumers.

use std::collections::HashMap;

/// A single record: column name → string value. Keys are unique and
/// case-sensitive.
pub type Row = HashMap<String, String>;

/// An opaque batch handed from a producer to a consumer.
///
/// The variants are sealed here so consumers can match exhaustively and
/// reject shapes they do not understand instead of silently dropping data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Generic row set keyed by column name.
    Rows(Vec<Row>),
    /// Records carrying a declarative field→column association.
    Tagged(TaggedRows),
    /// Opaque text payload. Tabular consumers reject this shape.
    Text(String),
}

impl Chunk {
    /// Variant name used in unsupported-shape error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Chunk::Rows(_) => "row set",
            Chunk::Tagged(_) => "tagged row set",
            Chunk::Text(_) => "text",
        }
    }
}

/// Positional records plus the column names their positions stand for.
///
/// `columns[i]` names the column of element `i` in every record. This is the
/// caller-supplied association table that stands in for per-record field
/// introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedRows {
    pub columns: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl TaggedRows {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Vec<String>) {
        self.records.push(record);
    }

    /// Resolve every record into an equivalent keyed row.
    pub fn resolve(&self) -> Vec<Row> {
        self.records
            .iter()
            .map(|record| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(record.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_names() {
        assert_eq!(Chunk::Rows(vec![]).shape(), "row set");
        assert_eq!(Chunk::Tagged(TaggedRows::default()).shape(), "tagged row set");
        assert_eq!(Chunk::Text("echo".to_string()).shape(), "text");
    }

    #[test]
    fn tagged_rows_resolve_to_keyed_rows() {
        let mut tagged = TaggedRows::new(vec!["id".to_string(), "name".to_string()]);
        tagged.push(vec!["7".to_string(), "bob".to_string()]);

        let rows = tagged.resolve();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "7");
        assert_eq!(rows[0]["name"], "bob");
    }

    #[test]
    fn tagged_rows_short_record_yields_partial_row() {
        let mut tagged = TaggedRows::new(vec!["a".to_string(), "b".to_string()]);
        tagged.push(vec!["1".to_string()]);

        let rows = tagged.resolve();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["a"], "1");
    }
}
