//! Column-position binding: flattening keyed rows into ordered tuples.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, Row, TaggedRows};
use crate::error::BatchError;

/// Bijective column-name → zero-based output position map.
///
/// Controls both the header ordering and the per-row flattening order of
/// tabular output. Positions are expected to be dense and unique for the
/// bound columns; a row key absent from the binding is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindPosition {
    positions: HashMap<String, usize>,
}

impl BindPosition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a column name to an output position.
    pub fn bind(mut self, column: impl Into<String>, position: usize) -> Self {
        self.positions.insert(column.into(), position);
        self
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Column names ordered by ascending position.
    pub fn header(&self) -> Vec<String> {
        let mut pairs: Vec<(usize, &String)> = self
            .positions
            .iter()
            .map(|(name, pos)| (*pos, name))
            .collect();
        pairs.sort_by_key(|(pos, _)| *pos);
        pairs.into_iter().map(|(_, name)| name.clone()).collect()
    }

    /// Flatten keyed rows into ordered tuples.
    ///
    /// Each value lands at its bound position and the tuple is emitted in
    /// ascending position order. Positions not covered by a row's keys are
    /// left absent; callers are expected to supply complete rows.
    pub fn flatten_rows(&self, rows: &[Row]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| {
                let mut cells: Vec<(usize, &String)> = row
                    .iter()
                    .filter_map(|(name, value)| {
                        self.positions.get(name).map(|pos| (*pos, value))
                    })
                    .collect();
                cells.sort_by_key(|(pos, _)| *pos);
                cells.into_iter().map(|(_, value)| value.clone()).collect()
            })
            .collect()
    }

    /// Resolve tagged records into keyed rows, then flatten them.
    pub fn flatten_tagged(&self, tagged: &TaggedRows) -> Vec<Vec<String>> {
        self.flatten_rows(&tagged.resolve())
    }

    /// Consumer-boundary dispatch over the chunk variants.
    ///
    /// Any shape outside the two tabular variants is an explicit error, never
    /// silently dropped.
    pub fn flatten_chunk(&self, chunk: &Chunk) -> Result<Vec<Vec<String>>, BatchError> {
        match chunk {
            Chunk::Rows(rows) => Ok(self.flatten_rows(rows)),
            Chunk::Tagged(tagged) => Ok(self.flatten_tagged(tagged)),
            other => Err(BatchError::UnsupportedChunk(other.shape().to_string())),
        }
    }
}

impl From<HashMap<String, usize>> for BindPosition {
    fn from(positions: HashMap<String, usize>) -> Self {
        Self { positions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_binding() -> BindPosition {
        BindPosition::new().bind("name", 0).bind("id", 1)
    }

    fn sample_row() -> Row {
        Row::from([
            ("id".to_string(), "7".to_string()),
            ("name".to_string(), "bob".to_string()),
        ])
    }

    #[test]
    fn header_inverts_the_binding() {
        assert_eq!(sample_binding().header(), vec!["name", "id"]);
    }

    #[test]
    fn flatten_is_left_inverse_of_binding() {
        let flat = sample_binding().flatten_rows(&[sample_row()]);
        assert_eq!(flat, vec![vec!["bob".to_string(), "7".to_string()]]);
    }

    #[test]
    fn unbound_keys_are_skipped() {
        let mut row = sample_row();
        row.insert("extra".to_string(), "x".to_string());

        let flat = sample_binding().flatten_rows(&[row]);
        assert_eq!(flat, vec![vec!["bob".to_string(), "7".to_string()]]);
    }

    #[test]
    fn missing_keys_leave_positions_absent() {
        let row = Row::from([("id".to_string(), "7".to_string())]);
        let flat = sample_binding().flatten_rows(&[row]);
        assert_eq!(flat, vec![vec!["7".to_string()]]);
    }

    #[test]
    fn flatten_tagged_resolves_first() {
        let mut tagged = TaggedRows::new(vec!["id".to_string(), "name".to_string()]);
        tagged.push(vec!["7".to_string(), "bob".to_string()]);

        let flat = sample_binding().flatten_tagged(&tagged);
        assert_eq!(flat, vec![vec!["bob".to_string(), "7".to_string()]]);
    }

    #[test]
    fn flatten_chunk_accepts_tabular_shapes() {
        let binding = sample_binding();
        let rows = Chunk::Rows(vec![sample_row()]);
        assert!(binding.flatten_chunk(&rows).is_ok());

        let tagged = Chunk::Tagged(TaggedRows::new(vec!["id".to_string()]));
        assert!(binding.flatten_chunk(&tagged).is_ok());
    }

    #[test]
    fn flatten_chunk_rejects_text() {
        let err = sample_binding()
            .flatten_chunk(&Chunk::Text("echo".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "Not supported such a chunk type: text");
    }
}
