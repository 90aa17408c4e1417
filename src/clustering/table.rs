// Cluster membership table
// One row per detected fragment type, as emitted by the clustering routine

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Invalid cluster row {row}: {reason}")]
    InvalidClusterRow { row: usize, reason: String },

    #[error("Note index {idx} is outside a sequence of {size} notes")]
    IndexOutOfRange { idx: usize, size: usize },

    #[error("Malformed cluster table: {0}")]
    Json(#[from] serde_json::Error),
}

/// One fragment type: where it occurs and how far to widen each occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRow {
    /// Representative note index of every occurrence, in detection order
    pub idxs: Vec<usize>,

    /// Notes to include before each representative index
    pub left_shift: usize,

    /// Notes to include after each representative index
    pub right_shift: usize,
}

/// Row shape accepted on input; `n_variants` is optional and cross-checked,
/// other columns are ignored
#[derive(Debug, Deserialize)]
struct RawClusterRow {
    idxs: Vec<usize>,
    left_shift: usize,
    right_shift: usize,
    #[serde(default)]
    n_variants: Option<usize>,
}

impl ClusterRow {
    pub fn new(idxs: Vec<usize>, left_shift: usize, right_shift: usize) -> Self {
        ClusterRow {
            idxs,
            left_shift,
            right_shift,
        }
    }

    /// Number of detected occurrences
    pub fn n_variants(&self) -> usize {
        self.idxs.len()
    }
}

/// Ordered collection of cluster rows
///
/// Row order is the order the clustering routine emitted them and is
/// preserved by every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterTable {
    rows: Vec<ClusterRow>,
}

impl ClusterTable {
    pub fn new(rows: Vec<ClusterRow>) -> Self {
        ClusterTable { rows }
    }

    pub fn rows(&self) -> &[ClusterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClusterRow> {
        self.rows.iter()
    }

    /// Parse a table from JSON text
    ///
    /// Accepts either an array of row objects (records layout) or a single
    /// object of equal-length columns (`idxs`, `left_shift`, `right_shift`,
    /// optionally `n_variants`). Any malformed row fails the whole table.
    pub fn from_json(text: &str) -> Result<Self, ClusterError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Parse a table from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, ClusterError> {
        let records = match value {
            Value::Array(records) => records,
            Value::Object(columns) => columns_to_records(columns)?,
            other => {
                return Err(ClusterError::InvalidClusterRow {
                    row: 0,
                    reason: format!("expected an array or an object of columns, got {}", other),
                })
            }
        };

        let rows = records
            .into_iter()
            .enumerate()
            .map(|(row, record)| parse_row(row, record))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ClusterTable { rows })
    }
}

impl From<Vec<ClusterRow>> for ClusterTable {
    fn from(rows: Vec<ClusterRow>) -> Self {
        ClusterTable::new(rows)
    }
}

impl<'a> IntoIterator for &'a ClusterTable {
    type Item = &'a ClusterRow;
    type IntoIter = std::slice::Iter<'a, ClusterRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn parse_row(row: usize, record: Value) -> Result<ClusterRow, ClusterError> {
    let raw: RawClusterRow =
        serde_json::from_value(record).map_err(|e| ClusterError::InvalidClusterRow {
            row,
            reason: e.to_string(),
        })?;

    if let Some(n_variants) = raw.n_variants {
        if n_variants != raw.idxs.len() {
            return Err(ClusterError::InvalidClusterRow {
                row,
                reason: format!(
                    "n_variants is {} but idxs holds {} indices",
                    n_variants,
                    raw.idxs.len()
                ),
            });
        }
    }

    Ok(ClusterRow::new(raw.idxs, raw.left_shift, raw.right_shift))
}

/// Transpose a column layout into per-row objects
fn columns_to_records(
    columns: serde_json::Map<String, Value>,
) -> Result<Vec<Value>, ClusterError> {
    let mut row_count: Option<usize> = None;
    let mut split: Vec<(String, Vec<Value>)> = Vec::with_capacity(columns.len());

    for (name, column) in columns {
        let Value::Array(cells) = column else {
            return Err(ClusterError::InvalidClusterRow {
                row: 0,
                reason: format!("column '{}' is not an array", name),
            });
        };

        match row_count {
            None => row_count = Some(cells.len()),
            Some(expected) if expected != cells.len() => {
                return Err(ClusterError::InvalidClusterRow {
                    row: expected.min(cells.len()),
                    reason: format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        cells.len(),
                        expected
                    ),
                });
            }
            Some(_) => {}
        }

        split.push((name, cells));
    }

    let row_count = row_count.unwrap_or(0);
    let mut records: Vec<serde_json::Map<String, Value>> =
        (0..row_count).map(|_| serde_json::Map::new()).collect();

    for (name, cells) in split {
        for (record, cell) in records.iter_mut().zip(cells) {
            record.insert(name.clone(), cell);
        }
    }

    Ok(records.into_iter().map(Value::Object).collect())
}
