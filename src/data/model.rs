use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// FieldValue – a single cell in a candidate table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. Uploaded survey tables carry no fixed
/// schema, so every column is typed per cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Try to interpret the value as an `f64` for feature extraction.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single candidate measurement (one row of the source table).
/// Dynamic columns: column_name → value.
#[derive(Debug, Clone, Default)]
pub struct CandidateRecord {
    pub fields: BTreeMap<String, FieldValue>,
}

impl CandidateRecord {
    /// Numeric view of a column, if present and numeric.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.fields.get(column).and_then(FieldValue::as_f64)
    }

    /// Insert a derived column. Existing columns keep their value.
    pub fn insert_derived(&mut self, column: &str, value: f64) {
        self.fields
            .entry(column.to_string())
            .or_insert(FieldValue::Float(value));
    }
}

// ---------------------------------------------------------------------------
// CandidateTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with a pre-computed column index.
#[derive(Debug, Clone)]
pub struct CandidateTable {
    /// All candidate rows.
    pub records: Vec<CandidateRecord>,
    /// Ordered union of column names across all rows.
    pub column_names: Vec<String>,
}

impl CandidateTable {
    /// Build the column index from the loaded records.
    pub fn from_records(records: Vec<CandidateRecord>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        for rec in &records {
            for col in rec.fields.keys() {
                column_names_set.insert(col.clone());
            }
        }
        CandidateTable {
            records,
            column_names: column_names_set.into_iter().collect(),
        }
    }

    /// Number of candidate rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
