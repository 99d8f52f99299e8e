use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::data::schema::Schema;
use crate::error::SchemaViolation;

// ---------------------------------------------------------------------------
// FieldValue – a single typed cell of a validated record
// ---------------------------------------------------------------------------

/// A validated cell value. Only these three shapes exist downstream of the
/// schema validator; no component past the loader handles untyped data.
/// `Ord` so values can live in `BTreeSet`s (filter sets, unique-value index).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    Integer(i64),
    Bool(bool),
    Categorical(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            FieldValue::Categorical(s) => write!(f, "{s}"),
        }
    }
}

impl FieldValue {
    /// Interpret the value as an integer, for range predicates.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one validated row
// ---------------------------------------------------------------------------

/// One validated patient row. Constructed only by [`Schema::validate`]; the
/// row id is assigned at load time and is stable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    row_id: usize,
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub(crate) fn new(row_id: usize, values: BTreeMap<String, FieldValue>) -> Self {
        Self { row_id, values }
    }

    pub fn row_id(&self) -> usize {
        self.row_id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Field name → value pairs in canonical (sorted) order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete validated table
// ---------------------------------------------------------------------------

/// A row that failed validation during a tolerant load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based index of the row in the source (header excluded).
    pub source_index: usize,
    pub violation: SchemaViolation,
}

/// The full validated dataset: an ordered, immutable sequence of records plus
/// the schema they were validated against. Records are `Arc`-shared so
/// filtered views and query results reference the same rows without copying.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<Arc<Record>>,
    schema: Schema,
    /// For each column the sorted set of values actually present, the data a
    /// presentation layer needs to populate its filter widgets.
    unique_values: BTreeMap<String, BTreeSet<FieldValue>>,
    /// Rows excluded by a tolerant load, with why.
    skipped: Vec<SkippedRow>,
}

impl Dataset {
    /// Build the dataset and its unique-value index from validated records.
    pub(crate) fn new(records: Vec<Arc<Record>>, schema: Schema, skipped: Vec<SkippedRow>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<FieldValue>> = BTreeMap::new();
        for rec in &records {
            for (col, val) in rec.fields() {
                unique_values
                    .entry(col.to_string())
                    .or_default()
                    .insert(val.clone());
            }
        }
        Dataset {
            records,
            schema,
            unique_values,
            skipped,
        }
    }

    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn unique_values(&self, field: &str) -> Option<&BTreeSet<FieldValue>> {
        self.unique_values.get(field)
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count the distinct values of `field` over the given row indices.
    /// Indices outside the dataset are ignored. This is the aggregation
    /// behind the explorer's distribution charts.
    pub fn value_counts(&self, field: &str, indices: &[usize]) -> BTreeMap<FieldValue, usize> {
        let mut counts = BTreeMap::new();
        for &i in indices {
            let Some(rec) = self.records.get(i) else {
                continue;
            };
            if let Some(val) = rec.get(field) {
                *counts.entry(val.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
