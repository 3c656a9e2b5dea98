use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// FieldValue – a single cell of a school record
// ---------------------------------------------------------------------------

/// A normalized cell value.
///
/// CSV cells always arrive as [`FieldValue::Text`]; JSON sources may also carry
/// numbers and booleans. Missing cells and JSON `null` are not represented at
/// all: the field is simply absent from the [`Record`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            // Integral numbers key the same way as their CSV spelling ("2020", not "2020.0").
            FieldValue::Number(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                write!(f, "{}", *v as i64)
            }
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl FieldValue {
    /// Build a value from a raw CSV cell. Blank cells are absent.
    pub fn from_cell(cell: &str) -> Option<FieldValue> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(FieldValue::Text(trimmed.to_string()))
        }
    }

    /// Interpret the value as a finite `f64`, if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            FieldValue::Number(v) => *v,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
            FieldValue::Bool(_) => return None,
        };
        v.is_finite().then_some(v)
    }
}

// ---------------------------------------------------------------------------
// Record – one school-year observation
// ---------------------------------------------------------------------------

/// One school-year observation: field name → value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor from `(field, text)` pairs. Blank texts are skipped.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut record = Record::new();
        for (field, text) in pairs {
            if let Some(value) = FieldValue::from_cell(text) {
                record.insert(field, value);
            }
        }
        record
    }

    pub fn insert(&mut self, field: impl Into<String>, value: FieldValue) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Field names present on this record, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Textual grouping key of a field. Blank text counts as absent.
    pub fn key(&self, field: &str) -> Option<String> {
        let text = self.get(field)?.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Numeric value of a field; absent or malformed values resolve to `0.0`.
    pub fn number(&self, field: &str) -> f64 {
        self.get(field).and_then(FieldValue::as_f64).unwrap_or(0.0)
    }

    /// Exact key equality against `expected`.
    pub fn key_equals(&self, field: &str, expected: &str) -> bool {
        self.key(field).is_some_and(|k| k == expected)
    }
}

// ---------------------------------------------------------------------------
// RecordSet – an ordered collection of records
// ---------------------------------------------------------------------------

/// Ordered records together with the ordered column list they were read with.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSet {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RecordSet {
    /// Build a set whose column list is the union of record fields. Columns
    /// appear in the order their first record lists them; a record lists its
    /// own fields sorted by name.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for name in record.field_names() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        RecordSet { columns, records }
    }

    /// Build a set with an explicit column order (e.g. a CSV header).
    pub fn with_columns(columns: Vec<String>, records: Vec<Record>) -> Self {
        RecordSet { columns, records }
    }

    /// A new set over `records` that keeps this set's column order.
    pub fn derive(&self, records: Vec<Record>) -> Self {
        RecordSet {
            columns: self.columns.clone(),
            records,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
