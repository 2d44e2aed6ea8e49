use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cell values
// ---------------------------------------------------------------------------

/// A single scalar cell. Serializes as JSON `null`, number, or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Strict equality for match flags: null never equals anything, numbers
    /// compare numerically, text compares exactly, mixed kinds never match.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Column type as inferred from the values it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Text,
    Unknown,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered header plus rows of values, one value per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, values: Vec<Value>) -> Result<(), ReconError> {
        if values.len() != self.columns.len() {
            return Err(ReconError::RowWidth {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(values);
        Ok(())
    }

    /// Builder-style `push_row` for tests and fixtures.
    pub fn with_row(mut self, values: Vec<Value>) -> Result<Self, ReconError> {
        self.push_row(values)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Ordered `(column, value)` view of every row.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &Value)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    pub fn column_type(&self, name: &str) -> ColumnType {
        match self.column_index(name) {
            Some(idx) => infer_type(self.rows.iter().map(|r| &r[idx])),
            None => ColumnType::Unknown,
        }
    }
}

fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut seen_number = false;
    let mut seen_text = false;
    for v in values {
        match v {
            Value::Number(_) => seen_number = true,
            Value::Text(_) => seen_text = true,
            Value::Null => {}
        }
    }
    match (seen_number, seen_text) {
        (true, false) => ColumnType::Numeric,
        (false, true) => ColumnType::Text,
        _ => ColumnType::Unknown,
    }
}

struct RecordSer<'a> {
    columns: &'a [String],
    values: &'a [Value],
    derived: Option<&'a MatchedRow>,
}

impl Serialize for RecordSer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = if self.derived.is_some() { 5 } else { 0 };
        let mut map = serializer.serialize_map(Some(self.columns.len() + extra))?;
        for (col, val) in self.columns.iter().zip(self.values) {
            map.serialize_entry(col, val)?;
        }
        if let Some(row) = self.derived {
            map.serialize_entry("amount_match", &row.amount_match)?;
            map.serialize_entry("status_match", &row.status_match)?;
            map.serialize_entry("anomaly", &row.anomaly)?;
            map.serialize_entry("amount_variance", &row.amount_variance)?;
            map.serialize_entry("risk_level", &row.risk_level)?;
        }
        map.end()
    }
}

/// Row-oriented: a JSON array of objects keeping column order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RecordSer {
                columns: &self.columns,
                values: row,
                derived: None,
            })?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Matched rows
// ---------------------------------------------------------------------------

/// Ordinal risk. Escalate with `max`; never lower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// A joined row plus the flags derived by the engine and the scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow {
    pub values: Vec<Value>,
    pub amount_match: bool,
    pub status_match: bool,
    pub anomaly: bool,
    /// Percentage deviation, always >= 0.
    pub amount_variance: f64,
    pub risk_level: RiskLevel,
}

impl MatchedRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values,
            amount_match: true,
            status_match: true,
            anomaly: false,
            amount_variance: 0.0,
            risk_level: RiskLevel::Low,
        }
    }

    /// Raise the risk level; a lower level is ignored.
    pub fn escalate(&mut self, level: RiskLevel) {
        self.risk_level = self.risk_level.max(level);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedTable {
    pub columns: Vec<String>,
    pub rows: Vec<MatchedRow>,
}

impl MatchedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values.get(idx))
    }

    /// First row whose `transaction_reference` is the given text.
    pub fn find(&self, reference: &str) -> Option<&MatchedRow> {
        let idx = self.column_index("transaction_reference")?;
        self.rows
            .iter()
            .find(|r| r.values[idx].as_str() == Some(reference))
    }
}

impl Serialize for MatchedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&RecordSer {
                columns: &self.columns,
                values: &row.values,
                derived: Some(row),
            })?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub matched: usize,
    pub internal_only: usize,
    pub provider_only: usize,
    pub anomalies: usize,
    pub high_risk: usize,
    pub amount_mismatches: usize,
    pub status_mismatches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub matched: MatchedTable,
    pub internal_only: Table,
    pub provider_only: Table,
    pub summary: ReconSummary,
}
