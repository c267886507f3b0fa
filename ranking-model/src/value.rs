//! FILENAME: ranking-model/src/value.rs
//! Raw cell values, the row-source boundary, and the compare-value kinds
//! the sort routine dispatches on.
//!
//! Columns extract a `DataValue` from a row, turn it into one or more
//! `CompareValue`s, and declare the matching `CompareValueType`s so the
//! order computation can pick comparators without per-call inspection.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Index into a row's payload (0-based source column).
pub type FieldIndex = usize;

/// Stable row identifier within a table.
pub type RowIndex = u32;

// ============================================================================
// RAW VALUES
// ============================================================================

/// A raw domain value as read from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl DataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            DataValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            DataValue::Text(s) => s.parse::<f64>().ok(),
            DataValue::Null => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Missing means null, NaN or the empty string.
    pub fn is_missing(&self) -> bool {
        match self {
            DataValue::Null => true,
            DataValue::Number(n) => n.is_nan(),
            DataValue::Text(s) => s.is_empty(),
            DataValue::Bool(_) => false,
        }
    }

    /// Display form; missing values render as the empty string.
    pub fn label(&self) -> String {
        match self {
            DataValue::Null => String::new(),
            DataValue::Number(n) if n.is_nan() => String::new(),
            DataValue::Number(n) => format_number(*n),
            DataValue::Text(s) => s.clone(),
            DataValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        }
    }
}

/// Trims a float for display: integers without a fraction part.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// ROW SOURCE BOUNDARY
// ============================================================================

/// The row source the engine reads from. Rows are opaque handles with a
/// stable index; the payload is reached per field through `value`.
pub trait TableData {
    /// Number of rows in the table.
    fn row_count(&self) -> usize;

    /// The raw value of `row` at `field`; `DataValue::Null` when the row
    /// has no such field. Must not panic on malformed rows.
    fn value(&self, row: RowIndex, field: FieldIndex) -> DataValue;

    /// Whether the row is currently selected. Only selection-aware
    /// collaborators consult this; the order computation never does.
    fn is_selected(&self, _row: RowIndex) -> bool {
        false
    }
}

// ============================================================================
// COMPARE VALUES
// ============================================================================

/// Missing values sort after present ones in ascending order. A descending
/// criterion reverses the whole comparator, missing placement included.
pub const FIRST_IS_MISSING: i8 = 1;

/// The closed set of compare-value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareValueType {
    /// Small unsigned integers, e.g. category indices.
    Uint8,
    /// Floats in ascending order; NaN encodes missing.
    FloatAsc,
    /// Booleans, false < true.
    Binary,
    /// Case-insensitive strings; empty encodes missing.
    String,
    /// Non-negative counts, e.g. group sizes or category frequencies.
    Count,
}

/// One part of a compare key.
///
/// `Str` holds an already lower-cased value: comparison is case-insensitive
/// by Unicode lowercase, not locale collation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CompareValue {
    Uint8(Option<u8>),
    Float(f64),
    Binary(Option<bool>),
    Str(Option<String>),
    Count(u32),
}

/// A multi-part compare key; element-wise comparison, first non-equal part
/// decides.
pub type CompareKey = SmallVec<[CompareValue; 2]>;

/// The kinds making up a multi-part key.
pub type CompareKeyType = SmallVec<[CompareValueType; 2]>;

impl CompareValue {
    pub fn is_missing(&self) -> bool {
        match self {
            CompareValue::Uint8(v) => v.is_none(),
            CompareValue::Float(v) => v.is_nan(),
            CompareValue::Binary(v) => v.is_none(),
            CompareValue::Str(v) => v.as_ref().map_or(true, |s| s.is_empty()),
            CompareValue::Count(_) => false,
        }
    }
}

/// Compares two parts of the same kind; missing sorts after present.
/// Mismatched kinds compare equal (a criterion never mixes kinds).
pub fn compare_values(a: &CompareValue, b: &CompareValue) -> Ordering {
    use CompareValue::*;
    match (a.is_missing(), b.is_missing()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    match (a, b) {
        (Uint8(Some(x)), Uint8(Some(y))) => x.cmp(y),
        (Float(x), Float(y)) => x.total_cmp(y),
        (Binary(Some(x)), Binary(Some(y))) => x.cmp(y),
        (Str(Some(x)), Str(Some(y))) => x.cmp(y),
        (Count(x), Count(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Compares two multi-part keys element-wise, left to right.
pub fn compare_keys(a: &CompareKey, b: &CompareKey) -> Ordering {
    for (av, bv) in a.iter().zip(b.iter()) {
        let r = compare_values(av, bv);
        if r != Ordering::Equal {
            return r;
        }
    }
    a.len().cmp(&b.len())
}

/// Builds the `Str` part for a raw string: lower-cased, empty means missing.
pub fn str_compare_value(s: Option<&str>) -> CompareValue {
    CompareValue::Str(s.map(|v| v.to_lowercase()))
}

// ============================================================================
// FLOAT EQUALITY
// ============================================================================

/// Epsilon float equality used by numeric setter no-op guards.
pub fn similar(a: f64, b: f64, delta: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    (a - b).abs() < delta
}
