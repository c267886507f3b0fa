//! FILENAME: ranking-model/src/definition.rs
//! Column descriptions - the serializable construction configs.
//!
//! A description is the immutable half of a column: its type tag and the
//! initial configuration a factory turns into a live column. Descriptions
//! travel inside dumps, so unknown fields must deserialize leniently and
//! defaults stay out of the serialized form.

use serde::{Deserialize, Serialize};

use crate::value::FieldIndex;

// ============================================================================
// TYPE TAGS
// ============================================================================

pub const TYPE_RANK: &str = "rank";
pub const TYPE_NUMBER: &str = "number";
pub const TYPE_STRING: &str = "string";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_CATEGORICAL: &str = "categorical";
pub const TYPE_STACK: &str = "stack";
pub const TYPE_NESTED: &str = "nested";
pub const TYPE_REDUCE: &str = "reduce";
pub const TYPE_IMPOSITION: &str = "imposition";

// ============================================================================
// PER-TYPE CONFIG ENUMS
// ============================================================================

/// How a numeric column aggregates a group of raw values when it acts as a
/// group-sort criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMethod {
    Min,
    Max,
    Mean,
    Median,
    Q1,
    Q3,
}

impl Default for SortMethod {
    fn default() -> Self {
        SortMethod::Max
    }
}

/// The reduction a reduce composite applies across its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceOp {
    Min,
    Max,
    Mean,
    Median,
}

impl Default for ReduceOp {
    fn default() -> Self {
        ReduceOp::Max
    }
}

/// A category of a categorical column: the raw value, an optional display
/// label and an optional explicit color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDesc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CategoryDesc {
    pub fn new(name: impl Into<String>) -> Self {
        CategoryDesc {
            name: name.into(),
            label: None,
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ============================================================================
// COLUMN DESCRIPTION
// ============================================================================

/// The complete, serializable description of a column. Only the fields
/// relevant to `column_type` are consulted; the rest stay at their
/// defaults and are omitted from serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDesc {
    /// The column type tag; selects the factory that builds the column.
    #[serde(rename = "type")]
    pub column_type: String,

    /// Display label.
    pub label: String,

    /// Longer description shown in headers/tooltips.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Explicit column color; falls back to the default color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Source field this column reads; support and composite columns have
    /// none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldIndex>,

    /// Support columns (e.g. rank) are fixed: they cannot be removed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fixed: bool,

    /// Renderer overrides; each defaults to the type tag itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_renderer: Option<String>,

    /// Raw value domain of a numeric column, mapped linearly to [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,

    /// Initial group-aggregation method of a numeric column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<SortMethod>,

    /// Categories of a categorical column, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<CategoryDesc>,

    /// Initial reduction of a reduce composite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<ReduceOp>,

    /// Child descriptions of a composite column.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ColumnDesc>,
}

impl ColumnDesc {
    fn base(column_type: &str, label: impl Into<String>) -> Self {
        ColumnDesc {
            column_type: column_type.to_string(),
            label: label.into(),
            description: String::new(),
            color: None,
            field: None,
            fixed: false,
            renderer: None,
            group_renderer: None,
            summary_renderer: None,
            domain: None,
            sort_method: None,
            categories: Vec::new(),
            reduce: None,
            children: Vec::new(),
        }
    }

    /// The fixed rank support column.
    pub fn rank() -> Self {
        let mut d = Self::base(TYPE_RANK, "Rank");
        d.fixed = true;
        d
    }

    pub fn number(label: impl Into<String>, field: FieldIndex) -> Self {
        let mut d = Self::base(TYPE_NUMBER, label);
        d.field = Some(field);
        d
    }

    pub fn string(label: impl Into<String>, field: FieldIndex) -> Self {
        let mut d = Self::base(TYPE_STRING, label);
        d.field = Some(field);
        d
    }

    pub fn boolean(label: impl Into<String>, field: FieldIndex) -> Self {
        let mut d = Self::base(TYPE_BOOLEAN, label);
        d.field = Some(field);
        d
    }

    pub fn categorical<I, S>(label: impl Into<String>, field: FieldIndex, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut d = Self::base(TYPE_CATEGORICAL, label);
        d.field = Some(field);
        d.categories = categories
            .into_iter()
            .map(|c| CategoryDesc::new(c))
            .collect();
        d
    }

    pub fn stack(label: impl Into<String>) -> Self {
        Self::base(TYPE_STACK, label)
    }

    pub fn nested(label: impl Into<String>) -> Self {
        Self::base(TYPE_NESTED, label)
    }

    pub fn reduce(label: impl Into<String>, op: ReduceOp) -> Self {
        let mut d = Self::base(TYPE_REDUCE, label);
        d.reduce = Some(op);
        d
    }

    pub fn imposition(label: impl Into<String>) -> Self {
        Self::base(TYPE_IMPOSITION, label)
    }

    pub fn with_domain(mut self, min: f64, max: f64) -> Self {
        self.domain = Some([min, max]);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_children(mut self, children: Vec<ColumnDesc>) -> Self {
        self.children = children;
        self
    }

    /// Whether this description denotes a support column that carries no
    /// data of its own.
    pub fn is_support_type(&self) -> bool {
        self.column_type == TYPE_RANK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_stay_out_of_serialized_form() {
        let desc = ColumnDesc::number("Age", 2);
        let json = serde_json::to_value(&desc).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.get("type").unwrap(), "number");
        assert_eq!(obj.get("field").unwrap(), 2);
        assert!(!obj.contains_key("fixed"));
        assert!(!obj.contains_key("categories"));
        assert!(!obj.contains_key("domain"));
    }

    #[test]
    fn test_lenient_deserialization() {
        // unknown fields ignored, missing optionals defaulted
        let json = r#"{"type":"number","label":"Age","field":1,"someFutureField":true}"#;
        let desc: ColumnDesc = serde_json::from_str(json).unwrap();
        assert_eq!(desc.column_type, TYPE_NUMBER);
        assert_eq!(desc.field, Some(1));
        assert!(desc.domain.is_none());
    }

    #[test]
    fn test_rank_is_fixed_support() {
        let desc = ColumnDesc::rank();
        assert!(desc.fixed);
        assert!(desc.is_support_type());
    }
}
