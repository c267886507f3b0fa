//! FILENAME: ranking-model/src/categorical.rs
//! Categorical and boolean columns.
//!
//! Boolean columns are categorical-like: they delegate grouping and
//! labeling to the shared category helpers instead of duplicating them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::definition::ColumnDesc;
use crate::group::Group;
use crate::value::CompareValue;

/// The categorical color scheme, assigned round-robin to categories
/// without an explicit color.
pub const CATEGORY_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

/// A resolved category: raw value, display label and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub label: String,
    pub color: String,
}

impl Category {
    fn to_group(&self) -> Group {
        Group::new(self.label.clone(), self.color.clone())
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// The set of categories to keep. "No filter" and "a filter listing every
/// category (without filtering missing)" are the same observable state;
/// the owning column's setter normalizes the latter to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalFilter {
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub filter_missing: bool,
}

impl CategoricalFilter {
    pub fn keep<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategoricalFilter {
            categories: categories.into_iter().map(Into::into).collect(),
            filter_missing: false,
        }
    }
}

// ============================================================================
// CATEGORICAL COLUMN
// ============================================================================

#[derive(Debug, Clone)]
pub struct CategoricalColumn {
    categories: Vec<Category>,
    lookup: FxHashMap<String, usize>,
    pub(crate) filter: Option<CategoricalFilter>,
}

impl CategoricalColumn {
    pub fn from_desc(desc: &ColumnDesc) -> Self {
        let categories: Vec<Category> = desc
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| Category {
                name: c.name.clone(),
                label: c.label.clone().unwrap_or_else(|| c.name.clone()),
                color: c
                    .color
                    .clone()
                    .unwrap_or_else(|| CATEGORY_PALETTE[i % CATEGORY_PALETTE.len()].to_string()),
            })
            .collect();
        let lookup = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        CategoricalColumn {
            categories,
            lookup,
            filter: None,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn filter(&self) -> Option<&CategoricalFilter> {
        self.filter.as_ref()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    /// Category index as a compare value; unknown and missing values sort
    /// after known categories. Indices are capped at the `Uint8` range.
    pub fn compare_for(&self, value: Option<&str>) -> CompareValue {
        let idx = value
            .and_then(|v| self.index_of(v))
            .map(|i| i.min(u8::MAX as usize) as u8);
        CompareValue::Uint8(idx)
    }

    pub fn group_for(&self, value: Option<&str>) -> Group {
        match value.and_then(|v| self.index_of(v)) {
            Some(i) => self.categories[i].to_group(),
            None => Group::missing_group(),
        }
    }

    pub fn accepts(&self, value: Option<&str>) -> bool {
        let f = match &self.filter {
            Some(f) => f,
            None => return true,
        };
        match value {
            Some(v) if !v.is_empty() => f.categories.iter().any(|c| c == v),
            _ => !f.filter_missing,
        }
    }

    /// Normalizes "keep everything" to no filter so both code paths share
    /// one observable state.
    pub fn normalize_filter(&self, filter: Option<CategoricalFilter>) -> Option<CategoricalFilter> {
        let f = filter?;
        let covers_all = !f.filter_missing
            && self
                .categories
                .iter()
                .all(|c| f.categories.iter().any(|k| *k == c.name));
        if covers_all {
            None
        } else {
            Some(f)
        }
    }

    /// Most frequent category of a set of rows: `(index, count)`. Ties go
    /// to the lower category index; rows without a known category are not
    /// counted.
    pub fn most_frequent<'a>(
        &self,
        values: impl Iterator<Item = Option<&'a str>>,
    ) -> Option<(usize, u32)> {
        let mut counts = vec![0u32; self.categories.len()];
        for v in values {
            if let Some(i) = v.and_then(|s| self.index_of(s)) {
                counts[i] += 1;
            }
        }
        counts
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| *c > 0)
            .max_by(|(ia, ca), (ib, cb)| ca.cmp(cb).then(ib.cmp(ia)))
    }
}

// ============================================================================
// BOOLEAN COLUMN
// ============================================================================

/// Boolean columns reuse the categorical grouping machinery over the two
/// fixed true/false categories.
#[derive(Debug, Clone, Default)]
pub struct BooleanColumn {
    /// Keep only rows with this value; `None` keeps everything.
    pub(crate) filter: Option<bool>,
}

pub(crate) fn boolean_group(value: Option<bool>) -> Group {
    match value {
        Some(true) => Group::new("True", CATEGORY_PALETTE[0]),
        Some(false) => Group::new("False", CATEGORY_PALETTE[1]),
        None => Group::missing_group(),
    }
}

impl BooleanColumn {
    pub fn filter(&self) -> Option<bool> {
        self.filter
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }

    pub fn accepts(&self, value: Option<bool>) -> bool {
        match self.filter {
            None => true,
            Some(want) => value == Some(want),
        }
    }

    /// Majority value of a group plus its count, the boolean rendition of
    /// the categorical `[value, count]` group key.
    pub fn majority(values: impl Iterator<Item = Option<bool>>) -> (Option<bool>, u32) {
        let mut trues = 0u32;
        let mut falses = 0u32;
        for v in values.flatten() {
            if v {
                trues += 1;
            } else {
                falses += 1;
            }
        }
        if trues == 0 && falses == 0 {
            (None, 0)
        } else if trues >= falses {
            (Some(true), trues)
        } else {
            (Some(false), falses)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::CategoryDesc;

    fn abc_column() -> CategoricalColumn {
        CategoricalColumn::from_desc(&ColumnDesc::categorical("Cat", 0, ["a", "b", "c"]))
    }

    #[test]
    fn test_palette_assignment_and_override() {
        let mut desc = ColumnDesc::categorical("Cat", 0, ["a"]);
        desc.categories.push(CategoryDesc::new("b").with_color("#000000"));
        let col = CategoricalColumn::from_desc(&desc);
        assert_eq!(col.categories()[0].color, CATEGORY_PALETTE[0]);
        assert_eq!(col.categories()[1].color, "#000000");
    }

    #[test]
    fn test_group_and_compare() {
        let col = abc_column();
        assert_eq!(col.group_for(Some("b")).name, "b");
        assert_eq!(col.group_for(Some("zzz")), Group::missing_group());
        assert_eq!(col.compare_for(Some("c")), CompareValue::Uint8(Some(2)));
        assert_eq!(col.compare_for(None), CompareValue::Uint8(None));
    }

    #[test]
    fn test_filter_accepts() {
        let mut col = abc_column();
        col.filter = Some(CategoricalFilter::keep(["a"]));
        assert!(col.accepts(Some("a")));
        assert!(!col.accepts(Some("b")));
        assert!(col.accepts(None)); // missing passes unless filter_missing
    }

    #[test]
    fn test_filter_matching_everything_normalizes_to_none() {
        let col = abc_column();
        let all = CategoricalFilter::keep(["a", "b", "c"]);
        assert_eq!(col.normalize_filter(Some(all)), None);
        let partial = CategoricalFilter::keep(["a", "b"]);
        assert!(col.normalize_filter(Some(partial)).is_some());
        let mut all_plus_missing = CategoricalFilter::keep(["a", "b", "c"]);
        all_plus_missing.filter_missing = true;
        assert!(col.normalize_filter(Some(all_plus_missing)).is_some());
    }

    #[test]
    fn test_most_frequent_breaks_ties_by_index() {
        let col = abc_column();
        let values = [Some("b"), Some("a"), Some("b"), None, Some("zzz")];
        let (idx, count) = col.most_frequent(values.into_iter()).unwrap();
        assert_eq!((idx, count), (1, 2));
        let tied = [Some("a"), Some("b")];
        let (idx, _) = col.most_frequent(tied.into_iter()).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_boolean_majority_and_groups() {
        let (v, c) = BooleanColumn::majority([Some(true), Some(false), Some(true), None].into_iter());
        assert_eq!((v, c), (Some(true), 2));
        assert_eq!(boolean_group(Some(false)).name, "False");
        assert_eq!(boolean_group(None), Group::missing_group());
    }
}
