//! FILENAME: ranking-model/src/number.rs
//! Numeric columns: linear domain mapping, range filtering, group
//! aggregation methods and threshold-based grouping.

use serde::{Deserialize, Serialize};

use crate::definition::{ColumnDesc, SortMethod};
use crate::group::Group;
use crate::value::similar;

/// Epsilon for filter-bound and mapping no-op guards.
pub const NUMBER_DELTA: f64 = 1e-9;

// ============================================================================
// MAPPING
// ============================================================================

/// Maps the raw value domain linearly onto [0, 1], clamped. Comparison and
/// weighted aggregation operate on the normalized scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearMapping {
    pub domain: [f64; 2],
}

impl LinearMapping {
    pub fn new(domain: [f64; 2]) -> Self {
        LinearMapping { domain }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        if raw.is_nan() {
            return f64::NAN;
        }
        let [d0, d1] = self.domain;
        if (d1 - d0).abs() < NUMBER_DELTA {
            return 0.5;
        }
        ((raw - d0) / (d1 - d0)).clamp(0.0, 1.0)
    }

    pub fn is_similar(&self, other: &LinearMapping) -> bool {
        similar(self.domain[0], other.domain[0], NUMBER_DELTA)
            && similar(self.domain[1], other.domain[1], NUMBER_DELTA)
    }
}

impl Default for LinearMapping {
    fn default() -> Self {
        LinearMapping { domain: [0.0, 1.0] }
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// A raw-domain range filter. The unbounded default filters nothing and is
/// normalized to "no filter" by the owning column's setter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NumberFilter {
    pub min: f64,
    pub max: f64,
    pub filter_missing: bool,
}

impl NumberFilter {
    pub fn range(min: f64, max: f64) -> Self {
        NumberFilter {
            min,
            max,
            filter_missing: false,
        }
    }

    /// Whether this filter can reject anything at all.
    pub fn is_active(&self) -> bool {
        self.min.is_finite() || self.max.is_finite() || self.filter_missing
    }

    /// Missing rows pass unless `filter_missing` is set; present values
    /// must fall inside the inclusive range.
    pub fn accepts(&self, raw: Option<f64>) -> bool {
        match raw {
            None => !self.filter_missing,
            Some(v) if v.is_nan() => !self.filter_missing,
            Some(v) => v >= self.min && v <= self.max,
        }
    }

    pub fn is_similar(&self, other: &NumberFilter) -> bool {
        similar_bound(self.min, other.min)
            && similar_bound(self.max, other.max)
            && self.filter_missing == other.filter_missing
    }
}

fn similar_bound(a: f64, b: f64) -> bool {
    (a.is_infinite() && b.is_infinite() && a.signum() == b.signum()) || similar(a, b, NUMBER_DELTA)
}

impl Default for NumberFilter {
    fn default() -> Self {
        NumberFilter {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            filter_missing: false,
        }
    }
}

impl PartialEq for NumberFilter {
    fn eq(&self, other: &Self) -> bool {
        self.is_similar(other)
    }
}

// ============================================================================
// COLUMN STATE
// ============================================================================

#[derive(Debug, Clone)]
pub struct NumberColumn {
    pub(crate) mapping: LinearMapping,
    pub(crate) filter: Option<NumberFilter>,
    pub(crate) sort_method: SortMethod,
    /// Ascending bin boundaries; empty means the column cannot stratify.
    pub(crate) group_thresholds: Vec<f64>,
}

impl NumberColumn {
    pub fn from_desc(desc: &ColumnDesc) -> Self {
        NumberColumn {
            mapping: LinearMapping::new(desc.domain.unwrap_or([0.0, 1.0])),
            filter: None,
            sort_method: desc.sort_method.unwrap_or_default(),
            group_thresholds: Vec::new(),
        }
    }

    pub fn mapping(&self) -> &LinearMapping {
        &self.mapping
    }

    pub fn filter(&self) -> Option<&NumberFilter> {
        self.filter.as_ref()
    }

    pub fn sort_method(&self) -> SortMethod {
        self.sort_method
    }

    pub fn group_thresholds(&self) -> &[f64] {
        &self.group_thresholds
    }

    pub fn normalize(&self, raw: Option<f64>) -> f64 {
        match raw {
            Some(v) => self.mapping.apply(v),
            None => f64::NAN,
        }
    }

    pub fn accepts(&self, raw: Option<f64>) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accepts(raw))
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.as_ref().map_or(false, NumberFilter::is_active)
    }

    pub fn can_group(&self) -> bool {
        !self.group_thresholds.is_empty()
    }

    /// Buckets a raw value into its threshold bin. Missing values fall
    /// into the missing group.
    pub fn group_for(&self, raw: Option<f64>) -> Group {
        let v = match raw {
            Some(v) if !v.is_nan() => v,
            _ => return Group::missing_group(),
        };
        let ts = &self.group_thresholds;
        if ts.is_empty() {
            return Group::default_group();
        }
        let mut bin = ts.len();
        for (i, t) in ts.iter().enumerate() {
            if v < *t {
                bin = i;
                break;
            }
        }
        let name = if bin == 0 {
            format!("< {}", ts[0])
        } else if bin == ts.len() {
            format!("≥ {}", ts[ts.len() - 1])
        } else {
            format!("[{};{})", ts[bin - 1], ts[bin])
        };
        Group::new(name, crate::group::DEFAULT_GROUP_COLOR)
    }

    /// Aggregates a group's raw values by the configured sort method,
    /// skipping missing ones. Empty input yields NaN.
    pub fn group_aggregate(&self, values: &[f64]) -> f64 {
        aggregate(self.sort_method, values)
    }
}

/// Applies `method` over the non-missing values.
pub fn aggregate(method: SortMethod, values: &[f64]) -> f64 {
    let mut vs: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if vs.is_empty() {
        return f64::NAN;
    }
    match method {
        SortMethod::Min => vs.iter().copied().fold(f64::INFINITY, f64::min),
        SortMethod::Max => vs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        SortMethod::Mean => vs.iter().sum::<f64>() / vs.len() as f64,
        SortMethod::Median => {
            vs.sort_by(f64::total_cmp);
            quantile(&vs, 0.5)
        }
        SortMethod::Q1 => {
            vs.sort_by(f64::total_cmp);
            quantile(&vs, 0.25)
        }
        SortMethod::Q3 => {
            vs.sort_by(f64::total_cmp);
            quantile(&vs, 0.75)
        }
    }
}

/// Linear-interpolation quantile over an already sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_clamps_to_unit_interval() {
        let m = LinearMapping::new([0.0, 100.0]);
        assert_eq!(m.apply(50.0), 0.5);
        assert_eq!(m.apply(-10.0), 0.0);
        assert_eq!(m.apply(200.0), 1.0);
        assert!(m.apply(f64::NAN).is_nan());
    }

    #[test]
    fn test_default_filter_is_inactive() {
        let f = NumberFilter::default();
        assert!(!f.is_active());
        assert!(f.accepts(Some(1e12)));
        assert!(f.accepts(None));
    }

    #[test]
    fn test_filter_range_and_missing() {
        let mut f = NumberFilter::range(0.0, 30.0);
        assert!(f.accepts(Some(25.0)));
        assert!(!f.accepts(Some(40.0)));
        assert!(f.accepts(None));
        f.filter_missing = true;
        assert!(!f.accepts(None));
    }

    #[test]
    fn test_threshold_grouping() {
        let mut col = NumberColumn::from_desc(&ColumnDesc::number("x", 0).with_domain(0.0, 100.0));
        assert!(!col.can_group());
        col.group_thresholds = vec![10.0, 50.0];
        assert!(col.can_group());
        assert_eq!(col.group_for(Some(5.0)).name, "< 10");
        assert_eq!(col.group_for(Some(10.0)).name, "[10;50)");
        assert_eq!(col.group_for(Some(99.0)).name, "≥ 50");
        assert_eq!(col.group_for(None), Group::missing_group());
    }

    #[test]
    fn test_aggregation_methods() {
        let vs = [3.0, 1.0, f64::NAN, 2.0];
        assert_eq!(aggregate(SortMethod::Min, &vs), 1.0);
        assert_eq!(aggregate(SortMethod::Max, &vs), 3.0);
        assert_eq!(aggregate(SortMethod::Mean, &vs), 2.0);
        assert_eq!(aggregate(SortMethod::Median, &vs), 2.0);
        assert!(aggregate(SortMethod::Max, &[f64::NAN]).is_nan());
    }

    #[test]
    fn test_quantile_interpolates() {
        let vs = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&vs, 0.5), 2.5);
        assert_eq!(quantile(&vs, 0.25), 1.75);
    }
}
