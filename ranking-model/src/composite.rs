//! FILENAME: ranking-model/src/composite.rs
//! Composite columns: a column deriving its value from an owned, ordered
//! list of child columns.
//!
//! Variants:
//! - stack: weighted sum of the children's normalized values, weights in
//!   [0, 1] summing to 1 and renormalized on every structural change
//! - nested: lexicographic delegation, first child breaks ties
//! - reduce: min/max/mean/median across the children's values
//! - imposition: ordered by the first numeric child, colored/grouped by
//!   the first categorical child

use crate::column::Column;
use crate::definition::{ReduceOp, SortMethod};
use crate::group::{join_groups, Group};
use crate::number::aggregate;
use crate::value::{RowIndex, TableData};

/// Weight sums must stay within this distance of 1.
pub const WEIGHT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub enum CompositeKind {
    Stack { weights: Vec<f64> },
    Nested,
    Reduce { op: ReduceOp },
    Imposition,
}

#[derive(Debug, Clone)]
pub struct CompositeColumn {
    pub(crate) children: Vec<Column>,
    pub(crate) variant: CompositeKind,
}

impl CompositeColumn {
    pub fn new(variant: CompositeKind) -> Self {
        CompositeColumn {
            children: Vec::new(),
            variant,
        }
    }

    pub fn children(&self) -> &[Column] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn variant(&self) -> &CompositeKind {
        &self.variant
    }

    pub fn is_stack(&self) -> bool {
        matches!(self.variant, CompositeKind::Stack { .. })
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.children.iter().position(|c| c.id() == id)
    }

    // ------------------------------------------------------------------
    // structure
    // ------------------------------------------------------------------

    /// Inserts a child at `index`. For stacks, `weight` (in (0, 1)) takes
    /// its share from the existing children; without one the newcomer gets
    /// an equal share.
    pub(crate) fn insert_child(&mut self, index: usize, column: Column, weight: Option<f64>) {
        let index = index.min(self.children.len());
        if let CompositeKind::Stack { weights } = &mut self.variant {
            let n = weights.len();
            let w = match weight {
                Some(w) if n > 0 => w.clamp(0.0, 1.0 - WEIGHT_EPSILON),
                _ => {
                    if n == 0 {
                        1.0
                    } else {
                        1.0 / (n as f64 + 1.0)
                    }
                }
            };
            let scale = 1.0 - w;
            for existing in weights.iter_mut() {
                *existing *= scale;
            }
            weights.insert(index, if n == 0 { 1.0 } else { w });
        }
        self.children.insert(index, column);
        debug_assert!(self.weights_are_normalized());
    }

    /// Removes and returns the child at `index`; the removed weight is
    /// redistributed over the survivors.
    pub(crate) fn remove_child(&mut self, index: usize) -> Column {
        let removed = self.children.remove(index);
        if let CompositeKind::Stack { weights } = &mut self.variant {
            let w = weights.remove(index);
            if !weights.is_empty() {
                let rest = 1.0 - w;
                if rest.abs() < WEIGHT_EPSILON {
                    let equal = 1.0 / weights.len() as f64;
                    weights.iter_mut().for_each(|x| *x = equal);
                } else {
                    weights.iter_mut().for_each(|x| *x /= rest);
                }
            }
        }
        debug_assert!(self.weights_are_normalized());
        removed
    }

    pub(crate) fn move_child(&mut self, from: usize, to: usize) {
        let col = self.children.remove(from);
        let to = to.min(self.children.len());
        self.children.insert(to, col);
        if let CompositeKind::Stack { weights } = &mut self.variant {
            let w = weights.remove(from);
            weights.insert(to, w);
        }
    }

    // ------------------------------------------------------------------
    // weights
    // ------------------------------------------------------------------

    pub fn weights(&self) -> &[f64] {
        match &self.variant {
            CompositeKind::Stack { weights } => weights,
            _ => &[],
        }
    }

    /// Replaces the weights: shorter inputs are padded with an equal share
    /// of the remainder, longer ones truncated, and the result normalized
    /// to sum 1.
    pub(crate) fn set_weights(&mut self, given: &[f64]) {
        let n = self.children.len();
        if let CompositeKind::Stack { weights } = &mut self.variant {
            let mut next: Vec<f64> = given.iter().take(n).map(|w| w.max(0.0)).collect();
            if next.len() < n {
                let sum: f64 = next.iter().sum();
                let fill = ((1.0 - sum).max(0.0)) / (n - next.len()) as f64;
                next.resize(n, fill);
            }
            let sum: f64 = next.iter().sum();
            if sum > WEIGHT_EPSILON {
                next.iter_mut().for_each(|w| *w /= sum);
            } else if n > 0 {
                next.iter_mut().for_each(|w| *w = 1.0 / n as f64);
            }
            *weights = next;
        }
        debug_assert!(self.weights_are_normalized());
    }

    pub fn weights_are_normalized(&self) -> bool {
        match &self.variant {
            CompositeKind::Stack { weights } => {
                weights.is_empty() || (weights.iter().sum::<f64>() - 1.0).abs() < WEIGHT_EPSILON
            }
            _ => true,
        }
    }

    pub fn reduce_op(&self) -> Option<ReduceOp> {
        match &self.variant {
            CompositeKind::Reduce { op } => Some(*op),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // aggregation
    // ------------------------------------------------------------------

    /// The composite's numeric value for a row.
    pub fn number_value(&self, table: &dyn TableData, row: RowIndex) -> f64 {
        match &self.variant {
            CompositeKind::Stack { weights } => {
                // a single missing child poisons the weighted sum
                let mut acc = 0.0;
                for (child, w) in self.children.iter().zip(weights.iter()) {
                    acc += child.number_value(table, row) * w;
                }
                acc
            }
            CompositeKind::Reduce { op } => {
                let values: Vec<f64> = self
                    .children
                    .iter()
                    .map(|c| c.number_value(table, row))
                    .collect();
                aggregate(reduce_to_sort_method(*op), &values)
            }
            CompositeKind::Imposition => self
                .value_child()
                .map_or(f64::NAN, |c| c.number_value(table, row)),
            CompositeKind::Nested => f64::NAN,
        }
    }

    /// Median of the composite's values over a group of rows; the group
    /// compare key of every numeric composite.
    pub fn group_number_value(&self, table: &dyn TableData, rows: &[RowIndex]) -> f64 {
        let values: Vec<f64> = rows.iter().map(|r| self.number_value(table, *r)).collect();
        aggregate(SortMethod::Median, &values)
    }

    /// The child supplying the imposed value: the first number-capable one.
    pub fn value_child(&self) -> Option<&Column> {
        self.children.iter().find(|c| c.is_numeric())
    }

    /// The child supplying imposed colors/groups: the first categorical or
    /// boolean one.
    pub fn color_child(&self) -> Option<&Column> {
        self.children.iter().find(|c| c.is_categorical_like())
    }

    // ------------------------------------------------------------------
    // filtering and grouping
    // ------------------------------------------------------------------

    /// Logical AND across all children that declare a filter.
    pub fn filter(&self, table: &dyn TableData, row: RowIndex) -> bool {
        self.children.iter().all(|c| c.filter(table, row))
    }

    pub fn is_filtered(&self) -> bool {
        self.children.iter().any(|c| c.is_filtered())
    }

    pub fn can_group(&self) -> bool {
        match &self.variant {
            CompositeKind::Nested => self.children.iter().any(|c| c.can_group()),
            CompositeKind::Imposition => self.color_child().is_some(),
            _ => false,
        }
    }

    pub fn group(&self, table: &dyn TableData, row: RowIndex) -> Group {
        match &self.variant {
            CompositeKind::Nested => {
                let groups: Vec<Group> = self
                    .children
                    .iter()
                    .filter(|c| c.can_group())
                    .map(|c| c.group(table, row))
                    .collect();
                if groups.is_empty() {
                    Group::default_group()
                } else {
                    join_groups(&groups)
                }
            }
            CompositeKind::Imposition => self
                .color_child()
                .map_or_else(Group::default_group, |c| c.group(table, row)),
            _ => Group::default_group(),
        }
    }
}

pub(crate) fn reduce_to_sort_method(op: ReduceOp) -> SortMethod {
    match op {
        ReduceOp::Min => SortMethod::Min,
        ReduceOp::Max => SortMethod::Max,
        ReduceOp::Mean => SortMethod::Mean,
        ReduceOp::Median => SortMethod::Median,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::definition::ColumnDesc;

    fn stack_with(n: usize) -> CompositeColumn {
        let mut c = CompositeColumn::new(CompositeKind::Stack { weights: Vec::new() });
        for i in 0..n {
            let col = Column::from_desc(
                &format!("c{}", i),
                &ColumnDesc::number(format!("n{}", i), i),
            )
            .unwrap();
            c.insert_child(c.len(), col, None);
        }
        c
    }

    #[test]
    fn test_equal_redistribution_on_push() {
        let c = stack_with(3);
        for w in c.weights() {
            assert!((w - 1.0 / 3.0).abs() < WEIGHT_EPSILON);
        }
        assert!(c.weights_are_normalized());
    }

    #[test]
    fn test_explicit_weight_takes_share() {
        let mut c = stack_with(2);
        let col = Column::from_desc("c2", &ColumnDesc::number("n2", 2)).unwrap();
        c.insert_child(2, col, Some(0.5));
        assert!((c.weights()[2] - 0.5).abs() < WEIGHT_EPSILON);
        assert!((c.weights()[0] - 0.25).abs() < WEIGHT_EPSILON);
        assert!(c.weights_are_normalized());
    }

    #[test]
    fn test_remove_renormalizes() {
        let mut c = stack_with(3);
        c.remove_child(1);
        assert_eq!(c.len(), 2);
        assert!(c.weights_are_normalized());
        for w in c.weights() {
            assert!((w - 0.5).abs() < WEIGHT_EPSILON);
        }
    }

    #[test]
    fn test_weight_sum_invariant_over_random_edits() {
        let mut c = stack_with(1);
        for i in 1..12 {
            let col = Column::from_desc(
                &format!("x{}", i),
                &ColumnDesc::number(format!("x{}", i), i),
            )
            .unwrap();
            c.insert_child(i % c.len().max(1), col, Some(0.1 + (i as f64) * 0.05));
            if i % 3 == 0 {
                c.remove_child(i % c.len());
            }
            assert!(c.weights_are_normalized());
        }
    }

    #[test]
    fn test_set_weights_pads_and_normalizes() {
        let mut c = stack_with(3);
        c.set_weights(&[0.2, 0.2]);
        assert!(c.weights_are_normalized());
        assert!((c.weights()[2] - 0.6).abs() < WEIGHT_EPSILON);
        c.set_weights(&[2.0, 1.0, 1.0]);
        assert!((c.weights()[0] - 0.5).abs() < WEIGHT_EPSILON);
    }
}
