//! FILENAME: ranking-engine/src/view.rs
//! The renderable output of one order computation: the ordered group list
//! plus the concatenated row order and 1-based ranks.

use serde::{Deserialize, Serialize};

use ranking_model::{OrderedGroup, RowIndex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingView {
    /// Groups in display order, each carrying its ordered row indices.
    pub groups: Vec<OrderedGroup>,
    /// Concatenation of the group orders: the final display order.
    pub order: Vec<RowIndex>,
}

impl RankingView {
    pub fn new(groups: Vec<OrderedGroup>) -> Self {
        let order = groups.iter().flat_map(|g| g.order.iter().copied()).collect();
        RankingView { groups, order }
    }

    pub fn empty() -> Self {
        RankingView {
            groups: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Number of rows surviving the filter phase.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 1-based rank of a row in the final order; `None` for filtered rows.
    pub fn rank_of(&self, row: RowIndex) -> Option<u32> {
        self.order.iter().position(|r| *r == row).map(|i| i as u32 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ranking_model::Group;

    #[test]
    fn test_order_concatenates_groups() {
        let mut a = OrderedGroup::new(Group::new("A", "blue"));
        a.order = vec![2, 0];
        let mut b = OrderedGroup::new(Group::new("B", "red"));
        b.order = vec![1];
        let view = RankingView::new(vec![a, b]);
        assert_eq!(view.order, vec![2, 0, 1]);
        assert_eq!(view.len(), 3);
        assert_eq!(view.rank_of(0), Some(2));
        assert_eq!(view.rank_of(9), None);
    }
}
