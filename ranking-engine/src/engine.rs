//! FILENAME: ranking-engine/src/engine.rs
//! The order computation: filter → group → sort → group-sort → rank.
//!
//! The computation is a pure, synchronous pass over the row set. Per-row
//! compare keys are extracted once per criterion before sorting (the value
//! cache), so comparators never recompute column values. All sorts are
//! stable: rows (and groups) tying under the full criteria chain keep
//! their original relative order.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use ranking_model::{
    compare_keys, join_groups, Column, CompareKey, Group, OrderedGroup, Ranking, RowIndex,
    SortCriterion, TableData,
};

use crate::view::RankingView;

/// Computes the current view of `ranking` over `table`.
pub fn compute_order(ranking: &Ranking, table: &dyn TableData) -> RankingView {
    let total = table.row_count();
    let surviving = filter_rows(ranking, table);
    let mut groups = group_rows(ranking, table, &surviving);

    let criteria = resolve_criteria(ranking, ranking.sort_criteria());
    if !criteria.is_empty() {
        for group in &mut groups {
            sort_group(table, group, &criteria);
        }
    }

    let group_criteria = resolve_criteria(ranking, ranking.group_sort_criteria());
    if !group_criteria.is_empty() && groups.len() > 1 {
        sort_groups(table, &mut groups, &group_criteria);
    }

    let view = RankingView::new(groups);
    log::debug!(
        "order computed: {} of {} rows in {} groups",
        view.len(),
        total,
        view.groups.len()
    );
    view
}

/// Computes the view and stores the new order on the ranking (firing its
/// order-changed events).
pub fn update_order(ranking: &mut Ranking, table: &dyn TableData) -> RankingView {
    let view = compute_order(ranking, table);
    ranking.set_order(view.groups.clone());
    view
}

// ============================================================================
// PHASE 1: FILTER
// ============================================================================

/// Keeps a row iff every member column keeps it. Only columns with an
/// active filter are consulted; the AND short-circuits on the first
/// rejection.
fn filter_rows(ranking: &Ranking, table: &dyn TableData) -> Vec<RowIndex> {
    let filters: Vec<&Column> = ranking
        .children()
        .iter()
        .filter(|c| c.is_filtered())
        .collect();
    let n = table.row_count() as RowIndex;
    if filters.is_empty() {
        return (0..n).collect();
    }
    (0..n)
        .filter(|row| filters.iter().all(|c| c.filter(table, *row)))
        .collect()
}

// ============================================================================
// PHASE 2: GROUP
// ============================================================================

/// Buckets the surviving rows by the tuple of group-criteria results,
/// compared by joined group name. Groups appear in first-seen order.
fn group_rows(ranking: &Ranking, table: &dyn TableData, rows: &[RowIndex]) -> Vec<OrderedGroup> {
    let criteria: Vec<&Column> = ranking
        .group_criteria()
        .iter()
        .filter_map(|id| resolve_column(ranking, id))
        .collect();
    if criteria.is_empty() {
        let mut group = OrderedGroup::new(Group::default_group());
        group.order = rows.to_vec();
        return vec![group];
    }

    let mut groups: Vec<OrderedGroup> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    for row in rows {
        let parts: SmallVec<[Group; 2]> =
            criteria.iter().map(|c| c.group(table, *row)).collect();
        let joined = join_groups(&parts);
        let slot = *index.entry(joined.name.clone()).or_insert_with(|| {
            groups.push(OrderedGroup::new(joined));
            groups.len() - 1
        });
        groups[slot].order.push(*row);
    }
    groups
}

// ============================================================================
// PHASE 3 + 4: SORT
// ============================================================================

/// Looks a criterion column up, self-healing dangling references: a
/// criterion whose column left the ranking is skipped.
fn resolve_column<'a>(ranking: &'a Ranking, id: &str) -> Option<&'a Column> {
    let col = ranking.find(id);
    debug_assert!(col.is_some(), "criterion references unknown column {:?}", id);
    if col.is_none() {
        log::warn!("skipping criterion for unknown column {:?}", id);
    }
    col
}

fn resolve_criteria<'a>(
    ranking: &'a Ranking,
    criteria: &[SortCriterion],
) -> Vec<(&'a Column, bool)> {
    criteria
        .iter()
        .filter_map(|c| resolve_column(ranking, &c.column).map(|col| (col, c.asc)))
        .collect()
}

/// Multi-key comparison over pre-extracted keys; each criterion's
/// direction inverts its comparator, ties fall through to the next
/// criterion.
fn compare_key_sets(a: &[CompareKey], b: &[CompareKey], directions: &[bool]) -> Ordering {
    for ((ka, kb), asc) in a.iter().zip(b.iter()).zip(directions.iter()) {
        let mut ord = compare_keys(ka, kb);
        if !asc {
            ord = ord.reverse();
        }
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable multi-key sort of one group's rows.
fn sort_group(table: &dyn TableData, group: &mut OrderedGroup, criteria: &[(&Column, bool)]) {
    let directions: Vec<bool> = criteria.iter().map(|(_, asc)| *asc).collect();
    let mut keyed: Vec<(RowIndex, Vec<CompareKey>)> = group
        .order
        .iter()
        .map(|row| {
            let keys = criteria
                .iter()
                .map(|(col, _)| col.compare_value(table, *row))
                .collect();
            (*row, keys)
        })
        .collect();
    keyed.sort_by(|a, b| compare_key_sets(&a.1, &b.1, &directions));
    group.order = keyed.into_iter().map(|(row, _)| row).collect();
}

/// Stable multi-key sort of the group list itself, keyed by each
/// criterion's whole-group aggregate.
fn sort_groups(table: &dyn TableData, groups: &mut Vec<OrderedGroup>, criteria: &[(&Column, bool)]) {
    let directions: Vec<bool> = criteria.iter().map(|(_, asc)| *asc).collect();
    let mut keyed: Vec<(usize, Vec<CompareKey>)> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let keys = criteria
                .iter()
                .map(|(col, _)| col.group_value(table, &g.order, &g.group))
                .collect();
            (i, keys)
        })
        .collect();
    keyed.sort_by(|a, b| compare_key_sets(&a.1, &b.1, &directions));
    let mut reordered = Vec::with_capacity(groups.len());
    for (i, _) in keyed {
        reordered.push(groups[i].clone());
    }
    *groups = reordered;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LocalTable;
    use ranking_model::{ColumnDesc, DataValue, NumberFilter, SortCriterion};

    /// Rows [{i:0, Bob, 40}, {i:1, Amy, 40}, {i:2, Cid, 25}].
    fn people() -> LocalTable {
        LocalTable::with_rows(
            ["name", "age"],
            vec![
                vec![DataValue::Text("Bob".into()), DataValue::Number(40.0)],
                vec![DataValue::Text("Amy".into()), DataValue::Number(40.0)],
                vec![DataValue::Text("Cid".into()), DataValue::Number(25.0)],
            ],
        )
    }

    fn people_ranking() -> Ranking {
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("name", &ColumnDesc::string("Name", 0)).unwrap());
        r.push(
            Column::from_desc("age", &ColumnDesc::number("Age", 1).with_domain(0.0, 100.0))
                .unwrap(),
        );
        r
    }

    #[test]
    fn test_age_sort_with_stable_tie() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![SortCriterion::new("age", true)]);
        let view = compute_order(&r, &table);
        // Cid first, then the 40-tie keeps original order Bob before Amy
        assert_eq!(view.order, vec![2, 0, 1]);
        assert_eq!(view.rank_of(2), Some(1));
        assert_eq!(view.rank_of(0), Some(2));
        assert_eq!(view.rank_of(1), Some(3));
    }

    #[test]
    fn test_secondary_criterion_breaks_tie() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![
            SortCriterion::new("age", true),
            SortCriterion::new("name", true),
        ]);
        let view = compute_order(&r, &table);
        assert_eq!(view.order, vec![2, 1, 0]); // Cid, Amy, Bob
    }

    #[test]
    fn test_descending_inverts_missing_placement_too() {
        let table = LocalTable::with_rows(
            ["v"],
            vec![
                vec![DataValue::Number(1.0)],
                vec![DataValue::Null],
                vec![DataValue::Number(2.0)],
            ],
        );
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("v", &ColumnDesc::number("V", 0).with_domain(0.0, 10.0)).unwrap());
        r.set_sort_criteria(vec![SortCriterion::new("v", true)]);
        // ascending: missing sorts after present
        assert_eq!(compute_order(&r, &table).order, vec![0, 2, 1]);
        r.set_sort_criteria(vec![SortCriterion::new("v", false)]);
        // descending reverses the whole comparator, missing included
        assert_eq!(compute_order(&r, &table).order, vec![1, 2, 0]);
    }

    #[test]
    fn test_filter_yields_exact_subset() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![SortCriterion::new("name", true)]);
        r.set_number_filter("age", Some(NumberFilter::range(f64::NEG_INFINITY, 30.0)));
        let view = compute_order(&r, &table);
        assert_eq!(view.order, vec![2]);
        assert_eq!(view.rank_of(0), None);
    }

    #[test]
    fn test_empty_criteria_keep_original_order() {
        let table = people();
        let r = people_ranking();
        let view = compute_order(&r, &table);
        assert_eq!(view.order, vec![0, 1, 2]);
        assert_eq!(view.groups.len(), 1);
        assert_eq!(view.groups[0].group, Group::default_group());
    }

    #[test]
    fn test_grouping_first_seen_order() {
        let table = LocalTable::with_rows(
            ["cat"],
            vec![
                vec![DataValue::Text("A".into())],
                vec![DataValue::Text("A".into())],
                vec![DataValue::Text("B".into())],
            ],
        );
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("cat", &ColumnDesc::categorical("Cat", 0, ["A", "B"])).unwrap());
        r.group_by("cat");
        let view = compute_order(&r, &table);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].group.name, "A");
        assert_eq!(view.groups[0].order, vec![0, 1]);
        assert_eq!(view.groups[1].group.name, "B");
        assert_eq!(view.groups[1].order, vec![2]);
    }

    #[test]
    fn test_group_sort_by_size_descending() {
        // counts [1, 2]: A:{0}, B:{1,2} -> descending by count puts B first
        let table = LocalTable::with_rows(
            ["cat"],
            vec![
                vec![DataValue::Text("A".into())],
                vec![DataValue::Text("B".into())],
                vec![DataValue::Text("B".into())],
            ],
        );
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("cat", &ColumnDesc::categorical("Cat", 0, ["A", "B"])).unwrap());
        r.group_by("cat");
        // the rank support column's group key is the group size
        r.set_group_sort_criteria(vec![SortCriterion::new("rank", false)]);
        let view = compute_order(&r, &table);
        assert_eq!(view.groups[0].group.name, "B");
        assert_eq!(view.groups[0].order, vec![1, 2]);
        assert_eq!(view.groups[1].group.name, "A");

        // with counts [2, 1] the order is unchanged by the same criterion
        let table2 = LocalTable::with_rows(
            ["cat"],
            vec![
                vec![DataValue::Text("A".into())],
                vec![DataValue::Text("A".into())],
                vec![DataValue::Text("B".into())],
            ],
        );
        let view2 = compute_order(&r, &table2);
        assert_eq!(view2.groups[0].group.name, "A");
        assert_eq!(view2.groups[1].group.name, "B");
    }

    #[test]
    fn test_two_level_grouping_joins_names() {
        let table = LocalTable::with_rows(
            ["cat", "flag"],
            vec![
                vec![DataValue::Text("A".into()), DataValue::Bool(true)],
                vec![DataValue::Text("A".into()), DataValue::Bool(false)],
                vec![DataValue::Text("A".into()), DataValue::Bool(true)],
            ],
        );
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("cat", &ColumnDesc::categorical("Cat", 0, ["A", "B"])).unwrap());
        r.push(Column::from_desc("flag", &ColumnDesc::boolean("Flag", 1)).unwrap());
        r.group_by("cat");
        r.group_by("flag");
        let view = compute_order(&r, &table);
        assert_eq!(view.groups.len(), 2);
        assert_eq!(view.groups[0].group.name, "A ∧ True");
        assert_eq!(view.groups[0].order, vec![0, 2]);
        assert_eq!(view.groups[1].group.name, "A ∧ False");
    }

    #[test]
    fn test_ranks_are_a_permutation() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![SortCriterion::new("name", false)]);
        let view = compute_order(&r, &table);
        let mut ranks: Vec<u32> = view.order.iter().map(|r| view.rank_of(*r).unwrap()).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_order_stores_ranks_on_ranking() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![SortCriterion::new("age", true)]);
        update_order(&mut r, &table);
        assert_eq!(r.order(), &[2, 0, 1]);
        assert_eq!(r.rank_of(2), Some(1));
    }

    #[test]
    fn test_removing_criterion_column_renumbers_priorities() {
        let table = people();
        let mut r = people_ranking();
        r.set_sort_criteria(vec![
            SortCriterion::new("age", true),
            SortCriterion::new("name", true),
        ]);
        r.remove("age");
        assert_eq!(r.sort_criteria().len(), 1);
        let view = compute_order(&r, &table);
        // the name criterion moved up: Amy, Bob, Cid
        assert_eq!(view.order, vec![1, 0, 2]);
    }

    #[test]
    fn test_stability_under_equal_keys() {
        let rows: Vec<Vec<DataValue>> = (0..50)
            .map(|i| vec![DataValue::Number((i % 3) as f64)])
            .collect();
        let table = LocalTable::with_rows(["v"], rows);
        let mut r = Ranking::new("r");
        r.push(Column::from_desc("v", &ColumnDesc::number("V", 0).with_domain(0.0, 3.0)).unwrap());
        r.set_sort_criteria(vec![SortCriterion::new("v", true)]);
        let view = compute_order(&r, &table);
        // within each value class the original row order is preserved
        for window in view.order.windows(2) {
            let (a, b) = (window[0], window[1]);
            if a % 3 == b % 3 {
                assert!(a < b, "stable sort reordered equal rows {} and {}", a, b);
            }
        }
    }
}
