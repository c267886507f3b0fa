//! FILENAME: ranking-model/src/group.rs
//! Groups: named, colored buckets of rows sharing identical group-criteria
//! results. Produced by the order computation, not stored long-term.

use serde::{Deserialize, Serialize};

use crate::value::RowIndex;

pub const DEFAULT_GROUP_NAME: &str = "Default";
pub const MISSING_GROUP_NAME: &str = "Missing values";
pub const DEFAULT_GROUP_COLOR: &str = "gray";

/// A group descriptor. Identity is the `name`; two groups with equal names
/// are the same bucket regardless of where the descriptor was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub color: String,
}

impl Group {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Group {
            name: name.into(),
            color: color.into(),
        }
    }

    /// The single catch-all group used when no grouping is active or a
    /// column does not stratify.
    pub fn default_group() -> Self {
        Group::new(DEFAULT_GROUP_NAME, DEFAULT_GROUP_COLOR)
    }

    /// The bucket for rows whose group value is missing.
    pub fn missing_group() -> Self {
        Group::new(MISSING_GROUP_NAME, DEFAULT_GROUP_COLOR)
    }
}

impl Default for Group {
    fn default() -> Self {
        Group::default_group()
    }
}

/// Combines the per-criterion group descriptors of one row into the
/// composite bucket descriptor: names joined, color of the first.
pub fn join_groups(groups: &[Group]) -> Group {
    debug_assert!(!groups.is_empty());
    match groups {
        [] => Group::default_group(),
        [single] => single.clone(),
        many => Group {
            name: many
                .iter()
                .map(|g| g.name.as_str())
                .collect::<Vec<_>>()
                .join(" ∧ "),
            color: many[0].color.clone(),
        },
    }
}

/// A materialized group: the descriptor plus the ordered row indices that
/// belong to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedGroup {
    #[serde(flatten)]
    pub group: Group,
    pub order: Vec<RowIndex>,
}

impl OrderedGroup {
    pub fn new(group: Group) -> Self {
        OrderedGroup {
            group,
            order: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_single_is_identity() {
        let g = Group::new("A", "blue");
        assert_eq!(join_groups(&[g.clone()]), g);
    }

    #[test]
    fn test_join_concatenates_names_keeps_first_color() {
        let a = Group::new("A", "blue");
        let b = Group::new("B", "red");
        let joined = join_groups(&[a, b]);
        assert_eq!(joined.name, "A ∧ B");
        assert_eq!(joined.color, "blue");
    }

    #[test]
    fn test_default_and_missing_groups_differ() {
        assert_ne!(Group::default_group().name, Group::missing_group().name);
    }
}
