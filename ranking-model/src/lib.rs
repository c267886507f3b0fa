//! FILENAME: ranking-model/src/lib.rs
//! PURPOSE: Main library entry point for the ranking data model.
//! CONTEXT: Typed columns over an in-memory table, composable into
//! weighted/nested/reduced composites, collected into a Ranking that owns
//! the sort/group/group-sort criteria and classifies every mutation into
//! dirty buckets for its consumers. The order computation itself lives in
//! the `ranking-engine` crate.

pub mod categorical;
pub mod column;
pub mod composite;
pub mod definition;
pub mod dump;
pub mod event;
pub mod group;
pub mod number;
pub mod ranking;
pub mod registry;
pub mod text;
pub mod value;

// Re-export commonly used types at the crate root
pub use categorical::{BooleanColumn, CategoricalColumn, CategoricalFilter, Category, CATEGORY_PALETTE};
pub use column::{fix_css, Column, ColumnKind, ColumnMeta, DEFAULT_COLOR, DEFAULT_WIDTH};
pub use composite::{CompositeColumn, CompositeKind, WEIGHT_EPSILON};
pub use definition::{CategoryDesc, ColumnDesc, ReduceOp, SortMethod};
pub use dump::{dump_column, restore_column, ColumnDump, DumpError, FilterDump, RankingDump};
pub use event::{Event, EventBus, EventPayload, EventType, Handler};
pub use group::{join_groups, Group, OrderedGroup};
pub use number::{LinearMapping, NumberColumn, NumberFilter};
pub use ranking::{Ranking, SortCriterion, DEFAULT_MAX_GROUP_CRITERIA};
pub use registry::{ColumnFactory, ColumnRegistry, FactoryFn};
pub use text::{TextColumn, TextFilter};
pub use value::{
    compare_keys, compare_values, similar, CompareKey, CompareKeyType, CompareValue,
    CompareValueType, DataValue, FieldIndex, RowIndex, TableData, FIRST_IS_MISSING,
};
