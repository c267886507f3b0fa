//! FILENAME: ranking-model/src/registry.rs
//! The column type registry: an explicit, constructed-once mapping from
//! type tags to factories. Passed into restore and the surrounding
//! provider instead of living as a hidden module-level singleton.

use rustc_hash::FxHashMap;

use crate::column::Column;
use crate::definition::{
    ColumnDesc, TYPE_BOOLEAN, TYPE_CATEGORICAL, TYPE_IMPOSITION, TYPE_NESTED, TYPE_NUMBER,
    TYPE_RANK, TYPE_REDUCE, TYPE_STACK, TYPE_STRING,
};

/// Builds a live column from an id and its description.
pub type FactoryFn = fn(&str, &ColumnDesc) -> Option<Column>;

pub struct ColumnRegistry {
    factories: FxHashMap<String, FactoryFn>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        ColumnRegistry {
            factories: FxHashMap::default(),
        }
    }

    /// A registry with all built-in column types registered.
    pub fn with_default_types() -> Self {
        let mut r = Self::new();
        for tag in [
            TYPE_RANK,
            TYPE_NUMBER,
            TYPE_STRING,
            TYPE_BOOLEAN,
            TYPE_CATEGORICAL,
            TYPE_STACK,
            TYPE_NESTED,
            TYPE_REDUCE,
            TYPE_IMPOSITION,
        ] {
            r.register(tag, Column::from_desc);
        }
        r
    }

    pub fn register(&mut self, tag: &str, factory: FactoryFn) {
        self.factories.insert(tag.to_string(), factory);
    }

    pub fn knows(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Builds a column for `desc`; `None` for unregistered type tags.
    pub fn create(&self, id: &str, desc: &ColumnDesc) -> Option<Column> {
        self.factories.get(&desc.column_type)?(id, desc)
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::with_default_types()
    }
}

/// Wraps a registry with sequential id generation, the way the
/// surrounding provider hands out column ids.
pub struct ColumnFactory {
    registry: ColumnRegistry,
    next: u32,
}

impl ColumnFactory {
    pub fn new(registry: ColumnRegistry) -> Self {
        ColumnFactory { registry, next: 1 }
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    /// Creates a column under a fresh generated id.
    pub fn create(&mut self, desc: &ColumnDesc) -> Option<Column> {
        let id = format!("col{}", self.next);
        let col = self.registry.create(&id, desc)?;
        self.next += 1;
        Some(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_knows_builtins() {
        let r = ColumnRegistry::with_default_types();
        assert!(r.knows(TYPE_NUMBER));
        assert!(r.knows(TYPE_STACK));
        assert!(!r.knows("hierarchy"));
        assert!(r.create("c", &ColumnDesc::number("Age", 0)).is_some());
    }

    #[test]
    fn test_unknown_type_yields_none() {
        let r = ColumnRegistry::with_default_types();
        let mut desc = ColumnDesc::number("X", 0);
        desc.column_type = "unknown".to_string();
        assert!(r.create("c", &desc).is_none());
    }

    #[test]
    fn test_factory_generates_sequential_ids() {
        let mut f = ColumnFactory::new(ColumnRegistry::with_default_types());
        let a = f.create(&ColumnDesc::number("A", 0)).unwrap();
        let b = f.create(&ColumnDesc::number("B", 1)).unwrap();
        assert_eq!(a.id(), "col1");
        assert_eq!(b.id(), "col2");
    }

    #[test]
    fn test_custom_factory_registration() {
        fn renamed(id: &str, desc: &ColumnDesc) -> Option<Column> {
            let mut desc = desc.clone();
            desc.column_type = TYPE_STRING.to_string();
            Column::from_desc(id, &desc)
        }
        let mut r = ColumnRegistry::with_default_types();
        r.register("annotation", renamed);
        let mut desc = ColumnDesc::string("Note", 0);
        desc.column_type = "annotation".to_string();
        let col = r.create("c", &desc).unwrap();
        assert!(col.as_text().is_some());
    }
}
