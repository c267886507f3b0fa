//! FILENAME: ranking-engine/src/table.rs
//! An in-memory row source backing the order computation. Rows are stored
//! as value vectors addressed by field index; the stable row index is the
//! row handle the engine and the views trade in.

use rustc_hash::FxHashSet;

use ranking_model::{DataValue, FieldIndex, RowIndex, TableData};

#[derive(Debug, Clone, Default)]
pub struct LocalTable {
    fields: Vec<String>,
    rows: Vec<Vec<DataValue>>,
    selection: FxHashSet<RowIndex>,
}

impl LocalTable {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LocalTable {
            fields: fields.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            selection: FxHashSet::default(),
        }
    }

    pub fn with_rows<I, S>(fields: I, rows: Vec<Vec<DataValue>>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut t = Self::new(fields);
        t.rows = rows;
        t
    }

    /// Appends a row; short rows read as missing in the absent fields.
    pub fn add_row(&mut self, values: Vec<DataValue>) -> RowIndex {
        self.rows.push(values);
        (self.rows.len() - 1) as RowIndex
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn set_selected(&mut self, row: RowIndex, selected: bool) {
        if selected {
            self.selection.insert(row);
        } else {
            self.selection.remove(&row);
        }
    }
}

impl TableData for LocalTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: RowIndex, field: FieldIndex) -> DataValue {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(field))
            .cloned()
            .unwrap_or(DataValue::Null)
    }

    fn is_selected(&self, row: RowIndex) -> bool {
        self.selection.contains(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_read_as_null() {
        let mut t = LocalTable::new(["a", "b"]);
        t.add_row(vec![DataValue::Number(1.0)]);
        assert_eq!(t.value(0, 0), DataValue::Number(1.0));
        assert_eq!(t.value(0, 1), DataValue::Null);
        assert_eq!(t.value(5, 0), DataValue::Null);
    }

    #[test]
    fn test_selection() {
        let mut t = LocalTable::new(["a"]);
        t.add_row(vec![DataValue::Number(1.0)]);
        assert!(!t.is_selected(0));
        t.set_selected(0, true);
        assert!(t.is_selected(0));
        t.set_selected(0, false);
        assert!(!t.is_selected(0));
    }

    #[test]
    fn test_field_lookup() {
        let t = LocalTable::new(["name", "age"]);
        assert_eq!(t.field_index("age"), Some(1));
        assert_eq!(t.field_index("nope"), None);
    }
}
