//! FILENAME: ranking-model/src/column.rs
//! The column core: identity, layout/renderer metadata, the non-owning
//! parent back-reference, and the closed set of column kinds with all
//! contract dispatch (value, compare, filter, group) in one place.
//!
//! Columns are pure readers over the row source; mutation goes through the
//! owning `Ranking`, which fires the classified events.

use smallvec::smallvec;

use crate::categorical::{boolean_group, BooleanColumn, CategoricalColumn};
use crate::composite::{CompositeColumn, CompositeKind};
use crate::definition::{
    ColumnDesc, TYPE_BOOLEAN, TYPE_CATEGORICAL, TYPE_IMPOSITION, TYPE_NESTED, TYPE_NUMBER,
    TYPE_RANK, TYPE_REDUCE, TYPE_STACK, TYPE_STRING,
};
use crate::group::Group;
use crate::number::NumberColumn;
use crate::text::TextColumn;
use crate::value::{
    str_compare_value, CompareKey, CompareKeyType, CompareValue, CompareValueType, DataValue,
    RowIndex, TableData,
};

/// Default column color when neither description nor metadata set one.
pub const DEFAULT_COLOR: &str = "#C1C1C1";

/// Default column width in pixels.
pub const DEFAULT_WIDTH: f64 = 100.0;

/// Width comparisons use this delta for the no-op guard.
pub const WIDTH_DELTA: f64 = 0.5;

/// Converts an id into a CSS-compatible one.
pub fn fix_css(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Mutable label/description/color metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub label: String,
    pub description: String,
    pub color: String,
}

/// The closed set of column kinds.
#[derive(Debug, Clone)]
pub enum ColumnKind {
    /// The rank support column: 1-based position in the current order.
    Rank,
    Number(NumberColumn),
    Text(TextColumn),
    Boolean(BooleanColumn),
    Categorical(CategoricalColumn),
    Composite(CompositeColumn),
}

#[derive(Debug, Clone)]
pub struct Column {
    id: String,
    desc: ColumnDesc,
    width: f64,
    visible: bool,
    meta: ColumnMeta,
    renderer: String,
    group_renderer: String,
    summary_renderer: String,
    /// Id of the owning container; non-owning back-reference only.
    parent: Option<String>,
    pub(crate) kind: ColumnKind,
}

impl Column {
    pub fn new(id: &str, desc: ColumnDesc, kind: ColumnKind) -> Self {
        let id = fix_css(id);
        let meta = ColumnMeta {
            label: if desc.label.is_empty() {
                id.clone()
            } else {
                desc.label.clone()
            },
            description: desc.description.clone(),
            color: desc.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        };
        let ty = desc.column_type.clone();
        let mut col = Column {
            id,
            width: DEFAULT_WIDTH,
            visible: true,
            meta,
            renderer: desc.renderer.clone().unwrap_or_else(|| ty.clone()),
            group_renderer: desc.group_renderer.clone().unwrap_or_else(|| ty.clone()),
            summary_renderer: desc.summary_renderer.clone().unwrap_or(ty),
            parent: None,
            kind,
            desc,
        };
        col.claim_children();
        col
    }

    /// Builds a column (and, for composites, its subtree) from a
    /// description. Unknown type tags yield `None`.
    pub fn from_desc(id: &str, desc: &ColumnDesc) -> Option<Column> {
        let kind = match desc.column_type.as_str() {
            TYPE_RANK => ColumnKind::Rank,
            TYPE_NUMBER => ColumnKind::Number(NumberColumn::from_desc(desc)),
            TYPE_STRING => ColumnKind::Text(TextColumn::default()),
            TYPE_BOOLEAN => ColumnKind::Boolean(BooleanColumn::default()),
            TYPE_CATEGORICAL => ColumnKind::Categorical(CategoricalColumn::from_desc(desc)),
            TYPE_STACK => ColumnKind::Composite(CompositeColumn::new(CompositeKind::Stack {
                weights: Vec::new(),
            })),
            TYPE_NESTED => ColumnKind::Composite(CompositeColumn::new(CompositeKind::Nested)),
            TYPE_REDUCE => ColumnKind::Composite(CompositeColumn::new(CompositeKind::Reduce {
                op: desc.reduce.unwrap_or_default(),
            })),
            TYPE_IMPOSITION => ColumnKind::Composite(CompositeColumn::new(CompositeKind::Imposition)),
            _ => return None,
        };
        let mut col = Column::new(id, desc.clone(), kind);
        if let ColumnKind::Composite(composite) = &mut col.kind {
            for (i, child_desc) in desc.children.iter().enumerate() {
                let child_id = format!("{}_{}", col.id, i);
                if let Some(child) = Column::from_desc(&child_id, child_desc) {
                    composite.insert_child(composite.len(), child, None);
                }
            }
        }
        col.claim_children();
        Some(col)
    }

    // ------------------------------------------------------------------
    // identity and metadata
    // ------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn desc(&self) -> &ColumnDesc {
        &self.desc
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    /// A column is hidden when invisible or collapsed to zero width.
    pub fn is_hidden(&self) -> bool {
        !self.visible || self.width <= 0.0
    }

    pub fn label(&self) -> &str {
        &self.meta.label
    }

    pub fn description(&self) -> &str {
        &self.meta.description
    }

    pub fn color(&self) -> &str {
        &self.meta.color
    }

    pub fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    pub fn group_renderer(&self) -> &str {
        &self.group_renderer
    }

    pub fn summary_renderer(&self) -> &str {
        &self.summary_renderer
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_fixed(&self) -> bool {
        self.desc.fixed
    }

    // ------------------------------------------------------------------
    // kind accessors
    // ------------------------------------------------------------------

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn type_tag(&self) -> &str {
        &self.desc.column_type
    }

    pub fn as_number(&self) -> Option<&NumberColumn> {
        match &self.kind {
            ColumnKind::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextColumn> {
        match &self.kind {
            ColumnKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&BooleanColumn> {
        match &self.kind {
            ColumnKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&CategoricalColumn> {
        match &self.kind {
            ColumnKind::Categorical(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeColumn> {
        match &self.kind {
            ColumnKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    pub(crate) fn as_composite_mut(&mut self) -> Option<&mut CompositeColumn> {
        match &mut self.kind {
            ColumnKind::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the column produces a numeric value.
    pub fn is_numeric(&self) -> bool {
        match &self.kind {
            ColumnKind::Number(_) => true,
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Stack { .. } | CompositeKind::Reduce { .. } => true,
                CompositeKind::Imposition => c.value_child().is_some(),
                CompositeKind::Nested => false,
            },
            _ => false,
        }
    }

    pub fn is_categorical_like(&self) -> bool {
        matches!(self.kind, ColumnKind::Categorical(_) | ColumnKind::Boolean(_))
    }

    // ------------------------------------------------------------------
    // value contract
    // ------------------------------------------------------------------

    fn raw(&self, table: &dyn TableData, row: RowIndex) -> DataValue {
        match self.desc.field {
            Some(field) => table.value(row, field),
            None => DataValue::Null,
        }
    }

    /// The raw domain value; `Null` for missing and for support columns.
    /// Numeric columns coerce parseable text, so a malformed row degrades
    /// to missing instead of leaking the raw payload.
    pub fn value(&self, table: &dyn TableData, row: RowIndex) -> DataValue {
        match &self.kind {
            ColumnKind::Rank => DataValue::Null,
            ColumnKind::Number(_) => match self.raw(table, row).as_f64() {
                Some(v) if !v.is_nan() => DataValue::Number(v),
                _ => DataValue::Null,
            },
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => DataValue::Null,
                _ => {
                    let v = c.number_value(table, row);
                    if v.is_nan() {
                        DataValue::Null
                    } else {
                        DataValue::Number(v)
                    }
                }
            },
            _ => self.raw(table, row),
        }
    }

    /// Normalized numeric value in [0, 1]; NaN encodes missing and
    /// non-numeric columns.
    pub fn number_value(&self, table: &dyn TableData, row: RowIndex) -> f64 {
        match &self.kind {
            ColumnKind::Number(n) => n.normalize(self.raw(table, row).as_f64()),
            ColumnKind::Composite(c) => c.number_value(table, row),
            ColumnKind::Boolean(_) => match self.raw(table, row).as_bool() {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    pub fn is_missing(&self, table: &dyn TableData, row: RowIndex) -> bool {
        self.value(table, row).is_missing()
    }

    /// Display label of a row's value; missing renders as the empty string.
    pub fn label_for(&self, table: &dyn TableData, row: RowIndex) -> String {
        match &self.kind {
            ColumnKind::Categorical(c) => {
                let raw = self.raw(table, row);
                match raw.as_text().and_then(|v| c.index_of(v)) {
                    Some(i) => c.categories()[i].label.clone(),
                    None => String::new(),
                }
            }
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => c
                    .children()
                    .iter()
                    .map(|child| child.label_for(table, row))
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => self.value(table, row).label(),
            },
            _ => self.value(table, row).label(),
        }
    }

    // ------------------------------------------------------------------
    // comparison contract
    // ------------------------------------------------------------------

    /// The compare key of a row. Multi-part for nested composites; empty
    /// for support columns (stable order decides).
    pub fn compare_value(&self, table: &dyn TableData, row: RowIndex) -> CompareKey {
        match &self.kind {
            ColumnKind::Rank => smallvec![],
            ColumnKind::Number(_) => smallvec![CompareValue::Float(self.number_value(table, row))],
            ColumnKind::Text(_) => {
                let raw = self.raw(table, row);
                smallvec![str_compare_value(raw.as_text())]
            }
            ColumnKind::Boolean(_) => {
                smallvec![CompareValue::Binary(self.raw(table, row).as_bool())]
            }
            ColumnKind::Categorical(c) => {
                let raw = self.raw(table, row);
                smallvec![c.compare_for(raw.as_text())]
            }
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => {
                    let mut key = CompareKey::new();
                    for child in c.children() {
                        key.extend(child.compare_value(table, row));
                    }
                    key
                }
                _ => smallvec![CompareValue::Float(c.number_value(table, row))],
            },
        }
    }

    /// The kinds of the parts `compare_value` produces, so the sort
    /// routine binds comparators without per-call inspection.
    pub fn compare_value_type(&self) -> CompareKeyType {
        match &self.kind {
            ColumnKind::Rank => smallvec![],
            ColumnKind::Number(_) => smallvec![CompareValueType::FloatAsc],
            ColumnKind::Text(_) => smallvec![CompareValueType::String],
            ColumnKind::Boolean(_) => smallvec![CompareValueType::Binary],
            ColumnKind::Categorical(_) => smallvec![CompareValueType::Uint8],
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => {
                    let mut types = CompareKeyType::new();
                    for child in c.children() {
                        types.extend(child.compare_value_type());
                    }
                    types
                }
                _ => smallvec![CompareValueType::FloatAsc],
            },
        }
    }

    // ------------------------------------------------------------------
    // filter contract
    // ------------------------------------------------------------------

    /// Whether the row passes this column's filter; unfiltered columns
    /// accept everything.
    pub fn filter(&self, table: &dyn TableData, row: RowIndex) -> bool {
        match &self.kind {
            ColumnKind::Rank => true,
            ColumnKind::Number(n) => n.accepts(self.raw(table, row).as_f64()),
            ColumnKind::Text(t) => {
                let raw = self.raw(table, row);
                t.accepts(raw.as_text())
            }
            ColumnKind::Boolean(b) => b.accepts(self.raw(table, row).as_bool()),
            ColumnKind::Categorical(c) => {
                let raw = self.raw(table, row);
                c.accepts(raw.as_text())
            }
            ColumnKind::Composite(c) => c.filter(table, row),
        }
    }

    pub fn is_filtered(&self) -> bool {
        match &self.kind {
            ColumnKind::Rank => false,
            ColumnKind::Number(n) => n.is_filtered(),
            ColumnKind::Text(t) => t.is_filtered(),
            ColumnKind::Boolean(b) => b.is_filtered(),
            ColumnKind::Categorical(c) => c.is_filtered(),
            ColumnKind::Composite(c) => c.is_filtered(),
        }
    }

    // ------------------------------------------------------------------
    // grouping contract
    // ------------------------------------------------------------------

    /// Whether this column can stratify rows into discrete groups.
    pub fn can_group(&self) -> bool {
        match &self.kind {
            ColumnKind::Rank => false,
            ColumnKind::Number(n) => n.can_group(),
            ColumnKind::Text(_) => false,
            ColumnKind::Boolean(_) => true,
            ColumnKind::Categorical(c) => !c.categories().is_empty(),
            ColumnKind::Composite(c) => c.can_group(),
        }
    }

    /// The group a row belongs to; columns that do not stratify put every
    /// row in the default group.
    pub fn group(&self, table: &dyn TableData, row: RowIndex) -> Group {
        match &self.kind {
            ColumnKind::Number(n) => n.group_for(self.raw(table, row).as_f64()),
            ColumnKind::Boolean(_) => boolean_group(self.raw(table, row).as_bool()),
            ColumnKind::Categorical(c) => {
                let raw = self.raw(table, row);
                c.group_for(raw.as_text())
            }
            ColumnKind::Composite(c) => c.group(table, row),
            _ => Group::default_group(),
        }
    }

    /// Aggregates an entire group into one compare key; used only when
    /// this column is a group-sort criterion.
    pub fn group_value(&self, table: &dyn TableData, rows: &[RowIndex], group: &Group) -> CompareKey {
        match &self.kind {
            ColumnKind::Rank => smallvec![CompareValue::Count(rows.len() as u32)],
            ColumnKind::Number(n) => {
                let raws: Vec<f64> = rows
                    .iter()
                    .filter_map(|r| self.raw(table, *r).as_f64())
                    .collect();
                smallvec![CompareValue::Float(n.group_aggregate(&raws))]
            }
            ColumnKind::Text(_) => smallvec![str_compare_value(Some(&group.name))],
            ColumnKind::Boolean(_) => {
                let (majority, count) = BooleanColumn::majority(
                    rows.iter().map(|r| self.raw(table, *r).as_bool()),
                );
                smallvec![CompareValue::Binary(majority), CompareValue::Count(count)]
            }
            ColumnKind::Categorical(c) => {
                let raw_values: Vec<DataValue> =
                    rows.iter().map(|r| self.raw(table, *r)).collect();
                match c.most_frequent(raw_values.iter().map(DataValue::as_text)) {
                    Some((idx, count)) => smallvec![
                        CompareValue::Uint8(Some(idx.min(u8::MAX as usize) as u8)),
                        CompareValue::Count(count),
                    ],
                    None => smallvec![CompareValue::Uint8(None), CompareValue::Count(0)],
                }
            }
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => {
                    let mut key = CompareKey::new();
                    for child in c.children() {
                        key.extend(child.group_value(table, rows, group));
                    }
                    key
                }
                _ => smallvec![CompareValue::Float(c.group_number_value(table, rows))],
            },
        }
    }

    pub fn group_value_type(&self) -> CompareKeyType {
        match &self.kind {
            ColumnKind::Rank => smallvec![CompareValueType::Count],
            ColumnKind::Number(_) => smallvec![CompareValueType::FloatAsc],
            ColumnKind::Text(_) => smallvec![CompareValueType::String],
            ColumnKind::Boolean(_) => {
                smallvec![CompareValueType::Binary, CompareValueType::Count]
            }
            ColumnKind::Categorical(_) => {
                smallvec![CompareValueType::Uint8, CompareValueType::Count]
            }
            ColumnKind::Composite(c) => match c.variant() {
                CompositeKind::Nested => {
                    let mut types = CompareKeyType::new();
                    for child in c.children() {
                        types.extend(child.group_value_type());
                    }
                    types
                }
                _ => smallvec![CompareValueType::FloatAsc],
            },
        }
    }

    // ------------------------------------------------------------------
    // tree navigation
    // ------------------------------------------------------------------

    pub fn children(&self) -> &[Column] {
        self.as_composite().map_or(&[], CompositeColumn::children)
    }

    /// Finds a column by id in this subtree, including self.
    pub fn find(&self, id: &str) -> Option<&Column> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Column> {
        if self.id == id {
            return Some(self);
        }
        match &mut self.kind {
            ColumnKind::Composite(c) => c.children.iter_mut().find_map(|c| c.find_mut(id)),
            _ => None,
        }
    }

    /// Depth-first flattening of this subtree.
    pub fn flatten<'a>(&'a self, out: &mut Vec<&'a Column>) {
        out.push(self);
        for child in self.children() {
            child.flatten(out);
        }
    }

    // ------------------------------------------------------------------
    // attachment (crate-internal; the ranking fires the events)
    // ------------------------------------------------------------------

    pub(crate) fn attach(&mut self, parent: &str) {
        self.parent = Some(parent.to_string());
    }

    pub(crate) fn detach(&mut self) {
        self.parent = None;
    }

    /// Points all direct children back at this column.
    pub(crate) fn claim_children(&mut self) {
        let id = self.id.clone();
        if let ColumnKind::Composite(c) = &mut self.kind {
            for child in &mut c.children {
                child.attach(&id);
            }
        }
    }

    // ------------------------------------------------------------------
    // raw state mutation (crate-internal; see Ranking for the event side)
    // ------------------------------------------------------------------

    pub(crate) fn set_width_impl(&mut self, width: f64) {
        self.width = width.max(0.0);
    }

    pub(crate) fn set_visible_impl(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_meta_impl(&mut self, meta: ColumnMeta) {
        self.meta = meta;
    }

    pub(crate) fn set_renderer_impl(&mut self, renderer: &str) {
        self.renderer = renderer.to_string();
    }

    pub(crate) fn set_group_renderer_impl(&mut self, renderer: &str) {
        self.group_renderer = renderer.to_string();
    }

    pub(crate) fn set_summary_renderer_impl(&mut self, renderer: &str) {
        self.summary_renderer = renderer.to_string();
    }
}
