//! FILENAME: ranking-model/src/dump.rs
//! Dump/restore: the JSON-compatible persisted form of columns and
//! rankings.
//!
//! Dumps are minimal: fields equal to the type's default are omitted, and
//! restore tolerates missing optionals by falling back to the
//! description-derived defaults. Restoration is silent — no events fire;
//! only subsequent mutations do. Undecodable column dumps and criteria
//! referencing unknown column ids are dropped, not fatal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::categorical::CategoricalFilter;
use crate::column::{Column, ColumnKind, ColumnMeta, DEFAULT_COLOR, DEFAULT_WIDTH};
use crate::composite::CompositeKind;
use crate::definition::{ColumnDesc, ReduceOp, SortMethod, TYPE_RANK};
use crate::number::{LinearMapping, NumberFilter};
use crate::ranking::{Ranking, SortCriterion};
use crate::registry::ColumnRegistry;
use crate::text::TextFilter;
use crate::value::similar;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("dump serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// FILTER DUMPS
// ============================================================================

/// The serialized filter state of a column, tagged by filter family.
/// Numeric bounds are optional so that half-open ranges stay
/// JSON-compatible (JSON has no infinities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterDump {
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        filter_missing: bool,
    },
    String {
        pattern: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_regex: bool,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        filter_missing: bool,
    },
    Categorical {
        categories: Vec<String>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        filter_missing: bool,
    },
    Boolean {
        value: bool,
    },
}

impl FilterDump {
    fn from_number(f: &NumberFilter) -> Self {
        FilterDump::Number {
            min: f.min.is_finite().then_some(f.min),
            max: f.max.is_finite().then_some(f.max),
            filter_missing: f.filter_missing,
        }
    }

    fn into_number(self) -> Option<NumberFilter> {
        match self {
            FilterDump::Number {
                min,
                max,
                filter_missing,
            } => Some(NumberFilter {
                min: min.unwrap_or(f64::NEG_INFINITY),
                max: max.unwrap_or(f64::INFINITY),
                filter_missing,
            }),
            _ => None,
        }
    }
}

// ============================================================================
// COLUMN DUMP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDump {
    pub id: String,
    pub desc: ColumnDesc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_renderer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDump>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_method: Option<SortMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_thresholds: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduce: Option<ReduceOp>,
    /// Present (possibly empty) for composites, absent otherwise; the live
    /// structure wins over `desc.children`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ColumnDump>>,
}

/// Dumps one column (and its subtree), omitting default-valued fields.
pub fn dump_column(col: &Column) -> ColumnDump {
    let desc = col.desc();
    let default_label = if desc.label.is_empty() {
        col.id()
    } else {
        &desc.label
    };
    let default_color = desc.color.as_deref().unwrap_or(DEFAULT_COLOR);
    let ty = desc.column_type.as_str();

    let mut dump = ColumnDump {
        id: col.id().to_string(),
        desc: desc.clone(),
        width: (!similar(col.width(), DEFAULT_WIDTH, 1e-9)).then(|| col.width()),
        label: (col.label() != default_label).then(|| col.label().to_string()),
        description: (col.description() != desc.description)
            .then(|| col.description().to_string()),
        color: (col.color() != default_color).then(|| col.color().to_string()),
        visible: (!col.visible()).then_some(false),
        renderer: (col.renderer() != desc.renderer.as_deref().unwrap_or(ty))
            .then(|| col.renderer().to_string()),
        group_renderer: (col.group_renderer() != desc.group_renderer.as_deref().unwrap_or(ty))
            .then(|| col.group_renderer().to_string()),
        summary_renderer: (col.summary_renderer()
            != desc.summary_renderer.as_deref().unwrap_or(ty))
        .then(|| col.summary_renderer().to_string()),
        filter: None,
        sort_method: None,
        group_thresholds: None,
        domain: None,
        weights: None,
        reduce: None,
        children: None,
    };

    match col.kind() {
        ColumnKind::Number(n) => {
            dump.filter = n.filter().map(FilterDump::from_number);
            let default_method = desc.sort_method.unwrap_or_default();
            if n.sort_method() != default_method {
                dump.sort_method = Some(n.sort_method());
            }
            if !n.group_thresholds().is_empty() {
                dump.group_thresholds = Some(n.group_thresholds().to_vec());
            }
            let default_domain = desc.domain.unwrap_or([0.0, 1.0]);
            if !n.mapping().is_similar(&LinearMapping::new(default_domain)) {
                dump.domain = Some(n.mapping().domain);
            }
        }
        ColumnKind::Text(t) => {
            dump.filter = t.filter().map(|f| FilterDump::String {
                pattern: f.pattern.clone(),
                is_regex: f.is_regex,
                filter_missing: f.filter_missing,
            });
        }
        ColumnKind::Boolean(b) => {
            dump.filter = b.filter().map(|value| FilterDump::Boolean { value });
        }
        ColumnKind::Categorical(c) => {
            dump.filter = c.filter().map(|f| FilterDump::Categorical {
                categories: f.categories.clone(),
                filter_missing: f.filter_missing,
            });
        }
        ColumnKind::Composite(c) => {
            dump.children = Some(c.children().iter().map(dump_column).collect());
            if let CompositeKind::Stack { weights } = c.variant() {
                let n = weights.len();
                let equal_shares =
                    n == 0 || weights.iter().all(|w| similar(*w, 1.0 / n as f64, 1e-9));
                if !equal_shares {
                    dump.weights = Some(weights.clone());
                }
            }
            if let CompositeKind::Reduce { op } = c.variant() {
                if *op != desc.reduce.unwrap_or_default() {
                    dump.reduce = Some(*op);
                }
            }
        }
        ColumnKind::Rank => {}
    }
    dump
}

/// Restores a column from its dump through the registry factory. Unknown
/// types yield `None`; unknown fields were already discarded by
/// deserialization; missing fields keep the description-derived defaults.
pub fn restore_column(registry: &ColumnRegistry, dump: &ColumnDump) -> Option<Column> {
    let mut col = match registry.create(&dump.id, &dump.desc) {
        Some(c) => c,
        None => {
            log::warn!(
                "dropping column dump {:?}: unknown type {:?}",
                dump.id,
                dump.desc.column_type
            );
            return None;
        }
    };

    if let Some(width) = dump.width {
        col.set_width_impl(width);
    }
    if let Some(visible) = dump.visible {
        col.set_visible_impl(visible);
    }
    let meta = ColumnMeta {
        label: dump.label.clone().unwrap_or_else(|| col.label().to_string()),
        description: dump
            .description
            .clone()
            .unwrap_or_else(|| col.description().to_string()),
        color: dump.color.clone().unwrap_or_else(|| col.color().to_string()),
    };
    col.set_meta_impl(meta);
    if let Some(r) = &dump.renderer {
        col.set_renderer_impl(r);
    }
    if let Some(r) = &dump.group_renderer {
        col.set_group_renderer_impl(r);
    }
    if let Some(r) = &dump.summary_renderer {
        col.set_summary_renderer_impl(r);
    }

    match &mut col.kind {
        ColumnKind::Number(n) => {
            if let Some(domain) = dump.domain {
                n.mapping = LinearMapping::new(domain);
            }
            if let Some(method) = dump.sort_method {
                n.sort_method = method;
            }
            if let Some(ts) = &dump.group_thresholds {
                n.group_thresholds = ts.clone();
            }
            if let Some(f) = dump.filter.clone() {
                n.filter = f.into_number();
            }
        }
        ColumnKind::Text(t) => {
            if let Some(FilterDump::String {
                pattern,
                is_regex,
                filter_missing,
            }) = dump.filter.clone()
            {
                let mut f = TextFilter::substring(pattern);
                f.is_regex = is_regex;
                f.filter_missing = filter_missing;
                f.compile();
                t.filter = Some(f);
            }
        }
        ColumnKind::Boolean(b) => {
            if let Some(FilterDump::Boolean { value }) = &dump.filter {
                b.filter = Some(*value);
            }
        }
        ColumnKind::Categorical(c) => {
            if let Some(FilterDump::Categorical {
                categories,
                filter_missing,
            }) = dump.filter.clone()
            {
                c.filter = c.normalize_filter(Some(CategoricalFilter {
                    categories,
                    filter_missing,
                }));
            }
        }
        ColumnKind::Composite(composite) => {
            if let Some(children) = &dump.children {
                composite.children.clear();
                if let CompositeKind::Stack { weights } = &mut composite.variant {
                    weights.clear();
                }
                for child_dump in children {
                    if let Some(child) = restore_column(registry, child_dump) {
                        composite.insert_child(composite.len(), child, None);
                    }
                }
                if let Some(weights) = &dump.weights {
                    composite.set_weights(weights);
                }
            }
        }
        ColumnKind::Rank => {}
    }
    col.claim_children();
    Some(col)
}

// ============================================================================
// RANKING DUMP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortCriterionDump {
    pub sort_by: String,
    pub asc: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingDump {
    pub columns: Vec<ColumnDump>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_criteria: Vec<SortCriterionDump>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_sort_criteria: Vec<SortCriterionDump>,
}

impl RankingDump {
    pub fn to_json(&self) -> Result<String, DumpError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<RankingDump, DumpError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn dump_criteria(criteria: &[SortCriterion]) -> Vec<SortCriterionDump> {
    criteria
        .iter()
        .map(|c| SortCriterionDump {
            sort_by: c.column.clone(),
            asc: c.asc,
        })
        .collect()
}

impl Ranking {
    pub fn dump(&self) -> RankingDump {
        RankingDump {
            columns: self.children().iter().map(dump_column).collect(),
            sort_criteria: dump_criteria(self.sort_criteria()),
            group_criteria: self.group_criteria().to_vec(),
            group_sort_criteria: dump_criteria(self.group_sort_criteria()),
        }
    }

    /// Reconstructs a ranking from a dump. Silent: no events fire;
    /// criteria referencing unknown column ids are dropped.
    pub fn restore(id: &str, dump: &RankingDump, registry: &ColumnRegistry) -> Ranking {
        let mut r = Ranking::new(id);
        r.columns.clear();
        let ranking_id = r.id().to_string();
        for column_dump in &dump.columns {
            if let Some(mut col) = restore_column(registry, column_dump) {
                col.attach(&ranking_id);
                r.columns.push(col);
            }
        }
        if !r.columns.iter().any(|c| c.type_tag() == TYPE_RANK) {
            if let Some(mut rank) = registry.create("rank", &ColumnDesc::rank()) {
                rank.attach(&ranking_id);
                r.columns.insert(0, rank);
            }
        }

        fn known(r: &Ranking, column: &str, list: &str) -> bool {
            let ok = r.find(column).is_some();
            if !ok {
                log::warn!("dropping {} criterion for unknown column {:?}", list, column);
            }
            ok
        }
        let sort_criteria: Vec<SortCriterion> = dump
            .sort_criteria
            .iter()
            .filter(|c| known(&r, &c.sort_by, "sort"))
            .map(|c| SortCriterion::new(&c.sort_by, c.asc))
            .collect();
        let group_criteria: Vec<String> = dump
            .group_criteria
            .iter()
            .filter(|c| known(&r, c, "group"))
            .cloned()
            .collect();
        let group_sort_criteria: Vec<SortCriterion> = dump
            .group_sort_criteria
            .iter()
            .filter(|c| known(&r, &c.sort_by, "group-sort"))
            .map(|c| SortCriterion::new(&c.sort_by, c.asc))
            .collect();
        r.sort_criteria = sort_criteria;
        r.group_criteria = group_criteria;
        r.group_sort_criteria = group_sort_criteria;
        r
    }
}
