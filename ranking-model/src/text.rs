//! FILENAME: ranking-model/src/text.rs
//! String columns: substring/regex filtering and case-insensitive
//! comparison.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

// ============================================================================
// FILTER
// ============================================================================

/// A string filter: case-insensitive substring match, or a regular
/// expression when `is_regex` is set. An invalid pattern degrades to a
/// literal substring match instead of failing the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFilter {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_regex: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub filter_missing: bool,
    #[serde(skip)]
    compiled: Option<Regex>,
}

impl TextFilter {
    pub fn substring(pattern: impl Into<String>) -> Self {
        TextFilter {
            pattern: pattern.into(),
            is_regex: false,
            filter_missing: false,
            compiled: None,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        let mut f = TextFilter {
            pattern: pattern.into(),
            is_regex: true,
            filter_missing: false,
            compiled: None,
        };
        f.compile();
        f
    }

    pub fn with_filter_missing(mut self, filter_missing: bool) -> Self {
        self.filter_missing = filter_missing;
        self
    }

    /// (Re)compiles the regex form; called after deserialization too.
    pub fn compile(&mut self) {
        self.compiled = None;
        if self.is_regex {
            match RegexBuilder::new(&self.pattern).case_insensitive(true).build() {
                Ok(re) => self.compiled = Some(re),
                Err(err) => {
                    log::warn!("invalid filter pattern {:?}: {}", self.pattern, err);
                    self.is_regex = false;
                }
            }
        }
    }

    pub fn is_active(&self) -> bool {
        !self.pattern.is_empty() || self.filter_missing
    }

    pub fn accepts(&self, value: Option<&str>) -> bool {
        let v = match value {
            Some(s) if !s.is_empty() => s,
            _ => return !self.filter_missing,
        };
        if self.pattern.is_empty() {
            return true;
        }
        if let Some(re) = &self.compiled {
            return re.is_match(v);
        }
        v.to_lowercase().contains(&self.pattern.to_lowercase())
    }
}

impl PartialEq for TextFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
            && self.is_regex == other.is_regex
            && self.filter_missing == other.filter_missing
    }
}

// ============================================================================
// COLUMN STATE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TextColumn {
    pub(crate) filter: Option<TextFilter>,
}

impl TextColumn {
    pub fn filter(&self) -> Option<&TextFilter> {
        self.filter.as_ref()
    }

    pub fn is_filtered(&self) -> bool {
        self.filter.as_ref().map_or(false, TextFilter::is_active)
    }

    pub fn accepts(&self, value: Option<&str>) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accepts(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_filter_is_case_insensitive() {
        let f = TextFilter::substring("bo");
        assert!(f.accepts(Some("Bob")));
        assert!(!f.accepts(Some("Amy")));
    }

    #[test]
    fn test_regex_filter() {
        let f = TextFilter::regex("^a.*y$");
        assert!(f.accepts(Some("Amy")));
        assert!(!f.accepts(Some("Bob")));
    }

    #[test]
    fn test_invalid_regex_degrades_to_substring() {
        let f = TextFilter::regex("[unclosed");
        assert!(!f.is_regex);
        assert!(f.accepts(Some("x [unclosed y")));
    }

    #[test]
    fn test_missing_handling() {
        let keep = TextFilter::substring("");
        assert!(!keep.is_active());
        assert!(keep.accepts(None));
        let drop = TextFilter::substring("").with_filter_missing(true);
        assert!(drop.is_active());
        assert!(!drop.accepts(None));
        assert!(!drop.accepts(Some("")));
    }
}
