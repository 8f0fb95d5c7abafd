//! Domain selection.
//!
//! Picks which keys of an analysis result are plotted, in document order.

use crate::models::{AnalysisResult, GLOBAL_KEY, NAMES_IN_SEQUENCE_KEY, PROMPT_KEY};
use serde_json::Value;
use std::collections::BTreeSet;

/// Which domain keys to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    /// Keys never treated as domains. `"prompt"` is excluded regardless.
    pub exclude: BTreeSet<String>,
    /// Number of surviving keys to skip.
    pub offset: usize,
    /// Maximum number of keys to return.
    pub limit: Option<usize>,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self {
            exclude: default_excluded_keys(),
            offset: 0,
            limit: None,
        }
    }
}

pub fn default_excluded_keys() -> BTreeSet<String> {
    [PROMPT_KEY, GLOBAL_KEY, NAMES_IN_SEQUENCE_KEY]
        .into_iter()
        .map(String::from)
        .collect()
}

impl DomainPolicy {
    pub fn with_exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `key` is filtered out.
    pub fn excludes(&self, key: &str) -> bool {
        key == PROMPT_KEY || self.exclude.contains(key)
    }
}

/// Domain keys of `result` after exclusion, offset and limit.
pub fn select_domains(result: &AnalysisResult, policy: &DomainPolicy) -> Vec<String> {
    result
        .keys()
        .filter(|key| !policy.excludes(key))
        .skip(policy.offset)
        .take(policy.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect()
}

/// Consecutive fixed-size groups of selected domains ("first 5", "next 5").
///
/// Empty groups are dropped, so fewer than `group_count` groups may come back.
pub fn domain_groups(
    result: &AnalysisResult,
    policy: &DomainPolicy,
    group_size: usize,
    group_count: usize,
) -> Vec<Vec<String>> {
    if group_size == 0 {
        return Vec::new();
    }

    select_domains(result, policy)
        .chunks(group_size)
        .take(group_count)
        .map(<[String]>::to_vec)
        .collect()
}

/// Domain keys inside one range record, `"prompt"` and `exclude` removed.
///
/// A range that is not an object has no domains.
pub fn range_domains(range_record: &Value, exclude: &BTreeSet<String>) -> Vec<String> {
    range_record
        .as_object()
        .map(|domains| {
            domains
                .keys()
                .filter(|key| key.as_str() != PROMPT_KEY && !exclude.contains(key.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
