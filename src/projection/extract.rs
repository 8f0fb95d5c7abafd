//! Series extraction from nested analysis JSON.
//!
//! Every accessor here is total: a missing key, a short array, or a value
//! of the wrong kind resolves to the default instead of an error.

use crate::models::{AnovaSummary, Metric, MetricKeys, ANOVA_RESULTS_KEY, NODE_SEQUENCE_KEY};
use serde_json::Value;

/// Value substituted for any metric that cannot be resolved.
pub const DEFAULT_METRIC: f64 = 0.0;

/// One step of a traversal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }
}

/// Parse a dotted path such as `calculations.crime-0.Node0_to_NodeLast.3`.
///
/// All-digit segments become array indices; empty segments are dropped.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::key(segment),
        })
        .collect()
}

/// Walk `path` from `value`, stopping at the first missing step.
pub fn resolve<'a>(value: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match segment {
        PathSegment::Key(key) => current.as_object()?.get(key),
        PathSegment::Index(index) => current.as_array()?.get(*index),
    })
}

/// Read a finite number, falling back to [`DEFAULT_METRIC`].
pub fn number_or_default(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
        .unwrap_or(DEFAULT_METRIC)
}

/// Look a metric up directly on a measurement object.
pub fn metric_of(node: &Value, metric: Metric, keys: &MetricKeys) -> f64 {
    let Some(object) = node.as_object() else {
        return DEFAULT_METRIC;
    };

    let found = keys
        .candidates(metric)
        .find_map(|key| object.get(&key).filter(|v| !v.is_null()));
    number_or_default(found)
}

/// Extract a metric from `record` after following `path`.
pub fn extract_metric(
    record: &Value,
    metric: Metric,
    path: &[PathSegment],
    keys: &MetricKeys,
) -> f64 {
    match resolve(record, path) {
        Some(node) => metric_of(node, metric, keys),
        None => DEFAULT_METRIC,
    }
}

/// Metric of agent `position` in a domain's `Node0_to_NodeLast` sequence.
pub fn node_metric(record: &Value, position: usize, metric: Metric, keys: &MetricKeys) -> f64 {
    extract_metric(
        record,
        metric,
        &[PathSegment::key(NODE_SEQUENCE_KEY), PathSegment::Index(position)],
        keys,
    )
}

/// Whether a record carries an ANOVA block at all.
pub fn has_anova_results(record: &Value) -> bool {
    record
        .get(ANOVA_RESULTS_KEY)
        .map(Value::is_object)
        .unwrap_or(false)
}

/// Read the ANOVA summary of one metric.
///
/// Absent pieces stay `None` (or empty for group means); non-numeric
/// group means are skipped.
pub fn extract_anova_summary(record: &Value, metric: Metric) -> AnovaSummary {
    let path = [
        PathSegment::key(ANOVA_RESULTS_KEY),
        PathSegment::Key(metric.anova_key()),
    ];

    let Some(summary) = resolve(record, &path).and_then(Value::as_object) else {
        return AnovaSummary::default();
    };

    let finite = |key: &str| {
        summary
            .get(key)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
    };

    let group_means = summary
        .get("groupMeans")
        .and_then(Value::as_array)
        .map(|means| {
            means
                .iter()
                .filter_map(Value::as_f64)
                .filter(|n| n.is_finite())
                .collect()
        })
        .unwrap_or_default();

    AnovaSummary {
        overall_mean: finite("overallMean"),
        group_means,
        within_group_variance: finite("withinGroupVariance"),
        between_group_variance: finite("betweenGroupVariance"),
    }
}

/// Per-agent entries of a container: array elements, or object values in order.
pub fn agent_entries(container: &Value) -> Vec<&Value> {
    match container {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}
