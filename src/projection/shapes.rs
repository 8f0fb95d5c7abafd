//! Shape adapters.
//!
//! Each function turns an analysis result into one chart-ready shape.
//! They never fail: missing or malformed nested data becomes zeros (or an
//! explicit `None` mean) and the returned structure is always complete.

use crate::models::{
    AnalysisResult, AnovaMetricPanel, AnovaPanel, BoxSeries, LabeledSeries, MatrixShape, Metric,
    MetricKeys, Radar, RadarTrace, RangeComparison, ReferenceLine, ReferencePoint, Scatter,
    ScatterPoint, Series, SeriesKind, GLOBAL_KEY, NAMES_IN_SEQUENCE_KEY, PROMPT_KEY,
};
use crate::projection::extract::{
    agent_entries, extract_anova_summary, extract_metric, metric_of, node_metric, parse_path,
    resolve, PathSegment, DEFAULT_METRIC,
};
use crate::projection::palette::{color_for, fill_for, THRESHOLD_COLORS};
use crate::projection::selector::range_domains;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Classification thresholds drawn on every propagation chart.
pub const THRESHOLDS: [(f64, &str); 3] = [(1.0, "Factual Error"), (3.0, "Lie"), (4.0, "Propaganda")];

/// Node pairs compared in a range's `calculations` block.
pub const COMPARISON_PAIRS: [(&str, &str); 3] = [
    ("Node0_to_NodeFirst", "Node0 to NodeFirst MPR"),
    ("Node0_to_NodeLast", "Node0 to NodeLast MPR"),
    ("NodeFirst_to_NodeLast", "NodeFirst to NodeLast MPR"),
];

const RATE_KEY: &str = "Misinformation Propagation Rate";

/// `"Agent 1"` .. `"Agent N"`.
pub fn agent_labels(agent_count: usize) -> Vec<String> {
    (1..=agent_count).map(|i| format!("Agent {}", i)).collect()
}

fn threshold_series(agent_count: usize) -> Vec<Series> {
    THRESHOLDS
        .iter()
        .zip(THRESHOLD_COLORS)
        .map(|((value, name), color)| Series {
            name: name.to_string(),
            values: vec![*value; agent_count],
            kind: SeriesKind::Threshold,
            color: color.to_string(),
        })
        .collect()
}

/// One series per domain over agent positions, plus the three thresholds.
///
/// Every series has exactly `agent_count` values; a domain without a
/// measurement sequence yields zeros rather than being dropped.
pub fn to_labeled_series(
    domains: &[String],
    result: &AnalysisResult,
    agent_count: usize,
    metric: Metric,
    keys: &MetricKeys,
) -> LabeledSeries {
    let mut series: Vec<Series> = domains
        .iter()
        .enumerate()
        .map(|(index, domain)| {
            let values = match result.get(domain) {
                Some(record) => (0..agent_count)
                    .map(|position| node_metric(record, position, metric, keys))
                    .collect(),
                None => vec![DEFAULT_METRIC; agent_count],
            };

            Series {
                name: domain.clone(),
                values,
                kind: SeriesKind::Data,
                color: color_for(index),
            }
        })
        .collect();

    series.extend(threshold_series(agent_count));

    debug!(
        "Projected {} domains over {} agents ({})",
        domains.len(),
        agent_count,
        metric
    );

    LabeledSeries {
        labels: agent_labels(agent_count),
        series,
    }
}

/// `(range, domain)` column coordinates in document order.
pub fn matrix_columns(result: &AnalysisResult) -> Vec<(String, String)> {
    let none = BTreeSet::new();
    result
        .iter()
        .flat_map(|(range, record)| {
            range_domains(record, &none)
                .into_iter()
                .map(move |domain| (range.clone(), domain))
        })
        .collect()
}

/// Dense `[agent row][range + domain column]` matrix of one metric.
pub fn to_matrix(
    result: &AnalysisResult,
    row_count: usize,
    metric: Metric,
    keys: &MetricKeys,
) -> MatrixShape {
    let columns = matrix_columns(result);

    let cells = (0..row_count)
        .map(|row| {
            columns
                .iter()
                .map(|(range, domain)| {
                    let path = [PathSegment::key(domain.as_str()), PathSegment::Index(row)];
                    result
                        .get(range)
                        .map(|record| extract_metric(record, metric, &path, keys))
                        .unwrap_or(DEFAULT_METRIC)
                })
                .collect()
        })
        .collect();

    debug!("Projected {} x {} matrix ({})", row_count, columns.len(), metric);

    MatrixShape {
        row_labels: (1..=row_count).map(|i| i.to_string()).collect(),
        col_labels: columns
            .iter()
            .map(|(range, domain)| format!("{} {}", range, domain))
            .collect(),
        cells,
    }
}

fn is_point_domain(key: &str) -> bool {
    key != GLOBAL_KEY && key != PROMPT_KEY && key != NAMES_IN_SEQUENCE_KEY
}

/// Overall mean of every domain as `(rank, mean, domain)`, `"Global"` excluded.
pub fn to_point_series(result: &AnalysisResult, metric: Metric) -> Vec<ScatterPoint> {
    result
        .iter()
        .filter(|(key, _)| is_point_domain(key))
        .enumerate()
        .map(|(index, (domain, record))| ScatterPoint {
            x: index + 1,
            y: extract_anova_summary(record, metric).overall_mean,
            label: domain.clone(),
        })
        .collect()
}

/// Line from `(0, 0)` to `(N, global overall mean)`.
///
/// `N` is the number of scatter points. Without a global summary the second
/// point keeps `y = None` so the caller can choose not to draw it.
pub fn to_reference_line(result: &AnalysisResult, metric: Metric) -> ReferenceLine {
    let point_count = result.keys().filter(|key| is_point_domain(key)).count();
    let global_mean = result
        .get(GLOBAL_KEY)
        .and_then(|global| extract_anova_summary(global, metric).overall_mean);

    ReferenceLine {
        points: [
            ReferencePoint { x: 0.0, y: Some(0.0) },
            ReferencePoint {
                x: point_count as f64,
                y: global_mean,
            },
        ],
    }
}

/// Scatter cloud together with its reference line.
pub fn to_scatter(result: &AnalysisResult, metric: Metric) -> Scatter {
    Scatter {
        points: to_point_series(result, metric),
        reference_line: to_reference_line(result, metric),
    }
}

/// Radar fan-out: domains as axes, one trace per agent position.
pub fn to_radar(result: &AnalysisResult, metric: Metric, keys: &MetricKeys) -> Radar {
    let axes: Vec<(&String, Vec<&Value>)> = result
        .iter()
        .filter(|(key, _)| key.as_str() != PROMPT_KEY && key.as_str() != NAMES_IN_SEQUENCE_KEY)
        .map(|(domain, record)| (domain, agent_entries(record)))
        .collect();

    let agent_count = axes.iter().map(|(_, agents)| agents.len()).max().unwrap_or(0);

    let traces = (0..agent_count)
        .map(|position| RadarTrace {
            name: format!("Agent {}", position + 1),
            values: axes
                .iter()
                .map(|(_, agents)| {
                    agents
                        .get(position)
                        .map(|node| metric_of(node, metric, keys))
                        .unwrap_or(DEFAULT_METRIC)
                })
                .collect(),
            color: color_for(position),
            fill: fill_for(position),
        })
        .collect();

    Radar {
        axes: axes.into_iter().map(|(domain, _)| domain.clone()).collect(),
        traces,
    }
}

/// Group means and overall means of all three metrics for one domain.
pub fn to_anova_panel(domain: &str, record: &Value) -> AnovaPanel {
    let metrics: Vec<AnovaMetricPanel> = Metric::ALL
        .iter()
        .map(|&metric| {
            let summary = extract_anova_summary(record, metric);
            AnovaMetricPanel {
                metric,
                group_means: summary.group_means,
                overall_mean: summary.overall_mean.unwrap_or(DEFAULT_METRIC),
                within_group_variance: summary.within_group_variance,
                between_group_variance: summary.between_group_variance,
                color: color_for(metric.index()),
            }
        })
        .collect();

    let group_count = metrics
        .iter()
        .map(|panel| panel.group_means.len())
        .max()
        .unwrap_or(0)
        .max(2);

    AnovaPanel {
        domain: domain.to_string(),
        group_labels: (1..=group_count).map(|i| format!("Group {}", i)).collect(),
        metrics,
    }
}

/// Value populations per domain and metric, pooled across ranges.
pub fn to_box_series(result: &AnalysisResult, keys: &MetricKeys) -> Vec<BoxSeries> {
    let none = BTreeSet::new();
    let mut domains: Vec<String> = Vec::new();
    for (_, range) in result.iter() {
        for domain in range_domains(range, &none) {
            if !domains.contains(&domain) {
                domains.push(domain);
            }
        }
    }

    domains
        .iter()
        .flat_map(|domain| {
            Metric::ALL.iter().map(move |&metric| {
                let values = result
                    .iter()
                    .filter_map(|(_, range)| range.get(domain.as_str()))
                    .flat_map(agent_entries)
                    .map(|node| metric_of(node, metric, keys))
                    .collect();

                BoxSeries {
                    name: format!("{} - {}", domain, metric),
                    domain: domain.clone(),
                    metric,
                    values,
                }
            })
        })
        .collect()
}

/// Propagation rate of every calculation across the three node pairs.
pub fn to_range_comparison(
    range: &str,
    range_record: &Value,
    metric: Metric,
    keys: &MetricKeys,
) -> RangeComparison {
    let calculations = range_record.get("calculations");
    let labels: Vec<String> = calculations
        .and_then(Value::as_object)
        .map(|calcs| calcs.keys().cloned().collect())
        .unwrap_or_default();

    let series = COMPARISON_PAIRS
        .iter()
        .enumerate()
        .map(|(index, (pair, name))| Series {
            name: name.to_string(),
            values: labels
                .iter()
                .map(|label| {
                    let path = [
                        PathSegment::key("calculations"),
                        PathSegment::key(label.as_str()),
                        PathSegment::key(*pair),
                        PathSegment::key(RATE_KEY),
                    ];
                    extract_metric(range_record, metric, &path, keys)
                })
                .collect(),
            kind: SeriesKind::Data,
            color: color_for(index),
        })
        .collect();

    RangeComparison {
        range: range.to_string(),
        prompt: range_record
            .get(PROMPT_KEY)
            .and_then(Value::as_str)
            .map(String::from),
        table: LabeledSeries { labels, series },
    }
}

fn label_of(value: Option<&Value>, fallback: usize) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => fallback.to_string(),
    }
}

/// Misinformation index per version, forward-filling gaps.
///
/// A missing or non-numeric index repeats the previous one, starting at 0.
pub fn to_version_index(document: &Value) -> LabeledSeries {
    let versions = document
        .get("versions")
        .map(agent_entries)
        .unwrap_or_default();

    let mut previous = DEFAULT_METRIC;
    let mut labels = Vec::with_capacity(versions.len());
    let mut values = Vec::with_capacity(versions.len());

    for (index, version) in versions.iter().enumerate() {
        labels.push(label_of(version.get("versionNumber"), index + 1));
        if let Some(current) = version
            .get("misinformationIndex")
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
        {
            previous = current;
        }
        values.push(previous);
    }

    LabeledSeries {
        labels,
        series: vec![Series {
            name: "Misinformation Index".to_string(),
            values,
            kind: SeriesKind::Data,
            color: color_for(0),
        }],
    }
}

/// Per-node misinformation indices of a propagation graph, one series per metric.
pub fn to_node_index_series(document: &Value, keys: &MetricKeys) -> LabeledSeries {
    let nodes = document.get("nodes").map(agent_entries).unwrap_or_default();
    let index_path = parse_path("articles.0.misInformationIndexArray");

    let labels = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| label_of(node.get("id"), index))
        .collect();

    let series = Metric::ALL
        .iter()
        .map(|&metric| Series {
            name: format!("Misinformation Index {}", metric),
            values: nodes
                .iter()
                .map(|node| match resolve(node, &index_path) {
                    Some(indices) => metric_of(indices, metric, keys),
                    None => DEFAULT_METRIC,
                })
                .collect(),
            kind: SeriesKind::Data,
            color: color_for(metric.index()),
        })
        .collect();

    LabeledSeries { labels, series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(value: Value) -> AnalysisResult {
        AnalysisResult::from_value(&value).unwrap()
    }

    fn keys() -> MetricKeys {
        MetricKeys::default()
    }

    #[test]
    fn test_labeled_series_basic() {
        let data = result(json!({
            "A": {"Node0_to_NodeLast": [{"metric2": 2}, {"metric2": 5}]}
        }));
        let table = to_labeled_series(&["A".to_string()], &data, 2, Metric::I2, &keys());

        assert_eq!(table.labels, vec!["Agent 1", "Agent 2"]);
        assert_eq!(table.series[0].name, "A");
        assert_eq!(table.series[0].values, vec![2.0, 5.0]);
        assert_eq!(table.series[0].kind, SeriesKind::Data);
    }

    #[test]
    fn test_labeled_series_length_and_thresholds() {
        let data = result(json!({
            "short": {"Node0_to_NodeLast": [{"mprI2": 1.25}]},
            "missing": {"Between_Range_ANOVA_Results": {}},
            "broken": {"Node0_to_NodeLast": "nope"}
        }));
        let domains: Vec<String> = vec!["short", "missing", "broken", "absent"]
            .into_iter()
            .map(String::from)
            .collect();
        let table = to_labeled_series(&domains, &data, 21, Metric::I2, &keys());

        assert_eq!(table.series.len(), 7);
        for series in &table.series {
            assert_eq!(series.values.len(), 21);
        }
        assert_eq!(table.series[0].values[0], 1.25);
        assert!(table.series[0].values[1..].iter().all(|v| *v == 0.0));
        assert!(table.series[1].values.iter().all(|v| *v == 0.0));

        let thresholds: Vec<&Series> = table
            .series
            .iter()
            .filter(|s| s.kind == SeriesKind::Threshold)
            .collect();
        assert_eq!(thresholds.len(), 3);
        assert_eq!(thresholds[0].name, "Factual Error");
        assert_eq!(thresholds[0].values, vec![1.0; 21]);
        assert_eq!(thresholds[1].values, vec![3.0; 21]);
        assert_eq!(thresholds[2].name, "Propaganda");
        assert_eq!(thresholds[2].values, vec![4.0; 21]);
    }

    #[test]
    fn test_labeled_series_is_deterministic() {
        let data = result(json!({
            "crime": {"Node0_to_NodeLast": [{"mprI2": 0.5}, {"mprI2": 3.5}]},
            "politics": {"Node0_to_NodeLast": [{"mprI2": 4.5}]}
        }));
        let domains = vec!["crime".to_string(), "politics".to_string()];
        let first = to_labeled_series(&domains, &data, 3, Metric::I2, &keys());
        let second = to_labeled_series(&domains, &data, 3, Metric::I2, &keys());

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_ne!(first.series[0].color, first.series[1].color);
    }

    #[test]
    fn test_matrix_and_scatter_are_deterministic() {
        let ranges = result(json!({
            "1-30": {"prompt": "p", "crime": [{"I0": 1.5}, {"I0": 2}], "health": [{"I0": 0.25}]},
            "31-60": {"health": [{"I0": 4}], "prompt": "q", "crime": [{}]}
        }));
        let first = to_matrix(&ranges, 4, Metric::I0, &keys());
        let second = to_matrix(&ranges, 4, Metric::I0, &keys());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );

        let domains = result(json!({
            "crime": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 2.5}}},
            "Global": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 3.25}}},
            "health": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 1}}}
        }));
        assert_eq!(
            serde_json::to_string(&to_point_series(&domains, Metric::I0)).unwrap(),
            serde_json::to_string(&to_point_series(&domains, Metric::I0)).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&to_scatter(&domains, Metric::I0)).unwrap(),
            serde_json::to_string(&to_scatter(&domains, Metric::I0)).unwrap()
        );
    }

    #[test]
    fn test_matrix_excludes_prompt() {
        let data = result(json!({"1-30": {"A": [{"I0": 3}], "prompt": "text"}}));
        let matrix = to_matrix(&data, 1, Metric::I0, &keys());

        assert_eq!(matrix.row_labels, vec!["1"]);
        assert_eq!(matrix.col_labels, vec!["1-30 A"]);
        assert_eq!(matrix.cells, vec![vec![3.0]]);
    }

    #[test]
    fn test_matrix_columns_and_defaults() {
        let data = result(json!({
            "1-30": {"crime": [{"I0": 1, "I2": 9}, {"I0": 2}], "prompt": "p"},
            "61-90": {"crime": [{"I2": 7}], "health": [{"I0": 5}]},
            "note": "free text"
        }));

        let matrix = to_matrix(&data, 3, Metric::I0, &keys());
        assert_eq!(matrix.col_labels, vec!["1-30 crime", "61-90 crime", "61-90 health"]);
        assert_eq!(matrix.cells.len(), 3);
        assert_eq!(matrix.cells[0], vec![1.0, 0.0, 5.0]);
        assert_eq!(matrix.cells[1], vec![2.0, 0.0, 0.0]);
        assert_eq!(matrix.cells[2], vec![0.0, 0.0, 0.0]);
        assert!(!matrix.col_labels.iter().any(|c| c.contains("prompt")));

        // the same metric drives presence and value
        let matrix = to_matrix(&data, 1, Metric::I2, &keys());
        assert_eq!(matrix.cells[0], vec![9.0, 7.0, 0.0]);
    }

    #[test]
    fn test_scatter_with_global_mean() {
        let data = result(json!({
            "A": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 2}}},
            "Global": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 5}}}
        }));

        let points = to_point_series(&data, Metric::I0);
        assert_eq!(
            points,
            vec![ScatterPoint {
                x: 1,
                y: Some(2.0),
                label: "A".to_string()
            }]
        );

        let line = to_reference_line(&data, Metric::I0);
        assert_eq!(line.points[0], ReferencePoint { x: 0.0, y: Some(0.0) });
        assert_eq!(line.points[1], ReferencePoint { x: 1.0, y: Some(5.0) });
    }

    #[test]
    fn test_scatter_without_global() {
        let data = result(json!({
            "A": {"Between_Range_ANOVA_Results": {"anovaI0": {"overallMean": 2}}},
            "B": {},
            "prompt": "text"
        }));

        let scatter = to_scatter(&data, Metric::I0);
        assert_eq!(scatter.points.len(), 2);
        assert_eq!(scatter.points[1].x, 2);
        assert_eq!(scatter.points[1].y, None);
        assert!(!scatter.reference_line.is_defined());
        assert_eq!(scatter.reference_line.points[1].x, 2.0);
    }

    #[test]
    fn test_radar() {
        let data = result(json!({
            "crime": [{"I0": 1}, {"I0": 2}, {"I0": 3}],
            "politics": {"agent1": {"I0": 4}},
            "namesInSequence": ["a", "b"],
            "prompt": "text"
        }));

        let radar = to_radar(&data, Metric::I0, &keys());
        assert_eq!(radar.axes, vec!["crime", "politics"]);
        assert_eq!(radar.traces.len(), 3);
        assert_eq!(radar.traces[0].name, "Agent 1");
        assert_eq!(radar.traces[0].values, vec![1.0, 4.0]);
        assert_eq!(radar.traces[2].values, vec![3.0, 0.0]);
    }

    #[test]
    fn test_anova_panel() {
        let record = json!({
            "Between_Range_ANOVA_Results": {
                "anovaI0": {"overallMean": 1.5, "groupMeans": [1, 2, 3], "withinGroupVariance": 0.2},
                "anovaI2": {"groupMeans": [4]}
            }
        });

        let panel = to_anova_panel("crime", &record);
        assert_eq!(panel.domain, "crime");
        assert_eq!(panel.group_labels, vec!["Group 1", "Group 2", "Group 3"]);
        assert_eq!(panel.metrics.len(), 3);
        assert_eq!(panel.metrics[0].overall_mean, 1.5);
        assert_eq!(panel.metrics[0].within_group_variance, Some(0.2));
        assert!(panel.metrics[1].group_means.is_empty());
        assert_eq!(panel.metrics[2].overall_mean, 0.0);

        let empty = to_anova_panel("none", &json!({}));
        assert_eq!(empty.group_labels, vec!["Group 1", "Group 2"]);
    }

    #[test]
    fn test_box_series() {
        let data = result(json!({
            "1-30": {"crime": [{"I0": 1, "I1": 2, "I2": 3}], "prompt": "p"},
            "31-60": {"health": [{"I0": 4}], "crime": [{"I0": 5}, {}]}
        }));

        let boxes = to_box_series(&data, &keys());
        assert_eq!(boxes.len(), 6);
        assert_eq!(boxes[0].name, "crime - I0");
        assert_eq!(boxes[0].values, vec![1.0, 5.0, 0.0]);
        assert_eq!(boxes[1].values, vec![2.0, 0.0, 0.0]);
        assert_eq!(boxes[3].domain, "health");
        assert_eq!(boxes[3].values, vec![4.0]);
    }

    #[test]
    fn test_range_comparison() {
        let range = json!({
            "prompt": "Write a story",
            "calculations": {
                "crime-0": {
                    "Node0_to_NodeFirst": {"Misinformation Propagation Rate": {"mprI0": 0.5}},
                    "Node0_to_NodeLast": {"Misinformation Propagation Rate": {"mprI0": 2.5}}
                },
                "health-0": {}
            }
        });

        let comparison = to_range_comparison("1-30", &range, Metric::I0, &keys());
        assert_eq!(comparison.prompt.as_deref(), Some("Write a story"));
        assert_eq!(comparison.table.labels, vec!["crime-0", "health-0"]);
        assert_eq!(comparison.table.series.len(), 3);
        assert_eq!(comparison.table.series[0].values, vec![0.5, 0.0]);
        assert_eq!(comparison.table.series[1].values, vec![2.5, 0.0]);
        assert_eq!(comparison.table.series[2].values, vec![0.0, 0.0]);

        let empty = to_range_comparison("x", &json!("text"), Metric::I0, &keys());
        assert!(empty.table.labels.is_empty());
        assert!(empty.table.series.iter().all(|s| s.values.is_empty()));
    }

    #[test]
    fn test_version_index_forward_fill() {
        let document = json!({
            "versions": [
                {"versionNumber": 1, "misinformationIndex": null},
                {"versionNumber": 2, "misinformationIndex": 0.4},
                {"versionNumber": 3},
                {"versionNumber": "4", "misinformationIndex": "NaN"},
                {"versionNumber": 5, "misinformationIndex": 0.9}
            ]
        });

        let timeline = to_version_index(&document);
        assert_eq!(timeline.labels, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(timeline.series[0].values, vec![0.0, 0.4, 0.4, 0.4, 0.9]);
        assert!(to_version_index(&json!({})).labels.is_empty());
    }

    #[test]
    fn test_node_index_series() {
        let document = json!({
            "nodes": [
                {"id": 0, "articles": [{"misInformationIndexArray": {"I0": 1, "I1": 2, "I2": 3}}]},
                {"id": 1, "articles": []}
            ],
            "edges": [{"source": 0, "target": 1}]
        });

        let timeline = to_node_index_series(&document, &keys());
        assert_eq!(timeline.labels, vec!["0", "1"]);
        assert_eq!(timeline.series.len(), 3);
        assert_eq!(timeline.series[0].values, vec![1.0, 0.0]);
        assert_eq!(timeline.series[2].values, vec![3.0, 0.0]);
    }
}
