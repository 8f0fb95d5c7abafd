//! Data models for the projector.
//!
//! This module contains the input wrapper for analysis results, the
//! metric identifiers used to address nested measurements, and every
//! chart-ready shape the projection layer emits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Reserved free-text key that never denotes a domain.
pub const PROMPT_KEY: &str = "prompt";

/// Pseudo-domain carrying the aggregate ANOVA result.
pub const GLOBAL_KEY: &str = "Global";

/// Bookkeeping key emitted by some backends next to the domains.
pub const NAMES_IN_SEQUENCE_KEY: &str = "namesInSequence";

/// Per-agent measurement sequence of a domain record.
pub const NODE_SEQUENCE_KEY: &str = "Node0_to_NodeLast";

/// ANOVA block of a domain record.
pub const ANOVA_RESULTS_KEY: &str = "Between_Range_ANOVA_Results";

/// One of the three parallel metrics (metric-0, metric-1, metric-2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Metric-0.
    I0,
    /// Metric-1.
    I1,
    /// Metric-2.
    I2,
}

impl Metric {
    /// All metrics in index order.
    pub const ALL: [Metric; 3] = [Metric::I0, Metric::I1, Metric::I2];

    /// Numeric index of the metric (0, 1 or 2).
    pub fn index(&self) -> usize {
        match self {
            Metric::I0 => 0,
            Metric::I1 => 1,
            Metric::I2 => 2,
        }
    }

    /// Key of the ANOVA summary for this metric (`anovaI0`, ...).
    pub fn anova_key(&self) -> String {
        format!("anova{}", self)
    }

    /// Parser used by clap for `--metric`.
    pub fn parse_arg(s: &str) -> Result<Self, String> {
        s.parse()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I{}", self.index())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "i0" | "metric0" | "metric-0" => Ok(Metric::I0),
            "1" | "i1" | "metric1" | "metric-1" => Ok(Metric::I1),
            "2" | "i2" | "metric2" | "metric-2" => Ok(Metric::I2),
            other => Err(format!("unknown metric '{}': expected 0, 1 or 2", other)),
        }
    }
}

/// Field family used to find a metric on a measurement object.
///
/// The key for metric `n` is `prefix + n`; prefixes are tried in order
/// and the first non-null key on the object wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricKeys {
    pub prefixes: Vec<String>,
}

impl Default for MetricKeys {
    fn default() -> Self {
        Self {
            prefixes: default_metric_prefixes(),
        }
    }
}

pub fn default_metric_prefixes() -> Vec<String> {
    vec!["mprI", "I", "metric"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl MetricKeys {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// Candidate keys for a metric, in lookup order.
    pub fn candidates(&self, metric: Metric) -> impl Iterator<Item = String> + '_ {
        self.prefixes
            .iter()
            .map(move |prefix| format!("{}{}", prefix, metric.index()))
    }
}

/// A full analysis result keyed by domain (or by range, then domain).
///
/// Key order is the order of the source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResult(Map<String, Value>);

impl AnalysisResult {
    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().cloned().map(Self)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// ANOVA summary for one metric of a domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnovaSummary {
    /// `None` when the summary or the field is absent.
    pub overall_mean: Option<f64>,
    pub group_means: Vec<f64>,
    pub within_group_variance: Option<f64>,
    pub between_group_variance: Option<f64>,
}

/// Role of a series inside a labeled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Extracted from a domain (or comparison pair, or metric).
    Data,
    /// Constant classification threshold.
    Threshold,
}

/// One named sequence of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub kind: SeriesKind,
    pub color: String,
}

/// Multi-series table over a shared x-axis (line charts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSeries {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

impl LabeledSeries {
    /// Series extracted from data, thresholds skipped.
    pub fn data_series(&self) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(|s| s.kind == SeriesKind::Data)
    }
}

/// Dense `[row][column]` matrix (heatmaps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixShape {
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

/// One domain in the scatter cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    /// 1-based rank in iteration order.
    pub x: usize,
    pub y: Option<f64>,
    pub label: String,
}

/// Point of the synthetic reference line. `y = None` marks an undefined mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: Option<f64>,
}

/// Two-point line from the origin to `(N, global mean)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub points: [ReferencePoint; 2],
}

impl ReferenceLine {
    /// Whether the global mean was available.
    pub fn is_defined(&self) -> bool {
        self.points[1].y.is_some()
    }
}

/// Scatter cloud plus its reference line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scatter {
    pub points: Vec<ScatterPoint>,
    pub reference_line: ReferenceLine,
}

/// One polygon of a radar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarTrace {
    pub name: String,
    pub values: Vec<f64>,
    pub color: String,
    pub fill: String,
}

/// Radar fan-out: domains on the angular axis, one trace per agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Radar {
    pub axes: Vec<String>,
    pub traces: Vec<RadarTrace>,
}

/// ANOVA numbers of one metric, ready for a group-means chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaMetricPanel {
    pub metric: Metric,
    pub group_means: Vec<f64>,
    /// Overall mean, 0 when absent (drawn as a flat line).
    pub overall_mean: f64,
    pub within_group_variance: Option<f64>,
    pub between_group_variance: Option<f64>,
    pub color: String,
}

/// Per-domain ANOVA panel across all three metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnovaPanel {
    pub domain: String,
    pub group_labels: Vec<String>,
    pub metrics: Vec<AnovaMetricPanel>,
}

/// Raw value population of one domain/metric pair (box plots).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSeries {
    pub name: String,
    pub domain: String,
    pub metric: Metric,
    pub values: Vec<f64>,
}

/// Propagation rate of each calculation across the three node pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeComparison {
    pub range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub table: LabeledSeries,
}

/// Chart-ready shape produced by one projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Shape {
    LabeledSeries(LabeledSeries),
    Matrix(MatrixShape),
    Scatter(Scatter),
    Radar(Radar),
    Anova(AnovaPanel),
    Box(Vec<BoxSeries>),
    Comparison(RangeComparison),
    Timeline(LabeledSeries),
}

/// A titled shape together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub title: String,
    /// Envelope key (or `"<root>"`) the shape was projected from.
    pub dataset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<Metric>,
    pub shape: Shape,
}

/// Summary numbers of one data series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// 1-based agent position of the maximum.
    pub peak_agent: usize,
    pub band_counts: BandCounts,
}

/// How many values fall in each classification band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub below: usize,
    pub factual_error: usize,
    pub lie: usize,
    pub propaganda: usize,
}

/// Metadata about a projection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// File path or backend URL the analysis came from.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub views: Vec<String>,
    pub projection_count: usize,
    pub duration_seconds: f64,
}

/// The complete projection report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionReport {
    pub metadata: ReportMetadata,
    pub projections: Vec<Projection>,
    /// Statistics over every data series of the line-chart projections.
    pub statistics: Vec<SeriesStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_parsing() {
        assert_eq!("0".parse::<Metric>(), Ok(Metric::I0));
        assert_eq!("I1".parse::<Metric>(), Ok(Metric::I1));
        assert_eq!("metric-2".parse::<Metric>(), Ok(Metric::I2));
        assert!("3".parse::<Metric>().is_err());
    }

    #[test]
    fn test_metric_keys() {
        assert_eq!(Metric::I2.to_string(), "I2");
        assert_eq!(Metric::I0.anova_key(), "anovaI0");

        let keys = MetricKeys::default();
        let candidates: Vec<String> = keys.candidates(Metric::I2).collect();
        assert_eq!(candidates, vec!["mprI2", "I2", "metric2"]);
    }

    #[test]
    fn test_analysis_result_preserves_order() {
        let value = json!({"zeta": 1, "alpha": 2, "mid": 3});
        let result = AnalysisResult::from_value(&value).unwrap();
        let keys: Vec<&String> = result.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert!(AnalysisResult::from_value(&json!([1, 2])).is_none());
    }

    #[test]
    fn test_shape_serialization_tag() {
        let shape = Shape::Matrix(MatrixShape {
            row_labels: vec!["1".to_string()],
            col_labels: vec!["1-30 crime".to_string()],
            cells: vec![vec![3.0]],
        });
        let value = serde_json::to_value(&shape).unwrap();
        assert_eq!(value["kind"], "matrix");
        assert_eq!(value["data"]["cells"][0][0], 3.0);
    }

    #[test]
    fn test_reference_line_defined() {
        let line = ReferenceLine {
            points: [
                ReferencePoint { x: 0.0, y: Some(0.0) },
                ReferencePoint { x: 2.0, y: None },
            ],
        };
        assert!(!line.is_defined());
    }
}
