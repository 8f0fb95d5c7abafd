//! Report generation.
//!
//! Renders a projection report as Markdown tables or pretty JSON.

use crate::analysis::{matrix_column_means, most_propagating, Band};
use crate::config::ReportConfig;
use crate::models::{
    AnovaPanel, BoxSeries, LabeledSeries, MatrixShape, Projection, ProjectionReport, Radar,
    RangeComparison, ReportMetadata, Scatter, SeriesStats, Shape,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ProjectionReport, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# mprview Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str(&generate_table_of_contents(report, config));

    output.push_str("## Projections\n\n");
    for projection in &report.projections {
        output.push_str(&generate_projection_section(projection, config.precision));
    }

    if config.include_statistics {
        output.push_str(&generate_statistics_section(&report.statistics, config));
    }

    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Views:** {}\n", metadata.views.join(", ")));
    section.push_str(&format!(
        "- **Projections:** {}\n",
        metadata.projection_count
    ));
    section.push_str(&format!("- **Duration:** {:.1}s\n", metadata.duration_seconds));
    section.push('\n');

    section
}

/// GitHub-style heading anchor.
fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c == ' ' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

fn generate_table_of_contents(report: &ProjectionReport, config: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Projections](#projections)\n");

    for projection in &report.projections {
        toc.push_str(&format!(
            "  - [{}](#{})\n",
            projection.title,
            anchor(&projection.title)
        ));
    }

    if config.include_statistics && !report.statistics.is_empty() {
        toc.push_str("- [Statistics](#statistics)\n");
    }

    toc.push('\n');

    toc
}

fn fmt_value(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

fn fmt_optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| fmt_value(v, precision))
        .unwrap_or_else(|| "n/a".to_string())
}

fn table_header(columns: &[String]) -> String {
    let mut header = format!("| {} |\n", columns.join(" | "));
    header.push('|');
    for (i, _) in columns.iter().enumerate() {
        header.push_str(if i == 0 { ":---|" } else { "---:|" });
    }
    header.push('\n');
    header
}

/// Section for a single projection.
fn generate_projection_section(projection: &Projection, precision: usize) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", projection.title));

    let metric = projection
        .metric
        .map(|m| format!(" | Metric: {}", m))
        .unwrap_or_default();
    section.push_str(&format!("*Dataset: {}{}*\n\n", projection.dataset, metric));

    let body = match &projection.shape {
        Shape::LabeledSeries(table) | Shape::Timeline(table) => {
            labeled_series_table(table, precision)
        }
        Shape::Matrix(matrix) => matrix_table(matrix, precision),
        Shape::Scatter(scatter) => scatter_table(scatter, precision),
        Shape::Radar(radar) => radar_table(radar, precision),
        Shape::Anova(panel) => anova_table(panel, precision),
        Shape::Box(boxes) => box_table(boxes, precision),
        Shape::Comparison(comparison) => comparison_table(comparison, precision),
    };

    section.push_str(&body);
    section.push('\n');

    section
}

/// One row per x label, one column per series.
fn labeled_series_table(table: &LabeledSeries, precision: usize) -> String {
    if table.labels.is_empty() {
        return "No data points.\n".to_string();
    }

    let mut columns = vec![String::new()];
    columns.extend(table.series.iter().map(|s| s.name.clone()));

    let mut out = table_header(&columns);
    for (row, label) in table.labels.iter().enumerate() {
        let cells: Vec<String> = table
            .series
            .iter()
            .map(|s| {
                s.values
                    .get(row)
                    .map(|v| fmt_value(*v, precision))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
    }
    out
}

fn matrix_table(matrix: &MatrixShape, precision: usize) -> String {
    if matrix.col_labels.is_empty() {
        return "No range/domain columns.\n".to_string();
    }

    let mut columns = vec!["Agent".to_string()];
    columns.extend(matrix.col_labels.iter().cloned());

    let mut out = table_header(&columns);
    for (label, row) in matrix.row_labels.iter().zip(&matrix.cells) {
        let cells: Vec<String> = row.iter().map(|v| fmt_value(*v, precision)).collect();
        out.push_str(&format!("| {} | {} |\n", label, cells.join(" | ")));
    }

    let means: Vec<String> = matrix_column_means(matrix)
        .into_iter()
        .map(|(_, mean)| fmt_value(mean, precision))
        .collect();
    out.push_str(&format!("| **Mean** | {} |\n", means.join(" | ")));
    out
}

fn scatter_table(scatter: &Scatter, precision: usize) -> String {
    let columns = ["#", "Domain", "Overall Mean"].map(String::from);
    let mut out = table_header(&columns);

    for point in &scatter.points {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            point.x,
            point.label,
            fmt_optional(point.y, precision)
        ));
    }

    let [start, end] = scatter.reference_line.points;
    out.push('\n');
    if scatter.reference_line.is_defined() {
        out.push_str(&format!(
            "Reference line: ({}, {}) to ({}, {})\n",
            start.x,
            fmt_optional(start.y, precision),
            end.x,
            fmt_optional(end.y, precision)
        ));
    } else {
        out.push_str("Reference line: global mean unavailable\n");
    }
    out
}

fn radar_table(radar: &Radar, precision: usize) -> String {
    if radar.traces.is_empty() {
        return "No agent traces.\n".to_string();
    }

    let mut columns = vec!["Agent".to_string()];
    columns.extend(radar.axes.iter().cloned());

    let mut out = table_header(&columns);
    for trace in &radar.traces {
        let cells: Vec<String> = trace.values.iter().map(|v| fmt_value(*v, precision)).collect();
        out.push_str(&format!("| {} | {} |\n", trace.name, cells.join(" | ")));
    }
    out
}

fn anova_table(panel: &AnovaPanel, precision: usize) -> String {
    let mut columns = vec!["Metric".to_string()];
    columns.extend(panel.group_labels.iter().cloned());
    columns.extend(
        ["Overall Mean", "Within Variance", "Between Variance"].map(String::from),
    );

    let mut out = table_header(&columns);
    for metric in &panel.metrics {
        let mut cells: Vec<String> = (0..panel.group_labels.len())
            .map(|g| fmt_optional(metric.group_means.get(g).copied(), precision))
            .collect();
        cells.push(fmt_value(metric.overall_mean, precision));
        cells.push(fmt_optional(metric.within_group_variance, precision));
        cells.push(fmt_optional(metric.between_group_variance, precision));
        out.push_str(&format!("| {} | {} |\n", metric.metric, cells.join(" | ")));
    }
    out
}

fn box_table(boxes: &[BoxSeries], precision: usize) -> String {
    if boxes.is_empty() {
        return "No domains.\n".to_string();
    }

    let columns = ["Series", "Count", "Min", "Mean", "Max"].map(String::from);
    let mut out = table_header(&columns);

    for series in boxes {
        let count = series.values.len();
        let (min, mean, max) = if count == 0 {
            (None, None, None)
        } else {
            let min = series.values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = series.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mean = series.values.iter().sum::<f64>() / count as f64;
            (Some(min), Some(mean), Some(max))
        };
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            series.name,
            count,
            fmt_optional(min, precision),
            fmt_optional(mean, precision),
            fmt_optional(max, precision)
        ));
    }
    out
}

fn comparison_table(comparison: &RangeComparison, precision: usize) -> String {
    let mut out = String::new();
    if let Some(ref prompt) = comparison.prompt {
        out.push_str(&format!("> {}\n\n", prompt));
    }
    out.push_str(&labeled_series_table(&comparison.table, precision));
    out
}

fn generate_statistics_section(stats: &[SeriesStats], config: &ReportConfig) -> String {
    if stats.is_empty() {
        return String::new();
    }

    let precision = config.precision;
    let mut section = String::new();

    section.push_str("## Statistics\n\n");

    let top = most_propagating(stats, config.top_domains);
    if !top.is_empty() {
        section.push_str("### Strongest Propagation\n\n");
        section.push_str("| Domain | Peak | Agent | Band |\n");
        section.push_str("|:---|---:|---:|:---|\n");
        for s in top {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                s.name,
                fmt_value(s.max, precision),
                s.peak_agent,
                Band::classify(s.max).label()
            ));
        }
        section.push('\n');
    }

    section.push_str("### Series Statistics\n\n");
    section.push_str(
        "| Domain | Min | Mean | Max | Below | Factual Error | Lie | Propaganda |\n",
    );
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|---:|\n");
    for s in stats {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
            s.name,
            fmt_value(s.min, precision),
            fmt_value(s.mean, precision),
            fmt_value(s.max, precision),
            s.band_counts.below,
            s.band_counts.factual_error,
            s.band_counts.lie,
            s.band_counts.propaganda
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by mprview v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ProjectionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
