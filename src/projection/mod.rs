//! Projection layer.
//!
//! Domain selection, metric extraction and shape adapters, plus the
//! dispatcher that turns a `--view` into titled projections.

pub mod extract;
pub mod palette;
pub mod selector;
pub mod shapes;

use crate::cli::View;
use crate::config::ProjectionConfig;
use crate::models::{Metric, MetricKeys, Projection, Shape, NAMES_IN_SEQUENCE_KEY, PROMPT_KEY};
use crate::source::{analysis_result, select_dataset, SourceError};
use extract::has_anova_results;
use selector::{domain_groups, select_domains, DomainPolicy};
use serde_json::Value;
use tracing::{debug, info};

/// Everything a projection needs besides the data.
#[derive(Debug, Clone)]
pub struct ProjectionSettings {
    pub agent_count: usize,
    pub row_count: usize,
    pub series_metric: Metric,
    pub matrix_metric: Metric,
    pub scatter_metric: Metric,
    pub radar_metric: Metric,
    pub comparison_metric: Metric,
    pub group_size: usize,
    pub group_count: usize,
    pub policy: DomainPolicy,
    pub keys: MetricKeys,
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        Self::from_config(&ProjectionConfig::default(), 0, None)
    }
}

impl ProjectionSettings {
    /// Build settings from config plus the CLI's offset/limit.
    pub fn from_config(config: &ProjectionConfig, offset: usize, limit: Option<usize>) -> Self {
        let mut policy = DomainPolicy::default()
            .with_exclude(config.exclude.iter().cloned())
            .with_offset(offset);
        if let Some(limit) = limit {
            policy = policy.with_limit(limit);
        }

        Self {
            agent_count: config.agent_count,
            row_count: config.row_count,
            series_metric: config.series_metric,
            matrix_metric: config.matrix_metric,
            scatter_metric: config.scatter_metric,
            radar_metric: config.radar_metric,
            comparison_metric: config.comparison_metric,
            group_size: config.group_size,
            group_count: config.group_count,
            policy,
            keys: MetricKeys::new(config.metric_prefixes.clone()),
        }
    }
}

/// Produce the projections of one view.
///
/// `dataset` overrides the view's default envelope key.
pub fn project_view(
    view: View,
    document: &Value,
    dataset: Option<&str>,
    settings: &ProjectionSettings,
) -> Result<Vec<Projection>, SourceError> {
    let key = dataset.or_else(|| view.default_dataset());
    let (value, name) = select_dataset(document, key)?;
    debug!("Projecting {} from {}", view.name(), name);

    let projections = match view {
        View::Series => project_series(value, &name, settings)?,
        View::Matrix => {
            let result = analysis_result(value, &name)?;
            let metric = settings.matrix_metric;
            vec![Projection {
                title: "Agent Interaction Heatmap".to_string(),
                dataset: name,
                metric: Some(metric),
                shape: Shape::Matrix(shapes::to_matrix(
                    &result,
                    settings.row_count,
                    metric,
                    &settings.keys,
                )),
            }]
        }
        View::Scatter => {
            let result = analysis_result(value, &name)?;
            let metric = settings.scatter_metric;
            vec![Projection {
                title: "Overall Mean per Domain".to_string(),
                dataset: name,
                metric: Some(metric),
                shape: Shape::Scatter(shapes::to_scatter(&result, metric)),
            }]
        }
        View::Radar => {
            let result = analysis_result(value, &name)?;
            let metric = settings.radar_metric;
            vec![Projection {
                title: "Agent Radar".to_string(),
                dataset: name,
                metric: Some(metric),
                shape: Shape::Radar(shapes::to_radar(&result, metric, &settings.keys)),
            }]
        }
        View::Anova => project_anova(value, &name)?,
        View::Box => {
            let result = analysis_result(value, &name)?;
            vec![Projection {
                title: "Value Distribution by Domain".to_string(),
                dataset: name,
                metric: None,
                shape: Shape::Box(shapes::to_box_series(&result, &settings.keys)),
            }]
        }
        View::Comparison => project_comparison(value, &name, settings)?,
        View::Versions => {
            require_array(value, "versions")?;
            vec![Projection {
                title: "Misinformation Index vs Version Number".to_string(),
                dataset: name,
                metric: None,
                shape: Shape::Timeline(shapes::to_version_index(value)),
            }]
        }
        View::Nodes => {
            require_array(value, "nodes")?;
            vec![Projection {
                title: "Misinformation Index per Node".to_string(),
                dataset: name,
                metric: None,
                shape: Shape::Timeline(shapes::to_node_index_series(value, &settings.keys)),
            }]
        }
        View::All => Vec::new(),
    };

    info!("View {}: {} projection(s)", view.name(), projections.len());
    Ok(projections)
}

fn require_array(value: &Value, key: &str) -> Result<(), SourceError> {
    match value.get(key) {
        Some(Value::Array(items)) if !items.is_empty() => Ok(()),
        Some(Value::Array(_)) => Err(SourceError::Empty {
            what: key.to_string(),
        }),
        _ => Err(SourceError::MissingDataset {
            key: key.to_string(),
        }),
    }
}

fn project_series(
    value: &Value,
    name: &str,
    settings: &ProjectionSettings,
) -> Result<Vec<Projection>, SourceError> {
    let result = analysis_result(value, name)?;
    let groups = domain_groups(
        &result,
        &settings.policy,
        settings.group_size,
        settings.group_count,
    );

    if groups.is_empty() {
        return Err(SourceError::Empty {
            what: format!("{} (no plottable domains)", name),
        });
    }

    let metric = settings.series_metric;
    let mut first = settings.policy.offset + 1;

    Ok(groups
        .iter()
        .enumerate()
        .map(|(index, domains)| {
            let last = first + domains.len() - 1;
            let title = format!(
                "Group {}: Domains {}-{} - Misinformation Propagation",
                index + 1,
                first,
                last
            );
            first = last + 1;

            Projection {
                title,
                dataset: name.to_string(),
                metric: Some(metric),
                shape: Shape::LabeledSeries(shapes::to_labeled_series(
                    domains,
                    &result,
                    settings.agent_count,
                    metric,
                    &settings.keys,
                )),
            }
        })
        .collect())
}

fn project_anova(value: &Value, name: &str) -> Result<Vec<Projection>, SourceError> {
    let result = analysis_result(value, name)?;
    let policy = DomainPolicy::default().with_exclude([NAMES_IN_SEQUENCE_KEY]);

    let projections: Vec<Projection> = select_domains(&result, &policy)
        .into_iter()
        .filter_map(|domain| {
            let record = result.get(&domain)?;
            if !has_anova_results(record) {
                debug!("No ANOVA results for {}", domain);
                return None;
            }
            Some(Projection {
                title: format!("ANOVA Analysis for {}", domain),
                dataset: name.to_string(),
                metric: None,
                shape: Shape::Anova(shapes::to_anova_panel(&domain, record)),
            })
        })
        .collect();

    if projections.is_empty() {
        return Err(SourceError::Empty {
            what: format!("{} (no ANOVA results)", name),
        });
    }

    Ok(projections)
}

fn project_comparison(
    value: &Value,
    name: &str,
    settings: &ProjectionSettings,
) -> Result<Vec<Projection>, SourceError> {
    let result = analysis_result(value, name)?;
    let metric = settings.comparison_metric;

    let projections: Vec<Projection> = result
        .iter()
        .filter(|(range, record)| {
            range.as_str() != PROMPT_KEY
                && record
                    .get("calculations")
                    .map(Value::is_object)
                    .unwrap_or(false)
        })
        .map(|(range, record)| Projection {
            title: format!("Misinformation Propagation Rate - {}", range),
            dataset: name.to_string(),
            metric: Some(metric),
            shape: Shape::Comparison(shapes::to_range_comparison(
                range,
                record,
                metric,
                &settings.keys,
            )),
        })
        .collect();

    if projections.is_empty() {
        return Err(SourceError::Empty {
            what: format!("{} (no range calculations)", name),
        });
    }

    Ok(projections)
}
