//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.mprview.toml` files.

use crate::cli::{FetchMethod, OutputFormat};
use crate::models::{default_metric_prefixes, Metric};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".mprview.toml";

/// Backend address variable read by the web frontend; used when neither
/// `--backend-url`/`BACKEND_URL` nor the config file sets a URL.
pub const FRONTEND_BACKEND_URL_ENV: &str = "NEXT_PUBLIC_BACKEND_URL";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Projection settings.
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> String {
    "mprview_report.md".to_string()
}

/// Analysis backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend. Usually supplied via `BACKEND_URL`.
    #[serde(default)]
    pub url: Option<String>,

    /// Path appended to the base URL (e.g. `/domaindata`).
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Article text sent in the request body.
    #[serde(default = "default_article")]
    pub article: String,

    /// `post` with an article body, or `get` for graph pages.
    #[serde(default)]
    pub method: FetchMethod,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            endpoint: None,
            article: default_article(),
            method: FetchMethod::default(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_article() -> String {
    String::new()
}

fn default_timeout() -> u64 {
    120
}

/// Projection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Agent positions on the x-axis of line charts.
    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    /// Rows of the heatmap matrix.
    #[serde(default = "default_row_count")]
    pub row_count: usize,

    /// Metric plotted by the line charts.
    #[serde(default = "default_series_metric")]
    pub series_metric: Metric,

    /// Metric shown in the heatmap.
    #[serde(default = "default_metric")]
    pub matrix_metric: Metric,

    /// Metric whose overall mean drives the scatter plot.
    #[serde(default = "default_metric")]
    pub scatter_metric: Metric,

    /// Metric used as the radar radius.
    #[serde(default = "default_metric")]
    pub radar_metric: Metric,

    /// Metric read from range comparison calculations.
    #[serde(default = "default_metric")]
    pub comparison_metric: Metric,

    /// Domains per line chart.
    #[serde(default = "default_group_size")]
    pub group_size: usize,

    /// Number of side-by-side line charts.
    #[serde(default = "default_group_count")]
    pub group_count: usize,

    /// Keys that are never plotted as domains.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Field prefixes tried when looking a metric up (`mprI` -> `mprI2`).
    #[serde(default = "default_metric_prefixes")]
    pub metric_prefixes: Vec<String>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            agent_count: default_agent_count(),
            row_count: default_row_count(),
            series_metric: default_series_metric(),
            matrix_metric: default_metric(),
            scatter_metric: default_metric(),
            radar_metric: default_metric(),
            comparison_metric: default_metric(),
            group_size: default_group_size(),
            group_count: default_group_count(),
            exclude: default_exclude(),
            metric_prefixes: default_metric_prefixes(),
        }
    }
}

fn default_agent_count() -> usize {
    21
}

fn default_row_count() -> usize {
    30
}

fn default_series_metric() -> Metric {
    Metric::I2
}

fn default_metric() -> Metric {
    Metric::I0
}

fn default_group_size() -> usize {
    5
}

fn default_group_count() -> usize {
    2
}

fn default_exclude() -> Vec<String> {
    crate::projection::selector::default_excluded_keys()
        .into_iter()
        .collect()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the series statistics section.
    #[serde(default = "default_true")]
    pub include_statistics: bool,

    /// Decimal places for numbers in Markdown tables.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// Number of domains listed under "Strongest Propagation".
    #[serde(default = "default_top_domains")]
    pub top_domains: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_statistics: true,
            precision: default_precision(),
            top_domains: default_top_domains(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_precision() -> usize {
    3
}

fn default_top_domains() -> usize {
    5
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.mprview.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Backend settings
        if let Some(ref url) = args.backend_url {
            self.backend.url = Some(url.clone());
        } else if self.backend.url.is_none() {
            self.backend.url = std::env::var(FRONTEND_BACKEND_URL_ENV)
                .ok()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty());
        }
        if let Some(ref endpoint) = args.endpoint {
            self.backend.endpoint = Some(endpoint.clone());
        }
        if let Some(ref article) = args.article {
            self.backend.article = article.clone();
        }
        if args.get {
            self.backend.method = FetchMethod::Get;
        }
        if let Some(timeout) = args.timeout {
            self.backend.timeout_seconds = timeout;
        }

        // A single --metric overrides every per-view metric
        if let Some(metric) = args.metric {
            self.projection.series_metric = metric;
            self.projection.matrix_metric = metric;
            self.projection.scatter_metric = metric;
            self.projection.radar_metric = metric;
            self.projection.comparison_metric = metric;
        }

        if let Some(agents) = args.agents {
            self.projection.agent_count = agents;
        }
        if let Some(rows) = args.rows {
            self.projection.row_count = rows;
        }
        if let Some(group_size) = args.group_size {
            self.projection.group_size = group_size;
        }
        if let Some(groups) = args.groups {
            self.projection.group_count = groups;
        }
        if let Some(ref exclude) = args.exclude {
            self.projection.exclude = exclude.clone();
        }

        if let Some(format) = args.format {
            self.general.format = format;
        }

    }

    /// Validate the merged configuration.
    ///
    /// Applies the same bounds as the CLI flags to values that may come
    /// from the config file.
    pub fn validate(&self) -> Result<()> {
        if self.projection.agent_count == 0 {
            bail!("projection.agent_count must be at least 1");
        }

        if self.projection.row_count == 0 {
            bail!("projection.row_count must be at least 1");
        }

        if self.projection.group_size == 0 {
            bail!("projection.group_size must be at least 1");
        }

        if self.backend.timeout_seconds == 0 {
            bail!("backend.timeout_seconds must be at least 1");
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
