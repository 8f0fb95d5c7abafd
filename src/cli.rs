//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Metric;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// mprview - chart-ready projections of misinformation-propagation analyses
///
/// Loads an analysis result from a JSON file or from the analysis backend
/// and reshapes it into line-chart series, heatmap matrices, scatter
/// clouds and radar traces. Markdown/JSON output.
///
/// Examples:
///   mprview --input results.json --view series
///   mprview --backend-url http://localhost:5000 --endpoint /domaindata --view all
///   mprview --input results.json --view matrix --metric 2 --format json -o heatmap.json
///   mprview --backend-url http://localhost:5000 --get --view nodes
///   mprview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Analysis result JSON file to project
    ///
    /// Takes precedence over the backend when both are given.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Base URL of the analysis backend
    ///
    /// Falls back to NEXT_PUBLIC_BACKEND_URL when neither this nor the
    /// config file sets one.
    #[arg(long, value_name = "URL", env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Path appended to the backend URL (e.g. /domaindata)
    #[arg(long, value_name = "PATH")]
    pub endpoint: Option<String>,

    /// Article text sent to the backend
    #[arg(long, value_name = "TEXT")]
    pub article: Option<String>,

    /// Fetch with a body-less GET instead of POST (graph endpoints)
    #[arg(long)]
    pub get: bool,

    /// Envelope key holding the analysis result (e.g. file2Data)
    ///
    /// Defaults depend on the view: series/comparison use file1Data,
    /// matrix/radar/box use file2Data, scatter/anova use file3Data.
    #[arg(short, long, value_name = "KEY")]
    pub dataset: Option<String>,

    /// Projections to produce
    #[arg(long, value_name = "VIEW", value_delimiter = ',', default_value = "series")]
    pub view: Vec<View>,

    /// Metric to extract (0, 1 or 2); overrides every per-view metric
    #[arg(long, value_name = "METRIC", value_parser = Metric::parse_arg)]
    pub metric: Option<Metric>,

    /// Agent positions on the x-axis of line charts
    #[arg(long, value_name = "COUNT")]
    pub agents: Option<usize>,

    /// Rows of the heatmap matrix
    #[arg(long, value_name = "COUNT")]
    pub rows: Option<usize>,

    /// Number of selected domains to skip
    #[arg(long, default_value = "0", value_name = "COUNT")]
    pub offset: usize,

    /// Maximum number of domains to select
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Domains per line chart
    #[arg(long, value_name = "COUNT")]
    pub group_size: Option<usize>,

    /// Number of line charts
    #[arg(long, value_name = "COUNT")]
    pub groups: Option<usize>,

    /// Keys never treated as domains (comma-separated)
    ///
    /// "prompt" is always excluded.
    #[arg(long, value_name = "KEYS", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write the fetched document unchanged to this file
    #[arg(long, value_name = "FILE")]
    pub raw_out: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .mprview.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Backend request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Generate a default .mprview.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// HTTP method used against the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    /// POST `{"article": ...}`
    #[default]
    Post,
    /// GET without a body
    Get,
}

/// Projection selectable with --view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum View {
    /// Per-domain propagation lines with threshold bands
    Series,
    /// Agent x (range, domain) heatmap
    Matrix,
    /// Overall mean per domain with the global reference line
    Scatter,
    /// Domains on the angular axis, one trace per agent
    Radar,
    /// Group means per domain for all three metrics
    Anova,
    /// Value populations per domain and metric
    Box,
    /// Node-pair propagation rates per range
    Comparison,
    /// Misinformation index per article version
    Versions,
    /// Misinformation indices per graph node
    Nodes,
    /// Every view above
    All,
}

impl View {
    /// Every concrete view, in report order.
    pub const CONCRETE: [View; 9] = [
        View::Series,
        View::Matrix,
        View::Scatter,
        View::Radar,
        View::Anova,
        View::Box,
        View::Comparison,
        View::Versions,
        View::Nodes,
    ];

    /// Envelope key projected when --dataset is not given; `None` means the
    /// document root.
    pub fn default_dataset(&self) -> Option<&'static str> {
        match self {
            View::Series | View::Comparison => Some("file1Data"),
            View::Matrix | View::Radar | View::Box => Some("file2Data"),
            View::Scatter | View::Anova => Some("file3Data"),
            View::Versions | View::Nodes | View::All => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            View::Series => "series",
            View::Matrix => "matrix",
            View::Scatter => "scatter",
            View::Radar => "radar",
            View::Anova => "anova",
            View::Box => "box",
            View::Comparison => "comparison",
            View::Versions => "versions",
            View::Nodes => "nodes",
            View::All => "all",
        }
    }
}

/// Expand `all` and drop duplicates, keeping first-seen order.
pub fn expand_views(views: &[View]) -> Vec<View> {
    let mut expanded: Vec<View> = Vec::new();
    for view in views {
        let items: &[View] = if *view == View::All {
            &View::CONCRETE
        } else {
            std::slice::from_ref(view)
        };
        for item in items {
            if !expanded.contains(item) {
                expanded.push(*item);
            }
        }
    }
    expanded
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate backend URL format
        if let Some(ref url) = self.backend_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Backend URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Validate input file if provided
        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if self.view.is_empty() {
            return Err("At least one --view is required".to_string());
        }

        if self.agents == Some(0) {
            return Err("Agent count must be at least 1".to_string());
        }

        if self.rows == Some(0) {
            return Err("Row count must be at least 1".to_string());
        }

        if self.group_size == Some(0) {
            return Err("Group size must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            backend_url: Some("http://localhost:5000".to_string()),
            endpoint: None,
            article: None,
            get: false,
            dataset: None,
            view: vec![View::Series],
            metric: None,
            agents: None,
            rows: None,
            offset: 0,
            limit: None,
            group_size: None,
            groups: None,
            exclude: None,
            format: None,
            output: None,
            raw_out: None,
            config: None,
            verbose: false,
            quiet: false,
            timeout: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_views_and_metric() {
        let args = Args::try_parse_from([
            "mprview",
            "--input",
            "results.json",
            "--view",
            "series,matrix",
            "--metric",
            "1",
        ])
        .unwrap();
        assert_eq!(args.view, vec![View::Series, View::Matrix]);
        assert_eq!(args.metric, Some(Metric::I1));

        assert!(Args::try_parse_from(["mprview", "--metric", "7"]).is_err());
    }

    #[test]
    fn test_expand_views() {
        let views = expand_views(&[View::Matrix, View::All]);
        assert_eq!(views.len(), View::CONCRETE.len());
        assert_eq!(views[0], View::Matrix);
        assert_eq!(views[1], View::Series);
        assert!(!views.contains(&View::All));
    }

    #[test]
    fn test_default_datasets() {
        assert_eq!(View::Series.default_dataset(), Some("file1Data"));
        assert_eq!(View::Matrix.default_dataset(), Some("file2Data"));
        assert_eq!(View::Scatter.default_dataset(), Some("file3Data"));
        assert_eq!(View::Nodes.default_dataset(), None);
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.backend_url = Some("localhost:5000".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_counts() {
        let mut args = make_args();
        args.agents = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.group_size = Some(0);
        assert!(args.validate().is_err());

        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
