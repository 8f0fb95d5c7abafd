//! mprview - chart-ready projections of misinformation-propagation analyses
//!
//! A CLI tool that loads an analysis result (from a JSON file or the
//! analysis backend) and reshapes it into line-chart series, heatmap
//! matrices, scatter clouds, radar traces and ANOVA panels.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, fetch, parse, write)
//!   2 - No data available (empty document or no projection produced)

mod analysis;
mod cli;
mod config;
mod models;
mod projection;
mod report;
mod source;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::{expand_views, Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME, FRONTEND_BACKEND_URL_ENV};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ProjectionReport, ReportMetadata};
use projection::{project_view, ProjectionSettings};
use serde_json::Value;
use source::BackendClient;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const EXIT_NO_DATA: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("mprview v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Projection failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .mprview.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the backend URL, metrics, agent counts and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete projection workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    // Step 1: Get the analysis document
    let (document, origin) = load_document(&args, &config).await?;

    if let Some(ref raw_out) = args.raw_out {
        let raw = serde_json::to_string_pretty(&document)?;
        std::fs::write(raw_out, raw)
            .with_context(|| format!("Failed to write raw document to {}", raw_out.display()))?;
        info!("Raw document written to {}", raw_out.display());
    }

    if source::is_empty_document(&document) {
        eprintln!("No data available: {} returned an empty document.", origin);
        return Ok(EXIT_NO_DATA);
    }

    // Step 2: Project every requested view
    let settings = ProjectionSettings::from_config(&config.projection, args.offset, args.limit);
    let views = expand_views(&args.view);

    let mut projections = Vec::new();
    let mut produced_views = Vec::new();

    for view in &views {
        match project_view(*view, &document, args.dataset.as_deref(), &settings) {
            Ok(view_projections) => {
                if !view_projections.is_empty() {
                    produced_views.push(view.name().to_string());
                }
                projections.extend(view_projections);
            }
            Err(e) => warn!("Skipping {} view: {}", view.name(), e),
        }
    }

    if projections.is_empty() {
        eprintln!("No data available for the requested view(s).");
        return Ok(EXIT_NO_DATA);
    }

    // Step 3: Build the report
    let statistics = analysis::collect_statistics(&projections);
    let duration = start_time.elapsed().as_secs_f64();

    let report = ProjectionReport {
        metadata: ReportMetadata {
            source: origin,
            generated_at: Utc::now(),
            views: produced_views,
            projection_count: projections.len(),
            duration_seconds: duration,
        },
        projections,
        statistics,
    };

    // Step 4: Write the report
    let output = match config.general.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = resolve_output_path(&args, &config);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if !args.quiet {
        println!("\n📊 Projection Summary:");
        println!("   Source: {}", report.metadata.source);
        println!("   Views: {}", report.metadata.views.join(", "));
        println!("   Projections: {}", report.metadata.projection_count);
        println!("   Domain series: {}", report.statistics.len());
        println!("   Duration: {:.1}s", duration);
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Read the document from --input, or fetch it from the backend.
///
/// Returns the document and a description of where it came from.
async fn load_document(args: &Args, config: &Config) -> Result<(Value, String)> {
    if let Some(ref input) = args.input {
        info!("Reading analysis from {}", input.display());
        let document = source::load_from_file(input)?;
        return Ok((document, input.display().to_string()));
    }

    if config.backend.url.is_none() {
        bail!(
            "No analysis source: pass --input FILE or --backend-url URL (or set BACKEND_URL / {})",
            FRONTEND_BACKEND_URL_ENV
        );
    }

    let client = BackendClient::new(&config.backend)?;

    let spinner = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching analysis from {}", client.url()));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };

    let result = client.fetch().await;
    spinner.finish_and_clear();

    let document = result
        .with_context(|| format!("Failed to fetch analysis from {}", client.url()))?;

    Ok((document, client.url().to_string()))
}

/// Output path from --output, else the configured default.
///
/// The configured default takes a `.json` extension when writing JSON.
fn resolve_output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }

    let path = PathBuf::from(&config.general.output);
    match config.general.format {
        OutputFormat::Json => path.with_extension("json"),
        OutputFormat::Markdown => path,
    }
}
