//! CLI entry point for the e-commerce insights pipeline.
//!
//! Provides subcommands for computing the full insights report, exporting
//! a filtered-row preview, and exporting sampled map coordinates.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use ecom_insights::analyzers::types::Granularity;
use ecom_insights::filter::FilterParams;
use ecom_insights::geo::{DEFAULT_MAX_POINTS, DEFAULT_SEED, sample_points};
use ecom_insights::loader::DatasetStore;
use ecom_insights::output::{
    RunMetrics, append_metrics, print_json, write_geo_csv, write_json, write_preview_csv,
};
use ecom_insights::report::build_report;
use ecom_insights::{filter, output};
use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ecom_insights")]
#[command(about = "Analytics pipeline for an e-commerce transactions dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Predicates shared by every subcommand; unset means unrestricted.
#[derive(Args)]
struct FilterArgs {
    /// Inclusive lower bound on the purchase date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Inclusive upper bound on the purchase date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Restrict to a product category (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Restrict to a customer city (repeatable)
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Restrict to an order status (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,
}

impl From<FilterArgs> for FilterParams {
    fn from(args: FilterArgs) -> Self {
        FilterParams {
            date_from: args.from,
            date_to: args.to,
            categories: args.categories,
            cities: args.cities,
            statuses: args.statuses,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the full insights report for a dataset
    Report {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Time bucket for the transaction series
        #[arg(long, value_enum, default_value_t = Granularity::Month)]
        granularity: Granularity,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to append one summary row per run
        #[arg(long)]
        metrics: Option<String>,
    },
    /// Export the first filtered rows as CSV
    Preview {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Number of rows to export
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Export a sampled set of valid customer coordinates as CSV
    MapPoints {
        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Cap on the number of exported points
        #[arg(long, default_value_t = DEFAULT_MAX_POINTS)]
        max_points: usize,

        /// Sampling seed; fixed by default so runs are reproducible
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ecom_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ecom_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let store = DatasetStore::new();

    match cli.command {
        Commands::Report {
            source,
            filters,
            granularity,
            output,
            metrics,
        } => {
            let dataset = store.load(&source).await?;
            let params = FilterParams::from(filters);

            let report = build_report(&dataset, &params, granularity);
            output::print_pretty(&report);

            match output {
                Some(path) => {
                    write_json(&path, &report)?;
                    info!(path = %path, "Report written");
                }
                None => print_json(&report)?,
            }

            if let Some(path) = metrics {
                append_metrics(&path, &RunMetrics::from_report(&report))?;
                info!(path = %path, "Run metrics appended");
            }
        }
        Commands::Preview {
            source,
            filters,
            limit,
            output,
        } => {
            let dataset = store.load(&source).await?;
            let params = FilterParams::from(filters);

            let rows = filter::apply(&dataset.records, &params);
            if rows.is_empty() {
                info!("No rows match the supplied filters");
            }

            with_output(output.as_deref(), |writer| {
                write_preview_csv(writer, &rows, limit)
            })?;
        }
        Commands::MapPoints {
            source,
            filters,
            max_points,
            seed,
            output,
        } => {
            let dataset = store.load(&source).await?;
            let params = FilterParams::from(filters);

            let rows = filter::apply(&dataset.records, &params);
            let points = sample_points(&rows, max_points, seed);
            if points.is_empty() {
                info!("No valid coordinates to export");
            } else {
                info!(
                    points = points.len(),
                    valid_rows = rows.iter().filter(|r| r.has_coordinates()).count(),
                    "Map points sampled"
                );
            }

            with_output(output.as_deref(), |writer| write_geo_csv(writer, &points))?;
        }
    }

    Ok(())
}

/// Runs a writer callback against a file path, or stdout when no path is given.
fn with_output(path: Option<&str>, write: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    match path {
        Some(path) => {
            let mut file = File::create(path)?;
            write(&mut file)?;
            info!(path, "Export written");
            Ok(())
        }
        None => write(&mut std::io::stdout()),
    }
}
