//! CLI entry point for the station consistency pipeline.
//!
//! Provides subcommands for screening downloaded station files, extracting
//! reported monthly averages, recomputing them from hourly readings, and
//! scoring the two against each other.

use anyhow::Result;
use clap::{Parser, Subcommand};
use station_consistency::config::PipelineConfig;
use station_consistency::output::{JsonFileSink, print_json, print_pretty};
use station_consistency::parser::StationTable;
use station_consistency::pipeline::{self, BatchSummary};
use station_consistency::validate::{FeatureStatus, feature_status};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "station_consistency")]
#[command(about = "Cross-check reported monthly climate averages against hourly data", long_about = None)]
struct Cli {
    /// Parameter file with feature pairs and directories
    #[arg(short, long, global = true, default_value = "params.yaml")]
    params: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check station files for usable feature pairs
    Validate {
        /// Directory of raw station CSVs (defaults to download.destination)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Delete files that have no usable feature pair
        #[arg(long, default_value_t = false)]
        remove: bool,
    },
    /// Extract the reported monthly averages of every station
    Prepare {
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Recompute monthly averages from the hourly readings
    Process {
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// Directory of extracted monthly tables
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory for the computed_ tables
        #[arg(short, long)]
        computed_dir: Option<PathBuf>,
    },
    /// Score recomputed averages against the reported ones
    Evaluate {
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        #[arg(short, long)]
        computed_dir: Option<PathBuf>,

        /// R² above which the pipeline is consistent
        #[arg(short, long)]
        threshold: Option<f64>,
    },
    /// Run every stage in order
    Run {
        #[arg(short, long)]
        threshold: Option<f64>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/station_consistency.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("station_consistency.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::load(&cli.params)?;
    info!(params = %cli.params.display(), pairs = config.pairs.len(), "Parameters loaded");

    match cli.command {
        Commands::Validate { input_dir, remove } => {
            let dir = input_dir.unwrap_or_else(|| config.raw_dir.clone());
            if remove {
                let summary = pipeline::screen_directory(&dir, &config.pairs)?;
                log_batch("validate", &summary);
            } else {
                report_validity(&dir, &config)?;
            }
        }
        Commands::Prepare {
            input_dir,
            output_dir,
        } => {
            let input = input_dir.unwrap_or_else(|| config.raw_dir.clone());
            let output = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let summary = pipeline::extract_directory(&input, &output, &config.pairs)?;
            log_batch("prepare", &summary);
        }
        Commands::Process {
            input_dir,
            output_dir,
            computed_dir,
        } => {
            let input = input_dir.unwrap_or_else(|| config.raw_dir.clone());
            let output = output_dir.unwrap_or_else(|| config.output_dir.clone());
            let computed = computed_dir.unwrap_or_else(|| config.computed_dir.clone());
            let summary = pipeline::aggregate_directory(&input, &output, &computed, &config.pairs)?;
            log_batch("process", &summary);
        }
        Commands::Evaluate {
            output_dir,
            computed_dir,
            threshold,
        } => {
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if let Some(dir) = computed_dir {
                config.computed_dir = dir;
            }
            if let Some(t) = threshold {
                config.threshold = t;
            }
            config.validate()?;

            let mut sink = JsonFileSink::in_dir(&config.eval_dir);
            let report = pipeline::evaluate(&config, &mut sink, Vec::new())?;
            print_pretty(&report);
            print_json(&report)?;
        }
        Commands::Run { threshold } => {
            if let Some(t) = threshold {
                config.threshold = t;
            }
            config.validate()?;

            let mut sink = JsonFileSink::in_dir(&config.eval_dir);
            let report = pipeline::run(&config, &mut sink)?;
            print_json(&report)?;
        }
    }

    Ok(())
}

/// Logs, per station file, whether each feature pair qualifies, without
/// touching the files.
#[tracing::instrument(skip(config), fields(dir = %dir.display()))]
fn report_validity(dir: &Path, config: &PipelineConfig) -> Result<()> {
    let mut valid = 0usize;
    let mut total = 0usize;

    for path in station_consistency::evaluate::pairing::list_csv_files(dir)? {
        total += 1;
        let table = match StationTable::from_path(&path) {
            Ok(table) => table,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Station file unreadable");
                continue;
            }
        };

        let mut usable = false;
        for pair in &config.pairs {
            match feature_status(&table, pair) {
                FeatureStatus::Qualifies => {
                    usable = true;
                    info!(file = %path.display(), monthly = %pair.monthly_name, "Feature usable");
                }
                FeatureStatus::MissingColumn(column) => {
                    info!(file = %path.display(), column, "Feature column missing");
                }
                FeatureStatus::EmptyFeature(column) => {
                    info!(file = %path.display(), column, "Feature column empty");
                }
            }
        }

        if usable {
            valid += 1;
        } else {
            warn!(file = %path.display(), "Station file has no usable feature pair");
        }
    }

    info!(valid, total, "Validation summary");
    Ok(())
}

fn log_batch(stage: &str, summary: &BatchSummary) {
    info!(
        stage,
        processed = summary.processed.len(),
        rejected = summary.rejected.len(),
        failures = summary.failures.len(),
        "Stage finished"
    );
    for failure in &summary.failures {
        warn!(stage, file = %failure.file, error = %failure.error, "Stage failure");
    }
}
