//! netmetrics: SNMP telemetry dashboard and anomaly classifier.
//!
//! Browses standardized network counters over time and classifies
//! telemetry rows with four stored models.
//!
//! # Architecture
//!
//! ```text
//!                  ┌──────────────┐     ┌──────────────┐
//!  telemetry CSV ─>│ Standardizer │────>│  Dashboard   │──> TUI (ratatui)
//!                  └──────────────┘     └──────────────┘     │
//!                                                            │ CSV path
//!  labelled CSV ──> Training ──> Model Store ──> Prediction <┘
//!                              (ml_models/)      Service
//! ```
//!
//! - **train**: fits RandomForest, SVM, KNN and NaiveBayes and saves the bundle
//! - **dashboard**: metric charts plus interactive classification
//! - **predict**: headless classification of a CSV

mod config;
mod dashboard;
mod error;
mod export;
mod ml;
mod standardize;
mod table;
mod taxonomy;
mod ui;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::dashboard::MetricsDashboard;
use crate::export::{export_predictions, export_training, OutputFormat};
use crate::ml::predict::predict_csv;
use crate::ml::store::ModelStore;
use crate::ml::training::train_csv;
use crate::table::DataTable;
use crate::ui::{run_ui, App};

/// netmetrics: network telemetry dashboard and anomaly classifier.
#[derive(Parser, Debug)]
#[command(name = "netmetrics")]
#[command(version)]
#[command(about = "Browse SNMP telemetry and classify anomalies with trained models")]
#[command(long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (writes to stderr).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive dashboard.
    Dashboard {
        /// Telemetry CSV to browse (default: from config).
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Model directory used by the anomaly view.
        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Train every classifier on a labelled CSV and save the bundle.
    Train {
        /// Path to the training CSV.
        file: PathBuf,

        /// Directory to write the models to.
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,

        /// Report format: text, json, jsonl.
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Classify a CSV with the stored models.
    Predict {
        /// Path to the CSV to classify.
        #[arg(short, long)]
        file: PathBuf,

        /// Model directory (default: from config).
        #[arg(short, long)]
        models: Option<PathBuf>,

        /// Output format: text, json, jsonl.
        #[arg(short, long)]
        output: Option<OutputFormat>,
    },

    /// Print a default configuration file.
    GenerateConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig = cli.command {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.output.verbose |= cli.verbose;
    config.validate().context("Invalid configuration")?;

    // Logging would corrupt the TUI, so only the headless commands get a subscriber
    if !matches!(cli.command, Commands::Dashboard { .. }) {
        let log_level = if config.output.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("Failed to set tracing subscriber")?;
    }

    match cli.command {
        Commands::Dashboard { data, models } => {
            if let Some(data) = data {
                config.data.dashboard_csv = data;
            }
            if let Some(models) = models {
                config.models.dir = models;
            }
            run_dashboard(&config)
        }

        Commands::Train {
            file,
            output_dir,
            output,
        } => {
            if let Some(dir) = output_dir {
                config.models.dir = dir;
            }
            if let Some(format) = output {
                config.output.format = format;
            }
            run_training(&file, &config)
        }

        Commands::Predict {
            file,
            models,
            output,
        } => {
            if let Some(models) = models {
                config.models.dir = models;
            }
            if let Some(format) = output {
                config.output.format = format;
            }
            run_prediction(&file, &config)
        }

        Commands::GenerateConfig => Ok(()),
    }
}

fn run_dashboard(config: &Config) -> Result<()> {
    let path = &config.data.dashboard_csv;
    let mut table = DataTable::read_csv(path, Some(&config.data.timestamp_column))
        .with_context(|| format!("Failed to load dashboard data '{}'", path.display()))?;
    config.column_map.standardize(&mut table);

    let dashboard = MetricsDashboard::new(
        table,
        &config.data.timestamp_column,
        config.taxonomy.clone(),
        config.column_map.clone(),
    )?;
    let app = App::new(dashboard, ModelStore::new(&config.models.dir), config);

    run_ui(app, Duration::from_millis(config.dashboard.tick_rate_ms))
}

fn run_training(file: &Path, config: &Config) -> Result<()> {
    info!("Training on '{}'", file.display());

    let store = ModelStore::new(&config.models.dir);
    let outcome = train_csv(
        file,
        &config.data.timestamp_column,
        &config.training,
        &store,
    )?;

    let report = export_training(
        &outcome.reports,
        outcome.train_rows,
        outcome.test_rows,
        config.output.format,
    );
    write_output(&report, config.output.file.as_deref())
}

fn run_prediction(file: &Path, config: &Config) -> Result<()> {
    let store = ModelStore::new(&config.models.dir);
    let report = predict_csv(
        file,
        &store,
        &config.data.timestamp_column,
        &config.prediction.ground_truth_column,
    )?;

    write_output(
        &export_predictions(&report, config.output.format),
        config.output.file.as_deref(),
    )
}

/// Writes to the configured output file, or stdout when there is none.
fn write_output(content: &str, file: Option<&Path>) -> Result<()> {
    match file {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
