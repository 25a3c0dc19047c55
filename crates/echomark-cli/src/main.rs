//! Echomark CLI - catalog ingestion and audio identification
//!
//! Features:
//! - Ingest WAV recordings into a JSON catalog
//! - Identify a clip against the catalog
//! - Inspect peaks and landmarks of a single file
//! - Catalog statistics

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use echomark_fingerprint::EchomarkConfig;

mod commands;
mod output;

/// Echomark CLI - landmark audio fingerprinting
#[derive(Parser)]
#[command(name = "echomark")]
#[command(version)]
#[command(about = "Fingerprint recordings and identify audio clips", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint WAV files and add them to a catalog
    Ingest {
        /// WAV files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Catalog file (created if missing)
        #[arg(long)]
        catalog: PathBuf,

        /// Recording id (defaults to the file stem; single file only)
        #[arg(long)]
        id: Option<String>,
    },

    /// Identify a WAV clip against a catalog
    Identify {
        /// WAV clip to identify
        file: PathBuf,

        /// Catalog file
        #[arg(long)]
        catalog: PathBuf,

        /// Number of results to show
        #[arg(long)]
        top: Option<usize>,
    },

    /// Show peaks and landmarks for a WAV file
    Fingerprint {
        /// Input WAV file
        file: PathBuf,

        /// Write landmark records to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show catalog statistics
    Stats {
        /// Catalog file
        #[arg(long)]
        catalog: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    echomark_core::init();

    let config = match &cli.config {
        Some(path) => EchomarkConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EchomarkConfig::default(),
    };

    match cli.command {
        Commands::Ingest { files, catalog, id } => {
            commands::ingest(&files, &catalog, id, &config, &cli.format).await?;
        }
        Commands::Identify { file, catalog, top } => {
            commands::identify(&file, &catalog, top, &config, &cli.format).await?;
        }
        Commands::Fingerprint { file, output } => {
            commands::fingerprint(&file, output, &config, &cli.format).await?;
        }
        Commands::Stats { catalog } => {
            commands::stats(&catalog, &config, &cli.format).await?;
        }
    }

    Ok(())
}
