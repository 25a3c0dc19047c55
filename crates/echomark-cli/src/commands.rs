//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use echomark_core::{CatalogStore, FileCatalog, MatchResult};
use echomark_fingerprint::{audio, EchomarkConfig, Fingerprinter, MatchEngine};

use crate::output::{is_interactive, print_rows, print_value, OutputFormat};

#[derive(Tabled, Serialize)]
struct IngestRow {
    #[tabled(rename = "Recording")]
    recording_id: String,
    #[tabled(rename = "Duration (s)")]
    duration_secs: String,
    #[tabled(rename = "Landmarks")]
    landmarks: usize,
}

#[derive(Tabled, Serialize)]
struct MatchRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Recording")]
    recording_id: String,
    #[tabled(rename = "Score")]
    score: u32,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Offset (ms)")]
    offset_ms: i64,
}

impl MatchRow {
    fn new(rank: usize, result: &MatchResult) -> Self {
        Self {
            rank,
            recording_id: result.recording_id.clone(),
            score: result.score,
            confidence: format!("{:.2}", result.confidence),
            offset_ms: result.offset_ms,
        }
    }
}

fn recording_id_for(path: &Path) -> anyhow::Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive a recording id from {}", path.display()))
}

async fn open_existing_catalog(path: &Path, config: &EchomarkConfig) -> anyhow::Result<FileCatalog> {
    if !path.exists() {
        bail!("Catalog {} does not exist; ingest recordings first", path.display());
    }
    FileCatalog::open(path, config.fingerprint.landmarks.scheme)
        .await
        .with_context(|| format!("Failed to open catalog {}", path.display()))
}

/// Fingerprint files and add them to the catalog
pub async fn ingest(
    files: &[PathBuf],
    catalog_path: &Path,
    id: Option<String>,
    config: &EchomarkConfig,
    format: &str,
) -> anyhow::Result<()> {
    if id.is_some() && files.len() > 1 {
        bail!("--id can only be used when ingesting a single file");
    }

    let fingerprinter = Fingerprinter::new(config.fingerprint.clone())?;
    let catalog = FileCatalog::open(catalog_path, fingerprinter.scheme())
        .await
        .with_context(|| format!("Failed to open catalog {}", catalog_path.display()))?;

    let progress = if is_interactive(format) {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Failed to create progress bar template")?
                .progress_chars("=> "),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut rows = Vec::with_capacity(files.len());
    for file in files {
        let recording_id = match &id {
            Some(id) => id.clone(),
            None => recording_id_for(file)?,
        };
        progress.set_message(recording_id.clone());

        let buffer = audio::load_wav(file, fingerprinter.sample_rate())
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let duration_secs = buffer.duration_secs();
        let landmarks = fingerprinter
            .ingest(&catalog, buffer, &recording_id)
            .await
            .with_context(|| format!("Failed to ingest {}", file.display()))?;

        rows.push(IngestRow {
            recording_id,
            duration_secs: format!("{:.2}", duration_secs),
            landmarks,
        });
        progress.inc(1);
    }
    progress.finish_and_clear();

    catalog.flush().await.context("Failed to save catalog")?;
    info!(
        catalog = %catalog_path.display(),
        recordings = rows.len(),
        "Catalog updated"
    );

    print_rows(&rows, format)
}

/// Identify a clip against the catalog
pub async fn identify(
    file: &Path,
    catalog_path: &Path,
    top: Option<usize>,
    config: &EchomarkConfig,
    format: &str,
) -> anyhow::Result<()> {
    let fingerprinter = Fingerprinter::new(config.fingerprint.clone())?;
    let catalog = open_existing_catalog(catalog_path, config).await?;

    let mut match_config = config.matching.clone();
    if let Some(top) = top {
        match_config.top_n = top;
    }

    let clip = audio::load_wav(file, fingerprinter.sample_rate())
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let engine = MatchEngine::new(Arc::new(catalog), match_config)?;
    let results = engine
        .identify(&fingerprinter, &clip)
        .await
        .context("Identification failed")?;

    if results.is_empty() && OutputFormat::from(format) != OutputFormat::Json {
        println!("No match for {}", file.display());
        return Ok(());
    }

    let rows: Vec<MatchRow> = results
        .iter()
        .enumerate()
        .map(|(i, result)| MatchRow::new(i + 1, result))
        .collect();
    print_rows(&rows, format)
}

#[derive(Serialize)]
struct FingerprintSummary {
    file: String,
    duration_secs: f64,
    peaks: usize,
    landmarks: usize,
    distinct_hashes: usize,
}

/// Show peaks and landmarks for a single file
pub async fn fingerprint(
    file: &Path,
    output: Option<PathBuf>,
    config: &EchomarkConfig,
    format: &str,
) -> anyhow::Result<()> {
    let fingerprinter = Fingerprinter::new(config.fingerprint.clone())?;
    let buffer = audio::load_wav(file, fingerprinter.sample_rate())
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let recording_id = recording_id_for(file)?;

    let (peaks, records) = fingerprinter.analyze(&buffer, &recording_id)?;
    let distinct_hashes = records
        .iter()
        .map(|r| r.hash)
        .collect::<std::collections::HashSet<_>>()
        .len();

    let summary = FingerprintSummary {
        file: file.display().to_string(),
        duration_secs: buffer.duration_secs(),
        peaks: peaks.len(),
        landmarks: records.len(),
        distinct_hashes,
    };

    if let Some(path) = output {
        let json = serde_json::to_vec_pretty(&records)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), landmarks = records.len(), "Wrote landmarks");
    }

    print_value(&summary, format, || {
        format!(
            "Fingerprint: {}\n  Duration: {:.2}s\n  Peaks: {}\n  Landmarks: {}\n  Distinct hashes: {}",
            summary.file,
            summary.duration_secs,
            summary.peaks,
            summary.landmarks,
            summary.distinct_hashes
        )
    })
}

/// Show catalog statistics
pub async fn stats(catalog_path: &Path, config: &EchomarkConfig, format: &str) -> anyhow::Result<()> {
    let catalog = open_existing_catalog(catalog_path, config).await?;
    let stats = catalog.stats().await?;

    print_value(&stats, format, || {
        format!(
            "Catalog: {}\n  Scheme: {}\n  Recordings: {}\n  Landmarks: {}\n  Distinct hashes: {}",
            catalog_path.display(),
            catalog.scheme(),
            stats.recordings,
            stats.landmarks,
            stats.distinct_hashes
        )
    })
}
