//! Sample buffer to landmark records, and catalog ingestion.
//!
//! The pipeline is pure CPU work. Async entry points move it onto tokio's
//! blocking pool so that catalog I/O on the runtime is never starved.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use echomark_core::{CatalogStore, Error, HashScheme, LandmarkRecord, Peak, Result, SampleBuffer};

use crate::config::FingerprintConfig;
use crate::landmark::LandmarkHasher;
use crate::peaks::{extractor_for, PeakExtractor};
use crate::spectrogram::{Spectrogram, SpectrogramBuilder};

/// Spectrogram, peak extraction and landmark hashing in one value.
///
/// Cloning is cheap enough to hand a copy to each blocking task.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    config: FingerprintConfig,
    builder: SpectrogramBuilder,
    extractor: Arc<dyn PeakExtractor>,
    hasher: LandmarkHasher,
}

impl Fingerprinter {
    /// Validate `config` and build the pipeline.
    pub fn new(config: FingerprintConfig) -> Result<Self> {
        config.validate()?;

        let builder = SpectrogramBuilder::new(config.window_len, config.hop_len)?;
        let extractor = extractor_for(&config.peaks);
        let hasher = LandmarkHasher::new(config.landmarks.clone(), config.sample_rate);

        debug!(
            sample_rate = config.sample_rate,
            window_len = config.window_len,
            hop_len = config.hop_len,
            peaks = extractor.name(),
            scheme = %hasher.scheme(),
            "Created fingerprinter"
        );

        Ok(Self {
            config,
            builder,
            extractor,
            hasher,
        })
    }

    /// Pipeline configuration.
    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }

    /// Analysis sample rate that inputs must have.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Hash scheme of produced landmarks.
    pub fn scheme(&self) -> HashScheme {
        self.hasher.scheme()
    }

    /// Spectrogram of `buffer`.
    ///
    /// Fails on an empty buffer or a sample rate other than the analysis
    /// rate. Input shorter than one window gives an empty spectrogram.
    pub fn spectrogram(&self, buffer: &SampleBuffer) -> Result<Spectrogram> {
        if buffer.is_empty() {
            return Err(Error::invalid_input("sample buffer is empty"));
        }
        if buffer.sample_rate != self.config.sample_rate {
            return Err(Error::invalid_input(format!(
                "sample rate {} Hz does not match analysis rate {} Hz",
                buffer.sample_rate, self.config.sample_rate
            )));
        }
        if buffer.len() < self.config.window_len {
            warn!(
                samples = buffer.len(),
                window_len = self.config.window_len,
                "Input shorter than one analysis window"
            );
        }

        self.builder.build(&buffer.samples, buffer.sample_rate)
    }

    /// Time-sorted peaks of `buffer`.
    pub fn peaks(&self, buffer: &SampleBuffer) -> Result<Vec<Peak>> {
        let spectrogram = self.spectrogram(buffer)?;
        Ok(self.extractor.extract(&spectrogram))
    }

    /// Landmark records for `buffer`, attributed to `recording_id`.
    pub fn fingerprint(&self, buffer: &SampleBuffer, recording_id: &str) -> Result<Vec<LandmarkRecord>> {
        let (_, records) = self.analyze(buffer, recording_id)?;
        Ok(records)
    }

    /// Peaks and the landmarks built from them, from a single spectrogram pass.
    pub fn analyze(&self, buffer: &SampleBuffer, recording_id: &str) -> Result<(Vec<Peak>, Vec<LandmarkRecord>)> {
        let peaks = self.peaks(buffer)?;
        let records = self.hasher.landmarks(&peaks, recording_id);
        Ok((peaks, records))
    }

    /// [`fingerprint`](Self::fingerprint) on the blocking pool.
    pub async fn fingerprint_blocking(
        &self,
        buffer: SampleBuffer,
        recording_id: String,
    ) -> Result<Vec<LandmarkRecord>> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.fingerprint(&buffer, &recording_id))
            .await
            .map_err(|e| Error::Internal(format!("fingerprint task failed: {}", e)))?
    }

    /// Fingerprint `buffer` and store it under `recording_id`.
    ///
    /// Landmarks previously stored for the same id are replaced. Returns the
    /// number of landmarks inserted.
    #[instrument(skip(self, store, buffer), fields(samples = buffer.len()))]
    pub async fn ingest<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        buffer: SampleBuffer,
        recording_id: &str,
    ) -> Result<usize> {
        let records = self
            .fingerprint_blocking(buffer, recording_id.to_string())
            .await?;
        self.replace(store, recording_id, &records).await
    }

    /// Fingerprint several recordings concurrently and store each as it
    /// completes.
    ///
    /// The first failure is returned; recordings stored before it stay in
    /// the catalog. Returns the total number of landmarks inserted.
    pub async fn ingest_all<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        items: Vec<(String, SampleBuffer)>,
    ) -> Result<usize> {
        let mut tasks = JoinSet::new();
        for (recording_id, buffer) in items {
            let this = self.clone();
            tasks.spawn_blocking(move || {
                let records = this.fingerprint(&buffer, &recording_id)?;
                Ok::<_, Error>((recording_id, records))
            });
        }

        let mut total = 0;
        while let Some(joined) = tasks.join_next().await {
            let (recording_id, records) =
                joined.map_err(|e| Error::Internal(format!("fingerprint task failed: {}", e)))??;
            total += self.replace(store, &recording_id, &records).await?;
        }

        info!(landmarks = total, "Ingested recordings");
        Ok(total)
    }

    async fn replace<S: CatalogStore + ?Sized>(
        &self,
        store: &S,
        recording_id: &str,
        records: &[LandmarkRecord],
    ) -> Result<usize> {
        let removed = store.replace_recording(recording_id, records).await?;
        if removed > 0 {
            debug!(recording = recording_id, removed, "Replaced existing landmarks");
        }

        info!(
            recording = recording_id,
            landmarks = records.len(),
            "Ingested recording"
        );
        Ok(records.len())
    }
}
