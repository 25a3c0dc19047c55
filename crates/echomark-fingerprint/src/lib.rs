//! Echomark Fingerprint - landmark audio fingerprinting and matching
//!
//! This crate turns audio into hashed landmarks and identifies query clips
//! against a catalog of them:
//! - **Spectral analysis**: radix-2 FFT and Hann-windowed spectrograms
//! - **Peak extraction**: uniform-density or adaptive-band constellation peaks
//! - **Landmark hashing**: anchor/target pairs reduced to catalog keys
//! - **Matching**: offset-histogram voting over a
//!   [`CatalogStore`](echomark_core::CatalogStore)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   WAV Source    │───▶│  Downmix and     │───▶│   Spectrogram   │
//! │                 │    │  Resample        │    │   (Hann + FFT)  │
//! └─────────────────┘    └──────────────────┘    └────────┬────────┘
//!                                                         │
//!                                                         ▼
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  Match Engine   │◀───│  Landmark Hasher │◀───│ Peak Extractor  │
//! │ (offset votes)  │    │  (anchor/target) │    │                 │
//! └────────┬────────┘    └────────┬─────────┘    └─────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌──────────────────┐
//! │  Match Results  │    │  Catalog Store   │
//! └─────────────────┘    └──────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use echomark_core::MemoryCatalog;
//! use echomark_fingerprint::{audio, EchomarkConfig, Fingerprinter, MatchEngine};
//!
//! #[tokio::main]
//! async fn main() -> echomark_core::Result<()> {
//!     let config = EchomarkConfig::default();
//!     let fingerprinter = Fingerprinter::new(config.fingerprint.clone())?;
//!     let catalog = Arc::new(MemoryCatalog::new());
//!
//!     let song = audio::load_wav("song.wav", fingerprinter.sample_rate())?;
//!     fingerprinter.ingest(catalog.as_ref(), song, "song").await?;
//!
//!     let clip = audio::load_wav("clip.wav", fingerprinter.sample_rate())?;
//!     let engine = MatchEngine::new(catalog, config.matching)?;
//!     for result in engine.identify(&fingerprinter, &clip).await? {
//!         println!("{} at {} ms", result.recording_id, result.offset_ms);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod audio;
pub mod config;
pub mod fft;
pub mod landmark;
pub mod matching;
pub mod peaks;
pub mod pipeline;
pub mod spectrogram;

pub use audio::{SampleSource, WavSource};
pub use config::{
    EchomarkConfig, FingerprintConfig, LandmarkConfig, MatchConfig, PeakStrategy, ScoreWeights,
    ValidationTolerance,
};
pub use fft::SpectralTransform;
pub use landmark::{LandmarkHashFn, LandmarkHasher, PackedBits, QuantizedPair, Sha1Digest};
pub use matching::MatchEngine;
pub use peaks::{AdaptiveBand, PeakExtractor, UniformDensity};
pub use pipeline::Fingerprinter;
pub use spectrogram::{Spectrogram, SpectrogramBuilder};
