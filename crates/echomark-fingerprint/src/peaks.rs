//! Spectral peak extraction.
//!
//! Two strategies are provided behind the [`PeakExtractor`] trait:
//!
//! - [`UniformDensity`] keeps strict local maxima of the dB spectrogram and
//!   caps them to the strongest few per fixed time chunk, which spreads peaks
//!   evenly over the recording.
//! - [`AdaptiveBand`] takes the loudest bin of each frequency band in every
//!   frame and keeps the ones above the frame's mean band level.
//!
//! Both report amplitudes in dB and return peaks sorted by time, then
//! frequency.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use echomark_core::Peak;

use crate::config::PeakStrategy;
use crate::spectrogram::Spectrogram;

/// Selects landmark candidates from a spectrogram.
pub trait PeakExtractor: Send + Sync + fmt::Debug {
    /// Extract peaks, sorted by time then frequency.
    fn extract(&self, spectrogram: &Spectrogram) -> Vec<Peak>;

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Build the extractor described by `strategy`.
pub fn extractor_for(strategy: &PeakStrategy) -> Arc<dyn PeakExtractor> {
    match strategy {
        PeakStrategy::Uniform {
            neighborhood,
            chunk_secs,
            peaks_per_chunk,
        } => Arc::new(UniformDensity {
            neighborhood: *neighborhood,
            chunk_secs: *chunk_secs,
            peaks_per_chunk: *peaks_per_chunk,
        }),
        PeakStrategy::AdaptiveBand { bands } => Arc::new(AdaptiveBand {
            bands: bands.clone(),
        }),
    }
}

/// Strict local maxima with a per-chunk density cap.
#[derive(Debug, Clone)]
pub struct UniformDensity {
    /// Half-width of the square neighbourhood; values below 1 act as 1
    pub neighborhood: usize,
    /// Chunk duration in seconds
    pub chunk_secs: f64,
    /// Peaks kept per chunk
    pub peaks_per_chunk: usize,
}

impl Default for UniformDensity {
    fn default() -> Self {
        Self {
            neighborhood: 2,
            chunk_secs: 1.0,
            peaks_per_chunk: 30,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    frame: usize,
    bin: usize,
    level: f32,
}

impl UniformDensity {
    fn half_width(&self) -> usize {
        self.neighborhood.max(1)
    }

    fn local_maxima(&self, db: &[Vec<f32>], frame: usize) -> Vec<Candidate> {
        let h = self.half_width();
        let bins = db[frame].len();
        let mut found = Vec::new();

        for bin in h..bins - h {
            let level = db[frame][bin];
            let dominant = (frame - h..=frame + h).all(|t| {
                (bin - h..=bin + h).all(|k| (t == frame && k == bin) || db[t][k] < level)
            });
            if dominant {
                found.push(Candidate { frame, bin, level });
            }
        }
        found
    }
}

impl PeakExtractor for UniformDensity {
    fn extract(&self, spectrogram: &Spectrogram) -> Vec<Peak> {
        let h = self.half_width();
        let frames = spectrogram.frame_count();
        let bins = spectrogram.bin_count();
        if frames < 2 * h + 1 || bins < 2 * h + 1 {
            return Vec::new();
        }

        let db = spectrogram.decibels();
        let candidates: Vec<Candidate> = (h..frames - h)
            .into_par_iter()
            .flat_map_iter(|frame| self.local_maxima(&db, frame))
            .collect();

        let frames_per_chunk = (self.chunk_secs * spectrogram.sample_rate() as f64
            / spectrogram.hop_len() as f64)
            .max(1.0);

        let mut chunks: BTreeMap<usize, Vec<Candidate>> = BTreeMap::new();
        for candidate in candidates.iter().copied() {
            let chunk = (candidate.frame as f64 / frames_per_chunk).floor() as usize;
            chunks.entry(chunk).or_default().push(candidate);
        }

        let mut kept: Vec<Candidate> = Vec::new();
        for (_, mut members) in chunks {
            members.sort_by(|a, b| {
                b.level
                    .total_cmp(&a.level)
                    .then(a.frame.cmp(&b.frame))
                    .then(a.bin.cmp(&b.bin))
            });
            members.truncate(self.peaks_per_chunk);
            kept.extend(members);
        }
        kept.sort_by(|a, b| a.frame.cmp(&b.frame).then(a.bin.cmp(&b.bin)));

        debug!(
            candidates = candidates.len(),
            kept = kept.len(),
            "Selected uniform peaks"
        );

        kept.into_iter()
            .map(|c| Peak {
                time: spectrogram.frame_time(c.frame),
                frequency: spectrogram.bin_frequency(c.bin),
                amplitude: c.level,
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

/// Per-band maxima above the frame's mean band level.
#[derive(Debug, Clone)]
pub struct AdaptiveBand {
    /// Frequency bands as `[low, high)` Hz pairs
    pub bands: Vec<(f64, f64)>,
}

impl Default for AdaptiveBand {
    fn default() -> Self {
        Self {
            bands: crate::config::DEFAULT_BANDS.to_vec(),
        }
    }
}

impl AdaptiveBand {
    /// Bin ranges of the configured bands, skipping bands with no bins.
    fn bin_ranges(&self, spectrogram: &Spectrogram) -> Vec<(usize, usize)> {
        let scale = spectrogram.window_len() as f64 / spectrogram.sample_rate() as f64;
        let bins = spectrogram.bin_count();

        self.bands
            .iter()
            .filter_map(|&(low, high)| {
                let start = (low * scale).ceil().max(0.0) as usize;
                let end = ((high * scale).ceil().max(0.0) as usize).min(bins);
                (start < end).then_some((start, end))
            })
            .collect()
    }
}

impl PeakExtractor for AdaptiveBand {
    fn extract(&self, spectrogram: &Spectrogram) -> Vec<Peak> {
        if spectrogram.is_empty() {
            return Vec::new();
        }

        let ranges = self.bin_ranges(spectrogram);
        if ranges.is_empty() {
            return Vec::new();
        }

        let db = spectrogram.decibels();
        let mut peaks: Vec<Peak> = db
            .par_iter()
            .enumerate()
            .flat_map_iter(|(frame, levels)| {
                let maxima: Vec<(usize, f32)> = ranges
                    .iter()
                    .filter_map(|&(start, end)| {
                        levels[start..end]
                            .iter()
                            .enumerate()
                            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
                            .map(|(offset, &level)| (start + offset, level))
                    })
                    .collect();

                let mean = maxima.iter().map(|&(_, level)| level as f64).sum::<f64>()
                    / maxima.len() as f64;

                maxima
                    .into_iter()
                    .filter(move |&(_, level)| level as f64 > mean)
                    .map(move |(bin, level)| Peak {
                        time: spectrogram.frame_time(frame),
                        frequency: spectrogram.bin_frequency(bin),
                        amplitude: level,
                    })
            })
            .collect();

        peaks.sort_by(compare_peaks);
        peaks.dedup_by(|a, b| a.time == b.time && a.frequency == b.frequency);

        debug!(peaks = peaks.len(), bands = ranges.len(), "Selected band peaks");
        peaks
    }

    fn name(&self) -> &'static str {
        "adaptive_band"
    }
}

/// Order peaks by time, then frequency.
pub fn compare_peaks(a: &Peak, b: &Peak) -> Ordering {
    a.time
        .total_cmp(&b.time)
        .then(a.frequency.total_cmp(&b.frequency))
}
