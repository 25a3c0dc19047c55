//! Core types shared by the fingerprinting pipeline and the matcher.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mono PCM audio at a fixed sample rate.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// PCM samples normalized to [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Create a new buffer from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Get a slice of samples for a specific time range.
    pub fn slice_secs(&self, start_secs: f64, end_secs: f64) -> &[f32] {
        let start_idx = (start_secs.max(0.0) * self.sample_rate as f64) as usize;
        let end_idx = (end_secs.max(0.0) * self.sample_rate as f64) as usize;
        let end_idx = end_idx.min(self.samples.len());
        &self.samples[start_idx.min(end_idx)..end_idx]
    }

    /// Get number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A locally dominant time-frequency point.
///
/// Amplitude is in decibels for every extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Time in seconds from the start of the buffer
    pub time: f64,
    /// Frequency in Hz
    pub frequency: f64,
    /// Level in dB
    pub amplitude: f32,
}

/// Catalog lookup key derived from one anchor/target pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkHash(pub u64);

impl fmt::Display for LandmarkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// How quantized landmark triples are reduced to a [`LandmarkHash`].
///
/// Ingestion and query must use the same scheme; catalogs record the scheme
/// they were written with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    /// First 64 bits of the SHA-1 digest of the big-endian packed triple
    #[default]
    Sha1Digest,
    /// 12 bits anchor frequency, 12 bits target frequency, 8 bits time delta
    PackedBits,
}

impl fmt::Display for HashScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashScheme::Sha1Digest => write!(f, "sha1_digest"),
            HashScheme::PackedBits => write!(f, "packed_bits"),
        }
    }
}

/// A single anchor-target pairing, keyed by hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    /// Lookup key
    pub hash: LandmarkHash,
    /// Absolute time of the anchor peak in seconds
    pub anchor_time: f64,
    /// Anchor frequency in Hz
    pub anchor_freq: f64,
    /// Target frequency in Hz
    pub target_freq: f64,
    /// Target time minus anchor time, in seconds
    pub time_delta: f64,
    /// Recording the landmark was taken from
    pub recording_id: String,
}

impl LandmarkRecord {
    /// Copy of this record with its anchor moved by `secs`.
    pub fn with_time_shift(&self, secs: f64) -> Self {
        Self {
            anchor_time: self.anchor_time + secs,
            ..self.clone()
        }
    }
}

/// A ranked catalog candidate for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched recording
    pub recording_id: String,
    /// Number of votes in the winning offset bucket
    pub score: u32,
    /// Winning bucket count over the runner-up bucket count
    pub confidence: f64,
    /// Query time minus catalog time, in milliseconds
    pub offset_ms: i64,
}

/// Summary of catalog contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    /// Distinct recordings
    pub recordings: usize,
    /// Stored landmark records
    pub landmarks: usize,
    /// Distinct hash keys
    pub distinct_hashes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_duration() {
        let buffer = SampleBuffer::new(vec![0.0; 22050], 11025);
        assert_eq!(buffer.duration_secs(), 2.0);
        assert_eq!(buffer.len(), 22050);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_slice_clamps_to_buffer() {
        let buffer = SampleBuffer::new((0..100).map(|i| i as f32).collect(), 10);
        assert_eq!(buffer.slice_secs(9.0, 20.0).len(), 10);
        assert!(buffer.slice_secs(20.0, 30.0).is_empty());
        assert_eq!(buffer.slice_secs(1.0, 2.0)[0], 10.0);
    }

    #[test]
    fn test_hash_display_is_fixed_width() {
        assert_eq!(LandmarkHash(0xab).to_string(), "00000000000000ab");
    }

    #[test]
    fn test_time_shift_keeps_hash() {
        let record = LandmarkRecord {
            hash: LandmarkHash(42),
            anchor_time: 1.5,
            anchor_freq: 440.0,
            target_freq: 880.0,
            time_delta: 0.25,
            recording_id: "a".to_string(),
        };
        let shifted = record.with_time_shift(5.0);
        assert_eq!(shifted.hash, record.hash);
        assert_eq!(shifted.anchor_time, 6.5);
        assert_eq!(shifted.time_delta, record.time_delta);
    }

    #[test]
    fn test_hash_scheme_serde_names() {
        let json = serde_json::to_string(&HashScheme::PackedBits).unwrap();
        assert_eq!(json, "\"packed_bits\"");
        let scheme: HashScheme = serde_json::from_str("\"sha1_digest\"").unwrap();
        assert_eq!(scheme, HashScheme::Sha1Digest);
    }
}
