//! Anchor/target pairing and landmark hashing.
//!
//! Each peak acts as an anchor and is paired with up to `fan_out` later peaks
//! inside its target zone. A pair is quantized to integer centi-Hz and
//! milliseconds before hashing so that ingestion and query agree exactly.

use std::fmt;
use std::sync::Arc;

use ring::digest;
use tracing::debug;

use echomark_core::{HashScheme, LandmarkHash, LandmarkRecord, Peak};

use crate::config::LandmarkConfig;

/// Anchor/target pair in integer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantizedPair {
    /// Anchor frequency in hundredths of a Hz
    pub anchor_centihz: i32,
    /// Target frequency in hundredths of a Hz
    pub target_centihz: i32,
    /// Target time minus anchor time in milliseconds
    pub delta_ms: i32,
}

impl QuantizedPair {
    /// Quantize a pair given in Hz and seconds.
    pub fn new(anchor_freq: f64, target_freq: f64, time_delta: f64) -> Self {
        Self {
            anchor_centihz: (anchor_freq * 100.0).round() as i32,
            target_centihz: (target_freq * 100.0).round() as i32,
            delta_ms: (time_delta * 1000.0).round() as i32,
        }
    }

    /// Big-endian packing of the three fields.
    pub fn to_be_bytes(&self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.anchor_centihz.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.target_centihz.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.delta_ms.to_be_bytes());
        bytes
    }
}

/// Reduces a quantized pair to a catalog key.
pub trait LandmarkHashFn: Send + Sync + fmt::Debug {
    /// Hash one pair.
    fn hash(&self, pair: &QuantizedPair) -> LandmarkHash;

    /// Scheme identifier stored alongside catalogs.
    fn scheme(&self) -> HashScheme;
}

/// First 64 bits of SHA-1 over the big-endian triple.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Digest;

impl LandmarkHashFn for Sha1Digest {
    fn hash(&self, pair: &QuantizedPair) -> LandmarkHash {
        let digest = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &pair.to_be_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.as_ref()[..8]);
        LandmarkHash(u64::from_be_bytes(prefix))
    }

    fn scheme(&self) -> HashScheme {
        HashScheme::Sha1Digest
    }
}

const FREQ_BUCKETS: f64 = 4096.0;
const DELTA_BUCKETS: f64 = 256.0;

/// 12 bits anchor frequency, 12 bits target frequency, 8 bits time delta.
///
/// Frequencies are scaled onto 4096 buckets up to Nyquist and the delta onto
/// 256 buckets up to the end of the target zone. Out-of-range values clamp to
/// the edge bucket.
#[derive(Debug, Clone, Copy)]
pub struct PackedBits {
    nyquist_centihz: f64,
    max_delta_ms: f64,
}

impl PackedBits {
    /// Create a packer for the given Nyquist frequency and target zone end.
    pub fn new(nyquist_hz: f64, max_delta_secs: f64) -> Self {
        Self {
            nyquist_centihz: (nyquist_hz * 100.0).max(1.0),
            max_delta_ms: (max_delta_secs * 1000.0).max(1.0),
        }
    }
}

fn bucket(value: i32, max: f64, buckets: f64) -> u64 {
    (value as f64 / max * buckets).floor().clamp(0.0, buckets - 1.0) as u64
}

impl LandmarkHashFn for PackedBits {
    fn hash(&self, pair: &QuantizedPair) -> LandmarkHash {
        let anchor = bucket(pair.anchor_centihz, self.nyquist_centihz, FREQ_BUCKETS);
        let target = bucket(pair.target_centihz, self.nyquist_centihz, FREQ_BUCKETS);
        let delta = bucket(pair.delta_ms, self.max_delta_ms, DELTA_BUCKETS);
        LandmarkHash((anchor << 20) | (target << 8) | delta)
    }

    fn scheme(&self) -> HashScheme {
        HashScheme::PackedBits
    }
}

/// Hash function for `scheme`.
pub fn hash_fn_for(scheme: HashScheme, nyquist_hz: f64, max_delta_secs: f64) -> Arc<dyn LandmarkHashFn> {
    match scheme {
        HashScheme::Sha1Digest => Arc::new(Sha1Digest),
        HashScheme::PackedBits => Arc::new(PackedBits::new(nyquist_hz, max_delta_secs)),
    }
}

/// Pairs peaks into hashed landmarks.
#[derive(Debug, Clone)]
pub struct LandmarkHasher {
    config: LandmarkConfig,
    hash_fn: Arc<dyn LandmarkHashFn>,
}

impl LandmarkHasher {
    /// Create a hasher for audio analysed at `sample_rate`.
    pub fn new(config: LandmarkConfig, sample_rate: u32) -> Self {
        let hash_fn = hash_fn_for(
            config.scheme,
            sample_rate as f64 / 2.0,
            config.max_delta_secs,
        );
        Self { config, hash_fn }
    }

    /// Create a hasher with a custom hash function.
    pub fn with_hash_fn(config: LandmarkConfig, hash_fn: Arc<dyn LandmarkHashFn>) -> Self {
        Self { config, hash_fn }
    }

    /// Pairing configuration.
    pub fn config(&self) -> &LandmarkConfig {
        &self.config
    }

    /// Scheme of the produced hashes.
    pub fn scheme(&self) -> HashScheme {
        self.hash_fn.scheme()
    }

    /// Hash a single pair.
    pub fn hash_pair(&self, anchor: &Peak, target: &Peak) -> LandmarkHash {
        let pair = QuantizedPair::new(anchor.frequency, target.frequency, target.time - anchor.time);
        self.hash_fn.hash(&pair)
    }

    /// Generate landmarks for peaks sorted by time.
    ///
    /// Targets closer than `min_delta_secs` are skipped, the scan stops past
    /// `max_delta_secs`, and targets failing the optional frequency gate do
    /// not count towards `fan_out`.
    pub fn landmarks(&self, peaks: &[Peak], recording_id: &str) -> Vec<LandmarkRecord> {
        let mut records = Vec::new();

        for (i, anchor) in peaks.iter().enumerate() {
            let mut paired = 0;

            for target in &peaks[i + 1..] {
                let time_delta = target.time - anchor.time;
                if time_delta < self.config.min_delta_secs {
                    continue;
                }
                if time_delta > self.config.max_delta_secs {
                    break;
                }
                if let Some(max_freq_delta) = self.config.max_freq_delta_hz {
                    if (target.frequency - anchor.frequency).abs() > max_freq_delta {
                        continue;
                    }
                }

                records.push(LandmarkRecord {
                    hash: self.hash_pair(anchor, target),
                    anchor_time: anchor.time,
                    anchor_freq: anchor.frequency,
                    target_freq: target.frequency,
                    time_delta,
                    recording_id: recording_id.to_string(),
                });

                paired += 1;
                if paired >= self.config.fan_out {
                    break;
                }
            }
        }

        debug!(
            peaks = peaks.len(),
            landmarks = records.len(),
            recording = recording_id,
            "Generated landmarks"
        );
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(time: f64, frequency: f64) -> Peak {
        Peak {
            time,
            frequency,
            amplitude: 0.0,
        }
    }

    fn hasher(config: LandmarkConfig) -> LandmarkHasher {
        LandmarkHasher::new(config, 11025)
    }

    #[test]
    fn test_quantization_rounds() {
        let pair = QuantizedPair::new(440.004, 880.006, 0.2504);
        assert_eq!(pair.anchor_centihz, 44000);
        assert_eq!(pair.target_centihz, 88001);
        assert_eq!(pair.delta_ms, 250);
        assert_eq!(
            pair.to_be_bytes(),
            [0, 0, 0xab, 0xe0, 0, 1, 0x57, 0xc1, 0, 0, 0, 0xfa]
        );
    }

    #[test]
    fn test_sha1_hash_is_deterministic() {
        let pair = QuantizedPair::new(300.0, 600.0, 0.5);
        let a = Sha1Digest.hash(&pair);
        let b = Sha1Digest.hash(&QuantizedPair::new(300.001, 599.999, 0.5001));
        assert_eq!(a, b);
        assert_ne!(a, Sha1Digest.hash(&QuantizedPair::new(300.0, 600.0, 0.51)));
    }

    #[test]
    fn test_sha1_matches_digest_prefix() {
        let pair = QuantizedPair::new(1.0, 2.0, 0.003);
        let full = digest::digest(&digest::SHA1_FOR_LEGACY_USE_ONLY, &pair.to_be_bytes());
        let expected = full.as_ref()[..8]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        assert_eq!(Sha1Digest.hash(&pair), LandmarkHash(expected));
    }

    #[test]
    fn test_packed_bits_layout() {
        let packer = PackedBits::new(5000.0, 2.0);
        // Half of Nyquist, a quarter of Nyquist, half of the target zone
        let hash = packer.hash(&QuantizedPair::new(2500.0, 1250.0, 1.0));
        assert_eq!(hash.0 >> 20, 2048);
        assert_eq!((hash.0 >> 8) & 0xfff, 1024);
        assert_eq!(hash.0 & 0xff, 128);
        assert!(hash.0 < 1 << 32);

        // Out of range values clamp
        let clamped = packer.hash(&QuantizedPair::new(9000.0, -5.0, 3.0));
        assert_eq!(clamped.0 >> 20, 4095);
        assert_eq!((clamped.0 >> 8) & 0xfff, 0);
        assert_eq!(clamped.0 & 0xff, 255);
    }

    #[test]
    fn test_target_zone_and_fan_out() {
        let peaks = vec![
            peak(0.0, 100.0),
            peak(0.05, 200.0), // too close
            peak(0.1, 300.0),
            peak(0.5, 400.0),
            peak(1.0, 500.0),
            peak(1.5, 600.0),
            peak(1.9, 700.0), // fan-out exhausted for the first anchor
            peak(4.0, 800.0), // beyond every zone
        ];
        let records = hasher(LandmarkConfig::default()).landmarks(&peaks, "rec");

        let first: Vec<f64> = records
            .iter()
            .filter(|r| r.anchor_time == 0.0)
            .map(|r| r.target_freq)
            .collect();
        assert_eq!(first, vec![300.0, 400.0, 500.0, 600.0]);

        assert!(records.iter().all(|r| r.time_delta >= 0.1 && r.time_delta <= 2.0));
        assert!(records.iter().all(|r| r.target_freq != 800.0));
        assert!(records.iter().all(|r| r.recording_id == "rec"));
    }

    #[test]
    fn test_frequency_gate_does_not_consume_fan_out() {
        let peaks = vec![
            peak(0.0, 1000.0),
            peak(0.2, 3000.0),
            peak(0.3, 3100.0),
            peak(0.4, 1100.0),
            peak(0.5, 900.0),
        ];
        let config = LandmarkConfig {
            fan_out: 2,
            max_freq_delta_hz: Some(500.0),
            ..LandmarkConfig::default()
        };
        let records = hasher(config).landmarks(&peaks, "rec");

        let first: Vec<f64> = records
            .iter()
            .filter(|r| r.anchor_time == 0.0)
            .map(|r| r.target_freq)
            .collect();
        assert_eq!(first, vec![1100.0, 900.0]);
    }

    #[test]
    fn test_empty_and_single_peak() {
        let hasher = hasher(LandmarkConfig::default());
        assert!(hasher.landmarks(&[], "rec").is_empty());
        assert!(hasher.landmarks(&[peak(1.0, 440.0)], "rec").is_empty());
    }

    #[test]
    fn test_hash_ignores_absolute_time() {
        let hasher = hasher(LandmarkConfig::default());
        let early = hasher.hash_pair(&peak(1.0, 440.0), &peak(1.5, 660.0));
        let late = hasher.hash_pair(&peak(31.0, 440.0), &peak(31.5, 660.0));
        assert_eq!(early, late);
    }

    #[test]
    fn test_scheme_selection() {
        let config = LandmarkConfig {
            scheme: HashScheme::PackedBits,
            ..LandmarkConfig::default()
        };
        assert_eq!(hasher(config).scheme(), HashScheme::PackedBits);
        assert_eq!(hasher(LandmarkConfig::default()).scheme(), HashScheme::Sha1Digest);
    }
}
