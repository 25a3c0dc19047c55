//! Tunable parameters for fingerprinting and matching.
//!
//! Every constant the pipeline depends on lives here. Configurations are
//! plain serde structs so they can be loaded from JSON; missing fields take
//! their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use echomark_core::{Error, HashScheme, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchomarkConfig {
    /// Landmark generation parameters
    pub fingerprint: FingerprintConfig,
    /// Matching parameters
    pub matching: MatchConfig,
}

impl EchomarkConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.fingerprint.validate()?;
        self.matching.validate()
    }
}

/// Landmark generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Analysis sample rate in Hz
    pub sample_rate: u32,
    /// FFT window length (power of two)
    pub window_len: usize,
    /// Hop between frames
    pub hop_len: usize,
    /// Peak extraction strategy
    pub peaks: PeakStrategy,
    /// Anchor/target pairing and hashing
    pub landmarks: LandmarkConfig,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: 11_025,
            window_len: 1024,
            hop_len: 512,
            peaks: PeakStrategy::default(),
            landmarks: LandmarkConfig::default(),
        }
    }
}

impl FingerprintConfig {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be > 0".into()));
        }
        if !self.window_len.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "window_len {} must be a power of two",
                self.window_len
            )));
        }
        if self.hop_len == 0 || self.hop_len > self.window_len {
            return Err(Error::InvalidConfig(format!(
                "hop_len {} must be in 1..={}",
                self.hop_len, self.window_len
            )));
        }
        self.peaks.validate()?;
        self.landmarks.validate()
    }

    /// Highest representable frequency.
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }
}

/// Peak extraction strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PeakStrategy {
    /// Strict local maxima, capped to the strongest few per time chunk
    Uniform {
        /// Half-width of the square neighbourhood
        neighborhood: usize,
        /// Chunk duration in seconds
        chunk_secs: f64,
        /// Peaks kept per chunk
        peaks_per_chunk: usize,
    },
    /// Strongest bin per band, kept when above the frame's mean band level
    AdaptiveBand {
        /// Frequency bands as `[low, high)` Hz pairs
        bands: Vec<(f64, f64)>,
    },
}

impl Default for PeakStrategy {
    fn default() -> Self {
        PeakStrategy::Uniform {
            neighborhood: 2,
            chunk_secs: 1.0,
            peaks_per_chunk: 30,
        }
    }
}

impl PeakStrategy {
    /// Adaptive strategy over the default band layout.
    pub fn adaptive() -> Self {
        PeakStrategy::AdaptiveBand {
            bands: DEFAULT_BANDS.to_vec(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            PeakStrategy::Uniform {
                neighborhood,
                chunk_secs,
                peaks_per_chunk,
            } => {
                if *neighborhood == 0 {
                    return Err(Error::InvalidConfig("neighborhood must be > 0".into()));
                }
                if *chunk_secs <= 0.0 {
                    return Err(Error::InvalidConfig("chunk_secs must be > 0".into()));
                }
                if *peaks_per_chunk == 0 {
                    return Err(Error::InvalidConfig("peaks_per_chunk must be > 0".into()));
                }
            }
            PeakStrategy::AdaptiveBand { bands } => {
                if bands.is_empty() {
                    return Err(Error::InvalidConfig("at least one band is required".into()));
                }
                if let Some((low, high)) = bands.iter().find(|(low, high)| low >= high || *low < 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "band {}-{} Hz is empty",
                        low, high
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Default adaptive bands in Hz.
pub const DEFAULT_BANDS: [(f64, f64); 6] = [
    (30.0, 100.0),
    (100.0, 250.0),
    (250.0, 500.0),
    (500.0, 1000.0),
    (1000.0, 2500.0),
    (2500.0, 5000.0),
];

/// Anchor/target pairing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// Maximum targets per anchor
    pub fan_out: usize,
    /// Start of the target zone after the anchor, seconds
    pub min_delta_secs: f64,
    /// End of the target zone after the anchor, seconds
    pub max_delta_secs: f64,
    /// Optional limit on |target - anchor| frequency, Hz
    pub max_freq_delta_hz: Option<f64>,
    /// Hash derivation
    pub scheme: HashScheme,
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            fan_out: 4,
            min_delta_secs: 0.1,
            max_delta_secs: 2.0,
            max_freq_delta_hz: None,
            scheme: HashScheme::default(),
        }
    }
}

impl LandmarkConfig {
    fn validate(&self) -> Result<()> {
        if self.fan_out == 0 {
            return Err(Error::InvalidConfig("fan_out must be > 0".into()));
        }
        if self.min_delta_secs < 0.0 || self.min_delta_secs > self.max_delta_secs {
            return Err(Error::InvalidConfig(format!(
                "target zone {}-{}s is invalid",
                self.min_delta_secs, self.max_delta_secs
            )));
        }
        if matches!(self.max_freq_delta_hz, Some(d) if d <= 0.0) {
            return Err(Error::InvalidConfig("max_freq_delta_hz must be > 0".into()));
        }
        Ok(())
    }
}

/// Matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum votes in the best offset bucket
    pub min_match_count: u32,
    /// Offset bucket width in milliseconds
    pub offset_bucket_ms: i64,
    /// Results returned
    pub top_n: usize,
    /// Per-vote frequency/time-delta check, disabled when `None`
    pub validation: Option<ValidationTolerance>,
    /// Blend a time-delta histogram into the score; raw votes when `None`
    pub score_weights: Option<ScoreWeights>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_match_count: 5,
            offset_bucket_ms: 32,
            top_n: 3,
            validation: Some(ValidationTolerance::default()),
            score_weights: None,
        }
    }
}

impl MatchConfig {
    /// Validate parameters.
    pub fn validate(&self) -> Result<()> {
        if self.offset_bucket_ms <= 0 {
            return Err(Error::InvalidConfig("offset_bucket_ms must be > 0".into()));
        }
        if self.top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be > 0".into()));
        }
        if let Some(tolerance) = &self.validation {
            if tolerance.freq_tolerance_hz < 0.0 || tolerance.time_delta_tolerance_ms < 0.0 {
                return Err(Error::InvalidConfig("validation tolerances must be >= 0".into()));
            }
        }
        if let Some(weights) = &self.score_weights {
            if weights.count_weight < 0.0 || weights.time_delta_weight < 0.0 {
                return Err(Error::InvalidConfig("score weights must be >= 0".into()));
            }
        }
        Ok(())
    }
}

/// Tolerances for the secondary vote check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationTolerance {
    /// Allowed anchor/target frequency difference, Hz
    pub freq_tolerance_hz: f64,
    /// Allowed time-delta difference, milliseconds
    pub time_delta_tolerance_ms: f64,
}

impl Default for ValidationTolerance {
    fn default() -> Self {
        Self {
            freq_tolerance_hz: 2.0,
            time_delta_tolerance_ms: 20.0,
        }
    }
}

/// Weights for combining offset votes with time-delta agreement.
///
/// Score = floor(count_weight * best bucket votes + time_delta_weight *
/// largest time-delta agreement count).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Weight of the winning offset bucket
    pub count_weight: f64,
    /// Weight of the most common query/catalog time-delta difference
    pub time_delta_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            count_weight: 0.7,
            time_delta_weight: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EchomarkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fingerprint.landmarks.fan_out, 4);
        assert_eq!(config.matching.offset_bucket_ms, 32);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "fingerprint": {
                "hop_len": 256,
                "peaks": { "strategy": "adaptive_band", "bands": [[100.0, 400.0], [400.0, 2000.0]] },
                "landmarks": { "scheme": "packed_bits" }
            },
            "matching": { "min_match_count": 3, "validation": null }
        }"#;
        let config: EchomarkConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.fingerprint.window_len, 1024);
        assert_eq!(config.fingerprint.hop_len, 256);
        assert_eq!(config.fingerprint.landmarks.scheme, HashScheme::PackedBits);
        assert_eq!(config.fingerprint.landmarks.fan_out, 4);
        assert_eq!(config.matching.min_match_count, 3);
        assert_eq!(config.matching.validation, None);
        assert_eq!(config.matching.score_weights, None);
        assert!(matches!(
            config.fingerprint.peaks,
            PeakStrategy::AdaptiveBand { ref bands } if bands.len() == 2
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_window() {
        let mut config = FingerprintConfig::default();
        config.window_len = 1000;
        assert!(config.validate().is_err());

        let mut config = FingerprintConfig::default();
        config.hop_len = 2048;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_band() {
        let mut config = FingerprintConfig::default();
        config.peaks = PeakStrategy::AdaptiveBand {
            bands: vec![(500.0, 500.0)],
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_neighbourhood() {
        let mut config = FingerprintConfig::default();
        config.peaks = PeakStrategy::Uniform {
            neighborhood: 0,
            chunk_secs: 1.0,
            peaks_per_chunk: 30,
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echomark.json");
        std::fs::write(&path, r#"{ "matching": { "top_n": 5 } }"#).unwrap();

        let config = EchomarkConfig::from_json_file(&path).unwrap();
        assert_eq!(config.matching.top_n, 5);

        std::fs::write(&path, r#"{ "matching": { "top_n": 0 } }"#).unwrap();
        assert!(EchomarkConfig::from_json_file(&path).is_err());
    }
}
