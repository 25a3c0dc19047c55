//! Short-time Fourier analysis.

use num_complex::Complex;
use rayon::prelude::*;
use tracing::debug;

use echomark_core::{Error, Result};

use crate::fft::{hann_window, SpectralTransform};

/// Time x frequency grid of complex bins.
///
/// Only the non-redundant half of each transform is kept, so every frame has
/// `window_len / 2` bins and bin `k` sits at `k * sample_rate / window_len` Hz.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    frames: Vec<Vec<Complex<f32>>>,
    sample_rate: u32,
    window_len: usize,
    hop_len: usize,
}

impl Spectrogram {
    /// Frames in time order.
    pub fn frames(&self) -> &[Vec<Complex<f32>>] {
        &self.frames
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Bins per frame.
    pub fn bin_count(&self) -> usize {
        self.window_len / 2
    }

    /// Whether the spectrogram has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sample rate of the analysed audio.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Analysis window length in samples.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Hop between frames in samples.
    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    /// Start time of a frame in seconds.
    pub fn frame_time(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_len as f64 / self.sample_rate as f64
    }

    /// Centre frequency of a bin in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.window_len as f64
    }

    /// Magnitudes in dB, `20 * log10(|c| + 1e-10)`.
    pub fn decibels(&self) -> Vec<Vec<f32>> {
        self.frames
            .par_iter()
            .map(|frame| frame.iter().map(|c| to_decibels(c.norm())).collect())
            .collect()
    }
}

/// Convert a linear magnitude to dB.
pub fn to_decibels(magnitude: f32) -> f32 {
    20.0 * (magnitude + 1e-10).log10()
}

/// Slides a Hann-windowed FFT over a mono signal.
#[derive(Debug, Clone)]
pub struct SpectrogramBuilder {
    transform: SpectralTransform,
    hop_len: usize,
    window: Vec<f32>,
}

impl SpectrogramBuilder {
    /// Create a builder for the given window and hop lengths.
    ///
    /// The window length must be a power of two and the hop must be in
    /// `1..=window_len`.
    pub fn new(window_len: usize, hop_len: usize) -> Result<Self> {
        let transform = SpectralTransform::new(window_len)?;
        if hop_len == 0 || hop_len > window_len {
            return Err(Error::InvalidConfig(format!(
                "hop length {} must be in 1..={}",
                hop_len, window_len
            )));
        }

        Ok(Self {
            transform,
            hop_len,
            window: hann_window(window_len),
        })
    }

    /// Analysis window length.
    pub fn window_len(&self) -> usize {
        self.transform.len()
    }

    /// Hop length.
    pub fn hop_len(&self) -> usize {
        self.hop_len
    }

    /// Number of frames produced for `sample_count` samples.
    pub fn frame_count(&self, sample_count: usize) -> usize {
        let window_len = self.window_len();
        if sample_count < window_len {
            return 0;
        }
        (sample_count - window_len) / self.hop_len + 1
    }

    /// Compute the spectrogram of `samples`.
    ///
    /// Input shorter than one window yields an empty spectrogram.
    pub fn build(&self, samples: &[f32], sample_rate: u32) -> Result<Spectrogram> {
        if sample_rate == 0 {
            return Err(Error::invalid_input("sample rate must be positive"));
        }

        let window_len = self.window_len();
        let bins = window_len / 2;
        let num_frames = self.frame_count(samples.len());

        let frames = (0..num_frames)
            .into_par_iter()
            .map(|frame_idx| {
                let start = frame_idx * self.hop_len;
                let windowed: Vec<Complex<f32>> = samples[start..start + window_len]
                    .iter()
                    .zip(self.window.iter())
                    .map(|(&s, &w)| Complex::new(s * w, 0.0))
                    .collect();

                let mut spectrum = self.transform.forward(&windowed)?;
                spectrum.truncate(bins);
                Ok(spectrum)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(frames = frames.len(), bins, "Computed spectrogram");

        Ok(Spectrogram {
            frames,
            sample_rate,
            window_len,
            hop_len: self.hop_len,
        })
    }
}
