//! Radix-2 FFT and analysis window.
//!
//! The transform is a recursive decimation-in-time Cooley-Tukey FFT. Input
//! length must be a power of two; anything else is rejected with
//! [`Error::NonPowerOfTwo`] rather than truncated or padded.

use num_complex::Complex;

use echomark_core::{Error, Result};

/// Sub-transforms at least this long are split across the rayon pool.
const PARALLEL_MIN_LEN: usize = 8192;

/// Fixed-length forward/inverse DFT.
#[derive(Debug, Clone)]
pub struct SpectralTransform {
    len: usize,
}

impl SpectralTransform {
    /// Create a transform for inputs of exactly `len` samples.
    pub fn new(len: usize) -> Result<Self> {
        check_power_of_two(len)?;
        Ok(Self { len })
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; a transform has at least one point.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Forward DFT in natural frequency order.
    pub fn forward(&self, input: &[Complex<f32>]) -> Result<Vec<Complex<f32>>> {
        self.check_len(input.len())?;
        Ok(fft_recursive(input))
    }

    /// Inverse DFT, scaled by `1/n`.
    pub fn inverse(&self, input: &[Complex<f32>]) -> Result<Vec<Complex<f32>>> {
        self.check_len(input.len())?;
        let conjugated: Vec<Complex<f32>> = input.iter().map(|c| c.conj()).collect();
        let scale = 1.0 / self.len as f32;
        Ok(fft_recursive(&conjugated)
            .into_iter()
            .map(|c| c.conj() * scale)
            .collect())
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len != self.len {
            return Err(Error::invalid_input(format!(
                "transform planned for {} points, got {}",
                self.len, len
            )));
        }
        Ok(())
    }
}

/// Forward DFT of a power-of-two-length sequence.
pub fn fft(input: &[Complex<f32>]) -> Result<Vec<Complex<f32>>> {
    check_power_of_two(input.len())?;
    Ok(fft_recursive(input))
}

/// Hann window `0.5 * (1 - cos(2*pi*i / (n - 1)))`.
pub fn hann_window(len: usize) -> Vec<f32> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / (len - 1) as f64;
            (0.5 * (1.0 - phase.cos())) as f32
        })
        .collect()
}

fn check_power_of_two(len: usize) -> Result<()> {
    if !len.is_power_of_two() {
        return Err(Error::NonPowerOfTwo { len });
    }
    Ok(())
}

fn fft_recursive(x: &[Complex<f32>]) -> Vec<Complex<f32>> {
    let n = x.len();
    if n == 1 {
        return vec![x[0]];
    }

    let half = n / 2;
    let even: Vec<Complex<f32>> = x.iter().step_by(2).copied().collect();
    let odd: Vec<Complex<f32>> = x.iter().skip(1).step_by(2).copied().collect();

    let (even, odd) = if n >= PARALLEL_MIN_LEN {
        rayon::join(|| fft_recursive(&even), || fft_recursive(&odd))
    } else {
        (fft_recursive(&even), fft_recursive(&odd))
    };

    let mut out = vec![Complex::new(0.0f32, 0.0); n];
    for k in 0..half {
        let angle = -2.0 * std::f64::consts::PI * k as f64 / n as f64;
        let twiddle = Complex::new(angle.cos() as f32, angle.sin() as f32);
        let t = twiddle * odd[k];
        out[k] = even[k] + t;
        out[k + half] = even[k] - t;
    }
    out
}
