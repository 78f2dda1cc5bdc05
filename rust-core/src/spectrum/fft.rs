//! FFT engine using realfft for real-valued signals
//!
//! Plans once and owns all working buffers so per-block analysis never allocates

use crate::error::{ConfigError, DetectorError};
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// FFT engine for real-valued signals
pub struct FftEngine {
    /// FFT size (number of samples)
    fft_size: usize,

    /// Real FFT processor
    r2c: Arc<dyn RealToComplex<f32>>,

    /// Reusable input buffer (realfft uses it as scratch)
    input_buffer: Vec<f32>,

    /// Reusable output buffer (complex spectrum)
    output_buffer: Vec<Complex<f32>>,

    /// Magnitude of the last computed spectrum
    magnitude_buffer: Vec<f32>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size, a power of two >= 2
    pub fn new(fft_size: usize) -> Result<Self, ConfigError> {
        crate::config::validate_block_size(fft_size)?;

        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);

        let input_buffer = r2c.make_input_vec();
        let output_buffer = r2c.make_output_vec();
        let magnitude_buffer = vec![0.0; output_buffer.len()];

        Ok(Self {
            fft_size,
            r2c,
            input_buffer,
            output_buffer,
            magnitude_buffer,
        })
    }

    /// Compute FFT and return magnitude spectrum
    ///
    /// # Arguments
    /// * `signal` - Windowed input (zero-padded or truncated to fft_size)
    ///
    /// # Returns
    /// Magnitude spectrum |X[k]| for k = 0..=fft_size/2
    pub fn compute_magnitude(&mut self, signal: &[f32]) -> Result<&[f32], DetectorError> {
        let copy_len = signal.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&signal[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);

        self.r2c.process(&mut self.input_buffer, &mut self.output_buffer)?;

        for (mag, c) in self.magnitude_buffer.iter_mut().zip(&self.output_buffer) {
            *mag = c.norm();
        }

        Ok(&self.magnitude_buffer)
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get number of frequency bins (fft_size/2 + 1 for real FFT)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Convert bin index to Hz
    pub fn bin_to_hz(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }
}
