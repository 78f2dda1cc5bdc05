//! Precomputed analysis window
//!
//! Applies a Hann window to each sample block before the FFT to reduce
//! spectral leakage. Coefficients are computed once and reused for every block.

use crate::config::validate_block_size;
use crate::error::ConfigError;
use std::f32::consts::PI;

/// Read-only table of window coefficients, one per sample in a block
#[derive(Debug, Clone)]
pub struct WindowTable {
    coefficients: Vec<f32>,
}

impl WindowTable {
    /// Build a Hann window: w[n] = 0.5 * (1 - cos(2πn/(M-1)))
    ///
    /// # Arguments
    /// * `size` - Number of samples (M), a power of two >= 2
    pub fn hann(size: usize) -> Result<Self, ConfigError> {
        validate_block_size(size)?;

        let denom = (size - 1) as f32;
        let coefficients = (0..size)
            .map(|n| {
                let angle = 2.0 * PI * n as f32 / denom;
                // Rounding can push the endpoints a hair below zero
                (0.5 * (1.0 - angle.cos())).clamp(0.0, 1.0)
            })
            .collect();

        Ok(Self { coefficients })
    }

    /// Window samples into `out`
    ///
    /// Writes `min(samples.len(), len())` values; the rest of `out` is zeroed.
    pub fn apply(&self, samples: &[i16], out: &mut [f32]) {
        let n = samples.len().min(self.coefficients.len()).min(out.len());

        for ((o, &s), &w) in out[..n].iter_mut().zip(samples).zip(&self.coefficients) {
            *o = s as f32 * w;
        }
        out[n..].fill(0.0);
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
}
