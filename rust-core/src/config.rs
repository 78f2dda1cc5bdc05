//! Detector configuration
//!
//! All tuning constants for the detection pipeline live here. Defaults match
//! a 16 kHz microphone front end delivering 1024-sample blocks.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Detection pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Sample rate of the audio source in Hz
    pub sample_rate: u32,

    /// Samples per analysis block (power of 2)
    pub block_size: usize,

    /// Lower edge of the whistle band in Hz (inclusive)
    pub min_whistle_freq: f32,

    /// Upper edge of the whistle band in Hz (inclusive)
    pub max_whistle_freq: f32,

    /// Bin magnitude a peak must strictly exceed to count as a whistle
    pub min_magnitude: f32,

    /// Shortest whistle that produces an event, in ms
    pub min_duration_ms: u32,

    /// Silence tolerated inside a whistle before it ends, in ms
    pub dropout_grace_ms: u32,

    /// Weight of the previous frequency estimate when smoothing
    pub smoothing: f32,

    /// Readings further than this from the current estimate are not smoothed in (Hz)
    pub max_frequency_jump: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            block_size: 1024,
            min_whistle_freq: 500.0,
            max_whistle_freq: 5000.0,
            min_magnitude: 50_000.0,
            min_duration_ms: 100,
            dropout_grace_ms: 50,
            smoothing: 0.7,
            max_frequency_jump: 200.0,
        }
    }
}

impl DetectorConfig {
    /// Check every parameter, returning the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }

        validate_block_size(self.block_size)?;

        let (min, max) = (self.min_whistle_freq, self.max_whistle_freq);
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min >= max {
            return Err(ConfigError::InvalidBand { min, max });
        }

        let nyquist = self.sample_rate as f32 / 2.0;
        if max > nyquist {
            return Err(ConfigError::BandAboveNyquist { max, nyquist });
        }

        if !self.min_magnitude.is_finite() || self.min_magnitude < 0.0 {
            return Err(ConfigError::InvalidMagnitude(self.min_magnitude));
        }

        if self.min_duration_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }

        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(ConfigError::InvalidSmoothing(self.smoothing));
        }

        if !self.max_frequency_jump.is_finite() || self.max_frequency_jump <= 0.0 {
            return Err(ConfigError::InvalidJumpThreshold(self.max_frequency_jump));
        }

        Ok(())
    }

    /// Width of one FFT bin in Hz
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.block_size as f32
    }

    /// Duration of one block in ms
    pub fn block_duration_ms(&self) -> f64 {
        self.block_size as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Block sizes must be a power of two and at least 2
pub(crate) fn validate_block_size(size: usize) -> Result<(), ConfigError> {
    if size < 2 || !size.is_power_of_two() {
        return Err(ConfigError::BlockSize(size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DetectorConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert!((config.bin_width() - 15.625).abs() < 1e-6);
        assert!((config.block_duration_ms() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_block_size() {
        for size in [0, 1, 3, 1000] {
            let config = DetectorConfig {
                block_size: size,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::BlockSize(size)));
        }
    }

    #[test]
    fn test_rejects_inverted_band() {
        let config = DetectorConfig {
            min_whistle_freq: 4000.0,
            max_whistle_freq: 1000.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBand { .. })));
    }

    #[test]
    fn test_rejects_band_above_nyquist() {
        let config = DetectorConfig {
            max_whistle_freq: 9000.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BandAboveNyquist { .. })));
    }

    #[test]
    fn test_rejects_zero_duration_and_bad_smoothing() {
        let config = DetectorConfig {
            min_duration_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroDuration));

        let config = DetectorConfig {
            smoothing: 1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSmoothing(1.0)));

        let config = DetectorConfig {
            max_frequency_jump: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidJumpThreshold(0.0)));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{"min_whistle_freq": 800.0}"#).unwrap();
        assert_eq!(config.min_whistle_freq, 800.0);
        assert_eq!(config.block_size, 1024);
    }
}
