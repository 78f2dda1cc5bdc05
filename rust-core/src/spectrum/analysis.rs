//! Band-limited peak frequency analyzer
//!
//! Combines the window table and FFT engine to turn one block of samples into
//! the dominant frequency inside the whistle band, or nothing.

use super::fft::FftEngine;
use super::windowing::WindowTable;
use crate::config::DetectorConfig;
use crate::error::DetectorError;

/// Lowest bin considered. Bins 0 and 1 carry DC offset and rumble.
pub const FIRST_SEARCH_BIN: usize = 2;

/// Spectral analyzer for whistle detection
pub struct SpectralAnalyzer {
    window: WindowTable,
    fft_engine: FftEngine,

    /// Windowed copy of the current block
    windowed: Vec<f32>,

    sample_rate: u32,
    min_magnitude: f32,

    /// Bins searched: [first_bin, end_bin)
    first_bin: usize,
    end_bin: usize,

    last_peak_magnitude: Option<f32>,
}

impl SpectralAnalyzer {
    /// Create a new analyzer
    ///
    /// All buffers are allocated here; analysis never allocates.
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;

        let window = WindowTable::hann(config.block_size)?;
        let fft_engine = FftEngine::new(config.block_size)?;

        // Bin i is searched when min <= i * bin_width <= max. Both edges are
        // inclusive, so a band edge landing exactly on a bin keeps that bin.
        let bin_width = config.bin_width();
        let first_bin =
            ((config.min_whistle_freq / bin_width).ceil() as usize).max(FIRST_SEARCH_BIN);
        // Only bins below N/2 are searched
        let end_bin = ((config.max_whistle_freq / bin_width).floor() as usize + 1)
            .min(config.block_size / 2);

        if first_bin >= end_bin {
            return Err(DetectorError::Initialization(format!(
                "no FFT bins fall inside {} Hz .. {} Hz at {} Hz bin width",
                config.min_whistle_freq, config.max_whistle_freq, bin_width
            )));
        }

        tracing::debug!(
            block_size = config.block_size,
            sample_rate = config.sample_rate,
            first_bin,
            end_bin,
            "spectral analyzer ready"
        );

        Ok(Self {
            window,
            fft_engine,
            windowed: vec![0.0; config.block_size],
            sample_rate: config.sample_rate,
            min_magnitude: config.min_magnitude,
            first_bin,
            end_bin,
            last_peak_magnitude: None,
        })
    }

    /// Find the dominant in-band frequency of one sample block
    ///
    /// # Arguments
    /// * `block` - Raw samples (zero-padded or truncated to the block size)
    ///
    /// # Returns
    /// Peak frequency in Hz, or `None` if no in-band bin clears the magnitude gate
    pub fn analyze(&mut self, block: &[i16]) -> Result<Option<f32>, DetectorError> {
        self.window.apply(block, &mut self.windowed);

        let magnitudes = self.fft_engine.compute_magnitude(&self.windowed)?;

        let peak = search_band(magnitudes, self.first_bin, self.end_bin, self.min_magnitude);
        self.last_peak_magnitude = peak.map(|(_, mag)| mag);

        let freq = peak.map(|(bin, _)| self.fft_engine.bin_to_hz(bin, self.sample_rate));
        tracing::trace!(peak_hz = ?freq, magnitude = ?self.last_peak_magnitude, "block analyzed");

        Ok(freq)
    }

    /// Gated peak search over a magnitude spectrum
    ///
    /// Only bins from [`FIRST_SEARCH_BIN`] up to (excluding) N/2 whose frequency
    /// lies inside the band are candidates. A bin wins only by strictly
    /// exceeding both the magnitude gate and every earlier candidate, so ties go
    /// to the lower frequency.
    pub fn find_peak(&self, magnitudes: &[f32]) -> Option<f32> {
        let end = self.end_bin.min(magnitudes.len());
        search_band(magnitudes, self.first_bin, end, self.min_magnitude)
            .map(|(bin, _)| self.fft_engine.bin_to_hz(bin, self.sample_rate))
    }

    /// Magnitude of the bin selected by the most recent `analyze`
    pub fn last_peak_magnitude(&self) -> Option<f32> {
        self.last_peak_magnitude
    }

    /// Searched bin range, [first, end)
    pub fn bin_range(&self) -> (usize, usize) {
        (self.first_bin, self.end_bin)
    }
}

fn search_band(magnitudes: &[f32], first: usize, end: usize, gate: f32) -> Option<(usize, f32)> {
    let mut max_magnitude = gate;
    let mut peak = None;

    for (bin, &magnitude) in magnitudes.iter().enumerate().take(end).skip(first) {
        if magnitude > max_magnitude {
            max_magnitude = magnitude;
            peak = Some((bin, magnitude));
        }
    }

    peak
}
