//! Block-oriented audio sources

use crate::error::AudioError;

/// Delivers fixed-size blocks of 16-bit mono samples at a known rate
pub trait AudioSource {
    /// Sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Fill `block` completely, blocking until enough samples are available
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError>;
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        (**self).read_block(block)
    }
}

/// Finite in-memory source for offline replay
#[derive(Debug, Clone)]
pub struct PcmSource {
    samples: Vec<i16>,
    position: usize,
    sample_rate: u32,
}

impl PcmSource {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            position: 0,
            sample_rate,
        }
    }

    /// Samples not yet read
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.position
    }
}

impl AudioSource for PcmSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Fails with [`AudioError::EndOfStream`] once less than a full block remains
    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        if self.remaining() < block.len() {
            return Err(AudioError::EndOfStream);
        }

        let end = self.position + block.len();
        block.copy_from_slice(&self.samples[self.position..end]);
        self.position = end;
        Ok(())
    }
}
