//! Millisecond timestamp sources for the whistle tracker

use std::time::Instant;

pub trait Clock {
    /// Monotonic time in ms
    fn now_ms(&mut self) -> u64;
}

/// Wall-clock time since construction
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&mut self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Time derived from the number of samples consumed
///
/// Each call advances by one block, so the n-th block is stamped with the end
/// of its own audio. Used for offline replay where wall time is meaningless.
#[derive(Debug, Clone)]
pub struct SampleClock {
    samples: u64,
    block_size: u64,
    sample_rate: u64,
}

impl SampleClock {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Self {
            samples: 0,
            block_size: block_size as u64,
            sample_rate: u64::from(sample_rate.max(1)),
        }
    }
}

impl Clock for SampleClock {
    fn now_ms(&mut self) -> u64 {
        self.samples += self.block_size;
        self.samples * 1000 / self.sample_rate
    }
}
