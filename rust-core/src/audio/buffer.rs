//! Lock-free ring buffer for captured samples
//!
//! Carries 16-bit PCM from the capture callback thread to the detection loop

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Single-producer single-consumer sample ring buffer
pub struct AudioRingBuffer {
    producer: HeapProducer<i16>,
    consumer: HeapConsumer<i16>,
}

impl AudioRingBuffer {
    /// Create new ring buffer with given capacity in samples
    pub fn new(capacity: usize) -> Self {
        let rb = HeapRb::<i16>::new(capacity);
        let (producer, consumer) = rb.split();

        Self { producer, consumer }
    }

    /// Split into producer and consumer ends
    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        let dropped = Arc::new(AtomicU64::new(0));
        (
            AudioProducer {
                producer: self.producer,
                dropped: Arc::clone(&dropped),
            },
            AudioConsumer {
                consumer: self.consumer,
                dropped,
                dropped_seen: 0,
            },
        )
    }
}

/// Producer end, owned by the capture callback
pub struct AudioProducer {
    producer: HeapProducer<i16>,
    dropped: Arc<AtomicU64>,
}

impl AudioProducer {
    /// Write samples to buffer
    ///
    /// # Returns
    /// Number of samples written. Samples that do not fit are dropped and counted.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let written = self.producer.push_slice(samples);
        if written < samples.len() {
            self.dropped
                .fetch_add((samples.len() - written) as u64, Ordering::Relaxed);
        }
        written
    }
}

/// Consumer end, owned by the detection loop
pub struct AudioConsumer {
    consumer: HeapConsumer<i16>,
    dropped: Arc<AtomicU64>,
    dropped_seen: u64,
}

impl AudioConsumer {
    /// Read up to `buffer.len()` samples
    ///
    /// # Returns
    /// Number of samples actually read
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        self.consumer.pop_slice(buffer)
    }

    /// Samples dropped on overflow since the last call
    pub fn take_dropped(&mut self) -> u64 {
        let total = self.dropped.load(Ordering::Relaxed);
        let new = total - self.dropped_seen;
        self.dropped_seen = total;
        new
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}
