//! Whistle detection loop
//!
//! Reads one block from the audio source, finds its in-band peak, feeds the
//! tracker and forwards completed whistles to the registered sink.

use crate::audio::{AudioSource, Clock};
use crate::config::DetectorConfig;
use crate::error::DetectorError;
use crate::spectrum::SpectralAnalyzer;
use crate::tracker::{EventSink, TrackerConfig, WhistleEvent, WhistleTracker};

pub struct WhistleDetector<S: AudioSource, C: Clock> {
    config: DetectorConfig,
    source: S,
    clock: C,
    analyzer: SpectralAnalyzer,
    tracker: WhistleTracker,
    sink: Option<Box<dyn EventSink>>,

    /// Sample block, reused every cycle
    block: Vec<i16>,
}

impl<S: AudioSource, C: Clock> WhistleDetector<S, C> {
    /// Build a detector over `source`
    ///
    /// Fails if the configuration is invalid or the source runs at a different
    /// sample rate than the configuration expects.
    pub fn new(config: DetectorConfig, source: S, clock: C) -> Result<Self, DetectorError> {
        let analyzer = SpectralAnalyzer::new(&config)?;

        if source.sample_rate() != config.sample_rate {
            return Err(DetectorError::Initialization(format!(
                "audio source runs at {} Hz, detector configured for {} Hz",
                source.sample_rate(),
                config.sample_rate
            )));
        }

        let tracker = WhistleTracker::new(TrackerConfig::from(&config));
        let block = vec![0; config.block_size];

        tracing::info!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            band_hz = ?(config.min_whistle_freq, config.max_whistle_freq),
            "whistle detector initialized"
        );

        Ok(Self {
            config,
            source,
            clock,
            analyzer,
            tracker,
            sink: None,
            block,
        })
    }

    /// Register the sink for completed whistles, replacing any previous one
    pub fn set_callback<E: EventSink + 'static>(&mut self, sink: E) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_callback(&mut self) {
        self.sink = None;
    }

    /// Run one detection step on an already-acquired block
    pub fn process_block(
        &mut self,
        block: &[i16],
        now_ms: u64,
    ) -> Result<Option<WhistleEvent>, DetectorError> {
        let peak = self.analyzer.analyze(block)?;
        let event = self.tracker.update(peak, now_ms);

        if let Some(event) = &event {
            tracing::info!(
                frequency_hz = event.frequency_hz,
                duration_ms = event.duration_ms,
                "whistle detected"
            );
            if let Some(sink) = self.sink.as_mut() {
                sink.on_whistle(event);
            }
        }

        Ok(event)
    }

    /// Acquire the next block and process it
    pub fn update(&mut self) -> Result<Option<WhistleEvent>, DetectorError> {
        let mut block = std::mem::take(&mut self.block);

        let result = match self.source.read_block(&mut block) {
            Ok(()) => {
                let now_ms = self.clock.now_ms();
                self.process_block(&block, now_ms)
            }
            Err(err) => Err(err.into()),
        };

        self.block = block;
        result
    }

    /// Process blocks until the source or analysis fails
    ///
    /// Never returns `Ok` for an endless source; the error is handed back
    /// without retrying.
    pub fn run(&mut self) -> Result<(), DetectorError> {
        loop {
            if let Err(err) = self.update() {
                tracing::error!(%err, "detection loop stopped");
                return Err(err);
            }
        }
    }

    pub fn tracker(&self) -> &WhistleTracker {
        &self.tracker
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PcmSource, SampleClock};
    use crate::error::AudioError;
    use std::cell::RefCell;
    use std::f32::consts::PI;
    use std::rc::Rc;

    struct FixedClock(u64);

    impl Clock for FixedClock {
        fn now_ms(&mut self) -> u64 {
            self.0
        }
    }

    fn tone_block(freq_hz: f32, config: &DetectorConfig) -> Vec<i16> {
        (0..config.block_size)
            .map(|n| {
                let t = n as f32 / config.sample_rate as f32;
                (8000.0 * (2.0 * PI * freq_hz * t).sin()) as i16
            })
            .collect()
    }

    fn detector(config: &DetectorConfig) -> WhistleDetector<PcmSource, FixedClock> {
        let source = PcmSource::new(Vec::new(), config.sample_rate);
        WhistleDetector::new(config.clone(), source, FixedClock(0)).unwrap()
    }

    #[test]
    fn test_sink_receives_event() {
        let config = DetectorConfig::default();
        let mut detector = detector(&config);

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink_events = Rc::clone(&received);
        detector.set_callback(move |event: &WhistleEvent| sink_events.borrow_mut().push(*event));

        let tone = tone_block(1500.0, &config);
        let silence = vec![0; config.block_size];

        for t in [0, 64, 128] {
            assert_eq!(detector.process_block(&tone, t).unwrap(), None);
        }
        // Within grace
        assert_eq!(detector.process_block(&silence, 160).unwrap(), None);
        let event = detector.process_block(&silence, 192).unwrap().unwrap();

        // Closed by the silent block at 192 ms
        assert_eq!(event.duration_ms, 192);
        assert!((event.frequency_hz - 1500.0).abs() <= config.bin_width());
        assert_eq!(*received.borrow(), vec![event]);
    }

    #[test]
    fn test_event_returned_without_sink() {
        let config = DetectorConfig::default();
        let mut detector = detector(&config);

        let received = Rc::new(RefCell::new(Vec::new()));
        let sink_events = Rc::clone(&received);
        detector.set_callback(move |event: &WhistleEvent| sink_events.borrow_mut().push(*event));
        detector.clear_callback();

        let tone = tone_block(1500.0, &config);
        let silence = vec![0; config.block_size];
        detector.process_block(&tone, 0).unwrap();
        detector.process_block(&tone, 200).unwrap();

        let event = detector.process_block(&silence, 300).unwrap().unwrap();
        assert_eq!(event.duration_ms, 300);
        assert!(!detector.tracker().is_active());
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn test_rejects_mismatched_sample_rate() {
        let config = DetectorConfig::default();
        let source = PcmSource::new(Vec::new(), 44_100);
        let result = WhistleDetector::new(config, source, FixedClock(0));
        assert!(matches!(result, Err(DetectorError::Initialization(_))));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            block_size: 1000,
            ..Default::default()
        };
        let source = PcmSource::new(Vec::new(), config.sample_rate);
        let result = WhistleDetector::new(config, source, FixedClock(0));
        assert!(matches!(result, Err(DetectorError::Config(_))));
    }

    #[test]
    fn test_update_propagates_source_failure() {
        let config = DetectorConfig::default();
        let source = PcmSource::new(vec![0; config.block_size], config.sample_rate);
        let clock = SampleClock::new(config.sample_rate, config.block_size);
        let mut detector = WhistleDetector::new(config, source, clock).unwrap();

        assert_eq!(detector.update().unwrap(), None);
        assert!(matches!(
            detector.update(),
            Err(DetectorError::Acquisition(AudioError::EndOfStream))
        ));
        assert!(matches!(
            detector.run(),
            Err(DetectorError::Acquisition(AudioError::EndOfStream))
        ));
    }
}
