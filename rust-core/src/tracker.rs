//! Whistle session state machine
//!
//! Turns one peak-frequency estimate per audio block into discrete whistle
//! events. A session starts on the first in-band peak, smooths its frequency
//! while peaks keep arriving, survives short dropouts, and ends once no peak
//! has been seen for longer than the grace period.

use crate::config::DetectorConfig;
use serde::{Deserialize, Serialize};

/// A completed whistle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WhistleEvent {
    /// Smoothed frequency at the end of the session
    pub frequency_hz: f32,

    /// Time from the first peak to the block that closed the session
    pub duration_ms: u32,
}

/// Receives completed whistle events
pub trait EventSink {
    fn on_whistle(&mut self, event: &WhistleEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&WhistleEvent),
{
    fn on_whistle(&mut self, event: &WhistleEvent) {
        self(event)
    }
}

/// Mutable state of an active whistle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhistleSession {
    pub current_freq: f32,
    pub start_ms: u64,
    pub last_seen_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerState {
    Idle,
    Active(WhistleSession),
}

/// Timing and smoothing parameters for [`WhistleTracker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub min_duration_ms: u32,
    pub dropout_grace_ms: u32,
    pub smoothing: f32,
    pub max_frequency_jump: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

impl From<&DetectorConfig> for TrackerConfig {
    fn from(cfg: &DetectorConfig) -> Self {
        Self {
            min_duration_ms: cfg.min_duration_ms,
            dropout_grace_ms: cfg.dropout_grace_ms,
            smoothing: cfg.smoothing,
            max_frequency_jump: cfg.max_frequency_jump,
        }
    }
}

pub struct WhistleTracker {
    config: TrackerConfig,
    state: TrackerState,
}

impl WhistleTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            state: TrackerState::Idle,
        }
    }

    /// Feed one block's peak estimate
    ///
    /// # Arguments
    /// * `peak` - Peak frequency in Hz, or `None` if the block had no whistle
    /// * `now_ms` - Monotonic timestamp of the block
    ///
    /// # Returns
    /// The completed whistle, if this block closed a session that lasted at
    /// least `min_duration_ms`
    pub fn update(&mut self, peak: Option<f32>, now_ms: u64) -> Option<WhistleEvent> {
        match (self.state, peak) {
            (TrackerState::Idle, Some(freq)) => {
                tracing::debug!(freq, now_ms, "whistle started");
                self.state = TrackerState::Active(WhistleSession {
                    current_freq: freq,
                    start_ms: now_ms,
                    last_seen_ms: now_ms,
                });
                None
            }

            (TrackerState::Active(mut session), Some(freq)) => {
                if (freq - session.current_freq).abs() < self.config.max_frequency_jump {
                    let a = self.config.smoothing;
                    session.current_freq = session.current_freq * a + freq * (1.0 - a);
                } else {
                    tracing::trace!(freq, current = session.current_freq, "frequency jump ignored");
                }
                session.last_seen_ms = now_ms;
                self.state = TrackerState::Active(session);
                None
            }

            (TrackerState::Active(session), None) => {
                let gap = now_ms.saturating_sub(session.last_seen_ms);
                if gap <= u64::from(self.config.dropout_grace_ms) {
                    return None;
                }

                self.state = TrackerState::Idle;

                let duration = now_ms.saturating_sub(session.start_ms);
                let duration_ms = u32::try_from(duration).unwrap_or(u32::MAX);

                if duration_ms >= self.config.min_duration_ms {
                    let event = WhistleEvent {
                        frequency_hz: session.current_freq,
                        duration_ms,
                    };
                    tracing::debug!(?event, "whistle ended");
                    Some(event)
                } else {
                    tracing::debug!(duration_ms, "whistle too short, discarded");
                    None
                }
            }

            (TrackerState::Idle, None) => None,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TrackerState::Active(_))
    }

    /// Smoothed frequency of the active session
    pub fn current_frequency(&self) -> Option<f32> {
        match self.state {
            TrackerState::Active(session) => Some(session.current_freq),
            TrackerState::Idle => None,
        }
    }

    /// Drop any active session without emitting an event
    pub fn reset(&mut self) {
        self.state = TrackerState::Idle;
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_MS: u64 = 10;

    /// Feed `peak` every BLOCK_MS from `start` (inclusive) to `end` (exclusive)
    fn feed(
        tracker: &mut WhistleTracker,
        peak: Option<f32>,
        start: u64,
        end: u64,
        events: &mut Vec<WhistleEvent>,
    ) {
        let mut t = start;
        while t < end {
            events.extend(tracker.update(peak, t));
            t += BLOCK_MS;
        }
    }

    #[test]
    fn test_whistle_emits_single_event() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());
        let mut events = Vec::new();

        // Peaks at 0..=150 ms, closed by the silent block at 210 ms
        feed(&mut tracker, Some(1000.0), 0, 160, &mut events);
        feed(&mut tracker, None, 160, 400, &mut events);

        assert_eq!(events.len(), 1);
        let event = events[0];
        assert!((event.frequency_hz - 1000.0).abs() < 1e-3);
        assert_eq!(event.duration_ms, 210);
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_short_whistle_is_discarded() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());
        let mut events = Vec::new();

        // Peaks at 0..=30 ms, closed at 90 ms
        feed(&mut tracker, Some(1000.0), 0, 40, &mut events);
        feed(&mut tracker, None, 40, 300, &mut events);

        assert!(events.is_empty());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_block_cadence_durations() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        // One 64 ms block of whistle closes at 64 ms, under the minimum
        assert_eq!(tracker.update(Some(1000.0), 0), None);
        assert_eq!(tracker.update(None, 64), None);
        assert!(!tracker.is_active());

        // Three blocks close at 192 ms
        for t in [1000, 1064, 1128] {
            assert_eq!(tracker.update(Some(1000.0), t), None);
        }
        let event = tracker.update(None, 1192).unwrap();
        assert_eq!(event.duration_ms, 192);
    }

    #[test]
    fn test_duration_runs_to_closing_block() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        assert_eq!(tracker.update(Some(1000.0), 0), None);
        assert_eq!(tracker.update(Some(1000.0), 100), None);

        let event = tracker.update(None, 151).unwrap();
        assert_eq!(event.duration_ms, 151);
    }

    #[test]
    fn test_grace_gap_lifts_whistle_over_minimum() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());
        let mut events = Vec::new();

        // Peaks at 0..=60 ms span only 60 ms, but the session closes at 120 ms
        feed(&mut tracker, Some(1000.0), 0, 70, &mut events);
        feed(&mut tracker, None, 70, 300, &mut events);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_ms, 120);
    }

    #[test]
    fn test_smoothing_and_jump_rejection() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        tracker.update(Some(1000.0), 0);
        tracker.update(Some(1250.0), 10);
        assert_eq!(tracker.current_frequency(), Some(1000.0));

        tracker.update(Some(1100.0), 20);
        let freq = tracker.current_frequency().unwrap();
        assert!((freq - 1030.0).abs() < 1e-3);
    }

    #[test]
    fn test_jump_still_refreshes_last_seen() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        tracker.update(Some(1000.0), 0);
        tracker.update(Some(3000.0), 40);

        match tracker.state() {
            TrackerState::Active(session) => {
                assert_eq!(session.last_seen_ms, 40);
                assert_eq!(session.current_freq, 1000.0);
            }
            TrackerState::Idle => panic!("session should be active"),
        }

        // 50 ms after the rejected reading, still within grace
        assert_eq!(tracker.update(None, 90), None);
        assert!(tracker.is_active());
    }

    #[test]
    fn test_short_dropout_keeps_session() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        tracker.update(Some(1000.0), 0);
        tracker.update(Some(1000.0), 100);

        // Exactly 50 ms gap is within the grace period
        assert_eq!(tracker.update(None, 130), None);
        assert_eq!(tracker.update(None, 150), None);
        assert!(tracker.is_active());

        tracker.update(Some(1000.0), 160);
        assert_eq!(tracker.update(None, 210), None);
        assert!(tracker.is_active());

        let event = tracker.update(None, 211).unwrap();
        assert_eq!(event.duration_ms, 211);
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_idle_silence_never_emits() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());
        for t in 0..1000 {
            assert_eq!(tracker.update(None, t * 64), None);
        }
        assert_eq!(tracker.state(), TrackerState::Idle);
    }

    #[test]
    fn test_clock_rollback_reads_as_no_elapsed_time() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        tracker.update(Some(1000.0), 10_000);
        assert_eq!(tracker.update(None, 5_000), None);
        assert!(tracker.is_active());
    }

    #[test]
    fn test_new_session_after_event() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());
        let mut events = Vec::new();

        feed(&mut tracker, Some(1000.0), 0, 200, &mut events);
        feed(&mut tracker, None, 200, 300, &mut events);
        feed(&mut tracker, Some(2000.0), 300, 500, &mut events);
        feed(&mut tracker, None, 500, 600, &mut events);

        assert_eq!(events.len(), 2);
        assert!((events[0].frequency_hz - 1000.0).abs() < 1e-3);
        assert!((events[1].frequency_hz - 2000.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_drops_session() {
        let mut tracker = WhistleTracker::new(TrackerConfig::default());

        tracker.update(Some(1000.0), 0);
        tracker.update(Some(1000.0), 500);
        tracker.reset();

        assert_eq!(tracker.update(None, 1000), None);
        assert_eq!(tracker.current_frequency(), None);
    }

    #[test]
    fn test_closure_sink() {
        let mut received = Vec::new();
        {
            let mut sink = |event: &WhistleEvent| received.push(*event);
            sink.on_whistle(&WhistleEvent {
                frequency_hz: 1500.0,
                duration_ms: 120,
            });
        }
        assert_eq!(received.len(), 1);
    }
}
