//! Whistle Detector - real-time whistle detection core
//!
//! Windowed FFT peak search over a fixed whistle band, followed by a small
//! state machine that turns per-block peaks into whistle events with duration.

pub mod audio;
pub mod config;
pub mod detector;
pub mod error;
pub mod spectrum;
pub mod tracker;

pub use config::DetectorConfig;
pub use detector::WhistleDetector;
pub use error::{AudioError, ConfigError, DetectorError};
pub use spectrum::SpectralAnalyzer;
pub use tracker::{EventSink, WhistleEvent, WhistleTracker};
