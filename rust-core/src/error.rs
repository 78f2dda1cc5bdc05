//! Error types for configuration, audio capture and detection

use thiserror::Error;

/// Invalid detector parameters, caught before any audio is processed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("Block size must be a power of two >= 2 (got {0})")]
    BlockSize(usize),

    #[error("Whistle band must satisfy 0 < min < max (got {min} Hz .. {max} Hz)")]
    InvalidBand { min: f32, max: f32 },

    #[error("Whistle band maximum {max} Hz exceeds Nyquist frequency {nyquist} Hz")]
    BandAboveNyquist { max: f32, nyquist: f32 },

    #[error("Minimum magnitude must be finite and non-negative (got {0})")]
    InvalidMagnitude(f32),

    #[error("Minimum whistle duration must be greater than zero")]
    ZeroDuration,

    #[error("Smoothing factor must be in [0, 1) (got {0})")]
    InvalidSmoothing(f32),

    #[error("Frequency jump threshold must be positive (got {0} Hz)")]
    InvalidJumpThreshold(f32),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio input device found")]
    NoDevice,

    #[error("No audio input device named '{0}'")]
    DeviceNotFound(String),

    #[error("Failed to get device name: {0}")]
    DeviceName(String),

    #[error("Failed to query device configuration: {0}")]
    DeviceConfig(String),

    #[error("Device does not support {0} Hz mono capture")]
    UnsupportedSampleRate(u32),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build stream: {0}")]
    BuildStream(String),

    #[error("Failed to play stream: {0}")]
    PlayStream(String),

    #[error("Audio stream failed: {0}")]
    Stream(String),

    #[error("Audio source exhausted")]
    EndOfStream,
}

/// Top-level error for building and running a detector
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Transform failed: {0}")]
    Transform(#[from] realfft::FftError),

    #[error("Audio acquisition failed: {0}")]
    Acquisition(#[from] AudioError),
}
