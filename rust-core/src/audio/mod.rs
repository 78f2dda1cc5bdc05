//! Audio acquisition: block sources, capture and timestamps

pub mod buffer;
pub mod clock;
pub mod input;
pub mod source;

pub use buffer::AudioRingBuffer;
pub use clock::{Clock, MonotonicClock, SampleClock};
pub use input::{list_input_devices, AudioDeviceInfo, MicrophoneSource};
pub use source::{AudioSource, PcmSource};
