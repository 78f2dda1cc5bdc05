//! Microphone capture using cpal
//!
//! Captures the first channel of an input device at the detector's sample
//! rate and hands it to the detection loop as fixed-size 16-bit blocks.

use super::buffer::{AudioConsumer, AudioProducer, AudioRingBuffer};
use super::source::AudioSource;
use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig,
    SupportedStreamConfig,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long `read_block` sleeps when the ring buffer is empty
const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Audio input device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// First error reported by a stream's error callback
type FailureSlot = Arc<Mutex<Option<String>>>;

/// Detection-loop side of a capture stream
///
/// Assembles fixed-size blocks from the ring buffer and surfaces errors the
/// audio thread latched into the failure slot.
struct CaptureReader {
    consumer: AudioConsumer,
    failure: FailureSlot,
}

impl CaptureReader {
    fn new(consumer: AudioConsumer, failure: FailureSlot) -> Self {
        Self { consumer, failure }
    }

    /// Block until `block` is full or the stream has failed
    ///
    /// # Returns
    /// Samples dropped on overflow since the previous fill
    fn fill(&mut self, block: &mut [i16]) -> Result<u64, AudioError> {
        let mut filled = 0;
        while filled < block.len() {
            self.check_stream()?;

            if self.consumer.is_empty() {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            filled += self.consumer.read(&mut block[filled..]);
        }

        Ok(self.consumer.take_dropped())
    }

    fn check_stream(&self) -> Result<(), AudioError> {
        let slot = self
            .failure
            .lock()
            .map_err(|_| AudioError::Stream("capture state poisoned".to_string()))?;

        match slot.as_ref() {
            Some(message) => Err(AudioError::Stream(message.clone())),
            None => Ok(()),
        }
    }
}

/// Live microphone source
pub struct MicrophoneSource {
    stream: Stream,
    reader: CaptureReader,
    device_info: AudioDeviceInfo,
}

impl MicrophoneSource {
    /// Open the default input device
    ///
    /// # Arguments
    /// * `sample_rate` - Required capture rate in Hz
    /// * `capacity` - Ring buffer capacity in samples
    pub fn from_default_device(sample_rate: u32, capacity: usize) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(AudioError::NoDevice)?;

        Self::from_device(device, sample_rate, capacity)
    }

    /// Open the input device with the given name
    pub fn from_device_name(
        name: &str,
        sample_rate: u32,
        capacity: usize,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let mut devices = host
            .input_devices()
            .map_err(|e| AudioError::DeviceName(e.to_string()))?;

        let device = devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))?;

        Self::from_device(device, sample_rate, capacity)
    }

    /// Open a specific device. The stream is built paused; call [`start`](Self::start).
    pub fn from_device(device: Device, sample_rate: u32, capacity: usize) -> Result<Self, AudioError> {
        let name = device
            .name()
            .map_err(|e| AudioError::DeviceName(e.to_string()))?;

        let supported = select_config(&device, sample_rate)?;
        let stream_config: StreamConfig = supported.config();

        let device_info = AudioDeviceInfo {
            name,
            sample_rate,
            channels: stream_config.channels,
        };

        let (producer, consumer) = AudioRingBuffer::new(capacity).split();
        let failure = Arc::new(Mutex::new(None));

        let stream = match supported.sample_format() {
            SampleFormat::I16 => {
                build_capture_stream::<i16>(&device, &stream_config, producer, Arc::clone(&failure))
            }
            SampleFormat::F32 => {
                build_capture_stream::<f32>(&device, &stream_config, producer, Arc::clone(&failure))
            }
            other => Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        }?;

        tracing::info!(
            device = %device_info.name,
            sample_rate,
            channels = device_info.channels,
            format = ?supported.sample_format(),
            "input stream ready"
        );

        Ok(Self {
            stream,
            reader: CaptureReader::new(consumer, failure),
            device_info,
        })
    }

    /// Start capturing audio
    pub fn start(&self) -> Result<(), AudioError> {
        self.stream
            .play()
            .map_err(|e| AudioError::PlayStream(e.to_string()))
    }

    /// Get device information
    pub fn device_info(&self) -> &AudioDeviceInfo {
        &self.device_info
    }
}

impl AudioSource for MicrophoneSource {
    fn sample_rate(&self) -> u32 {
        self.device_info.sample_rate
    }

    fn read_block(&mut self, block: &mut [i16]) -> Result<(), AudioError> {
        let dropped = self.reader.fill(block)?;
        if dropped > 0 {
            tracing::warn!(dropped, "capture buffer overflowed, samples dropped");
        }

        Ok(())
    }
}

/// Pick a 16-bit or float input configuration supporting `sample_rate`
fn select_config(device: &Device, sample_rate: u32) -> Result<SupportedStreamConfig, AudioError> {
    let ranges = device
        .supported_input_configs()
        .map_err(|e| AudioError::DeviceConfig(e.to_string()))?;

    let mut candidates: Vec<_> = ranges
        .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
        .filter(|r| matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32))
        .collect();

    // Native 16-bit first, then fewest channels
    candidates.sort_by_key(|r| (r.sample_format() != SampleFormat::I16, r.channels()));

    candidates
        .into_iter()
        .next()
        .map(|r| r.with_sample_rate(SampleRate(sample_rate)))
        .ok_or(AudioError::UnsupportedSampleRate(sample_rate))
}

fn build_capture_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
    failure: FailureSlot,
) -> Result<Stream, AudioError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let mut mono: Vec<i16> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Left channel only
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| i16::from_sample(frame[0])));
                producer.write(&mono);
            },
            move |err| {
                tracing::error!(%err, "audio input error");
                if let Ok(mut slot) = failure.lock() {
                    slot.get_or_insert_with(|| err.to_string());
                }
            },
            None,
        )
        .map_err(|e| AudioError::BuildStream(e.to_string()))
}

/// List available audio input devices
pub fn list_input_devices() -> Result<Vec<AudioDeviceInfo>, AudioError> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    let device_iter = host
        .input_devices()
        .map_err(|e| AudioError::DeviceName(e.to_string()))?;

    for device in device_iter {
        if let Ok(name) = device.name() {
            if let Ok(config) = device.default_input_config() {
                devices.push(AudioDeviceInfo {
                    name,
                    sample_rate: config.sample_rate().0,
                    channels: config.channels(),
                });
            }
        }
    }

    Ok(devices)
}
