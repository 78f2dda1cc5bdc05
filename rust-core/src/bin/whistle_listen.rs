//! Listen on a microphone and print every whistle detected

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use whistle_detector::audio::{list_input_devices, MicrophoneSource, MonotonicClock};
use whistle_detector::{DetectorConfig, WhistleDetector, WhistleEvent};

#[derive(Debug, Parser)]
#[command(name = "whistle-listen", about = "Detect whistles on an audio input device")]
struct Args {
    /// List input devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Input device name (default device if omitted)
    #[arg(long, env = "WHISTLE_DEVICE")]
    device: Option<String>,

    /// JSON file with detector settings; flags below override it
    #[arg(long, env = "WHISTLE_CONFIG")]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Capture buffer length in ms
    #[arg(long, default_value_t = 2000)]
    buffer_ms: u32,

    #[arg(long)]
    sample_rate: Option<u32>,

    /// Samples per analysis block (power of two)
    #[arg(long)]
    block_size: Option<usize>,

    /// Lower edge of the whistle band in Hz
    #[arg(long)]
    min_freq: Option<f32>,

    /// Upper edge of the whistle band in Hz
    #[arg(long)]
    max_freq: Option<f32>,

    /// FFT magnitude a peak must exceed
    #[arg(long)]
    min_magnitude: Option<f32>,

    /// Shortest reported whistle in ms
    #[arg(long)]
    min_duration_ms: Option<u32>,

    /// Silence tolerated inside a whistle in ms
    #[arg(long)]
    dropout_grace_ms: Option<u32>,

    /// Weight of the previous frequency estimate (0..1)
    #[arg(long)]
    smoothing: Option<f32>,

    /// Frequency jump (Hz) above which readings are not smoothed in
    #[arg(long)]
    max_jump: Option<f32>,
}

impl Args {
    fn detector_config(&self) -> Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => DetectorConfig::default(),
        };

        if let Some(v) = self.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = self.block_size {
            config.block_size = v;
        }
        if let Some(v) = self.min_freq {
            config.min_whistle_freq = v;
        }
        if let Some(v) = self.max_freq {
            config.max_whistle_freq = v;
        }
        if let Some(v) = self.min_magnitude {
            config.min_magnitude = v;
        }
        if let Some(v) = self.min_duration_ms {
            config.min_duration_ms = v;
        }
        if let Some(v) = self.dropout_grace_ms {
            config.dropout_grace_ms = v;
        }
        if let Some(v) = self.smoothing {
            config.smoothing = v;
        }
        if let Some(v) = self.max_jump {
            config.max_frequency_jump = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn print_event(event: &WhistleEvent, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(%err, "failed to encode event"),
        }
    } else {
        println!(
            "whistle: {:.1} Hz for {} ms",
            event.frequency_hz, event.duration_ms
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list_devices {
        for device in list_input_devices()? {
            println!(
                "{} ({} Hz, {} ch)",
                device.name, device.sample_rate, device.channels
            );
        }
        return Ok(());
    }

    let config = args.detector_config()?;
    let capacity = (config.sample_rate as usize * args.buffer_ms as usize / 1000)
        .max(config.block_size * 2);

    let source = match &args.device {
        Some(name) => MicrophoneSource::from_device_name(name, config.sample_rate, capacity),
        None => MicrophoneSource::from_default_device(config.sample_rate, capacity),
    }
    .context("opening audio input")?;
    source.start().context("starting audio input")?;

    let device = source.device_info();
    tracing::info!(
        device = %device.name,
        channels = device.channels,
        "listening for whistles"
    );

    let mut detector = WhistleDetector::new(config, source, MonotonicClock::new())?;
    let json = args.json;
    detector.set_callback(move |event: &WhistleEvent| print_event(event, json));

    detector.run().context("whistle detection stopped")?;
    Ok(())
}
