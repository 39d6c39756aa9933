//! # Microphone Analog Input
//!
//! Uses CPAL (Cross-Platform Audio Library) to stand in for the ADC: the
//! audio callback keeps the most recent sample, and every tuner tick reads
//! that value as the instantaneous input voltage. The tuner's own 2 kHz tick
//! does the decimation.

use anyhow::{Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tuner_core::hal::AnalogInput;

/// Preferred capture rate. Anything close works.
const TARGET_SAMPLE_RATE: u32 = 44100;

/// Mid-scale and span of the simulated 12-bit converter.
const ADC_BIAS: f32 = 2048.0;
const ADC_SPAN: f32 = 2047.0;

/// Latest microphone sample, scaled like a 12-bit ADC reading.
#[derive(Debug, Clone)]
pub struct MicInput {
    latest: Arc<AtomicU32>,
}

impl AnalogInput for MicInput {
    fn read_sample(&mut self) -> f32 {
        let sample = f32::from_bits(self.latest.load(Ordering::Relaxed));
        ADC_BIAS + ADC_SPAN * sample.clamp(-1.0, 1.0)
    }
}

/// Starts capture from the default input device.
///
/// The returned stream must be kept alive for as long as the input is read.
pub fn start_mic_capture() -> Result<(cpal::Stream, MicInput)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let rate = TARGET_SAMPLE_RATE
        .clamp(supported_config.min_sample_rate().0, supported_config.max_sample_rate().0);
    let config: cpal::StreamConfig = supported_config.with_sample_rate(cpal::SampleRate(rate)).into();
    let channels = config.channels as usize;
    info!("Selected sample rate: {rate} Hz, {channels} channel(s)");

    let latest = Arc::new(AtomicU32::new(0.0_f32.to_bits()));
    let writer = Arc::clone(&latest);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // First channel of the last frame.
            if let Some(frame) = data.chunks_exact(channels.max(1)).last() {
                writer.store(frame[0].to_bits(), Ordering::Relaxed);
            }
        },
        |err| error!("An error occurred on the audio stream: {err}"),
        None,
    )?;

    stream.play()?;

    Ok((stream, MicInput { latest }))
}

/// Picks an f32 configuration, mono if possible, whose rate range is closest
/// to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            let in_range = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            (c.channels() != 1, if in_range { 0 } else { min_diff.min(max_diff) })
        })
}
