//! # String Tuner - Host Simulation
//!
//! Runs the tuner's control loop on a desktop: a thread timer replaces the
//! hardware timer, the LEDs are log lines, and the analog input is either a
//! simulated string or, with the `mic` feature, the default microphone.
//!
//! The selector is fixed on A2 and the simulated string glides through the
//! A2 band so that all three indicators light in turn.

#[cfg(feature = "mic")]
mod mic;
mod sim;

use anyhow::Result;
use log::{Level, debug, info, log_enabled};

use tuner_core::config::{self, TunerConfig};
use tuner_core::control::{self, ControlLoop};
use tuner_core::hal::AnalogInput;
use tuner_core::timer::ThreadTimer;
use tuner_core::tuning::STANDARD_TABLE;
use tuner_core::{CycleReport, TunerError};

use sim::{FixedSwitches, LedPanel};

/// Pitch steps of the simulated string, one per buffer.
#[cfg(not(feature = "mic"))]
const GLIDE_HZ: [f32; 7] = [100.0, 104.0, 108.0, 110.0, 112.0, 116.0, 120.0];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = TunerConfig::default();
    info!("[MAIN] Starting tuner simulation...");
    info!("[MAIN] Configuration: {}", serde_json::to_string(&config)?);
    info!(
        "[MAIN] Analog input on GPIO {} (ADC {}), selector fixed on GPIO {}",
        config::ANALOG_PIN.0,
        config::ADC_CHANNEL,
        config::SELECT_A2_PIN.0
    );
    info!("[MAIN] Frequency resolution: {:.3} Hz per bin", config.bin_width_hz());

    #[cfg(feature = "mic")]
    let (_stream, input) = mic::start_mic_capture()?;
    #[cfg(not(feature = "mic"))]
    let input = sim::SimulatedString::new(GLIDE_HZ.to_vec(), config.sample_rate_hz(), config.sample_count);

    run(config, input)
}

fn run<A: AnalogInput + Send + 'static>(config: TunerConfig, input: A) -> Result<()> {
    let switches = FixedSwitches::new(vec![config::SELECT_A2_PIN]);
    let started = ControlLoop::start(
        config,
        STANDARD_TABLE.clone(),
        input,
        ThreadTimer::new(),
        switches,
        LedPanel::default(),
    );
    let mut control = match started {
        Ok(control) => control,
        Err(err @ TunerError::UnsupportedLength { .. }) => control::halt(&err),
        Err(err) => return Err(err.into()),
    };

    // Only returns if the timer thread dies.
    control.run_with(log_report)?;
    Ok(())
}

fn log_report(report: &CycleReport) {
    info!("[MAIN] Cycle {} complete: {:?}", report.cycle, report.state);
    if log_enabled!(Level::Debug) {
        match serde_json::to_string(report) {
            Ok(json) => debug!("{json}"),
            Err(err) => debug!("Report not serializable: {err}"),
        }
    }
}
