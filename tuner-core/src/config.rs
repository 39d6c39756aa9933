//! # Build-Time Configuration
//!
//! Every tunable of the instrument is a named constant here. There is no
//! configuration file and no command line: the device is flashed with these
//! values. [`TunerConfig`] gathers them into a single value so the control
//! loop and the tests can be handed a configuration explicitly.

use serde::Serialize;
use std::time::Duration;

use crate::hal::PinId;
use crate::tuning::Pitch;

/// Number of samples per analysis buffer. Must be a power of two.
///
/// Larger buffers give finer frequency resolution but a longer cycle.
pub const SAMPLE_COUNT: usize = 2048;

/// Period of the sampling timer in microseconds (2 kHz sampling).
pub const SAMPLE_PERIOD_US: u64 = 500;

/// Sampling rate implied by [`SAMPLE_PERIOD_US`].
pub const SAMPLE_RATE_HZ: f32 = 2000.0;

/// Half-width of the in-tune band around the target frequency, in Hz.
pub const TOLERANCE_HZ: f32 = 5.0;

/// Delay between the buffer-ready event and reading the buffer, letting the
/// last analog conversion settle.
pub const SETTLE_DELAY_US: u64 = 500;

/// Target used until the first selector input is seen active.
pub const DEFAULT_PITCH: Pitch = Pitch::E2;

// Pin assignments.
pub const ANALOG_PIN: PinId = PinId(26);
pub const ADC_CHANNEL: u8 = 0;

pub const SELECT_E4_PIN: PinId = PinId(2);
pub const SELECT_B3_PIN: PinId = PinId(3);
pub const SELECT_G3_PIN: PinId = PinId(4);
pub const SELECT_D3_PIN: PinId = PinId(5);
pub const SELECT_A2_PIN: PinId = PinId(6);
pub const SELECT_E2_PIN: PinId = PinId(7);

pub const FLAT_LED_PIN: PinId = PinId(19);
pub const IN_TUNE_LED_PIN: PinId = PinId(20);
pub const SHARP_LED_PIN: PinId = PinId(21);

/// Output pins of the three indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorPins {
    pub flat: PinId,
    pub in_tune: PinId,
    pub sharp: PinId,
}

impl Default for IndicatorPins {
    fn default() -> Self {
        Self {
            flat: FLAT_LED_PIN,
            in_tune: IN_TUNE_LED_PIN,
            sharp: SHARP_LED_PIN,
        }
    }
}

/// The full configuration of one tuner instance.
#[derive(Debug, Clone, Serialize)]
pub struct TunerConfig {
    pub sample_count: usize,
    #[serde(serialize_with = "serialize_micros")]
    pub sample_period: Duration,
    #[serde(serialize_with = "serialize_micros")]
    pub settle_delay: Duration,
    pub tolerance_hz: f32,
    pub default_pitch: Pitch,
    pub indicator_pins: IndicatorPins,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            sample_period: Duration::from_micros(SAMPLE_PERIOD_US),
            settle_delay: Duration::from_micros(SETTLE_DELAY_US),
            tolerance_hz: TOLERANCE_HZ,
            default_pitch: DEFAULT_PITCH,
            indicator_pins: IndicatorPins::default(),
        }
    }
}

impl TunerConfig {
    /// Effective sampling rate in Hz, derived from the tick period.
    pub fn sample_rate_hz(&self) -> f32 {
        1_000_000.0 / self.sample_period.as_micros() as f32
    }

    /// Width of one spectrum bin in Hz (`sample_rate / N`).
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz() / self.sample_count as f32
    }
}

fn serialize_micros<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_micros() as u64)
}
