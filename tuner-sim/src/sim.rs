//! # Simulated Instrument
//!
//! Stand-ins for the board: a plucked string feeding the ADC, a fixed
//! selector switch and a bank of LEDs that logs every change.

use log::info;
use std::collections::BTreeMap;

use tuner_core::hal::{AnalogInput, DigitalInputs, DigitalOutputs, PinId};

/// Full scale of the simulated 12-bit converter.
const ADC_MAX: f32 = 4095.0;
/// Mid-scale bias of the analog front end.
const ADC_BIAS: f32 = 2048.0;
/// Relative level of the second harmonic.
const OVERTONE_LEVEL: f32 = 0.3;

/// A string whose pitch moves to the next step of `glide` every buffer,
/// sampled by a 12-bit ADC.
#[cfg_attr(feature = "mic", allow(dead_code))]
pub struct SimulatedString {
    glide: Vec<f32>,
    sample_rate: f32,
    samples_per_step: usize,
    taken: usize,
    phase: f32,
}

#[cfg_attr(feature = "mic", allow(dead_code))]
impl SimulatedString {
    pub fn new(glide: Vec<f32>, sample_rate: f32, samples_per_step: usize) -> Self {
        Self {
            glide,
            sample_rate,
            samples_per_step,
            taken: 0,
            phase: 0.0,
        }
    }

    /// Frequency currently being played.
    pub fn frequency(&self) -> f32 {
        if self.glide.is_empty() {
            return 0.0;
        }
        let step = self.taken / self.samples_per_step.max(1);
        self.glide[step % self.glide.len()]
    }
}

impl AnalogInput for SimulatedString {
    fn read_sample(&mut self) -> f32 {
        let freq = self.frequency();
        self.phase = (self.phase + freq / self.sample_rate).fract();
        self.taken += 1;

        let angle = 2.0 * std::f32::consts::PI * self.phase;
        let signal = (angle.sin() + OVERTONE_LEVEL * (2.0 * angle).sin()) / (1.0 + OVERTONE_LEVEL);
        (ADC_BIAS + 1500.0 * signal).round().clamp(0.0, ADC_MAX)
    }
}

/// Selector switches held in a fixed position.
#[derive(Debug, Clone)]
pub struct FixedSwitches {
    active: Vec<PinId>,
}

impl FixedSwitches {
    pub fn new(active: Vec<PinId>) -> Self {
        Self { active }
    }
}

impl DigitalInputs for FixedSwitches {
    fn read_pin(&mut self, pin: PinId) -> bool {
        self.active.contains(&pin)
    }
}

/// LEDs that log when they change.
#[derive(Debug, Default)]
pub struct LedPanel {
    levels: BTreeMap<PinId, bool>,
}

impl DigitalOutputs for LedPanel {
    fn write_pin(&mut self, pin: PinId, level: bool) {
        let previous = self.levels.insert(pin, level);
        if previous != Some(level) {
            info!("[LED] GPIO {} {}", pin.0, if level { "on" } else { "off" });
        }
    }
}
