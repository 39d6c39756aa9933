//! # Hardware Collaborators
//!
//! The narrow interfaces through which the tuner reaches the platform: one
//! analog input, a periodic timer, six selector inputs and three indicator
//! outputs. Register-level drivers live behind these traits; the core never
//! touches hardware directly.

use serde::Serialize;
use std::time::Duration;

use crate::error::TunerError;

/// A GPIO pin number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PinId(pub u8);

/// A single-channel analog-to-digital converter.
pub trait AnalogInput {
    /// Performs one blocking conversion of the current input voltage.
    fn read_sample(&mut self) -> f32;
}

/// Polled, active-high discrete inputs.
pub trait DigitalInputs {
    fn read_pin(&mut self, pin: PinId) -> bool;
}

/// Active-high discrete outputs.
pub trait DigitalOutputs {
    fn write_pin(&mut self, pin: PinId, level: bool);
}

/// What a tick handler asks of its timer after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Keep firing at the configured period.
    Continue,
    /// Stop firing until the timer is resumed.
    Cancel,
}

/// Callback run once per timer period.
pub type TickHandler = Box<dyn FnMut() -> TickControl + Send + 'static>;

/// A repeating timer that calls its handler once per period.
///
/// A handler never runs concurrently with itself. Returning
/// [`TickControl::Cancel`] from the handler pauses the timer from within the
/// callback; [`PeriodicTimer::resume`] starts it again with the same handler.
pub trait PeriodicTimer {
    fn schedule(&mut self, period: Duration, handler: TickHandler) -> Result<(), TunerError>;

    fn resume(&mut self);
}
