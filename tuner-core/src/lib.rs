// tuner-core/src/lib.rs

//! The core logic of the string tuner.
//! This crate holds the sampling/analysis pipeline, the tuning decision and
//! the indicator logic. Hardware is reached only through the traits in
//! [`hal`], so the same loop runs on the device and in tests.

pub mod config;
pub mod control;
pub mod error;
pub mod fft;
pub mod hal;
pub mod indicator;
pub mod sampler;
pub mod timer;
pub mod tuning;

pub use control::{ControlLoop, CycleReport, LoopState};
pub use error::TunerError;
pub use tuning::{IndicatorState, Pitch};
