//! # Control Loop
//!
//! Sequences one analysis cycle per completed sample buffer:
//!
//! ```text
//! Sampling -> Analyzing -> Deciding -> Indicating -> Sampling ...
//! ```
//!
//! The loop owns every piece of mutable state (analyzer scratch, current
//! target, indicator outputs, the read side of the sampler). The write side
//! lives in the timer's tick handler and only ever talks to the loop through
//! the [`SamplerLink`].

use log::{debug, error, info};
use serde::Serialize;
use std::thread;

use crate::config::TunerConfig;
use crate::error::TunerError;
use crate::fft::{SpectralAnalyzer, SpectralPeak};
use crate::hal::{AnalogInput, DigitalInputs, DigitalOutputs, PeriodicTimer};
use crate::indicator::IndicatorDriver;
use crate::sampler::{self, SampleBuffer, Sampler, SamplerLink};
use crate::tuning::{self, IndicatorState, Pitch, PitchTable, TargetSelector};

/// Phase of the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Sampling,
    Analyzing,
    Deciding,
    Indicating,
}

/// Everything decided in one cycle, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub peak_bin: usize,
    pub measured_hz: f32,
    pub target: Pitch,
    pub target_hz: f32,
    pub cents: f32,
    pub nearest_note: Option<String>,
    pub state: IndicatorState,
}

pub struct ControlLoop<T, I, O> {
    config: TunerConfig,
    analyzer: SpectralAnalyzer,
    selector: TargetSelector,
    indicators: IndicatorDriver<O>,
    inputs: I,
    timer: T,
    link: SamplerLink,
    state: LoopState,
    cycles: u64,
}

impl<T, I, O> ControlLoop<T, I, O>
where
    T: PeriodicTimer,
    I: DigitalInputs,
    O: DigitalOutputs,
{
    /// Plans the analyzer and assembles the loop around an existing sampler
    /// link. Sampling is not started.
    ///
    /// # Errors
    /// [`TunerError::UnsupportedLength`] if the FFT cannot be planned for the
    /// configured sample count. This is the one fatal condition of the device.
    pub fn new(
        config: TunerConfig,
        table: PitchTable,
        link: SamplerLink,
        timer: T,
        inputs: I,
        outputs: O,
    ) -> Result<Self, TunerError> {
        let analyzer = SpectralAnalyzer::new(config.sample_count, config.sample_rate_hz())?;
        let selector = TargetSelector::new(table, config.default_pitch);
        let indicators = IndicatorDriver::new(outputs, config.indicator_pins);

        Ok(Self {
            config,
            analyzer,
            selector,
            indicators,
            inputs,
            timer,
            link,
            state: LoopState::Sampling,
            cycles: 0,
        })
    }

    /// Builds the sampler for `input` together with the loop that consumes
    /// it, and starts the sampling timer.
    pub fn start<A>(
        config: TunerConfig,
        table: PitchTable,
        input: A,
        timer: T,
        inputs: I,
        outputs: O,
    ) -> Result<Self, TunerError>
    where
        A: AnalogInput + Send + 'static,
    {
        let (sampler, link) = sampler::channel(input, config.sample_count);
        let period = config.sample_period;
        // The FFT is planned before the first tick, so a bad length never samples.
        let mut control = Self::new(config, table, link, timer, inputs, outputs)?;
        Sampler::start(sampler, &mut control.timer, period)?;
        info!("Sampling every {period:?}");
        Ok(control)
    }

    /// Waits for the next full buffer, processes it and re-arms the sampler.
    pub fn run_cycle(&mut self) -> Result<CycleReport, TunerError> {
        self.state = LoopState::Sampling;
        let buffer = self.link.recv()?;

        info!("Sampling finished");
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }

        let report = self.process_buffer(&buffer);

        // Last step: the sampler may write again only after this.
        self.state = LoopState::Sampling;
        self.link.rearm(buffer, &mut self.timer)?;
        report
    }

    /// Analyzes one buffer, decides, and drives the indicators. Does not touch
    /// the sampler.
    pub fn process_buffer(&mut self, buffer: &SampleBuffer) -> Result<CycleReport, TunerError> {
        self.state = LoopState::Analyzing;
        let peak = self.analyzer.analyze(buffer)?;
        info!("FFT finished");
        debug!("Peak at bin {} ({:.1})", peak.bin, peak.magnitude);

        self.state = LoopState::Deciding;
        let target = self.selector.select(&mut self.inputs);
        let report = self.decide(peak, target);

        self.state = LoopState::Indicating;
        self.indicators.apply(report.state);

        info!("Measured frequency: {:.2} Hz", report.measured_hz);
        info!("Target frequency: {:.2} Hz ({})", report.target_hz, report.target);
        debug!(
            "Cycle {}: {:+.1} cents, nearest {}, {:?}",
            report.cycle,
            report.cents,
            report.nearest_note.as_deref().unwrap_or("-"),
            report.state
        );
        Ok(report)
    }

    fn decide(&mut self, peak: SpectralPeak, target: Pitch) -> CycleReport {
        self.cycles += 1;
        let target_hz = target.frequency();
        CycleReport {
            cycle: self.cycles,
            peak_bin: peak.bin,
            measured_hz: peak.frequency,
            target,
            target_hz,
            cents: tuning::calculate_cents_deviation(peak.frequency, target_hz),
            nearest_note: tuning::nearest_note(peak.frequency).map(|n| n.name.clone()),
            state: tuning::classify(peak.frequency, target_hz, self.config.tolerance_hz),
        }
    }

    /// Runs cycles forever. Returns only if the sampler side goes away.
    pub fn run(&mut self) -> Result<(), TunerError> {
        self.run_with(|_| {})
    }

    /// Like [`ControlLoop::run`], calling `on_cycle` after every cycle.
    pub fn run_with<F: FnMut(&CycleReport)>(&mut self, mut on_cycle: F) -> Result<(), TunerError> {
        loop {
            let report = self.run_cycle()?;
            on_cycle(&report);
        }
    }

    /// Current phase of the cycle.
    ///
    /// # Returns
    /// * `LoopState::Sampling` between cycles, otherwise the phase last entered
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The indicator outputs, as last driven.
    pub fn outputs(&self) -> &O {
        self.indicators.outputs()
    }
}

/// Reports a fatal error once and stops the device for good.
pub fn halt(err: &TunerError) -> ! {
    error!("{err}");
    loop {
        thread::park();
    }
}
