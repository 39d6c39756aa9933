//! # Sampler Module
//!
//! Timer-driven capture of one analog reading per tick into a fixed-size
//! buffer. The tick handler and the control loop never share the buffer:
//! ownership moves between them over two channels.
//!
//! ## Handoff protocol
//! 1. The [`Sampler`] owns the [`SampleBuffer`] while filling it and reports
//!    each reading as [`SamplerEvent::SampleTaken`].
//! 2. When the buffer is full the sampler gives it away inside
//!    [`SamplerEvent::BufferFull`] and asks its timer to stop.
//! 3. The control loop reads the buffer, then hands it back with
//!    [`SamplerLink::rearm`], which is the only way the next fill can start.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{error, trace};

use crate::error::TunerError;
use crate::hal::{AnalogInput, PeriodicTimer, TickControl};

/// A fixed-length block of analog readings.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Creates a zeroed buffer of `len` samples.
    pub fn new(len: usize) -> Self {
        Self { samples: vec![0.0; len] }
    }

    /// Wraps already-captured samples, e.g. a synthetic signal in tests.
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }
}

/// Events emitted by the tick handler, in order.
#[derive(Debug)]
pub enum SamplerEvent {
    /// One reading was stored at `index`.
    SampleTaken { index: usize },
    /// The buffer is complete; ownership passes to the receiver.
    BufferFull(SampleBuffer),
}

/// The write side: runs inside the timer's tick handler.
pub struct Sampler<A> {
    input: A,
    buffer: Option<SampleBuffer>,
    index: usize,
    events: Sender<SamplerEvent>,
    recycled: Receiver<SampleBuffer>,
}

/// The read side, held by the control loop.
#[derive(Debug)]
pub struct SamplerLink {
    events: Receiver<SamplerEvent>,
    recycle: Sender<SampleBuffer>,
}

/// Creates a sampler with an empty buffer of `sample_count` readings and the
/// link the control loop uses to receive it.
///
/// The event channel holds a whole generation (`sample_count` sample events
/// plus the full buffer), so the tick handler never blocks on it.
pub fn channel<A: AnalogInput>(input: A, sample_count: usize) -> (Sampler<A>, SamplerLink) {
    let (event_tx, event_rx) = bounded(sample_count + 1);
    let (recycle_tx, recycle_rx) = bounded(1);

    let sampler = Sampler {
        input,
        buffer: Some(SampleBuffer::new(sample_count)),
        index: 0,
        events: event_tx,
        recycled: recycle_rx,
    };
    let link = SamplerLink {
        events: event_rx,
        recycle: recycle_tx,
    };
    (sampler, link)
}

impl<A: AnalogInput> Sampler<A> {
    /// Takes one reading. Call once per timer period.
    ///
    /// Returns [`TickControl::Cancel`] once the buffer has been handed off, and
    /// on any tick that arrives while the buffer is still with the reader.
    pub fn on_tick(&mut self) -> TickControl {
        if self.buffer.is_none() {
            match self.recycled.try_recv() {
                Ok(buffer) => self.buffer = Some(buffer),
                Err(_) => return TickControl::Cancel,
            }
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return TickControl::Cancel;
        };

        let index = self.index;
        buffer.samples[index] = self.input.read_sample();
        self.index += 1;
        // Capacity covers a full generation; a full queue only means nobody is listening.
        if let Err(TrySendError::Disconnected(_)) = self.events.try_send(SamplerEvent::SampleTaken { index }) {
            trace!("sample {index} taken with no listener");
        }

        if self.index < buffer.samples.len() {
            return TickControl::Continue;
        }

        self.index = 0;
        if let Some(full) = self.buffer.take() {
            if self.events.send(SamplerEvent::BufferFull(full)).is_err() {
                error!("Sampler: buffer completed but the control loop is gone");
            }
        }
        TickControl::Cancel
    }

    /// Whether the sampler currently owns its buffer.
    pub fn is_armed(&self) -> bool {
        self.buffer.is_some()
    }

    /// Current fill position.
    pub fn fill_index(&self) -> usize {
        self.index
    }
}

impl<A: AnalogInput + Send + 'static> Sampler<A> {
    /// Installs this sampler as the tick handler of `timer`.
    pub fn start<T: PeriodicTimer>(
        mut self,
        timer: &mut T,
        period: std::time::Duration,
    ) -> Result<(), TunerError> {
        timer.schedule(period, Box::new(move || self.on_tick()))
    }
}

impl SamplerLink {
    /// Builds a link from raw channel ends, for driving the loop with
    /// injected events.
    pub fn from_channels(events: Receiver<SamplerEvent>, recycle: Sender<SampleBuffer>) -> Self {
        Self { events, recycle }
    }

    /// Blocks until the sampler delivers a full buffer.
    pub fn recv(&self) -> Result<SampleBuffer, TunerError> {
        loop {
            match self.events.recv() {
                Ok(SamplerEvent::SampleTaken { index }) => trace!("sample {index} taken"),
                Ok(SamplerEvent::BufferFull(buffer)) => return Ok(buffer),
                Err(_) => return Err(TunerError::SamplerDisconnected),
            }
        }
    }

    /// Returns the buffer to the sampler and restarts the timer. This must be
    /// the last step of a cycle.
    pub fn rearm<T: PeriodicTimer>(&self, buffer: SampleBuffer, timer: &mut T) -> Result<(), TunerError> {
        self.recycle
            .send(buffer)
            .map_err(|_| TunerError::SamplerDisconnected)?;
        timer.resume();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts up by one per reading.
    struct Ramp(f32);

    impl AnalogInput for Ramp {
        fn read_sample(&mut self) -> f32 {
            self.0 += 1.0;
            self.0
        }
    }

    #[derive(Default)]
    struct ManualTimer {
        resumed: usize,
    }

    impl PeriodicTimer for ManualTimer {
        fn schedule(
            &mut self,
            _period: std::time::Duration,
            _handler: crate::hal::TickHandler,
        ) -> Result<(), TunerError> {
            Ok(())
        }

        fn resume(&mut self) {
            self.resumed += 1;
        }
    }

    #[test]
    fn fills_exactly_n_samples_then_cancels() {
        let (mut sampler, link) = channel(Ramp(0.0), 4);
        for _ in 0..3 {
            assert_eq!(sampler.on_tick(), TickControl::Continue);
        }
        assert_eq!(sampler.on_tick(), TickControl::Cancel);
        assert_eq!(sampler.fill_index(), 0);
        assert!(!sampler.is_armed());

        let buffer = link.recv().unwrap();
        assert_eq!(buffer.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn does_not_sample_until_rearmed() {
        let (mut sampler, link) = channel(Ramp(0.0), 2);
        sampler.on_tick();
        sampler.on_tick();
        let buffer = link.recv().unwrap();

        // A stray tick while the reader holds the buffer takes no reading.
        assert_eq!(sampler.on_tick(), TickControl::Cancel);
        assert_eq!(sampler.fill_index(), 0);

        let mut timer = ManualTimer::default();
        link.rearm(buffer, &mut timer).unwrap();
        assert_eq!(timer.resumed, 1);

        assert_eq!(sampler.on_tick(), TickControl::Continue);
        assert_eq!(sampler.on_tick(), TickControl::Cancel);
        // The stray tick did not consume a reading.
        assert_eq!(link.recv().unwrap().as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn recv_reports_disconnect() {
        let (sampler, link) = channel(Ramp(0.0), 2);
        drop(sampler);
        assert!(matches!(link.recv(), Err(TunerError::SamplerDisconnected)));
    }
}
