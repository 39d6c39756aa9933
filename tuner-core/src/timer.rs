//! # Host Periodic Timer
//!
//! A [`PeriodicTimer`] backed by a dedicated thread, standing in for the
//! repeating hardware timer when the loop runs on a desktop.
//!
//! The thread fires the handler on a fixed-rate schedule. When the handler
//! returns [`TickControl::Cancel`] the thread parks on its control channel
//! until [`PeriodicTimer::resume`] is called. Dropping the timer stops and
//! joins the thread.

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use log::{debug, warn};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::TunerError;
use crate::hal::{PeriodicTimer, TickControl, TickHandler};

#[derive(Debug, Default)]
pub struct ThreadTimer {
    control: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the worker thread, if any, and waits for it to finish.
    pub fn shutdown(&mut self) {
        // Closing the channel is the stop signal.
        self.control = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Timer thread panicked");
            }
        }
    }
}

impl PeriodicTimer for ThreadTimer {
    fn schedule(&mut self, period: Duration, handler: TickHandler) -> Result<(), TunerError> {
        self.shutdown();

        let (control_tx, control_rx) = unbounded();
        let worker = thread::Builder::new()
            .name("tuner-timer".into())
            .spawn(move || run_timer(period, handler, control_rx))?;

        self.control = Some(control_tx);
        self.worker = Some(worker);
        debug!("Timer scheduled every {period:?}");
        Ok(())
    }

    fn resume(&mut self) {
        match &self.control {
            Some(control) => {
                if control.send(()).is_err() {
                    warn!("Timer thread is gone; resume ignored");
                }
            }
            None => warn!("Timer resumed before being scheduled"),
        }
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer(period: Duration, mut handler: TickHandler, control: Receiver<()>) {
    let mut next = Instant::now() + period;
    loop {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        next += period;

        match control.try_recv() {
            Err(TryRecvError::Disconnected) => return,
            // A resume while already running changes nothing.
            Ok(()) | Err(TryRecvError::Empty) => {}
        }

        if handler() == TickControl::Cancel {
            // Paused until resumed or dropped.
            if control.recv().is_err() {
                return;
            }
            next = Instant::now() + period;
        }
    }
}
