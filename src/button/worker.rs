//! The edge-notification context.
//!
//! One worker owns the button line. It samples the raw level every poll
//! period; whenever the raw level disagrees with the confirmed level it
//! runs a debounce watch, applies the transition and dispatches callbacks.
//! A confirmed press also runs the hold loop on this same context, so
//! callbacks for one episode always arrive as press → holds → release.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use embassy_time::Duration;
use embedded_hal::digital::InputPin;
use log::{debug, error};

use super::debounce::Debouncer;
use super::hold::HoldTimer;
use super::{ButtonEvent, Shared};
use crate::clock::Clock;
use crate::error::{Error, Result};

pub struct EdgeWorker<P, C> {
    line: P,
    clock: C,
    shared: Arc<Shared>,
    debouncer: Debouncer,
    hold: HoldTimer,
    poll: Duration,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

/// Clears the running flag when the worker leaves `run`, including by
/// unwinding out of a panicking callback.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<P, C> EdgeWorker<P, C>
where
    P: InputPin,
    C: Clock,
{
    pub(super) fn new(
        line: P,
        clock: C,
        shared: Arc<Shared>,
        debouncer: Debouncer,
        hold: HoldTimer,
        poll: Duration,
        stop: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            line,
            clock,
            shared,
            debouncer,
            hold,
            poll,
            stop,
            running,
        }
    }

    /// Sample the line once and process a level change if there is one.
    ///
    /// Returns the confirmed transition, if any. Noise that does not survive
    /// the debounce window returns `Ok(None)`.
    pub fn poll_once(&mut self) -> Result<Option<ButtonEvent>> {
        let channel = self.shared.channel;
        let raw = self.line.is_high().map_err(|_| Error::LineIo { line: channel })?;
        if raw == self.shared.state().confirmed_level() {
            return Ok(None);
        }

        let stable = self
            .debouncer
            .confirm(&mut self.line, &self.clock, raw)
            .map_err(|_| Error::LineIo { line: channel })?;
        if !stable {
            return Ok(None);
        }

        let now = self.clock.now();
        let Some(event) = self.shared.apply_level(raw, now) else {
            return Ok(None);
        };
        debug!("Button: {:?} on line {}", event, channel);
        self.shared.dispatch(event);

        if event == ButtonEvent::Press && self.shared.handler(ButtonEvent::Hold).is_some() {
            let shared = &self.shared;
            let holds = self
                .hold
                .run(&mut self.line, &self.clock, raw, now, &self.stop, || {
                    shared.dispatch(ButtonEvent::Hold)
                })
                .map_err(|_| Error::LineIo { line: channel })?;
            debug!("Button: hold episode ended after {} notifications", holds);
        }

        Ok(Some(event))
    }

    /// Poll until the stop flag is raised or the line fails. Dropping the
    /// worker on return releases the line. The button reports the worker as
    /// running until this returns or unwinds.
    pub fn run(mut self) {
        self.running.store(true, Ordering::Release);
        let _running = RunningGuard(self.running.clone());
        while !self.stop.load(Ordering::Acquire) {
            if let Err(e) = self.poll_once() {
                error!("Button: worker stopped: {}", e);
                break;
            }
            self.clock.sleep(self.poll);
        }
        debug!("Button: releasing line {}", self.shared.channel);
    }
}
