//! Deadline-based debounce watch.
//!
//! A candidate level is accepted only after the raw line has read that
//! level continuously until `now + window`. Sampling happens every `poll`,
//! but the decision compares against the deadline, so a coarse poll period
//! adds latency without stretching the accepted window.

use embassy_time::Duration;
use embedded_hal::digital::InputPin;

use crate::clock::Clock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    window: Duration,
    poll: Duration,
}

impl Debouncer {
    pub const fn new(window: Duration, poll: Duration) -> Self {
        Self { window, poll }
    }

    /// Watch `line` until it has stayed at `target` for the whole window.
    ///
    /// Returns `Ok(false)` as soon as a sample deviates; the caller waits for
    /// the next raw change before trying again.
    pub fn confirm<P, C>(&self, line: &mut P, clock: &C, target: bool) -> Result<bool, P::Error>
    where
        P: InputPin,
        C: Clock,
    {
        let deadline = clock.now() + self.window;
        loop {
            if line.is_high()? != target {
                return Ok(false);
            }
            let now = clock.now();
            if now >= deadline {
                return Ok(true);
            }
            clock.sleep(self.poll.min(deadline - now));
        }
    }
}
