//! Hold notifications while the button stays down.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

use crate::clock::Clock;

/// Emits a notification every `interval` while the line stays at the
/// pressed level. Intervals shorter than `poll` are paced at `poll`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoldTimer {
    interval: Duration,
    repeats: bool,
    poll: Duration,
}

impl HoldTimer {
    pub const fn new(interval: Duration, repeats: bool, poll: Duration) -> Self {
        let interval = if interval.as_ticks() < poll.as_ticks() { poll } else { interval };
        Self {
            interval,
            repeats,
            poll,
        }
    }

    /// Run one hold episode starting from the confirmed press at `pressed_at`.
    ///
    /// Returns the number of notifications emitted. The loop ends within one
    /// poll period of the raw level leaving `pressed_level`, after the first
    /// notification when repeats are disabled, or when `stop` is raised.
    pub fn run<P, C>(
        &self,
        line: &mut P,
        clock: &C,
        pressed_level: bool,
        pressed_at: Instant,
        stop: &AtomicBool,
        mut notify: impl FnMut(),
    ) -> Result<u32, P::Error>
    where
        P: InputPin,
        C: Clock,
    {
        let mut last = pressed_at;
        let mut count = 0;

        loop {
            if stop.load(Ordering::Acquire) || line.is_high()? != pressed_level {
                return Ok(count);
            }

            let now = clock.now();
            let due = last + self.interval;
            if now >= due {
                notify();
                count += 1;
                if !self.repeats {
                    return Ok(count);
                }
                last = now;
                continue;
            }

            clock.sleep(self.poll.min(due - now));
        }
    }
}
