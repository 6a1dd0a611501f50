//! Monotonic time source used by every timing decision in the panel.
//!
//! The button and screen state machines never read the wall clock
//! directly; they go through [`Clock`] so the same code runs against the
//! `embassy-time` std driver on hardware and against [`ManualClock`] in
//! tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use embassy_time::{Duration, Instant};

/// Monotonic clock with a blocking sleep.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real time, backed by the `embassy-time` std driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(std::time::Duration::from_micros(duration.as_micros()));
    }
}

/// Manually advanced clock. `sleep` returns immediately after moving time
/// forward, so polling loops run to completion without real delays.
///
/// Clones share the same time line.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward.
    pub fn advance(&self, duration: Duration) {
        self.micros.fetch_add(duration.as_micros(), Ordering::SeqCst);
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
