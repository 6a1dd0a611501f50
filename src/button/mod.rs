//! Momentary push button with debouncing, hold notifications and
//! press/release/hold callbacks.
//!
//! ## Components
//!
//! - **Debouncer**: deadline-based stability watch on the raw level
//! - **HoldTimer**: periodic notifications while the button stays down
//! - **EdgeWorker**: the single context that owns the line and runs both
//! - **Button**: handle for application code (callbacks, queries, waits)
//!
//! The pressed level is not configured; it is the inverse of the level
//! sampled at construction, so the button must be released at startup.

pub mod debounce;
pub mod hold;
pub mod worker;

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;
use log::{info, warn};

use crate::clock::Clock;
use crate::config::ButtonConfig;
use crate::error::{Error, Result};
use debounce::Debouncer;
use hold::HoldTimer;
pub use worker::EdgeWorker;

/// Hardware line identifier passed to every callback.
pub type Channel = u32;

/// Callback handle. Cloned out of its slot before being invoked so no lock
/// is held while user code runs.
pub type Callback = Arc<dyn Fn(Channel) + Send + Sync>;

/// Button events (after debouncing).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Release,
    Hold,
}

/// Snapshot of the confirmed button state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonState {
    pub channel: Channel,
    /// Raw level that means "pressed".
    pub pressed_level: bool,
    pub pressed: bool,
    pub last_press: Option<Instant>,
    pub last_release: Option<Instant>,
    pub debounce: Duration,
    pub hold_interval: Duration,
    pub hold_repeats: bool,
}

impl ButtonState {
    /// Raw level matching the confirmed logical state.
    pub fn confirmed_level(&self) -> bool {
        if self.pressed {
            self.pressed_level
        } else {
            !self.pressed_level
        }
    }
}

#[derive(Clone, Default)]
struct Handlers {
    press: Option<Callback>,
    release: Option<Callback>,
    hold: Option<Callback>,
}

impl Handlers {
    fn slot(&mut self, event: ButtonEvent) -> &mut Option<Callback> {
        match event {
            ButtonEvent::Press => &mut self.press,
            ButtonEvent::Release => &mut self.release,
            ButtonEvent::Hold => &mut self.hold,
        }
    }
}

/// State shared between the worker and every `Button` handle.
pub(crate) struct Shared {
    channel: Channel,
    state: Mutex<CriticalSectionRawMutex, RefCell<ButtonState>>,
    handlers: Mutex<CriticalSectionRawMutex, RefCell<Handlers>>,
}

impl Shared {
    fn state(&self) -> ButtonState {
        self.state.lock(|s| *s.borrow())
    }

    fn handler(&self, event: ButtonEvent) -> Option<Callback> {
        self.handlers.lock(|h| h.borrow_mut().slot(event).clone())
    }

    fn set_handler(&self, event: ButtonEvent, callback: Option<Callback>) {
        self.handlers.lock(|h| *h.borrow_mut().slot(event) = callback);
    }

    /// Record a confirmed raw level. Returns the transition it caused, or
    /// `None` if the level matches the current state (a repeated release
    /// is never reported twice).
    fn apply_level(&self, level: bool, now: Instant) -> Option<ButtonEvent> {
        self.state.lock(|s| {
            let mut s = s.borrow_mut();
            let pressed = level == s.pressed_level;
            if pressed == s.pressed {
                return None;
            }
            s.pressed = pressed;
            if pressed {
                s.last_press = Some(now);
                Some(ButtonEvent::Press)
            } else {
                s.last_release = Some(now);
                Some(ButtonEvent::Release)
            }
        })
    }

    /// Invoke the registered callback for `event`, if any.
    fn dispatch(&self, event: ButtonEvent) {
        if let Some(callback) = self.handler(event) {
            callback(self.channel);
        }
    }
}

/// Application-side handle to the button.
pub struct Button<C: Clock> {
    shared: Arc<Shared>,
    clock: C,
    wait_poll: Duration,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl<C: Clock> Button<C> {
    /// Build the handle and its edge worker without starting a thread.
    ///
    /// Samples the resting level of `line`; the inverse becomes the pressed
    /// level.
    pub fn new<P: InputPin>(
        mut line: P,
        clock: C,
        config: &ButtonConfig,
    ) -> Result<(Self, EdgeWorker<P, C>)> {
        let resting = line.is_high().map_err(|_| Error::LineIo {
            line: config.channel,
        })?;

        let state = ButtonState {
            channel: config.channel,
            pressed_level: !resting,
            pressed: false,
            last_press: None,
            last_release: None,
            debounce: config.debounce,
            hold_interval: config.hold_interval,
            hold_repeats: config.hold_repeats,
        };
        let shared = Arc::new(Shared {
            channel: config.channel,
            state: Mutex::new(RefCell::new(state)),
            handlers: Mutex::new(RefCell::new(Handlers::default())),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(false));

        let worker = EdgeWorker::new(
            line,
            clock.clone(),
            shared.clone(),
            Debouncer::new(config.debounce, config.poll),
            HoldTimer::new(config.hold_interval, config.hold_repeats, config.poll),
            config.poll,
            stop.clone(),
            running.clone(),
        );
        let button = Self {
            shared,
            clock,
            wait_poll: config.wait_poll,
            stop,
            running,
            worker: None,
        };
        Ok((button, worker))
    }

    /// Build the button and run its edge worker on a dedicated thread.
    pub fn spawn<P>(line: P, clock: C, config: &ButtonConfig) -> Result<Self>
    where
        P: InputPin + Send + 'static,
    {
        let (mut button, worker) = Self::new(line, clock, config)?;
        // Running from here on; the worker clears it when it exits.
        button.running.store(true, Ordering::Release);
        let handle = std::thread::Builder::new()
            .name(format!("button-{}", config.channel))
            .spawn(move || worker.run())
            .map_err(|e| {
                button.running.store(false, Ordering::Release);
                Error::LineAcquire {
                    line: config.channel,
                    reason: e.to_string(),
                }
            })?;
        button.worker = Some(handle);
        info!(
            "Button: watching line {} (pressed level {})",
            config.channel,
            if button.state().pressed_level { "high" } else { "low" }
        );
        Ok(button)
    }

    pub fn channel(&self) -> Channel {
        self.shared.channel
    }

    /// Whether the edge worker is still watching the line. Goes false once
    /// the worker stops, whether through `cleanup`, a line error or a
    /// panicking callback.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Register the press callback, replacing any previous one.
    pub fn on_press(&self, callback: impl Fn(Channel) + Send + Sync + 'static) {
        self.shared.set_handler(ButtonEvent::Press, Some(Arc::new(callback)));
    }

    /// Register the release callback, replacing any previous one.
    pub fn on_release(&self, callback: impl Fn(Channel) + Send + Sync + 'static) {
        self.shared.set_handler(ButtonEvent::Release, Some(Arc::new(callback)));
    }

    /// Register the hold callback, replacing any previous one. Hold timing
    /// follows the configured interval and repeat setting; the hold loop only
    /// runs for presses confirmed while a hold callback is registered.
    pub fn on_hold(&self, callback: impl Fn(Channel) + Send + Sync + 'static) {
        self.shared.set_handler(ButtonEvent::Hold, Some(Arc::new(callback)));
    }

    /// Remove the callback for `event`.
    pub fn clear(&self, event: ButtonEvent) {
        self.shared.set_handler(event, None);
    }

    pub fn state(&self) -> ButtonState {
        self.shared.state()
    }

    /// Confirmed logical state. Never touches the line.
    pub fn is_pressed(&self) -> bool {
        self.shared.state().pressed
    }

    /// Time since the last press while pressed, zero otherwise.
    pub fn held_duration(&self) -> Duration {
        let state = self.shared.state();
        match (state.pressed, state.last_press) {
            (true, Some(at)) => self.clock.now().saturating_duration_since(at),
            _ => Duration::from_ticks(0),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held_duration() > Duration::from_ticks(0)
    }

    /// Block until a press is confirmed after this call starts, or until
    /// `timeout` elapses. Returns whether the press happened.
    pub fn wait_for_press(&self, timeout: Option<Duration>) -> bool {
        self.wait_for(timeout, |s| s.last_press)
    }

    /// Block until a release is confirmed after this call starts, or until
    /// `timeout` elapses. Returns whether the release happened.
    pub fn wait_for_release(&self, timeout: Option<Duration>) -> bool {
        self.wait_for(timeout, |s| s.last_release)
    }

    fn wait_for(&self, timeout: Option<Duration>, stamp: impl Fn(&ButtonState) -> Option<Instant>) -> bool {
        let start = self.clock.now();
        loop {
            if stamp(&self.shared.state()).is_some_and(|at| at >= start) {
                return true;
            }
            let elapsed = self.clock.now().saturating_duration_since(start);
            let nap = match timeout {
                Some(limit) if elapsed >= limit => return false,
                Some(limit) => self.wait_poll.min(limit - elapsed),
                None => self.wait_poll,
            };
            self.clock.sleep(nap);
        }
    }

    /// Stop the edge worker and release the line. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.stop.store(true, Ordering::Release);
        let Some(handle) = self.worker.take() else {
            return;
        };
        if handle.thread().id() == std::thread::current().id() {
            // Called from a callback; the worker exits after it returns.
            return;
        }
        if handle.join().is_err() {
            warn!("Button: worker on line {} panicked", self.shared.channel);
        } else {
            info!("Button: line {} released", self.shared.channel);
        }
    }
}

impl<C: Clock> Drop for Button<C> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
