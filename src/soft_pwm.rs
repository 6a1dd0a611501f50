//! Software PWM for the three LED lines.
//!
//! One background thread drives every line. Each period starts with all
//! non-zero channels high and drops them low in order of their on-time.
//! Duties are shared through atomics, so the channel handles never block.

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use embassy_time::Duration;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use log::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};

/// Duty resolution of every channel.
pub const STEPS: u16 = 100;

type Duties = Arc<[AtomicU16; 3]>;

/// One PWM output, handed to `RgbLed`.
#[derive(Clone)]
pub struct PwmChannel {
    duties: Duties,
    index: usize,
}

impl ErrorType for PwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for PwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        STEPS
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Infallible> {
        self.duties[self.index].store(duty.min(STEPS), Ordering::Relaxed);
        Ok(())
    }
}

/// On-time of each channel within one `period`.
pub fn on_times(duties: [u16; 3], period: Duration) -> [Duration; 3] {
    duties.map(|d| {
        let d = u64::from(d.min(STEPS));
        Duration::from_micros(period.as_micros() * d / u64::from(STEPS))
    })
}

/// Handle to the PWM thread. Dropping it stops the thread.
pub struct SoftPwm {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SoftPwm {
    /// Start driving `pins` at `freq_hz` with every duty at zero.
    pub fn start<P>(pins: [P; 3], freq_hz: u32) -> Result<(Self, [PwmChannel; 3])>
    where
        P: OutputPin + Send + 'static,
    {
        let duties: Duties = Arc::new([AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)]);
        let stop = Arc::new(AtomicBool::new(false));
        let period = Duration::from_micros(1_000_000 / u64::from(freq_hz.max(1)));

        let thread = {
            let duties = duties.clone();
            let stop = stop.clone();
            std::thread::Builder::new()
                .name("soft-pwm".into())
                .spawn(move || drive(pins, &duties, &stop, period, SystemClock))
                .map_err(|_| Error::Pwm)?
        };
        info!("PWM: {} Hz on 3 lines", freq_hz);

        let channels = [0, 1, 2].map(|index| PwmChannel {
            duties: duties.clone(),
            index,
        });
        Ok((
            Self {
                stop,
                thread: Some(thread),
            },
            channels,
        ))
    }

    /// Stop the thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("PWM: thread panicked");
            }
        }
    }
}

impl Drop for SoftPwm {
    fn drop(&mut self) {
        self.stop();
    }
}

fn drive<P: OutputPin, C: Clock>(
    mut pins: [P; 3],
    duties: &[AtomicU16; 3],
    stop: &AtomicBool,
    period: Duration,
    clock: C,
) {
    let mut failed = false;
    while !stop.load(Ordering::Acquire) {
        let current = [0, 1, 2].map(|i| duties[i].load(Ordering::Relaxed));
        run_period(&mut pins, on_times(current, period), period, &clock, &mut failed);
    }
    // Park each line at its nearest static level so the last colour
    // survives the thread.
    for (pin, duty) in pins.iter_mut().zip(duties) {
        set_level(pin, duty.load(Ordering::Relaxed) >= STEPS / 2, &mut failed);
    }
}

/// Drive one line. Only the first failure is logged.
fn set_level<P: OutputPin>(pin: &mut P, high: bool, failed: &mut bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = result {
        if !*failed {
            warn!("PWM: line write failed: {:?}", e);
            *failed = true;
        }
    }
}

/// One PWM period: raise the active lines, then lower each at its on-time.
fn run_period<P: OutputPin, C: Clock>(
    pins: &mut [P; 3],
    on: [Duration; 3],
    period: Duration,
    clock: &C,
    failed: &mut bool,
) {
    let zero = Duration::from_ticks(0);
    for (pin, time) in pins.iter_mut().zip(on) {
        set_level(pin, time > zero, failed);
    }

    let mut order = [0usize, 1, 2];
    order.sort_by_key(|&i| on[i]);

    let mut elapsed = zero;
    for i in order {
        if on[i] == zero || on[i] >= period {
            continue;
        }
        if on[i] > elapsed {
            clock.sleep(on[i] - elapsed);
            elapsed = on[i];
        }
        set_level(&mut pins[i], false, failed);
    }
    clock.sleep(period - elapsed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use embassy_time::Instant;
    use std::sync::Mutex;

    /// Output line recording `(time, level)` for each write.
    struct TracePin {
        clock: ManualClock,
        trace: Arc<Mutex<Vec<(Instant, bool)>>>,
    }

    impl embedded_hal::digital::ErrorType for TracePin {
        type Error = Infallible;
    }

    impl OutputPin for TracePin {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.trace.lock().unwrap().push((self.clock.now(), false));
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.trace.lock().unwrap().push((self.clock.now(), true));
            Ok(())
        }
    }

    #[test]
    fn on_times_scale_with_duty() {
        let period = Duration::from_millis(10);
        assert_eq!(
            on_times([0, 50, 100], period),
            [Duration::from_ticks(0), Duration::from_millis(5), period]
        );
        assert_eq!(on_times([250, 0, 0], period)[0], period);
    }

    #[test]
    fn channels_share_duties_and_clamp() {
        let duties: Duties = Arc::new([AtomicU16::new(0), AtomicU16::new(0), AtomicU16::new(0)]);
        let mut green = PwmChannel {
            duties: duties.clone(),
            index: 1,
        };
        green.set_duty_cycle_percent(40).unwrap();
        assert_eq!(duties[1].load(Ordering::Relaxed), 40);
        green.set_duty_cycle(500).unwrap();
        assert_eq!(duties[1].load(Ordering::Relaxed), STEPS);
        assert_eq!(green.max_duty_cycle(), 100);
    }

    #[test]
    fn period_drops_lines_in_on_time_order() {
        let clock = ManualClock::new();
        let traces: Vec<_> = (0..3).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
        let mut pins = [0, 1, 2].map(|i| TracePin {
            clock: clock.clone(),
            trace: traces[i].clone(),
        });
        let period = Duration::from_millis(10);

        let mut failed = false;
        run_period(&mut pins, on_times([30, 0, 100], period), period, &clock, &mut failed);
        assert!(!failed);

        let ms = Instant::from_millis;
        assert_eq!(*traces[0].lock().unwrap(), [(ms(0), true), (ms(3), false)]);
        assert_eq!(*traces[1].lock().unwrap(), [(ms(0), false)]);
        assert_eq!(*traces[2].lock().unwrap(), [(ms(0), true)]);
        assert_eq!(clock.elapsed(), period);
    }

    /// Output line whose writes always fail.
    struct DeadPin;

    impl embedded_hal::digital::ErrorType for DeadPin {
        type Error = embedded_hal::digital::ErrorKind;
    }

    impl OutputPin for DeadPin {
        fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
            Err(embedded_hal::digital::ErrorKind::Other)
        }

        fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
            Err(embedded_hal::digital::ErrorKind::Other)
        }
    }

    #[test]
    fn failed_write_is_flagged_and_the_period_still_completes() {
        let clock = ManualClock::new();
        let mut pins = [DeadPin, DeadPin, DeadPin];
        let period = Duration::from_millis(10);
        let mut failed = false;

        run_period(&mut pins, on_times([30, 60, 0], period), period, &clock, &mut failed);
        assert!(failed);
        assert_eq!(clock.elapsed(), period);

        // Later periods keep running with the flag already raised.
        run_period(&mut pins, on_times([30, 60, 0], period), period, &clock, &mut failed);
        assert_eq!(clock.elapsed(), period * 2);
    }
}
