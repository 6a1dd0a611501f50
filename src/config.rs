//! Application-wide constants and runtime configuration.
//!
//! All hardware pin assignments, timing parameters, and screen settings
//! live here so they can be tuned in one place. `PanelConfig::from_env`
//! layers `RACKPANEL_*` environment overrides on top of the defaults.

use core::str::FromStr;

use embassy_time::Duration;
use log::warn;

use crate::indicator::{Color, NamedColor};

// GPIO pin assignments (BCM numbering on /dev/gpiochip0)
//
//   Button        → GPIO20 (to ground, pulled up by the board)
//   LED red       → GPIO17
//   LED green     → GPIO22
//   LED blue      → GPIO27
//   OLED SDA/SCL  → /dev/i2c-1

/// GPIO character device holding every line we use.
pub const GPIO_CHIP: &str = "/dev/gpiochip0";

/// Consumer label reported to the kernel for requested lines.
pub const GPIO_CONSUMER: &str = "rackpanel";

/// Button line offset.
pub const BUTTON_PIN: u32 = 20;

/// RGB LED line offsets.
pub const LED_RED_PIN: u32 = 17;
pub const LED_GREEN_PIN: u32 = 22;
pub const LED_BLUE_PIN: u32 = 27;

/// Software PWM frequency for the RGB LED (Hz).
pub const LED_PWM_FREQ_HZ: u32 = 100;

// Button

/// Raw level must stay stable this long before a change is accepted (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 200;

/// Interval between hold notifications while the button stays down (ms).
pub const BUTTON_HOLD_INTERVAL_MS: u64 = 1000;

/// Keep emitting hold notifications for as long as the button is held.
pub const BUTTON_HOLD_REPEATS: bool = true;

/// Sampling period of the edge worker, debounce watch and hold loop (ms).
pub const BUTTON_POLL_MS: u64 = 10;

/// Sampling period of `wait_for_press` / `wait_for_release` (ms).
pub const BUTTON_WAIT_POLL_MS: u64 = 20;

// Display (SSD1306 OLED)

/// I²C bus device node.
pub const OLED_I2C_BUS: &str = "/dev/i2c-1";

/// Panel geometry.
pub const OLED_WIDTH: u32 = 128;
pub const OLED_HEIGHT: u32 = 32;

// Screen orchestration

/// Foreground tick period (seconds).
pub const TICK_SECS: u64 = 1;

/// Idle time before the OLED is powered off (seconds).
pub const DISPLAY_OFF_TIMEOUT_SECS: u64 = 5 * 60;

/// Idle time before a non-home screen returns to the home screen (seconds).
pub const HOME_RESET_TIMEOUT_SECS: u64 = 60;

/// Hold time on the restart screen before the board reboots (seconds).
pub const RESTART_HOLD_SECS: u64 = 5;

/// Hold time on the shutdown screen before the board powers down (seconds).
pub const SHUTDOWN_HOLD_SECS: u64 = 10;

/// How long a privileged-action confirmation stays on screen before the
/// command takes effect (ms).
pub const CONFIRM_PAUSE_MS: u64 = 1000;

/// Self-test steps wait this long for a release before moving on (seconds).
pub const SELF_TEST_STEP_SECS: u64 = 5;

/// Button timing and behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonConfig {
    pub channel: u32,
    pub debounce: Duration,
    pub hold_interval: Duration,
    pub hold_repeats: bool,
    pub poll: Duration,
    pub wait_poll: Duration,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            channel: BUTTON_PIN,
            debounce: Duration::from_millis(BUTTON_DEBOUNCE_MS),
            hold_interval: Duration::from_millis(BUTTON_HOLD_INTERVAL_MS),
            hold_repeats: BUTTON_HOLD_REPEATS,
            poll: Duration::from_millis(BUTTON_POLL_MS),
            wait_poll: Duration::from_millis(BUTTON_WAIT_POLL_MS),
        }
    }
}

/// Timeouts and colours used by the screen orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelConfig {
    pub button: ButtonConfig,
    pub led_pins: [u32; 3],
    pub tick: Duration,
    pub display_off_timeout: Duration,
    pub home_reset_timeout: Duration,
    pub restart_hold: Duration,
    pub shutdown_hold: Duration,
    pub confirm_pause: Duration,
    pub info_color: Color,
    pub restart_color: Color,
    pub shutdown_color: Color,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            button: ButtonConfig::default(),
            led_pins: [LED_RED_PIN, LED_GREEN_PIN, LED_BLUE_PIN],
            tick: Duration::from_secs(TICK_SECS),
            display_off_timeout: Duration::from_secs(DISPLAY_OFF_TIMEOUT_SECS),
            home_reset_timeout: Duration::from_secs(HOME_RESET_TIMEOUT_SECS),
            restart_hold: Duration::from_secs(RESTART_HOLD_SECS),
            shutdown_hold: Duration::from_secs(SHUTDOWN_HOLD_SECS),
            confirm_pause: Duration::from_millis(CONFIRM_PAUSE_MS),
            info_color: Color::Named(NamedColor::Green),
            restart_color: Color::Named(NamedColor::Yellow),
            shutdown_color: Color::Named(NamedColor::Orange),
        }
    }
}

impl PanelConfig {
    /// Defaults with `RACKPANEL_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults with overrides taken from `lookup`. Unparsable values and
    /// zero durations are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        let secs = |name: &str, default: Duration| {
            nonzero(&lookup, name).map_or(default, Duration::from_secs)
        };
        let millis = |name: &str, default: Duration| {
            nonzero(&lookup, name).map_or(default, Duration::from_millis)
        };

        cfg.button.channel = parsed(&lookup, "RACKPANEL_BUTTON_PIN").unwrap_or(cfg.button.channel);
        cfg.button.debounce = millis("RACKPANEL_DEBOUNCE_MS", cfg.button.debounce);
        cfg.button.hold_interval = millis("RACKPANEL_HOLD_INTERVAL_MS", cfg.button.hold_interval);
        cfg.led_pins[0] = parsed(&lookup, "RACKPANEL_LED_RED_PIN").unwrap_or(cfg.led_pins[0]);
        cfg.led_pins[1] = parsed(&lookup, "RACKPANEL_LED_GREEN_PIN").unwrap_or(cfg.led_pins[1]);
        cfg.led_pins[2] = parsed(&lookup, "RACKPANEL_LED_BLUE_PIN").unwrap_or(cfg.led_pins[2]);
        cfg.display_off_timeout = secs("RACKPANEL_DISPLAY_TIMEOUT_SECS", cfg.display_off_timeout);
        cfg.home_reset_timeout = secs("RACKPANEL_HOME_TIMEOUT_SECS", cfg.home_reset_timeout);
        cfg.restart_hold = secs("RACKPANEL_RESTART_HOLD_SECS", cfg.restart_hold);
        cfg.shutdown_hold = secs("RACKPANEL_SHUTDOWN_HOLD_SECS", cfg.shutdown_hold);
        cfg.info_color = parsed(&lookup, "RACKPANEL_INFO_COLOR").unwrap_or(cfg.info_color);
        cfg.restart_color = parsed(&lookup, "RACKPANEL_RESTART_COLOR").unwrap_or(cfg.restart_color);
        cfg.shutdown_color =
            parsed(&lookup, "RACKPANEL_SHUTDOWN_COLOR").unwrap_or(cfg.shutdown_color);

        cfg
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Config: ignoring {}={:?} ({})", name, raw, e);
            None
        }
    }
}

fn nonzero(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    match parsed::<u64>(lookup, name)? {
        0 => {
            warn!("Config: ignoring {}=0, duration must be positive", name);
            None
        }
        value => Some(value),
    }
}
