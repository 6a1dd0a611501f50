//! Unified error type for rackpanel.
//!
//! Variants carry only what the log line needs. Hardware errors are
//! flattened to their message so the enum stays independent of the
//! concrete HAL error types.

use core::fmt;

/// Top-level error type used across the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // GPIO
    /// The button or LED line could not be requested (in use, permissions).
    LineAcquire { line: u32, reason: String },

    /// Reading or driving an already acquired line failed.
    LineIo { line: u32 },

    // UI / Display
    /// I²C transaction to the display failed.
    Display,

    // Indicator
    /// A colour name outside the palette.
    UnknownColor(String),

    /// A PWM channel rejected a duty cycle.
    Pwm,

    // System
    /// A statistic could not be read on this platform.
    StatUnavailable(&'static str),

    /// A privileged command could not be launched.
    Command { program: &'static str, reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LineAcquire { line, reason } => {
                write!(f, "could not acquire GPIO line {line}: {reason}")
            }
            Error::LineIo { line } => write!(f, "I/O error on GPIO line {line}"),
            Error::Display => f.write_str("display I2C transaction failed"),
            Error::UnknownColor(name) => write!(f, "invalid colour: {name}"),
            Error::Pwm => f.write_str("PWM duty cycle rejected"),
            Error::StatUnavailable(stat) => write!(f, "{stat} unavailable"),
            Error::Command { program, reason } => {
                write!(f, "failed to launch {program}: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
