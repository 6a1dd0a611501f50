//! Rack panel controller for a Raspberry Pi: one push button, a 128×32
//! OLED and an RGB status LED.
//!
//! Everything here except `hw` is pure logic over `embedded-hal` traits
//! and a `Clock`, so it runs and is tested on the host.
//!
//! Usage: `cargo test` (host), `cargo build --release --features hardware`
//! (target binary).

// ═══════════════════════════════════════════════════════════════════════════
// Core
// ═══════════════════════════════════════════════════════════════════════════

pub mod button;
pub mod clock;
pub mod config;
pub mod error;
pub mod ui;

// ═══════════════════════════════════════════════════════════════════════════
// Collaborators
// ═══════════════════════════════════════════════════════════════════════════

pub mod actions;
pub mod indicator;
pub mod soft_pwm;
pub mod stats;

/// Linux bindings: GPIO character device lines and the SSD1306 over I²C.
#[cfg(feature = "hardware")]
pub mod hw;

pub use error::{Error, Result};
