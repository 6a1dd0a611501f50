//! User interface subsystem - OLED text screens driven by one button.
//!
//! The orchestrator keeps the active screen, reacts to button callbacks
//! and is ticked once a second by the main loop to render, power the
//! display down when idle, and fall back to the home screen.
//!
//! ## Components
//!
//! - **Display**: line layout and the `TextDisplay` seam (SSD1306 128×32)
//! - **Screens**: the fixed info / restart / shutdown sequence
//! - **Idle logic**: pure per-tick power and home-reset decision
//! - **Orchestrator**: the screen state machine
//! - **Self-test**: interactive hardware check

pub mod display;
pub mod idle_logic;
pub mod orchestrator;
pub mod screens;

pub use idle_logic::TickOutcome;
pub use orchestrator::{Orchestrator, OrchestratorState, Tick};
pub use screens::{default_screens, ScreenDescriptor, Screens};
