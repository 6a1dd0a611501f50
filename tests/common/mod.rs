//! Shared fixtures: a scripted button line and recording collaborators.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType, InputPin};

use rackpanel::actions::{PrivilegedAction, SystemActions};
use rackpanel::button::{Button, ButtonEvent, EdgeWorker};
use rackpanel::clock::{Clock, ManualClock};
use rackpanel::config::{ButtonConfig, PanelConfig};
use rackpanel::error::{Error, Result};
use rackpanel::indicator::{Color, Indicator};
use rackpanel::stats::StatsSource;
use rackpanel::ui::display::{Line, TextDisplay};
use rackpanel::ui::{default_screens, Orchestrator};

/// Active-low button line (rests high) following `(at_ms, pressed)` changes
/// on a `ManualClock`.
pub struct ScriptedLine {
    clock: ManualClock,
    changes: Vec<(u64, bool)>,
}

impl ScriptedLine {
    pub fn new(clock: &ManualClock, changes: &[(u64, bool)]) -> Self {
        Self {
            clock: clock.clone(),
            changes: changes.to_vec(),
        }
    }
}

impl ErrorType for ScriptedLine {
    type Error = Infallible;
}

impl InputPin for ScriptedLine {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        let now = self.clock.now();
        let pressed = self
            .changes
            .iter()
            .take_while(|(at, _)| Instant::from_millis(*at) <= now)
            .last()
            .is_some_and(|(_, pressed)| *pressed);
        Ok(!pressed)
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// Press at `start + i * period` and release `down_ms` later, `n` times.
pub fn clicks(n: u64, start_ms: u64, period_ms: u64, down_ms: u64) -> Vec<(u64, bool)> {
    (0..n)
        .flat_map(|i| {
            let at = start_ms + i * period_ms;
            [(at, true), (at + down_ms, false)]
        })
        .collect()
}

#[derive(Default)]
pub struct Panel {
    pub powered: bool,
    pub frames: Vec<Vec<String>>,
}

#[derive(Clone)]
pub struct FakeDisplay(pub Arc<Mutex<Panel>>);

impl FakeDisplay {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Panel {
            powered: true,
            frames: Vec::new(),
        })))
    }

    pub fn last(&self) -> Vec<String> {
        self.0.lock().unwrap().frames.last().cloned().unwrap_or_default()
    }

    pub fn powered(&self) -> bool {
        self.0.lock().unwrap().powered
    }
}

impl TextDisplay for FakeDisplay {
    fn render(&mut self, lines: &[Line], _center: bool) -> Result<()> {
        let text = lines.iter().map(|l| l.to_string()).collect();
        self.0.lock().unwrap().frames.push(text);
        Ok(())
    }

    fn power_on(&mut self) -> Result<()> {
        let mut panel = self.0.lock().unwrap();
        panel.powered = true;
        if let Some(last) = panel.frames.last().cloned() {
            panel.frames.push(last);
        }
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        self.0.lock().unwrap().powered = false;
        Ok(())
    }

    fn is_powered(&self) -> bool {
        self.0.lock().unwrap().powered
    }
}

#[derive(Clone, Default)]
pub struct FakeLed(pub Arc<Mutex<Vec<Color>>>);

impl FakeLed {
    pub fn last(&self) -> Option<Color> {
        self.0.lock().unwrap().last().copied()
    }
}

impl Indicator for FakeLed {
    fn set_color(&mut self, color: Color) -> Result<()> {
        self.0.lock().unwrap().push(color);
        Ok(())
    }

    fn turn_off(&mut self) -> Result<()> {
        self.set_color(Color::OFF)
    }
}

pub struct FakeStats;

impl StatsSource for FakeStats {
    fn hostname(&self) -> Result<String> {
        Ok("rackpi".into())
    }
    fn primary_ip(&self) -> Result<String> {
        Ok("192.168.0.9".into())
    }
    fn cpu_percent(&self) -> Result<f32> {
        Ok(12.0)
    }
    fn memory_percent(&self) -> Result<f32> {
        Err(Error::StatUnavailable("memory"))
    }
    fn temperature_c(&self) -> Result<i32> {
        Ok(51)
    }
}

#[derive(Clone, Default)]
pub struct FakeActions(pub Arc<Mutex<Vec<PrivilegedAction>>>);

impl FakeActions {
    pub fn ran(&self) -> Vec<PrivilegedAction> {
        self.0.lock().unwrap().clone()
    }
}

impl SystemActions for FakeActions {
    fn run(&self, action: PrivilegedAction) -> Result<()> {
        self.0.lock().unwrap().push(action);
        Ok(())
    }
}

pub type TestPanel = Orchestrator<FakeDisplay, FakeLed, FakeStats, FakeActions, ManualClock>;

/// Button + orchestrator wired as in the binary, stepped by hand.
pub struct Rig {
    pub clock: ManualClock,
    pub button: Button<ManualClock>,
    pub worker: EdgeWorker<ScriptedLine, ManualClock>,
    pub panel: Arc<TestPanel>,
    pub display: FakeDisplay,
    pub led: FakeLed,
    pub actions: FakeActions,
    pub events: Arc<Mutex<Vec<ButtonEvent>>>,
    next_tick: Instant,
}

pub const POLL: Duration = Duration::from_millis(10);
pub const TICK: Duration = Duration::from_secs(1);

pub fn config() -> PanelConfig {
    PanelConfig {
        button: ButtonConfig {
            poll: POLL,
            ..ButtonConfig::default()
        },
        ..PanelConfig::default()
    }
}

impl Rig {
    pub fn new(changes: &[(u64, bool)]) -> Self {
        let clock = ManualClock::new();
        let config = config();
        let display = FakeDisplay::new();
        let led = FakeLed::default();
        let actions = FakeActions::default();

        let (button, worker) =
            Button::new(ScriptedLine::new(&clock, changes), clock.clone(), &config.button).unwrap();
        let panel = Arc::new(Orchestrator::new(
            display.clone(),
            led.clone(),
            FakeStats,
            actions.clone(),
            clock.clone(),
            default_screens(&config),
            &config,
        ));
        panel.attach(&button);

        Self {
            next_tick: clock.now(),
            clock,
            button,
            worker,
            panel,
            display,
            led,
            actions,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Step the edge worker and the one-second tick until `until_ms`.
    pub fn run_until(&mut self, until_ms: u64) {
        let until = Instant::from_millis(until_ms);
        while self.clock.now() < until {
            if let Some(event) = self.worker.poll_once().unwrap() {
                self.events.lock().unwrap().push(event);
            }
            while self.clock.now() >= self.next_tick {
                self.panel.tick();
                self.next_tick += TICK;
            }
            self.clock.sleep(POLL);
        }
    }

    pub fn active_screen(&self) -> usize {
        self.panel.state().active_screen
    }
}
