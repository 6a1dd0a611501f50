//! Screen orchestration driven by button callbacks and a periodic tick.
//!
//! Button callbacks run on the button worker thread while `tick` runs on the
//! foreground loop. Both go through one lock around the orchestrator state,
//! the display and the indicator. Slow work stays outside it: stats are
//! collected before the lock is taken, and privileged actions (plus the
//! confirmation pause) run after it is released.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Instant};
use log::{error, info, warn};

use crate::actions::{PrivilegedAction, SystemActions};
use crate::button::Button;
use crate::clock::Clock;
use crate::config::PanelConfig;
use crate::error::Result;
use crate::indicator::{Color, Indicator};
use crate::stats::StatsSource;
use crate::ui::display::{Line, TextDisplay};
use crate::ui::idle_logic::{self, IdleTimeouts, TickOutcome};
use crate::ui::screens::{exit_lines, Frame, Screens, FALLBACK_COLOR, HOME};

/// Snapshot of the orchestrator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorState {
    pub active_screen: usize,
    /// Hold notifications in the current press episode.
    pub hold_ticks: u32,
    /// Confirmation time of the current press, if the button is down.
    pub pressed_at: Option<Instant>,
    pub needs_render: bool,
    pub last_action: Instant,
    pub display_powered: bool,
    /// The hold action already ran in this press episode.
    pub action_fired: bool,
}

/// Result of one `tick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub rendered: bool,
    pub outcome: TickOutcome,
}

struct Inner<D, L> {
    state: OrchestratorState,
    display: D,
    indicator: L,
}

pub struct Orchestrator<D, L, S, A, C> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner<D, L>>>,
    screens: Screens,
    stats: S,
    actions: A,
    clock: C,
    hold_interval: Duration,
    debounce: Duration,
    timeouts: IdleTimeouts,
    confirm_pause: Duration,
}

impl<D, L, S, A, C> Orchestrator<D, L, S, A, C>
where
    D: TextDisplay,
    L: Indicator,
    S: StatsSource,
    A: SystemActions,
    C: Clock,
{
    /// Start on the home screen with a render pending.
    ///
    /// # Panics
    ///
    /// If `screens` is empty.
    pub fn new(
        display: D,
        indicator: L,
        stats: S,
        actions: A,
        clock: C,
        screens: Screens,
        config: &PanelConfig,
    ) -> Self {
        assert!(!screens.is_empty(), "orchestrator needs at least one screen");

        let state = OrchestratorState {
            active_screen: HOME,
            hold_ticks: 0,
            pressed_at: None,
            needs_render: true,
            last_action: clock.now(),
            display_powered: display.is_powered(),
            action_fired: false,
        };
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                state,
                display,
                indicator,
            })),
            screens,
            stats,
            actions,
            clock,
            hold_interval: config.button.hold_interval,
            debounce: config.button.debounce,
            timeouts: IdleTimeouts {
                display_off: config.display_off_timeout,
                home_reset: config.home_reset_timeout,
            },
            confirm_pause: config.confirm_pause,
        }
    }

    pub fn state(&self) -> OrchestratorState {
        self.inner.lock(|inner| inner.borrow().state)
    }

    pub fn screens(&self) -> &Screens {
        &self.screens
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<D, L>) -> R) -> R {
        self.inner.lock(|inner| f(&mut inner.borrow_mut()))
    }

    fn color_of(&self, index: usize) -> Color {
        self.screens.get(index).map_or(FALLBACK_COLOR, |s| s.color)
    }

    /// Put arbitrary lines on the display, outside the screen sequence.
    pub fn show(&self, lines: &[Line], center: bool) -> Result<()> {
        self.with_inner(|inner| inner.display.render(lines, center))
    }

    pub fn set_color(&self, color: Color) -> Result<()> {
        self.with_inner(|inner| inner.indicator.set_color(color))
    }

    /// Terminal screen: error colour, display on, exit message. Failures
    /// are logged since there is nothing left to recover.
    pub fn show_exit_screen(&self) {
        self.with_inner(|inner| {
            if let Err(e) = inner.indicator.set_color(Color::ERROR) {
                error!("Orchestrator: exit colour: {}", e);
            }
            if !inner.display.is_powered() {
                if let Err(e) = inner.display.power_on() {
                    error!("Orchestrator: exit power on: {}", e);
                }
            }
            if let Err(e) = inner.display.render(&exit_lines(), true) {
                error!("Orchestrator: exit screen: {}", e);
            }
            inner.state.display_powered = inner.display.is_powered();
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Button callbacks
    // ═══════════════════════════════════════════════════════════════════════

    pub fn on_press(&self) {
        let now = self.clock.now();
        self.with_inner(|inner| {
            inner.state.last_action = now;
            inner.state.pressed_at = Some(now);
            inner.state.action_fired = false;
        });
    }

    /// Advance to the next screen, unless the display is off.
    pub fn on_release(&self) {
        let now = self.clock.now();
        self.with_inner(|inner| {
            let state = &mut inner.state;
            state.last_action = now;
            state.hold_ticks = 0;
            state.pressed_at = None;
            state.action_fired = false;

            // Don't change screen while the display is off.
            if inner.display.is_powered() {
                state.active_screen = (state.active_screen + 1) % self.screens.len();
                state.needs_render = true;
            }
            let color = self.color_of(state.active_screen);
            if let Err(e) = inner.indicator.set_color(color) {
                warn!("Orchestrator: indicator: {}", e);
            }
        });
    }

    /// Count the hold and run the screen's action once its threshold has
    /// been exceeded, at most once per press episode.
    ///
    /// Hold time runs from the physical press: the confirmed press time
    /// less the debounce window.
    pub fn on_hold(&self) {
        let now = self.clock.now();
        let due = self.with_inner(|inner| {
            let state = &mut inner.state;
            state.last_action = now;
            state.hold_ticks += 1;
            if state.action_fired {
                return None;
            }

            let screen = self.screens.get(state.active_screen)?;
            let hold = screen.hold_action?;
            let held = match state.pressed_at {
                Some(at) => now.saturating_duration_since(at) + self.debounce,
                // Press not seen (callbacks attached mid-hold).
                None => self.hold_interval * state.hold_ticks,
            };
            if held <= hold.threshold {
                return None;
            }
            state.action_fired = true;

            info!("Orchestrator: {} hold time reached", screen.name);
            if let Err(e) = inner.display.render(&hold.action.confirmation(), true) {
                warn!("Orchestrator: confirmation screen: {}", e);
            }
            Some(hold.action)
        });

        if let Some(action) = due {
            self.run_action(action);
        }
    }

    fn run_action(&self, action: PrivilegedAction) {
        match self.actions.run(action) {
            // Keep the confirmation up while the command takes effect.
            Ok(()) => self.clock.sleep(self.confirm_pause),
            Err(e) => {
                error!("Orchestrator: {:?} failed: {}", action, e);
                self.with_inner(|inner| inner.state.needs_render = true);
            }
        }
    }

    /// Register the three callbacks on `button`.
    pub fn attach<BC: Clock>(self: &Arc<Self>, button: &Button<BC>)
    where
        Self: Send + Sync + 'static,
    {
        let this = self.clone();
        button.on_press(move |_| this.on_press());
        let this = self.clone();
        button.on_release(move |_| this.on_release());
        let this = self.clone();
        button.on_hold(move |_| this.on_hold());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Periodic tick
    // ═══════════════════════════════════════════════════════════════════════

    /// Render if needed, then apply at most one idle step.
    pub fn tick(&self) -> Tick {
        let pending = self.with_inner(|inner| {
            let state = &inner.state;
            state.needs_render.then_some(state.active_screen)
        });
        // Stats are read without holding the lock.
        let frame = pending.and_then(|index| {
            self.screens
                .get(index)
                .map(|screen| (index, screen.frame(&self.stats)))
        });

        let now = self.clock.now();
        self.with_inner(|inner| {
            let rendered = self.render_pending(inner, pending, frame);
            let outcome = self.idle_step(inner, now);
            inner.state.display_powered = inner.display.is_powered();
            Tick { rendered, outcome }
        })
    }

    fn render_pending(
        &self,
        inner: &mut Inner<D, L>,
        pending: Option<usize>,
        frame: Option<(usize, Frame)>,
    ) -> bool {
        let state = &mut inner.state;
        match (pending, frame) {
            (_, Some((index, frame))) if state.needs_render && index == state.active_screen => {
                match inner.display.render(&frame.lines, frame.center) {
                    Ok(()) => {
                        state.needs_render = false;
                        true
                    }
                    Err(e) => {
                        warn!("Orchestrator: render {}: {}", self.screens[index].name, e);
                        false
                    }
                }
            }
            (Some(index), None) => {
                warn!("Orchestrator: trying to show unknown screen {}", index);
                if state.active_screen == index {
                    state.needs_render = false;
                }
                false
            }
            // Screen changed since the frame was built; next tick renders it.
            _ => false,
        }
    }

    fn idle_step(&self, inner: &mut Inner<D, L>, now: Instant) -> TickOutcome {
        let idle = now.saturating_duration_since(inner.state.last_action);
        let outcome = idle_logic::decide(
            inner.display.is_powered(),
            inner.state.active_screen == HOME,
            idle,
            self.timeouts,
        );

        match outcome {
            TickOutcome::PoweredOff => {
                info!("Orchestrator: display off after {}s idle", idle.as_secs());
                if let Err(e) = inner.display.power_off() {
                    warn!("Orchestrator: power off: {}", e);
                }
            }
            TickOutcome::PoweredOn => {
                info!("Orchestrator: display on after recent activity");
                if let Err(e) = inner.display.power_on() {
                    warn!("Orchestrator: power on: {}", e);
                }
            }
            TickOutcome::ReturnedHome => {
                info!("Orchestrator: back to home screen after {}s idle", idle.as_secs());
                let state = &mut inner.state;
                state.active_screen = HOME;
                state.needs_render = true;
                state.last_action = now;
                if let Err(e) = inner.indicator.set_color(self.color_of(HOME)) {
                    warn!("Orchestrator: indicator: {}", e);
                }
            }
            TickOutcome::Unchanged => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;
    use crate::indicator::NamedColor;
    use crate::ui::display::lines;
    use crate::ui::screens::default_screens;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Screen {
        powered: bool,
        frames: Vec<Vec<String>>,
    }

    #[derive(Clone)]
    struct FakeDisplay(Arc<StdMutex<Screen>>);

    impl FakeDisplay {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Screen {
                powered: true,
                frames: Vec::new(),
            })))
        }

        fn last(&self) -> Option<Vec<String>> {
            self.0.lock().unwrap().frames.last().cloned()
        }

        fn renders(&self) -> usize {
            self.0.lock().unwrap().frames.len()
        }
    }

    impl TextDisplay for FakeDisplay {
        fn render(&mut self, lines: &[Line], _center: bool) -> Result<()> {
            let text = lines.iter().map(|l| l.to_string()).collect();
            self.0.lock().unwrap().frames.push(text);
            Ok(())
        }

        fn power_on(&mut self) -> Result<()> {
            self.0.lock().unwrap().powered = true;
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
    struct FakeLed(Arc<StdMutex<Vec<Color>>>);

    impl Indicator for FakeLed {
        fn set_color(&mut self, color: Color) -> Result<()> {
            self.0.lock().unwrap().push(color);
            Ok(())
        }

        fn turn_off(&mut self) -> Result<()> {
            self.set_color(Color::OFF)
        }
    }

    struct FixedStats;

    impl StatsSource for FixedStats {
        fn hostname(&self) -> Result<String> {
            Ok("rackpi".into())
        }
        fn primary_ip(&self) -> Result<String> {
            Ok("10.0.0.2".into())
        }
        fn cpu_percent(&self) -> Result<f32> {
            Ok(3.0)
        }
        fn memory_percent(&self) -> Result<f32> {
            Ok(41.0)
        }
        fn temperature_c(&self) -> Result<i32> {
            Err(Error::StatUnavailable("temperature"))
        }
    }

    #[derive(Clone)]
    struct FakeActions {
        ran: Arc<StdMutex<Vec<PrivilegedAction>>>,
        fail: bool,
    }

    impl SystemActions for FakeActions {
        fn run(&self, action: PrivilegedAction) -> Result<()> {
            self.ran.lock().unwrap().push(action);
            if self.fail {
                return Err(Error::Command {
                    program: "sudo",
                    reason: "not found".into(),
                });
            }
            Ok(())
        }
    }

    type TestOrchestrator = Orchestrator<FakeDisplay, FakeLed, FixedStats, FakeActions, ManualClock>;

    struct Rig {
        orch: TestOrchestrator,
        display: FakeDisplay,
        led: FakeLed,
        ran: Arc<StdMutex<Vec<PrivilegedAction>>>,
        clock: ManualClock,
    }

    fn rig_with(fail: bool) -> Rig {
        let clock = ManualClock::new();
        let display = FakeDisplay::new();
        let led = FakeLed::default();
        let ran = Arc::new(StdMutex::new(Vec::new()));
        let config = PanelConfig::default();
        let orch = Orchestrator::new(
            display.clone(),
            led.clone(),
            FixedStats,
            FakeActions {
                ran: ran.clone(),
                fail,
            },
            clock.clone(),
            default_screens(&config),
            &config,
        );
        Rig {
            orch,
            display,
            led,
            ran,
            clock,
        }
    }

    fn rig() -> Rig {
        rig_with(false)
    }

    fn click(orch: &TestOrchestrator) {
        orch.on_press();
        orch.on_release();
    }

    /// `n` hold notifications one interval apart, as the hold timer sends them.
    fn hold(r: &Rig, n: u32) {
        for _ in 0..n {
            r.clock.advance(Duration::from_secs(1));
            r.orch.on_hold();
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn first_tick_renders_home() {
        let r = rig();
        let tick = r.orch.tick();
        assert!(tick.rendered);
        assert_eq!(tick.outcome, TickOutcome::Unchanged);
        assert_eq!(
            r.display.last().unwrap(),
            ["NAME: rackpi", "IP  : 10.0.0.2", "C:3% | M:41% | T:--°"]
        );
        assert!(!r.orch.tick().rendered);
    }

    #[test]
    fn release_cycles_screens_and_colours() {
        let r = rig();
        click(&r.orch);
        assert_eq!(r.orch.state().active_screen, 1);
        assert!(r.orch.state().needs_render);
        r.orch.tick();
        assert_eq!(r.display.last().unwrap()[2], "to RESTART");

        click(&r.orch);
        click(&r.orch);
        assert_eq!(r.orch.state().active_screen, 0);
        assert_eq!(
            *r.led.0.lock().unwrap(),
            vec![
                Color::Named(NamedColor::Yellow),
                Color::Named(NamedColor::Orange),
                Color::Named(NamedColor::Green),
            ]
        );
    }

    #[test]
    fn release_while_display_off_only_wakes() {
        let r = rig();
        r.display.0.lock().unwrap().powered = false;
        click(&r.orch);
        assert_eq!(r.orch.state().active_screen, 0);

        let tick = r.orch.tick();
        assert_eq!(tick.outcome, TickOutcome::PoweredOn);
        assert!(r.display.is_powered());
        assert!(r.orch.state().display_powered);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Hold actions
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn hold_on_restart_fires_once_after_threshold() {
        let r = rig();
        click(&r.orch);
        r.orch.on_press();
        hold(&r, 4);
        assert!(r.ran.lock().unwrap().is_empty());

        // 5 s of notifications plus the 200 ms debounce exceeds 5 s.
        hold(&r, 1);
        assert_eq!(*r.ran.lock().unwrap(), vec![PrivilegedAction::Restart]);
        assert_eq!(r.display.last().unwrap(), ["Restarting", "Raspberry Pi", "Now"]);

        hold(&r, 5);
        assert_eq!(r.ran.lock().unwrap().len(), 1);
        // Ten notifications plus the confirmation pause.
        assert_eq!(r.clock.elapsed(), Duration::from_secs(11));
        assert_eq!(r.orch.state().hold_ticks, 10);
    }

    #[test]
    fn hold_time_counts_from_physical_press() {
        let r = rig();
        click(&r.orch);
        r.orch.on_press();
        // Confirmed 200 ms after the physical press; 4.8 s later the
        // button has been down exactly 5 s, which is not enough.
        r.clock.advance(Duration::from_millis(4_800));
        r.orch.on_hold();
        assert!(r.ran.lock().unwrap().is_empty());

        r.clock.advance(Duration::from_millis(1));
        r.orch.on_hold();
        assert_eq!(*r.ran.lock().unwrap(), vec![PrivilegedAction::Restart]);
    }

    #[test]
    fn release_clears_press_time() {
        let r = rig();
        r.orch.on_press();
        assert_eq!(r.orch.state().pressed_at, Some(r.clock.now()));
        r.orch.on_release();
        assert_eq!(r.orch.state().pressed_at, None);
    }

    #[test]
    fn hold_on_home_does_nothing() {
        let r = rig();
        r.orch.on_press();
        for _ in 0..20 {
            r.orch.on_hold();
        }
        assert!(r.ran.lock().unwrap().is_empty());
        assert!(!r.orch.state().action_fired);
    }

    #[test]
    fn new_episode_can_fire_again() {
        let r = rig();
        click(&r.orch);
        click(&r.orch);
        for _ in 0..2 {
            r.orch.on_press();
            hold(&r, 11);
            assert!(r.orch.state().action_fired);
            // Released on the shutdown screen moves back home; go round again.
            r.orch.on_release();
            click(&r.orch);
            click(&r.orch);
        }
        assert_eq!(
            *r.ran.lock().unwrap(),
            vec![PrivilegedAction::Shutdown, PrivilegedAction::Shutdown]
        );
    }

    #[test]
    fn failed_action_is_logged_and_screen_restored() {
        let r = rig_with(true);
        r.orch.tick();
        click(&r.orch);
        r.orch.tick();
        r.orch.on_press();
        hold(&r, 6);
        assert_eq!(r.ran.lock().unwrap().len(), 1);
        // No confirmation pause after a failed launch.
        assert_eq!(r.clock.elapsed(), Duration::from_secs(6));
        assert!(r.orch.state().needs_render);

        assert!(r.orch.tick().rendered);
        assert_eq!(r.display.last().unwrap()[0], "HOLD Button");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Idle handling
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn display_powers_off_when_idle() {
        let r = rig();
        r.orch.tick();
        r.clock.advance(Duration::from_secs(299));
        assert_eq!(r.orch.tick().outcome, TickOutcome::Unchanged);
        r.clock.advance(Duration::from_secs(1));
        assert_eq!(r.orch.tick().outcome, TickOutcome::PoweredOff);
        assert!(!r.orch.state().display_powered);
        assert_eq!(r.orch.tick().outcome, TickOutcome::Unchanged);

        r.orch.on_press();
        assert_eq!(r.orch.tick().outcome, TickOutcome::PoweredOn);
    }

    #[test]
    fn home_reset_happens_once() {
        let r = rig();
        click(&r.orch);
        r.orch.tick();
        r.clock.advance(Duration::from_secs(60));

        let tick = r.orch.tick();
        assert_eq!(tick.outcome, TickOutcome::ReturnedHome);
        assert_eq!(r.orch.state().active_screen, HOME);
        assert_eq!(r.orch.state().last_action, r.clock.now());
        assert_eq!(r.led.0.lock().unwrap().last(), Some(&Color::Named(NamedColor::Green)));

        let renders = r.display.renders();
        let next = r.orch.tick();
        assert!(next.rendered);
        assert_eq!(next.outcome, TickOutcome::Unchanged);
        assert_eq!(r.display.renders(), renders + 1);

        r.clock.advance(Duration::from_secs(120));
        assert_eq!(r.orch.tick().outcome, TickOutcome::Unchanged);
    }

    #[test]
    fn exit_screen_wakes_display_and_shows_red() {
        let r = rig();
        r.display.0.lock().unwrap().powered = false;
        r.orch.show_exit_screen();
        assert!(r.display.is_powered());
        assert_eq!(r.display.last().unwrap()[0], "Program Exited");
        assert_eq!(r.led.0.lock().unwrap().last(), Some(&Color::ERROR));
    }

    #[test]
    fn show_and_set_color_pass_through() {
        let r = rig();
        r.orch.show(&lines(&["hello"]), true).unwrap();
        r.orch.set_color(Color::Rgb(1, 2, 3)).unwrap();
        assert_eq!(r.display.last().unwrap(), ["hello"]);
        assert_eq!(r.led.0.lock().unwrap().last(), Some(&Color::Rgb(1, 2, 3)));
    }
}
