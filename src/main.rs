//! rackpanel - status panel for a rack-mounted Raspberry Pi.
//!
//! Boots the LED, the OLED and the button, then ticks the screen
//! orchestrator once a second until Ctrl-C or SIGTERM. Whatever ends the
//! loop (a signal, an error, a panic or a dead button worker), the button
//! line is released, the LED turns red and the exit screen is shown.
//!
//! `rackpanel --self-test` runs the interactive hardware check instead.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use embassy_time::Duration;
use log::{debug, error, info};
use tokio::signal::unix::{signal, SignalKind};

use rackpanel::actions::SudoCommands;
use rackpanel::button::Button;
use rackpanel::clock::SystemClock;
use rackpanel::config::{PanelConfig, LED_PWM_FREQ_HZ, OLED_I2C_BUS, SELF_TEST_STEP_SECS};
use rackpanel::hw::{self, OledDisplay};
use rackpanel::indicator::{Indicator, NamedColor, RgbLed};
use rackpanel::soft_pwm::{PwmChannel, SoftPwm};
use rackpanel::stats::SystemStats;
use rackpanel::ui::display::TextDisplay;
use rackpanel::ui::screens::{default_screens, intro_lines};
use rackpanel::ui::{self_test, Orchestrator, TickOutcome};

type Led = RgbLed<PwmChannel, PwmChannel, PwmChannel>;
type Panel = Orchestrator<OledDisplay, Led, SystemStats, SudoCommands, SystemClock>;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting up rackpanel v{}", env!("CARGO_PKG_VERSION"));

    let config = PanelConfig::from_env();
    let self_test = std::env::args().skip(1).any(|arg| arg == "--self-test");

    // ═══════════════════════════════════════════════════════════════════════
    // Hardware
    // ═══════════════════════════════════════════════════════════════════════

    let (_pwm, [red, green, blue]) =
        SoftPwm::start(hw::led_lines(config.led_pins)?, LED_PWM_FREQ_HZ).context("starting LED PWM")?;
    let mut led = RgbLed::new(red, green, blue).context("initialising LED")?;
    led.set_color(NamedColor::Green.into())?;

    let mut display = OledDisplay::open(OLED_I2C_BUS).context("opening OLED")?;
    display.render(&intro_lines(), true)?;

    // Fatal: the loop is useless without the button.
    let line = hw::input_line(config.button.channel).context("acquiring button line")?;
    let mut button = Button::spawn(line, SystemClock, &config.button)?;

    if self_test {
        let step = Duration::from_secs(SELF_TEST_STEP_SECS);
        let result = self_test::run(&mut display, &mut led, &button, step);
        button.cleanup();
        return result.context("hardware self-test");
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Control loop
    // ═══════════════════════════════════════════════════════════════════════

    let panel: Arc<Panel> = Arc::new(Orchestrator::new(
        display,
        led,
        SystemStats::new(),
        SudoCommands,
        SystemClock,
        default_screens(&config),
        &config,
    ));
    panel.attach(&button);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run(&panel, &button, config.tick)))
        .unwrap_or_else(|cause| Err(anyhow!("control loop panicked: {}", panic_message(&*cause))));

    // Terminal cleanup, on every exit route.
    button.cleanup();
    panel.show_exit_screen();
    match &outcome {
        Ok(()) => info!("rackpanel terminated"),
        Err(e) => error!("rackpanel terminated, check for errors: {:#}", e),
    }
    outcome
}

/// Tick the orchestrator until a shutdown signal arrives. Fails once the
/// button worker has stopped, since the panel can no longer be woken.
fn run(panel: &Panel, button: &Button<SystemClock>, tick: Duration) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building runtime")?;

    runtime.block_on(async {
        let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
        let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
        let mut ticker = tokio::time::interval(std::time::Duration::from_micros(tick.as_micros()));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !button.is_running() {
                        return Err(anyhow!("button worker on line {} stopped", button.channel()));
                    }
                    let report = panel.tick();
                    if report.rendered || report.outcome != TickOutcome::Unchanged {
                        debug!("Tick: {:?}", report);
                    }
                }
                _ = interrupt.recv() => {
                    info!("Interrupted");
                    return Ok(());
                }
                _ = terminate.recv() => {
                    info!("Terminate requested");
                    return Ok(());
                }
            }
        }
    })
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    cause
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| cause.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".into())
}
