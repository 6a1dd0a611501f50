use embassy_time::Duration;

/// Idle limits applied on every tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdleTimeouts {
    pub display_off: Duration,
    pub home_reset: Duration,
}

/// What a tick does about inactivity. At most one applies per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Unchanged,
    PoweredOff,
    PoweredOn,
    ReturnedHome,
}

/// Decide the idle step for one tick.
///
/// Power-off and power-on are complementary on `idle`, and the home reset
/// is only considered while the display stays on.
pub fn decide(powered: bool, on_home: bool, idle: Duration, timeouts: IdleTimeouts) -> TickOutcome {
    if powered && idle >= timeouts.display_off {
        return TickOutcome::PoweredOff;
    }
    if !powered && idle < timeouts.display_off {
        return TickOutcome::PoweredOn;
    }
    if powered && !on_home && idle >= timeouts.home_reset {
        return TickOutcome::ReturnedHome;
    }
    TickOutcome::Unchanged
}
