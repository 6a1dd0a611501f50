//! The fixed screen sequence and the text of each screen.

use embassy_time::Duration;

use crate::actions::PrivilegedAction;
use crate::config::PanelConfig;
use crate::indicator::{Color, NamedColor};
use crate::stats::{info_lines, StatsSource};
use crate::ui::display::{line, lines, Lines};

/// Most screens a panel can be configured with.
pub const MAX_SCREENS: usize = 8;

/// Index of the home screen.
pub const HOME: usize = 0;

/// Indicator colour for an index with no screen behind it.
pub const FALLBACK_COLOR: Color = Color::Named(NamedColor::Purple);

/// What a screen shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenKind {
    /// Host name, address and load.
    Info,
    /// Instructions for the screen's hold action.
    HoldPrompt,
}

/// Privileged action performed after holding the button on a screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HoldAction {
    pub threshold: Duration,
    pub action: PrivilegedAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenDescriptor {
    pub name: &'static str,
    pub kind: ScreenKind,
    pub hold_action: Option<HoldAction>,
    pub color: Color,
}

/// Text to put on the display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub lines: Lines,
    pub center: bool,
}

pub type Screens = heapless::Vec<ScreenDescriptor, MAX_SCREENS>;

impl ScreenDescriptor {
    /// Build this screen's frame. Only the info screen reads `stats`.
    pub fn frame<S: StatsSource + ?Sized>(&self, stats: &S) -> Frame {
        match (self.kind, self.hold_action) {
            (ScreenKind::Info, _) => Frame {
                lines: info_lines(stats),
                center: false,
            },
            (ScreenKind::HoldPrompt, Some(hold)) => Frame {
                lines: hold_prompt(hold),
                center: true,
            },
            (ScreenKind::HoldPrompt, None) => Frame {
                lines: lines(&[self.name]),
                center: true,
            },
        }
    }
}

fn hold_prompt(hold: HoldAction) -> Lines {
    let mut out = Lines::new();
    for text in [
        "HOLD Button".to_string(),
        format!("for {} seconds", hold.threshold.as_secs()),
        format!("to {}", hold.action.verb()),
    ] {
        // Capacity is MAX_LINES, three always fit.
        let _ = out.push(line(&text));
    }
    out
}

/// Info, restart and shutdown, in that order.
pub fn default_screens(config: &PanelConfig) -> Screens {
    let mut screens = Screens::new();
    let all = [
        ScreenDescriptor {
            name: "info",
            kind: ScreenKind::Info,
            hold_action: None,
            color: config.info_color,
        },
        ScreenDescriptor {
            name: "restart",
            kind: ScreenKind::HoldPrompt,
            hold_action: Some(HoldAction {
                threshold: config.restart_hold,
                action: PrivilegedAction::Restart,
            }),
            color: config.restart_color,
        },
        ScreenDescriptor {
            name: "shutdown",
            kind: ScreenKind::HoldPrompt,
            hold_action: Some(HoldAction {
                threshold: config.shutdown_hold,
                action: PrivilegedAction::Shutdown,
            }),
            color: config.shutdown_color,
        },
    ];
    for screen in all {
        let _ = screens.push(screen);
    }
    screens
}

/// Shown once at boot.
pub fn intro_lines() -> Lines {
    lines(&["************", "Starting Up", "************"])
}

/// Shown when the program stops, whatever the reason.
pub fn exit_lines() -> Lines {
    lines(&["Program Exited", "------------", "Check for Error!"])
}
