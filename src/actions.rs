//! Privileged system actions triggered by a sustained hold.
//!
//! Both actions are fire-and-forget: the command is launched and not
//! waited on, since it takes the whole machine down.

use std::process::{Command, Stdio};

use log::info;

use crate::error::{Error, Result};
use crate::ui::display::{lines, Lines};

/// Irreversible system-level operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrivilegedAction {
    Restart,
    Shutdown,
}

impl PrivilegedAction {
    /// Upper-case verb used on the hold prompt.
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Restart => "RESTART",
            Self::Shutdown => "SHUTDOWN",
        }
    }

    /// Message left on the panel while the command takes effect.
    pub fn confirmation(self) -> Lines {
        match self {
            Self::Restart => lines(&["Restarting", "Raspberry Pi", "Now"]),
            Self::Shutdown => lines(&["Shutting down", "Raspberry Pi", "Now"]),
        }
    }

    /// Program and arguments, run through `sudo`.
    pub const fn command(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Restart => ("sudo", &["reboot", "now"]),
            Self::Shutdown => ("sudo", &["shutdown", "now"]),
        }
    }
}

/// Executes privileged actions.
pub trait SystemActions {
    fn run(&self, action: PrivilegedAction) -> Result<()>;
}

/// Launches the real `reboot` / `shutdown` commands.
#[derive(Clone, Copy, Debug, Default)]
pub struct SudoCommands;

impl SystemActions for SudoCommands {
    fn run(&self, action: PrivilegedAction) -> Result<()> {
        let (program, args) = action.command();
        info!("Actions: launching {} {}", program, args.join(" "));
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| Error::Command {
                program,
                reason: e.to_string(),
            })
    }
}
