//! The subprocess seam: every tmux call goes through `TmuxCommandRunner`,
//! so pane logic is tested against a mock instead of a live server.

use std::process::{Command, Output};

use tracing::debug;

use crate::error::TmuxError;

pub trait TmuxCommandRunner: Send + Sync {
    /// Run `tmux <args>` and return stdout.
    fn run(&self, args: &[&str]) -> Result<String, TmuxError>;
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

/// Runs the `tmux` binary against the server of the current session.
pub struct TmuxExecutor {
    tmux_bin: String,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
        }
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::new("tmux")
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        debug!(bin = %self.tmux_bin, ?args, "tmux");
        let output = Command::new(&self.tmux_bin).args(args).output()?;
        check_output(args, output)
    }
}

/// Map a finished tmux process to stdout or a classified error.
fn check_output(args: &[&str], output: Output) -> Result<String, TmuxError> {
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.starts_with("can't find pane") {
        let target = target_of(args).unwrap_or_default();
        return Err(TmuxError::PaneGone(target.to_string()));
    }
    if stderr.starts_with("no server running") {
        return Err(TmuxError::NotInTmux);
    }
    Err(TmuxError::Exited {
        subcommand: args.first().copied().unwrap_or_default().to_string(),
        code: output.status.code().unwrap_or(-1),
        stderr,
    })
}

/// Value of the `-t` flag, if any.
fn target_of<'a>(args: &[&'a str]) -> Option<&'a str> {
    args.iter()
        .position(|a| *a == "-t")
        .and_then(|i| args.get(i + 1).copied())
}
