//! The terminal operations the agent consumes, and their tmux implementation.

use tmuxai_core::PaneSnapshot;
use tracing::debug;

use crate::capture;
use crate::error::TmuxError;
use crate::executor::{TmuxCommandRunner, TmuxExecutor};
use crate::host;
use crate::pane_info::list_window_panes;
use crate::snapshot::to_pane_snapshot;

/// Pane operations the orchestrator needs. Synchronous: every call is one
/// short tmux round trip.
pub trait TerminalAdapter: Send + Sync {
    /// Id of the pane tmuxai itself runs in.
    fn current_pane_id(&self) -> Result<String, TmuxError>;

    /// Panes of the window tmuxai runs in, without content. Role flags are
    /// left unset.
    fn list_panes(&self) -> Result<Vec<PaneSnapshot>, TmuxError>;

    /// Last `lines` lines of a pane.
    fn capture_pane(&self, pane_id: &str, lines: u32) -> Result<String, TmuxError>;

    /// One keystroke entry: a key name (`Enter`, `C-c`) or literal text.
    fn send_keys(&self, pane_id: &str, keys: &str) -> Result<(), TmuxError>;

    /// Type `command` and press Enter after each of its lines.
    fn send_command(&self, pane_id: &str, command: &str) -> Result<(), TmuxError>;

    /// Split `target`, returning the new pane id.
    fn new_pane(&self, target: &str) -> Result<String, TmuxError>;

    /// Clear screen and scrollback.
    fn clear_pane(&self, pane_id: &str) -> Result<(), TmuxError>;
}

/// `TerminalAdapter` backed by the tmux CLI.
pub struct TmuxAdapter<R: TmuxCommandRunner = TmuxExecutor> {
    runner: R,
    /// Overrides `$TMUX_PANE`.
    pane_id: Option<String>,
    os: String,
    args_probe: fn(u32) -> Option<String>,
}

impl TmuxAdapter<TmuxExecutor> {
    /// Adapter for the tmux server this process runs under.
    pub fn from_env() -> Result<Self, TmuxError> {
        let pane_id = std::env::var("TMUX_PANE").map_err(|_| TmuxError::NotInTmux)?;
        Ok(Self::new(TmuxExecutor::default(), host::os_details()).with_pane_id(pane_id))
    }
}

impl<R: TmuxCommandRunner> TmuxAdapter<R> {
    pub fn new(runner: R, os: impl Into<String>) -> Self {
        Self {
            runner,
            pane_id: None,
            os: os.into(),
            args_probe: host::process_args,
        }
    }

    #[must_use]
    pub fn with_pane_id(mut self, pane_id: impl Into<String>) -> Self {
        self.pane_id = Some(pane_id.into());
        self
    }

    #[must_use]
    pub fn with_args_probe(mut self, probe: fn(u32) -> Option<String>) -> Self {
        self.args_probe = probe;
        self
    }

    pub fn os(&self) -> &str {
        &self.os
    }
}

impl<R: TmuxCommandRunner> TerminalAdapter for TmuxAdapter<R> {
    fn current_pane_id(&self) -> Result<String, TmuxError> {
        match &self.pane_id {
            Some(id) => Ok(id.clone()),
            None => {
                let output = self.runner.run(&["display-message", "-p", "#{pane_id}"])?;
                Ok(output.trim().to_string())
            }
        }
    }

    fn list_panes(&self) -> Result<Vec<PaneSnapshot>, TmuxError> {
        let own = self.current_pane_id()?;
        let window = capture::display(&self.runner, &own, "#{session_id}:#{window_id}")?;
        let panes = list_window_panes(&self.runner, &window)?;
        debug!(%window, count = panes.len(), "listed panes");
        Ok(panes
            .iter()
            .map(|p| {
                let args = p.pane_pid.and_then(self.args_probe);
                to_pane_snapshot(p, args, &self.os)
            })
            .collect())
    }

    fn capture_pane(&self, pane_id: &str, lines: u32) -> Result<String, TmuxError> {
        capture::capture_pane(&self.runner, pane_id, lines)
    }

    fn send_keys(&self, pane_id: &str, keys: &str) -> Result<(), TmuxError> {
        capture::send_keys(&self.runner, pane_id, keys)
    }

    fn send_command(&self, pane_id: &str, command: &str) -> Result<(), TmuxError> {
        capture::send_command(&self.runner, pane_id, command)
    }

    fn new_pane(&self, target: &str) -> Result<String, TmuxError> {
        capture::new_pane(&self.runner, target)
    }

    fn clear_pane(&self, pane_id: &str) -> Result<(), TmuxError> {
        capture::clear_pane(&self.runner, pane_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRunner;

    impl TmuxCommandRunner for MockRunner {
        fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
            match args.first().copied() {
                Some("display-message") if args.contains(&"#{pane_id}") => Ok("%0\n".into()),
                Some("display-message") => {
                    assert_eq!(args[3], "%0");
                    Ok("$0:@1\n".into())
                }
                Some("list-panes") => {
                    assert_eq!(args[2], "$0:@1");
                    Ok("%0\t1\t10\ttmuxai\t0\t2000\n%1\t0\t11\tbash\t40\t2000\n".into())
                }
                Some("capture-pane") => Ok("hello\n".into()),
                other => Err(TmuxError::CommandFailed(format!("unexpected {other:?}"))),
            }
        }
    }

    fn adapter() -> TmuxAdapter<MockRunner> {
        TmuxAdapter::new(MockRunner, "TestOS - x86_64").with_args_probe(|pid| Some(format!("proc-{pid}")))
    }

    #[test]
    fn current_pane_from_tmux() {
        assert_eq!(adapter().current_pane_id().expect("id"), "%0");
    }

    #[test]
    fn current_pane_override() {
        let a = adapter().with_pane_id("%9");
        assert_eq!(a.current_pane_id().expect("id"), "%9");
    }

    #[test]
    fn list_panes_builds_snapshots() {
        let panes = adapter().list_panes().expect("list");
        assert_eq!(panes.len(), 2);
        assert_eq!(panes[1].id, "%1");
        assert_eq!(panes[1].shell.as_deref(), Some("bash"));
        assert_eq!(panes[1].current_command_args, "proc-11");
        assert_eq!(panes[1].os, "TestOS - x86_64");
        assert_eq!(panes[1].history_size, 40);
    }

    #[test]
    fn capture_through_adapter() {
        assert_eq!(adapter().capture_pane("%1", 10).expect("capture"), "hello");
    }

    #[test]
    fn runner_errors_propagate() {
        let err = adapter().clear_pane("%1").expect_err("mock rejects send-keys");
        assert!(matches!(err, TmuxError::CommandFailed(_)));
    }
}
