//! The window as the agent sees it: which pane is ours, which pane it
//! drives, and the XML block sent to the model every turn.

use std::fmt::Write as _;
use std::time::Duration;

use tmuxai_core::transcript::is_idle_prompt;
use tmuxai_core::{CommandExecRecord, PaneSnapshot, parse_transcript};
use tmuxai_tmux::prepare::CLEAR_SCREEN_KEY;
use tmuxai_tmux::{TerminalAdapter, TmuxError, prompt_install_command};
use tracing::{debug, info};

use crate::session::SessionState;

/// How often a running command's pane is re-captured.
const EXEC_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct WindowView {
    pub tmuxai_pane: String,
    /// Pane the agent sends commands and keys to.
    pub exec_pane: PaneSnapshot,
    /// Transcript parsed from the exec pane after the last prepared command.
    pub exec_history: Vec<CommandExecRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    Prepared,
    AlreadyPrepared,
    UnsupportedShell(String),
}

impl WindowView {
    /// Pick the exec pane: `preferred` if it exists, else the first pane that
    /// is not ours, else a new split.
    pub fn init(term: &impl TerminalAdapter, preferred: Option<&str>) -> Result<Self, TmuxError> {
        let tmuxai_pane = term.current_pane_id()?;
        let panes = term.list_panes()?;

        let existing = preferred
            .and_then(|id| panes.iter().find(|p| p.id == id))
            .or_else(|| panes.iter().find(|p| p.id != tmuxai_pane))
            .cloned();
        let exec_pane = match existing {
            Some(pane) => pane,
            None => {
                let id = term.new_pane(&tmuxai_pane)?;
                info!(pane = %id, "created exec pane");
                term.list_panes()?
                    .into_iter()
                    .find(|p| p.id == id)
                    .unwrap_or_else(|| PaneSnapshot {
                        id,
                        ..Default::default()
                    })
            }
        };
        info!(pane = %exec_pane.id, "using exec pane");

        let mut view = Self {
            tmuxai_pane,
            exec_pane,
            exec_history: Vec::new(),
        };
        view.exec_pane.is_exec_pane = true;
        Ok(view)
    }

    /// All panes of the window with role flags set and content captured for
    /// every pane except ours. Updates the exec pane snapshot.
    pub fn panes(&mut self, term: &impl TerminalAdapter, lines: u32) -> Result<Vec<PaneSnapshot>, TmuxError> {
        let mut panes = term.list_panes()?;
        for pane in &mut panes {
            pane.is_tmuxai_pane = pane.id == self.tmuxai_pane;
            pane.is_exec_pane = pane.id == self.exec_pane.id;
            if !pane.is_tmuxai_pane {
                pane.set_content(term.capture_pane(&pane.id, lines)?);
            }
            if pane.is_exec_pane {
                self.exec_pane = pane.clone();
            }
        }
        Ok(panes)
    }

    /// Re-capture only the exec pane.
    pub fn refresh_exec(&mut self, term: &impl TerminalAdapter, lines: u32) -> Result<(), TmuxError> {
        let content = term.capture_pane(&self.exec_pane.id, lines)?;
        self.exec_pane.set_content(content);
        Ok(())
    }

    /// `<current_tmux_window_state>` block for the model.
    pub fn render_state(&mut self, term: &impl TerminalAdapter, lines: u32) -> Result<String, TmuxError> {
        let panes = self.panes(term, lines)?;
        Ok(render_panes(&panes))
    }

    /// "Keep in mind" line, empty for sub-shells where the host is unknown.
    pub fn environment_hint(&self) -> String {
        if self.exec_pane.is_sub_shell {
            return String::new();
        }
        format!(
            "Keep in mind, you are working within the shell: {} and OS: {}",
            self.exec_pane.shell.as_deref().unwrap_or(&self.exec_pane.current_command),
            self.exec_pane.os
        )
    }

    /// Install the status-carrying prompt in the exec pane.
    pub fn prepare(&mut self, term: &impl TerminalAdapter, lines: u32) -> Result<PrepareOutcome, TmuxError> {
        self.panes(term, lines)?;
        if self.exec_pane.is_prepared && self.exec_pane.shell.is_some() {
            return Ok(PrepareOutcome::AlreadyPrepared);
        }
        let shell = self.exec_pane.current_command.clone();
        let Some(command) = prompt_install_command(&shell) else {
            info!(%shell, pane = %self.exec_pane.id, "shell not supported for prompt preparation");
            return Ok(PrepareOutcome::UnsupportedShell(shell));
        };
        term.send_command(&self.exec_pane.id, command)?;
        term.send_keys(&self.exec_pane.id, CLEAR_SCREEN_KEY)?;
        Ok(PrepareOutcome::Prepared)
    }

    /// Run `command` in a prepared exec pane and wait for the prompt to come
    /// back. Returns the command's record, or `None` when the wait was cut
    /// short by the session stopping.
    pub async fn exec_wait_capture(
        &mut self,
        term: &impl TerminalAdapter,
        command: &str,
        lines: u32,
        state: &SessionState,
    ) -> Result<Option<CommandExecRecord>, TmuxError> {
        term.send_command(&self.exec_pane.id, command)?;
        let cancel = state.cancel_token();
        loop {
            tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                () = tokio::time::sleep(EXEC_POLL) => {}
            }
            self.refresh_exec(term, lines)?;
            if is_idle_prompt(&self.exec_pane.last_line) {
                break;
            }
            if !state.is_running() {
                return Ok(None);
            }
        }

        self.exec_history = parse_transcript(&self.exec_pane.content);
        let last = self.exec_history.last().cloned();
        if let Some(rec) = &last {
            debug!(command = %rec.command, code = rec.code, output_len = rec.output.len(), "command finished");
        }
        Ok(last)
    }
}

pub fn render_panes(panes: &[PaneSnapshot]) -> String {
    let mut out = String::from("<current_tmux_window_state>\n");
    for pane in panes.iter().filter(|p| !p.is_tmuxai_pane) {
        let title = if pane.is_exec_pane {
            "tmuxai_exec_pane"
        } else {
            "read_only_pane"
        };
        let _ = writeln!(out, "<{title}>");
        let _ = writeln!(out, " - Id: {}", pane.id);
        let _ = writeln!(
            out,
            " - CurrentPid: {}",
            pane.current_pid.map(|p| p.to_string()).unwrap_or_default()
        );
        let _ = writeln!(out, " - CurrentCommand: {}", pane.current_command);
        let _ = writeln!(out, " - CurrentCommandArgs: {}", pane.current_command_args);
        let _ = writeln!(out, " - Shell: {}", pane.shell.as_deref().unwrap_or_default());
        let _ = writeln!(out, " - OS: {}", pane.os);
        let _ = writeln!(out, " - LastLine: {}", pane.last_line);
        let _ = writeln!(out, " - IsActive: {}", u8::from(pane.is_active));
        let _ = writeln!(out, " - IsTmuxAiPane: {}", pane.is_tmuxai_pane);
        let _ = writeln!(out, " - IsTmuxAiExecPane: {}", pane.is_exec_pane);
        let _ = writeln!(out, " - IsPrepared: {}", pane.is_prepared);
        let _ = writeln!(out, " - IsSubShell: {}", pane.is_sub_shell);
        let _ = writeln!(out, " - HistorySize: {}", pane.history_size);
        let _ = writeln!(out, " - HistoryLimit: {}", pane.history_limit);
        if !pane.content.is_empty() {
            let _ = write!(out, "<pane_content>\n{}\n</pane_content>\n", pane.content);
        }
        let _ = writeln!(out, "</{title}>\n");
    }
    out.push_str("</current_tmux_window_state>\n");
    out
}
