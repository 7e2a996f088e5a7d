use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Agent Action ─────────────────────────────────────────────────

/// Structured result of parsing one model response.
///
/// The parser fills every field it finds; exclusivity between booleans and
/// between action kinds is checked by [`crate::guideline::validate`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    /// Free text left after all recognized tags were stripped.
    pub message: String,
    pub send_keys: Vec<String>,
    pub exec_command: Vec<String>,
    /// Empty when absent.
    pub paste_multiline_content: String,
    /// Empty when absent.
    pub exec_and_wait: String,
    pub request_accomplished: bool,
    pub exec_pane_seems_busy: bool,
    pub waiting_for_user_response: bool,
    pub no_comment: bool,
}

impl AgentAction {
    /// Number of boolean flags set.
    pub fn flag_count(&self) -> usize {
        [
            self.request_accomplished,
            self.exec_pane_seems_busy,
            self.waiting_for_user_response,
            self.no_comment,
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    /// Action kinds that carry at least one value.
    pub fn action_kinds(&self) -> Vec<ActionKind> {
        let mut kinds = Vec::new();
        if !self.exec_command.is_empty() {
            kinds.push(ActionKind::ExecCommand);
        }
        if !self.send_keys.is_empty() {
            kinds.push(ActionKind::SendKeys);
        }
        if !self.paste_multiline_content.is_empty() {
            kinds.push(ActionKind::PasteMultiline);
        }
        if !self.exec_and_wait.is_empty() {
            kinds.push(ActionKind::ExecAndWait);
        }
        kinds
    }

    /// True when neither a flag nor an action was produced.
    pub fn is_plain_message(&self) -> bool {
        self.flag_count() == 0 && self.action_kinds().is_empty()
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message={:?} send_keys={:?} exec_command={:?} paste={:?} exec_and_wait={:?} \
             accomplished={} busy={} waiting_user={} no_comment={}",
            self.message,
            self.send_keys,
            self.exec_command,
            self.paste_multiline_content,
            self.exec_and_wait,
            self.request_accomplished,
            self.exec_pane_seems_busy,
            self.waiting_for_user_response,
            self.no_comment,
        )
    }
}

/// The four mutually exclusive kinds of terminal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ExecCommand,
    SendKeys,
    PasteMultiline,
    ExecAndWait,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExecCommand => "exec_command",
            Self::SendKeys => "send_keys",
            Self::PasteMultiline => "paste_multiline",
            Self::ExecAndWait => "exec_and_wait",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transcript ───────────────────────────────────────────────────

/// One reconstructed shell turn from the exec pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandExecRecord {
    pub command: String,
    pub output: String,
    /// `-1` when the status is unknown (no terminating prompt seen).
    pub code: i32,
}

impl CommandExecRecord {
    pub const UNKNOWN_CODE: i32 = -1;

    pub fn is_terminated(&self) -> bool {
        self.code != Self::UNKNOWN_CODE
    }
}

// ─── Chat ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub from_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            from_user: true,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            from_user: false,
            timestamp: Utc::now(),
        }
    }
}

// ─── Pane ─────────────────────────────────────────────────────────

/// Point-in-time view of one pane. Replaced on refresh, never diffed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaneSnapshot {
    pub id: String,
    pub current_pid: Option<u32>,
    pub current_command: String,
    pub current_command_args: String,
    pub content: String,
    /// Last non-blank line of `content`, whitespace-trimmed.
    pub last_line: String,
    /// Set when `current_command` is a known interactive shell.
    pub shell: Option<String>,
    pub os: String,
    pub is_active: bool,
    pub is_tmuxai_pane: bool,
    pub is_exec_pane: bool,
    pub is_prepared: bool,
    pub is_sub_shell: bool,
    pub history_size: u32,
    pub history_limit: u32,
}

impl PaneSnapshot {
    /// Replace the captured content and recompute derived fields.
    pub fn set_content(&mut self, content: String) {
        self.last_line = content
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_default();
        self.is_prepared = self.last_line.ends_with(crate::transcript::PROMPT_TERMINATOR);
        self.content = content;
    }
}

// ─── Tests ────────────────────────────────────────────────────────
