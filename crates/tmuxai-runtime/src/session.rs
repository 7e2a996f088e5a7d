//! Session state shared with the interrupt listener, and the chat history.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tmuxai_core::{ChatMessage, estimate_token_count};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ai_client::{ModelClient, complete_or_cancel};

// ─── Status ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Running,
    /// The model asked the user a question.
    Waiting,
}

impl SessionStatus {
    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Waiting => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Running,
            2 => Self::Waiting,
            _ => Self::Idle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Waiting => "waiting",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flags read by the orchestrator and written by interrupt handlers.
///
/// Only atomics and a per-request token: the orchestrator observes changes
/// at its next check, nothing is aborted mid-call except the model request.
#[derive(Debug)]
pub struct SessionState {
    status: AtomicU8,
    watch_mode: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: AtomicU8::new(SessionStatus::Idle.to_u8()),
            watch_mode: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: SessionStatus) {
        self.status.store(status.to_u8(), Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    pub fn watch_mode(&self) -> bool {
        self.watch_mode.load(Ordering::SeqCst)
    }

    pub fn set_watch_mode(&self, on: bool) {
        self.watch_mode.store(on, Ordering::SeqCst);
    }

    /// Mark the session running under a fresh cancellation token and return it.
    pub fn begin_request(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.cancel.lock() {
            *slot = token.clone();
        }
        self.set_status(SessionStatus::Running);
        token
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .map(|t| t.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// What Ctrl-C does: stop the request, leave watch mode.
    pub fn interrupt(&self) {
        info!("interrupt received");
        self.set_status(SessionStatus::Idle);
        self.set_watch_mode(false);
        self.cancel_token().cancel();
    }
}

// ─── History ──────────────────────────────────────────────────────

/// Leads the squash request so the history never takes the system slot.
const SQUASH_SYSTEM: &str = "You condense a conversation between a user and a terminal assistant \
into a short summary the assistant can continue from.";

const SQUASH_PROMPT: &str = "Summarize the conversation so far for your own future reference. \
Keep the user's goals, decisions, commands that were run with their outcomes, and any open questions. \
Be concise. Reply with the summary only, without any XML tags.";

/// Conversation carried between turns. Append-only, except for `squash`
/// and `clear`.
#[derive(Debug, Default, Clone)]
pub struct SessionHistory {
    messages: Vec<ChatMessage>,
}

impl SessionHistory {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn token_estimate(&self) -> usize {
        self.messages.iter().map(|m| estimate_token_count(&m.content)).sum()
    }

    pub fn needs_squash(&self, max_context_size: usize) -> bool {
        self.token_estimate() > max_context_size
    }

    /// Replace the history with one model-written summary. On failure the
    /// history is kept as is and the error is logged; returns whether the
    /// history was squashed.
    pub async fn squash(
        &mut self,
        client: &impl ModelClient,
        model: &str,
        cancel: &CancellationToken,
    ) -> bool {
        if self.messages.is_empty() {
            return false;
        }
        let mut request = Vec::with_capacity(self.messages.len() + 2);
        request.push(ChatMessage::assistant(SQUASH_SYSTEM));
        request.extend_from_slice(&self.messages);
        request.push(ChatMessage::user(SQUASH_PROMPT));

        match complete_or_cancel(client, &request, model, cancel).await {
            Ok(summary) => {
                let before = self.token_estimate();
                self.messages = vec![ChatMessage::assistant(format!(
                    "Summary of the conversation so far:\n{}",
                    summary.trim()
                ))];
                info!(before, after = self.token_estimate(), "history squashed");
                true
            }
            Err(e) => {
                warn!(error = %e, "history squash failed, keeping full history");
                false
            }
        }
    }
}
