//! Turn orchestrator: prompt the model, validate its reply, dispatch the
//! actions, decide whether to take another turn.
//!
//! One request is an explicit loop over turns. Every turn re-renders the
//! window, so the model always reasons about what the panes show now.

use std::fmt;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tmuxai_core::{
    ActionKind, AgentAction, ChatMessage, ConfirmPolicy, ConfirmVerdict, parse_response, validate,
};
use tmuxai_tmux::{TerminalAdapter, TmuxError};
use tracing::{debug, info, warn};

use crate::ai_client::{ModelClient, ModelError, complete_or_cancel};
use crate::config::Config;
use crate::countdown::CountdownEnd;
use crate::operator::{Operator, Resolution};
use crate::prompts;
use crate::session::{SessionHistory, SessionState, SessionStatus};
use crate::window::WindowView;

/// Pause after a plain send so the pane can catch up before the next capture.
const SETTLE: Duration = Duration::from_secs(1);

const CONTINUE_TEXT: &str = "sending updated pane(s) content";

/// Steps the model is told to follow on every watch cycle.
const WATCH_STEPS: &str = "
1. Find out if there is new content in the pane.
2. Comment considering only the new pane content.
";

// ─── Outcome ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingModel,
    Validating,
    Dispatching,
    WaitingPaneBusy,
    WaitingUserInput,
    Done,
}

impl TurnPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingModel => "awaiting_model",
            Self::Validating => "validating",
            Self::Dispatching => "dispatching",
            Self::WaitingPaneBusy => "waiting_pane_busy",
            Self::WaitingUserInput => "waiting_user_input",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Accomplished,
    WaitingForUser,
    /// The model had nothing (more) to say: no-comment, or a watch cycle.
    Yielded,
    /// The operator declined or interrupted an action.
    Declined,
    Canceled,
    Failed(String),
    TurnLimit,
}

/// What the dispatcher tells the loop.
enum Next {
    /// Take another turn with this text.
    Turn(String),
    Stop(TurnOutcome),
}

// ─── Orchestrator ─────────────────────────────────────────────────

pub struct Orchestrator<T, M, O> {
    pub term: T,
    pub model: M,
    pub operator: O,
    pub config: Config,
    pub policy: ConfirmPolicy,
    pub state: Arc<SessionState>,
    pub history: SessionHistory,
    pub window: WindowView,
    /// Where model exchanges are dumped when `config.debug` is on.
    pub debug_dir: Option<PathBuf>,
    phase: TurnPhase,
}

impl<T, M, O> Orchestrator<T, M, O>
where
    T: TerminalAdapter,
    M: ModelClient,
    O: Operator,
{
    pub fn new(
        term: T,
        model: M,
        operator: O,
        config: Config,
        window: WindowView,
        state: Arc<SessionState>,
    ) -> Self {
        let (policy, errors) =
            ConfirmPolicy::compile(&config.whitelist_patterns, &config.blacklist_patterns);
        for e in &errors {
            warn!(list = e.list, pattern = %e.pattern, error = %e.source, "skipping invalid pattern");
        }
        Self {
            term,
            model,
            operator,
            config,
            policy,
            state,
            history: SessionHistory::default(),
            window,
            debug_dir: None,
            phase: TurnPhase::Idle,
        }
    }

    pub fn with_debug_dir(mut self, dir: PathBuf) -> Self {
        self.debug_dir = Some(dir);
        self
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    fn enter(&mut self, phase: TurnPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "turn phase");
            self.phase = phase;
        }
    }

    /// Run one user request to completion under a fresh cancellation token.
    /// A request that ends while still marked running is set back to idle.
    pub async fn run_request(&mut self, text: &str) -> TurnOutcome {
        self.state.begin_request();
        let outcome = self.process(text).await;
        if self.state.is_running() {
            self.state.set_status(SessionStatus::Idle);
        }
        outcome
    }

    /// Watch `goal` until the user stops watching, the session stops, or the
    /// model reports the goal accomplished. Questions to the user keep the
    /// watch going.
    pub async fn run_watch(&mut self, goal: &str) -> TurnOutcome {
        self.state.begin_request();
        self.state.set_watch_mode(true);
        let text = format!("{WATCH_STEPS}{goal}");
        info!(goal, "watch mode started");

        let outcome = loop {
            if !self.state.is_running() || !self.state.watch_mode() {
                break TurnOutcome::Canceled;
            }
            let wait = self.config.wait_interval;
            if self.operator.countdown(wait, &self.state).await == CountdownEnd::Interrupted {
                break TurnOutcome::Canceled;
            }
            match self.process(&text).await {
                TurnOutcome::Yielded => continue,
                // A question in watch mode does not end the watch.
                TurnOutcome::WaitingForUser => {
                    self.state.set_status(SessionStatus::Running);
                    continue;
                }
                other => break other,
            }
        };

        self.state.set_watch_mode(false);
        if self.state.is_running() {
            self.state.set_status(SessionStatus::Idle);
        }
        info!(?outcome, "watch mode ended");
        outcome
    }

    /// The turn loop. Assumes the caller marked the session running.
    pub async fn process(&mut self, text: &str) -> TurnOutcome {
        let mut turn_text = text.to_string();
        let mut turns = 0usize;
        let mut corrections = 0usize;

        let outcome = loop {
            self.enter(TurnPhase::Idle);
            if !self.state.is_running() {
                break TurnOutcome::Canceled;
            }
            turns += 1;
            if turns > self.config.max_turns {
                warn!(max_turns = self.config.max_turns, "turn limit reached");
                self.operator.notice(&format!(
                    "Stopping after {} turns without finishing.",
                    self.config.max_turns
                ));
                self.state.set_status(SessionStatus::Idle);
                break TurnOutcome::TurnLimit;
            }
            self.squash_if_needed().await;

            self.enter(TurnPhase::AwaitingModel);
            let current = match self.compose_message(&turn_text) {
                Ok(m) => m,
                Err(e) => break self.fail(format!("Failed to read tmux panes: {e}")),
            };
            let mut sending = vec![self.system_prompt()];
            sending.extend_from_slice(self.history.messages());
            sending.push(current.clone());

            let cancel = self.state.cancel_token();
            let response = match complete_or_cancel(&self.model, &sending, &self.config.openrouter.model, &cancel).await {
                Ok(r) => r,
                Err(ModelError::Canceled) => {
                    self.state.set_status(SessionStatus::Idle);
                    break TurnOutcome::Canceled;
                }
                Err(e) => break self.fail(format!("Failed to get response from AI: {e}")),
            };
            if !self.state.is_running() {
                break TurnOutcome::Canceled;
            }
            if self.config.debug {
                self.dump_exchange(&sending, &response);
            }

            self.enter(TurnPhase::Validating);
            let action = parse_response(&response);
            debug!(%action, "parsed response");
            if let Err(violation) = validate(&action, self.state.watch_mode()) {
                corrections += 1;
                warn!(%violation, corrections, "response broke guidelines");
                if corrections > self.config.max_corrections {
                    break self.fail(format!(
                        "AI did not follow the guidelines after {} corrections, giving up.",
                        self.config.max_corrections
                    ));
                }
                self.operator.notice("AI didn't follow guidelines, trying again...");
                self.history.push(current);
                self.history.push(ChatMessage::assistant(response));
                turn_text = violation.corrective_message();
                continue;
            }
            corrections = 0;

            if !action.message.is_empty() {
                self.operator.show_reply(&action.message);
            }
            if !(action.exec_pane_seems_busy || action.no_comment) {
                self.history.push(current);
                self.history.push(ChatMessage::assistant(response));
            }

            self.enter(TurnPhase::Dispatching);
            match self.dispatch(&action).await {
                Next::Turn(text) => turn_text = text,
                Next::Stop(outcome) => break outcome,
            }
        };

        self.enter(TurnPhase::Done);
        info!(?outcome, turns, "request finished");
        outcome
    }

    fn fail(&mut self, message: String) -> TurnOutcome {
        warn!(error = %message, "request failed");
        self.operator.notice(&message);
        self.state.set_status(SessionStatus::Idle);
        TurnOutcome::Failed(message)
    }

    async fn squash_if_needed(&mut self) {
        if !self.history.needs_squash(self.config.max_context_size) {
            return;
        }
        self.operator.notice("Exceeded context size, squashing history...");
        self.squash().await;
    }

    /// Summarize the history into one message. Also backs `/squash`.
    pub async fn squash(&mut self) -> bool {
        let cancel = self.state.cancel_token();
        self.history
            .squash(&self.model, &self.config.openrouter.model, &cancel)
            .await
    }

    fn system_prompt(&self) -> ChatMessage {
        let text = if self.state.watch_mode() {
            prompts::watch(&self.config.prompts)
        } else {
            prompts::chat_assistant(&self.config.prompts, self.window.exec_pane.is_prepared)
        };
        ChatMessage::assistant(text)
    }

    /// Window state, environment hint, then the turn text.
    fn compose_message(&mut self, text: &str) -> Result<ChatMessage, TmuxError> {
        let window = self
            .window
            .render_state(&self.term, self.config.max_capture_lines)?;
        let hint = self.window.environment_hint();
        Ok(ChatMessage::user(format!("{window}\n\n{hint}\n\n{text}")))
    }

    // ─── Dispatch ─────────────────────────────────────────────────

    async fn dispatch(&mut self, action: &AgentAction) -> Next {
        let lines = self.config.max_capture_lines;

        for command in &action.exec_command {
            let command = match self.gate(ActionKind::ExecCommand, "Execute this command?", command, true).await {
                Ok(c) => c,
                Err(outcome) => return Next::Stop(outcome),
            };
            if let Err(outcome) = self.run_command(&command, lines).await {
                return Next::Stop(outcome);
            }
        }

        for keys in &action.send_keys {
            let keys = match self.gate(ActionKind::SendKeys, "Send this key(s)?", keys, true).await {
                Ok(k) => k,
                Err(outcome) => return Next::Stop(outcome),
            };
            if let Err(e) = self.term.send_keys(&self.window.exec_pane.id, &keys) {
                return Next::Stop(self.fail(format!("Failed to send keys: {e}")));
            }
            tokio::time::sleep(SETTLE).await;
        }

        let mut waited = None;
        if action.exec_pane_seems_busy {
            self.enter(TurnPhase::WaitingPaneBusy);
            let wait = self.config.wait_interval;
            if self.operator.countdown(wait, &self.state).await == CountdownEnd::Interrupted {
                return Next::Stop(TurnOutcome::Canceled);
            }
            self.enter(TurnPhase::Dispatching);
            waited = Some(wait);
        }

        if !action.paste_multiline_content.is_empty() {
            let content = &action.paste_multiline_content;
            let content = match self.gate(ActionKind::PasteMultiline, "Paste multiline content?", content, false).await {
                Ok(c) => c,
                Err(outcome) => return Next::Stop(outcome),
            };
            if let Err(e) = self.term.send_command(&self.window.exec_pane.id, &content) {
                return Next::Stop(self.fail(format!("Failed to paste content: {e}")));
            }
            tokio::time::sleep(SETTLE).await;
        }

        if !action.exec_and_wait.is_empty() {
            let command = match self.gate(ActionKind::ExecAndWait, "Execute this command?", &action.exec_and_wait, true).await {
                Ok(c) => c,
                Err(outcome) => return Next::Stop(outcome),
            };
            if let Err(outcome) = self.run_command(&command, lines).await {
                return Next::Stop(outcome);
            }
        }

        if let Some(wait) = waited {
            return Next::Turn(format!(
                "waited for {wait} more seconds, here is the current pane(s) content"
            ));
        }
        if action.request_accomplished {
            self.state.set_status(SessionStatus::Idle);
            return Next::Stop(TurnOutcome::Accomplished);
        }
        if action.waiting_for_user_response {
            self.enter(TurnPhase::WaitingUserInput);
            self.state.set_status(SessionStatus::Waiting);
            return Next::Stop(TurnOutcome::WaitingForUser);
        }
        if action.no_comment || self.state.watch_mode() {
            return Next::Stop(TurnOutcome::Yielded);
        }
        Next::Turn(CONTINUE_TEXT.to_string())
    }

    /// Pass `text` through the confirmation policy and, when needed, the
    /// operator. Returns the text to act on.
    async fn gate(&mut self, kind: ActionKind, prompt: &str, text: &str, editable: bool) -> Result<String, TurnOutcome> {
        let verdict = self.policy.evaluate(text, self.config.confirm_for(kind));
        let resolution = match verdict {
            ConfirmVerdict::AllowSilently => {
                self.operator.show_action(kind.as_str(), text);
                Resolution::Approved(text.to_string())
            }
            ConfirmVerdict::NeedsConfirmation => self.operator.confirm(prompt, text, editable).await,
        };
        debug!(%kind, ?verdict, ?resolution, "confirmation");
        match resolution {
            Resolution::Approved(text) => Ok(text),
            Resolution::Declined => {
                self.state.set_status(SessionStatus::Idle);
                Err(TurnOutcome::Declined)
            }
            Resolution::Interrupted => {
                self.state.interrupt();
                Err(TurnOutcome::Declined)
            }
        }
    }

    /// Prepared panes: wait for the prompt to return. Otherwise send and
    /// give the pane a moment.
    async fn run_command(&mut self, command: &str, lines: u32) -> Result<(), TurnOutcome> {
        if self.window.exec_pane.is_prepared {
            match self
                .window
                .exec_wait_capture(&self.term, command, lines, &self.state)
                .await
            {
                Ok(Some(_)) => Ok(()),
                Ok(None) => Err(TurnOutcome::Canceled),
                Err(e) => Err(self.fail(format!("Failed to run command: {e}"))),
            }
        } else {
            if let Err(e) = self.term.send_command(&self.window.exec_pane.id, command) {
                return Err(self.fail(format!("Failed to run command: {e}")));
            }
            tokio::time::sleep(SETTLE).await;
            Ok(())
        }
    }

    // ─── Debug dump ───────────────────────────────────────────────

    fn dump_exchange(&self, sent: &[ChatMessage], response: &str) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let path = dir.join(format!(
            "debug-{}.txt",
            chrono::Local::now().format("%Y%m%d-%H%M%S")
        ));
        let text = format_exchange(sent, response);
        let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, text));
        match written {
            Ok(()) => debug!(path = %path.display(), "wrote debug dump"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write debug dump"),
        }
    }
}

pub fn format_exchange(sent: &[ChatMessage], response: &str) -> String {
    let mut out = String::from("==================    SENT CHAT MESSAGES ==================\n\n");
    for (i, msg) in sent.iter().enumerate() {
        let role = if msg.from_user { "user" } else { "assistant" };
        let _ = write!(
            out,
            "Message {}: Role={}, Time={}\nContent:\n{}\n\n",
            i + 1,
            role,
            msg.timestamp.to_rfc3339(),
            msg.content
        );
    }
    out.push_str("==================    RECEIVED RESPONSE ==================\n\n");
    out.push_str(response);
    out.push_str("\n\n==================    END DEBUG ==================\n");
    out
}
