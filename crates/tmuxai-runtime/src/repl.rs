//! Interactive loop: read a line, run it as a slash command or a request.

use std::fmt::Write as _;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use anyhow::Context;
use crossterm::style::Stylize;
use tmuxai_core::PaneSnapshot;
use tmuxai_tmux::TerminalAdapter;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ai_client::ModelClient;
use crate::chat_command::{ChatCommand, is_command, parse_command};
use crate::config::{Config, ConfigKey};
use crate::operator::Operator;
use crate::orchestrator::{Orchestrator, TurnOutcome};
use crate::prompts::HELP;
use crate::session::{SessionState, SessionStatus};
use crate::window::PrepareOutcome;

const LABEL_WIDTH: usize = 18;

pub struct Repl<T, M, O> {
    pub orchestrator: Orchestrator<T, M, O>,
}

impl<T, M, O> Repl<T, M, O>
where
    T: TerminalAdapter,
    M: ModelClient,
    O: Operator,
{
    pub fn new(orchestrator: Orchestrator<T, M, O>) -> Self {
        Self { orchestrator }
    }

    fn prompt(&self) -> String {
        match self.orchestrator.state.status() {
            SessionStatus::Waiting => format!("{} » ", "TmuxAI [waiting]".cyan()),
            _ => format!("{} » ", "TmuxAI".cyan()),
        }
    }

    /// Run `initial` (if any), then read stdin until EOF or `/exit`.
    pub async fn run(&mut self, initial: Option<String>) -> anyhow::Result<()> {
        println!();
        println!("Type '/help' for a list of commands, '/exit' to quit");
        println!();

        if let Some(message) = initial.filter(|m| !m.trim().is_empty()) {
            println!("{}{}", self.prompt(), message);
            if self.handle_input(&message).await.is_break() {
                return Ok(());
            }
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("{}", self.prompt());
            flush_stdout();
            let line = tokio::select! {
                line = lines.next_line() => line.context("failed to read input")?,
                _ = tokio::signal::ctrl_c() => {
                    // Ctrl-C at the prompt only clears the line.
                    println!();
                    continue;
                }
            };
            let Some(line) = line else {
                println!();
                return Ok(());
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if input == "exit" || input == "quit" {
                return Ok(());
            }
            debug!(input, "processing input");
            if self.handle_input(input).await.is_break() {
                return Ok(());
            }
        }
    }

    pub async fn handle_input(&mut self, input: &str) -> ControlFlow<()> {
        if is_command(input) {
            return self.handle_command(parse_command(input)).await;
        }
        self.request(input).await;
        ControlFlow::Continue(())
    }

    async fn request(&mut self, text: &str) -> TurnOutcome {
        let state = self.orchestrator.state.clone();
        with_interrupt_listener(state, self.orchestrator.run_request(text)).await
    }

    async fn watch(&mut self, goal: &str) -> TurnOutcome {
        let state = self.orchestrator.state.clone();
        with_interrupt_listener(state, self.orchestrator.run_watch(goal)).await
    }

    pub async fn handle_command(&mut self, command: ChatCommand) -> ControlFlow<()> {
        info!(?command, "chat command");
        let o = &mut self.orchestrator;
        match command {
            ChatCommand::Empty => println!("Empty command"),
            ChatCommand::Help => println!("{HELP}"),
            ChatCommand::Info => match format_info(o) {
                Ok(text) => println!("{text}"),
                Err(e) => println!("Failed to read tmux panes: {e}"),
            },
            ChatCommand::Prepare => {
                let lines = o.config.max_capture_lines;
                match o.window.prepare(&o.term, lines) {
                    Ok(PrepareOutcome::UnsupportedShell(shell)) => {
                        println!("Shell '{shell}' is not supported, only bash, zsh and fish can be prepared");
                    }
                    Ok(_) => {
                        // Give the shell a moment to redraw its prompt.
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        if let Err(e) = o.window.refresh_exec(&o.term, lines) {
                            warn!(error = %e, "exec pane refresh failed");
                        }
                        if o.window.exec_pane.is_prepared {
                            println!("Exec pane prepared successfully");
                        }
                        println!("{}", format_pane(&o.window.exec_pane));
                        o.window.exec_history = tmuxai_core::parse_transcript(&o.window.exec_pane.content);
                        for rec in &o.window.exec_history {
                            debug!(command = %rec.command, code = rec.code, "exec history");
                        }
                    }
                    Err(e) => println!("Failed to prepare exec pane: {e}"),
                }
            }
            ChatCommand::Clear => {
                o.history.clear();
                if let Err(e) = o.term.clear_pane(&o.window.tmuxai_pane) {
                    warn!(error = %e, "clear failed");
                }
            }
            ChatCommand::Reset => {
                o.state.set_status(SessionStatus::Idle);
                o.history.clear();
                for pane in [&o.window.tmuxai_pane, &o.window.exec_pane.id] {
                    if let Err(e) = o.term.clear_pane(pane) {
                        warn!(pane = %pane, error = %e, "clear failed");
                    }
                }
            }
            ChatCommand::Exit => {
                info!("exit command received");
                return ControlFlow::Break(());
            }
            ChatCommand::WatchOff => {
                o.state.set_watch_mode(false);
                println!("Watch mode disabled");
            }
            ChatCommand::Squash => {
                o.state.begin_request();
                if o.squash().await {
                    println!("History squashed into a summary");
                } else {
                    println!("Nothing was squashed");
                }
                o.state.set_status(SessionStatus::Idle);
            }
            ChatCommand::Watch(goal) => {
                println!("Watch mode enabled with description: {goal}");
                self.watch(&goal).await;
            }
            ChatCommand::WatchUsage => println!("Usage: /watch <description>"),
            ChatCommand::ConfigShow => println!("{}", format_config(&o.config)),
            ChatCommand::ConfigGet(key) => match key.parse::<ConfigKey>() {
                Ok(k) => println!("{k} = {}", k.get(&o.config)),
                Err(_) => println!("{}", disallowed_key(&key)),
            },
            ChatCommand::ConfigSet { key, value } => match key.parse::<ConfigKey>() {
                Ok(k) => match k.set(&mut o.config, &value) {
                    Ok(()) => {
                        info!(key = %k, value = %value, "session override");
                        println!("Set {k} = {}", k.get(&o.config));
                    }
                    Err(e) => println!("{e}"),
                },
                Err(_) => println!("{}", disallowed_key(&key)),
            },
            ChatCommand::Unknown(input) => {
                println!("Unknown command: {input}. Type '/help' to see available commands.");
            }
        }
        ControlFlow::Continue(())
    }
}

/// Drive `work` with a Ctrl-C listener alive for its duration. Ctrl-C
/// interrupts the session; `work` notices at its next state check.
async fn with_interrupt_listener<F: Future>(state: Arc<SessionState>, work: F) -> F::Output {
    let done = CancellationToken::new();
    let listener = tokio::spawn({
        let done = done.clone();
        async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        println!("canceling...");
                        state.interrupt();
                    }
                }
                () = done.cancelled() => {}
            }
        }
    });

    let output = work.await;
    done.cancel();
    if let Err(e) = listener.await {
        warn!(error = %e, "interrupt listener failed");
    }
    output
}

fn flush_stdout() {
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

fn disallowed_key(key: &str) -> String {
    let allowed: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
    format!(
        "Cannot set '{key}'. Only these keys are allowed: {}",
        allowed.join(", ")
    )
}

// ─── Formatting ───────────────────────────────────────────────────

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{label:<LABEL_WIDTH$}  {value}");
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

/// `██░░░░░░░░ 20.0%`
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = (((percent / 100.0) * width as f64) as usize).min(width);
    format!(
        "{}{} {percent:.1}%",
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

pub fn format_pane(pane: &PaneSnapshot) -> String {
    let id = pane.id.replace('%', "");
    let title = if pane.is_tmuxai_pane {
        format!("{id}: TmuxAI")
    } else if pane.is_exec_pane {
        format!("{id}: TmuxAI Exec Pane")
    } else {
        format!("{id}: Read Only")
    };
    let mut out = format!("Pane {title}\n");
    line(&mut out, "Command", &pane.current_command);
    if !pane.current_command_args.is_empty() {
        line(&mut out, "Args", &pane.current_command_args);
    }
    line(&mut out, "Shell", pane.shell.as_deref().unwrap_or_default());
    line(&mut out, "OS", &pane.os);
    line(&mut out, "Active", yes_no(pane.is_active));
    line(&mut out, "TmuxAI", yes_no(pane.is_tmuxai_pane));
    line(&mut out, "Exec Pane", yes_no(pane.is_exec_pane));
    line(&mut out, "Prepared", yes_no(pane.is_prepared));
    line(&mut out, "Sub Shell", yes_no(pane.is_sub_shell));
    out
}

pub fn format_info<T, M, O>(o: &mut Orchestrator<T, M, O>) -> Result<String, tmuxai_tmux::TmuxError>
where
    T: TerminalAdapter,
    M: ModelClient,
    O: Operator,
{
    let mut out = String::from("\nGeneral\n");
    line(&mut out, "Version", env!("CARGO_PKG_VERSION"));
    line(&mut out, "Max Capture Lines", o.config.max_capture_lines);
    line(&mut out, "Wait Interval", o.config.wait_interval);

    out.push_str("\nContext\n");
    line(&mut out, "Messages", o.history.len());
    let tokens = o.history.token_estimate();
    let max = o.config.max_context_size;
    let percent = if max > 0 {
        tokens as f64 / max as f64 * 100.0
    } else {
        0.0
    };
    line(&mut out, "Context Size~", format!("{tokens} tokens"));
    line(&mut out, "", progress_bar(percent, 10));
    line(&mut out, "Max Size", format!("{max} tokens"));

    out.push_str("\nTmux Window Panes\n");
    let panes = o.window.panes(&o.term, o.config.max_capture_lines)?;
    for pane in &panes {
        out.push_str(&format_pane(pane));
        out.push('\n');
    }
    Ok(out)
}

/// Effective configuration as TOML, with the API key masked.
pub fn format_config(config: &Config) -> String {
    let mut shown = config.clone();
    if !shown.openrouter.api_key.is_empty() {
        shown.openrouter.api_key = "********".into();
    }
    toml::to_string_pretty(&shown).unwrap_or_else(|e| format!("failed to render config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(progress_bar(0.0, 10), "░░░░░░░░░░ 0.0%");
        assert_eq!(progress_bar(25.0, 10), "██░░░░░░░░ 25.0%");
        assert_eq!(progress_bar(250.0, 4), "████ 250.0%");
    }

    #[test]
    fn pane_info_block() {
        let pane = PaneSnapshot {
            id: "%3".into(),
            current_command: "zsh".into(),
            shell: Some("zsh".into()),
            os: "Linux".into(),
            is_exec_pane: true,
            is_prepared: true,
            ..Default::default()
        };
        let text = format_pane(&pane);
        assert!(text.starts_with("Pane 3: TmuxAI Exec Pane\n"));
        assert!(text.contains("Shell               zsh\n"));
        assert!(text.contains("Prepared            yes\n"));
        assert!(text.contains("Sub Shell           no\n"));
        assert!(!text.contains("Args"));
    }

    #[test]
    fn config_masks_api_key() {
        let mut config = Config::default();
        config.openrouter.api_key = "sk-secret".into();
        let text = format_config(&config);
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("max_capture_lines = 200"));
        assert!(text.contains("[openrouter]"));
    }

    #[test]
    fn disallowed_key_lists_allowed() {
        let text = disallowed_key("debug");
        assert!(text.starts_with("Cannot set 'debug'. Only these keys are allowed: max_capture_lines,"));
        assert!(text.ends_with("openrouter.model"));
    }
}
