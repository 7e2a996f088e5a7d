//! tmuxai: AI assistant living in a tmux pane.
//! Loads config, wires the tmux adapter, model client and terminal
//! operator into the orchestrator, then hands over to the REPL.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tmuxai_tmux::{TmuxAdapter, TmuxError};

mod ai_client;
mod chat_command;
mod cli;
mod config;
mod countdown;
mod operator;
mod orchestrator;
mod prompts;
mod repl;
mod session;
mod window;

use ai_client::OpenRouterClient;
use config::{Config, config_dir};
use operator::TerminalOperator;
use orchestrator::Orchestrator;
use repl::Repl;
use session::SessionState;
use window::WindowView;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let config = Config::load().context("failed to load config")?;
    let dir = config_dir()?;
    init_logging(&dir, config.debug)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tmuxai starting");

    let initial = args.initial_message().context("failed to read request file")?;

    let term = TmuxAdapter::from_env().map_err(|e| match e {
        TmuxError::NotInTmux => anyhow::anyhow!("tmuxai must be started inside a tmux session"),
        other => other.into(),
    })?;
    let window = WindowView::init(&term, args.exec_pane.as_deref()).context("failed to set up exec pane")?;
    let model = OpenRouterClient::new(&config.openrouter);

    let mut orchestrator = Orchestrator::new(
        term,
        model,
        TerminalOperator,
        config,
        window,
        Arc::new(SessionState::default()),
    );
    if orchestrator.config.debug {
        orchestrator = orchestrator.with_debug_dir(dir.join("debug"));
    }

    Repl::new(orchestrator).run(initial).await?;
    tracing::info!("tmuxai exiting");
    Ok(())
}

/// Logs go to `<dir>/tmuxai.log`; stdout belongs to the REPL.
fn init_logging(dir: &Path, debug: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("tmuxai.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let default = if debug { "debug" } else { "info" };
    let filter = std::env::var("TMUXAI_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| default.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
