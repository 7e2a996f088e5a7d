//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "tmuxai",
    version,
    about = "AI assistant that watches and drives your tmux panes"
)]
pub struct Cli {
    /// Initial request; the interactive prompt follows
    pub message: Vec<String>,

    /// Read the initial request from a file
    #[arg(long, short = 'f', conflicts_with = "message")]
    pub file: Option<PathBuf>,

    /// Pane to run commands in (default: first other pane in the window)
    #[arg(long)]
    pub exec_pane: Option<String>,
}

impl Cli {
    /// The initial request from the arguments or `--file`, if any.
    pub fn initial_message(&self) -> std::io::Result<Option<String>> {
        if let Some(path) = &self.file {
            let text = std::fs::read_to_string(path)?;
            return Ok(Some(text.trim().to_string()).filter(|t| !t.is_empty()));
        }
        if self.message.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.message.join(" ")))
    }
}
