//! Errors at the tmux boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    /// tmux ran and exited non-zero.
    #[error("tmux {subcommand} exited with {code}: {stderr}")]
    Exited {
        subcommand: String,
        code: i32,
        stderr: String,
    },

    /// The target pane was closed under us.
    #[error("pane {0} no longer exists")]
    PaneGone(String),

    /// tmux answered, but not with what the caller needed.
    #[error("unexpected tmux output: {0}")]
    CommandFailed(String),

    #[error("failed to parse list-panes line {line_num}: {detail}")]
    ParseError { line_num: usize, detail: String },

    #[error("not running inside tmux")]
    NotInTmux,

    #[error("could not run tmux: {0}")]
    Io(#[from] std::io::Error),
}
