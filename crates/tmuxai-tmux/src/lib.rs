//! tmuxai-tmux: tmux IO boundary.
//! Subprocess execution, pane listing and capture, key and command
//! injection, and shell prompt preparation. No agent logic.

pub mod adapter;
pub mod capture;
pub mod error;
pub mod executor;
pub mod host;
pub mod pane_info;
pub mod prepare;
pub mod snapshot;

pub use adapter::{TerminalAdapter, TmuxAdapter};
pub use error::TmuxError;
pub use executor::{TmuxCommandRunner, TmuxExecutor};
pub use pane_info::{LIST_PANES_FORMAT, TmuxPaneInfo, list_window_panes, parse_list_panes_output};
pub use prepare::prompt_install_command;
pub use snapshot::{is_shell_command, is_sub_shell, to_pane_snapshot};
