//! TmuxPaneInfo, list-panes format string, and parser.

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;
use serde::{Deserialize, Serialize};

/// Tab-delimited format string for `tmux list-panes -F`.
pub const LIST_PANES_FORMAT: &str = "#{pane_id}\t#{pane_active}\t#{pane_pid}\t#{pane_current_command}\t#{history_size}\t#{history_limit}";

/// Raw per-pane metadata as reported by tmux.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TmuxPaneInfo {
    pub pane_id: String,
    pub active: bool,
    pub pane_pid: Option<u32>,
    pub current_cmd: String,
    pub history_size: u32,
    pub history_limit: u32,
}

/// List the panes of one window (`target`, e.g. `"$1:@2"`).
pub fn list_window_panes(
    runner: &impl TmuxCommandRunner,
    target: &str,
) -> Result<Vec<TmuxPaneInfo>, TmuxError> {
    let output = runner.run(&["list-panes", "-t", target, "-F", LIST_PANES_FORMAT])?;
    parse_list_panes_output(&output)
}

/// Parse the raw output of `tmux list-panes -F <FORMAT>`.
pub fn parse_list_panes_output(output: &str) -> Result<Vec<TmuxPaneInfo>, TmuxError> {
    let mut panes = Vec::new();
    for (idx, line) in output.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        panes.push(parse_line(trimmed, idx + 1)?);
    }
    Ok(panes)
}

fn parse_line(line: &str, line_num: usize) -> Result<TmuxPaneInfo, TmuxError> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 4 {
        return Err(TmuxError::ParseError {
            line_num,
            detail: format!("expected at least 4 tab-separated fields, got {}", parts.len()),
        });
    }
    if !parts[0].starts_with('%') {
        return Err(TmuxError::ParseError {
            line_num,
            detail: format!("pane id {:?} does not start with '%'", parts[0]),
        });
    }

    let number = |idx: usize| parts.get(idx).and_then(|s| s.trim().parse::<u32>().ok());

    Ok(TmuxPaneInfo {
        pane_id: parts[0].to_string(),
        active: matches!(parts[1].trim(), "1" | "true"),
        pane_pid: number(2),
        current_cmd: parts[3].to_string(),
        history_size: number(4).unwrap_or(0),
        history_limit: number(5).unwrap_or(0),
    })
}
