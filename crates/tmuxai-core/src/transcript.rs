//! Exec-pane transcript parsing.
//!
//! A prepared pane prints a prompt of the form `…[<status>]» <command>`.
//! The status on a prompt line belongs to the command introduced by the
//! *previous* prompt line, so every prompt line finalizes the running record
//! before it (optionally) opens the next one.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::CommandExecRecord;

/// Glyph that ends a prepared prompt.
pub const PROMPT_TERMINATOR: &str = "»";

/// Group 1: status of the previous command. Group 2: next command (may be empty).
static PROMPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*\[(\d+)\]» ?(.*)$").expect("prompt regex is valid"));

/// True when `line` is a prepared prompt that is waiting for input.
pub fn is_idle_prompt(line: &str) -> bool {
    line.trim_end().ends_with(&format!("]{PROMPT_TERMINATOR}"))
}

/// Reconstruct the ordered command history from raw pane text.
pub fn parse_transcript(content: &str) -> Vec<CommandExecRecord> {
    let mut history = Vec::new();
    let mut current: Option<CommandExecRecord> = None;
    let mut output = String::new();

    for line in content.lines() {
        let Some(caps) = PROMPT_RE.captures(line) else {
            // Lines before the first command are discarded.
            if current.is_some() {
                output.push_str(line);
                output.push('\n');
            }
            continue;
        };

        if let Some(mut record) = current.take() {
            record.code = caps[1]
                .parse()
                .unwrap_or(CommandExecRecord::UNKNOWN_CODE);
            record.output = take_output(&mut output);
            history.push(record);
        }

        let command = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        if !command.is_empty() {
            current = Some(CommandExecRecord {
                command: command.to_string(),
                output: String::new(),
                code: CommandExecRecord::UNKNOWN_CODE,
            });
        }
    }

    // Transcript ended before the next prompt: status stays unknown.
    if let Some(mut record) = current {
        record.output = take_output(&mut output);
        history.push(record);
    }

    history
}

fn take_output(buf: &mut String) -> String {
    let out = buf.strip_suffix('\n').unwrap_or(buf.as_str()).to_string();
    buf.clear();
    out
}
