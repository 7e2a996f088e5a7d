//! Structural checks a parsed response must pass before any action runs.

use thiserror::Error;

use crate::types::AgentAction;

/// Longest accepted `ExecCommand` or `TmuxSendKeys` entry, in characters.
pub const MAX_COMMAND_LEN: usize = 120;

/// Most `TmuxSendKeys` entries accepted in one response.
pub const MAX_SEND_KEYS: usize = 5;

/// First guideline a response broke. The `Display` text is the corrective
/// message fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuidelineViolation {
    #[error(
        "You didn't follow the guidelines. Only one boolean flag should be set to true in your response. Pay attention!"
    )]
    MultipleFlags { count: usize },

    #[error(
        "You didn't follow the guidelines. You can only use one type of XML tag in your response. Pay attention!"
    )]
    MixedActionKinds { count: usize },

    #[error(
        "You didn't follow the guidelines. You must use at least one XML tag in your response. Pay attention!"
    )]
    MissingTag,

    #[error(
        "You didn't follow the guidelines. ExecCommand is {len} characters long, the limit is {MAX_COMMAND_LEN}. Use shorter commands. Pay attention!"
    )]
    CommandTooLong { len: usize },

    #[error(
        "You didn't follow the guidelines. A TmuxSendKeys entry is {len} characters long, the limit is {MAX_COMMAND_LEN}. Pay attention!"
    )]
    SendKeysTooLong { len: usize },

    #[error(
        "You didn't follow the guidelines. You sent {count} TmuxSendKeys tags, the limit is {MAX_SEND_KEYS} per response. Pay attention!"
    )]
    TooManySendKeys { count: usize },
}

impl GuidelineViolation {
    pub fn corrective_message(&self) -> String {
        self.to_string()
    }
}

/// Check `action` in order, stopping at the first violation.
///
/// Watch mode relaxes only the "at least one tag" rule: a silent
/// observation is allowed to carry plain prose.
pub fn validate(action: &AgentAction, watch_mode: bool) -> Result<(), GuidelineViolation> {
    let flags = action.flag_count();
    if flags > 1 {
        return Err(GuidelineViolation::MultipleFlags { count: flags });
    }

    let kinds = action.action_kinds().len();
    if kinds > 1 {
        return Err(GuidelineViolation::MixedActionKinds { count: kinds });
    }

    if !watch_mode && flags + kinds == 0 {
        return Err(GuidelineViolation::MissingTag);
    }

    if let Some(len) = longest_over_limit(&action.exec_command) {
        return Err(GuidelineViolation::CommandTooLong { len });
    }
    if let Some(len) = longest_over_limit(&action.send_keys) {
        return Err(GuidelineViolation::SendKeysTooLong { len });
    }

    if action.send_keys.len() > MAX_SEND_KEYS {
        return Err(GuidelineViolation::TooManySendKeys {
            count: action.send_keys.len(),
        });
    }

    Ok(())
}

/// Character length of the first entry above the limit.
fn longest_over_limit(entries: &[String]) -> Option<usize> {
    entries
        .iter()
        .map(|e| e.chars().count())
        .find(|&len| len > MAX_COMMAND_LEN)
}
