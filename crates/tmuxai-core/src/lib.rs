//! tmuxai-core: agent protocol engine.
//! Transcript parsing, tagged-response parsing, guideline validation and
//! confirmation policy. Pure functions over strings, no IO.

pub mod confirm;
pub mod entity;
pub mod guideline;
pub mod protocol;
pub mod tokens;
pub mod transcript;
pub mod types;

pub use confirm::{ConfirmPolicy, ConfirmVerdict, PolicyError};
pub use guideline::{GuidelineViolation, MAX_COMMAND_LEN, MAX_SEND_KEYS, validate};
pub use protocol::parse_response;
pub use tokens::estimate_token_count;
pub use transcript::{PROMPT_TERMINATOR, parse_transcript};
pub use types::{ActionKind, AgentAction, ChatMessage, CommandExecRecord, PaneSnapshot};
