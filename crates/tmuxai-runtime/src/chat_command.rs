//! Slash commands typed at the REPL prompt.
//!
//! The first word is matched by prefix, so `/he` is `/help` and `/w` is
//! `/watch`. Arguments keep the case the user typed.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Info,
    Prepare,
    Clear,
    Reset,
    Exit,
    Squash,
    Watch(String),
    WatchOff,
    /// `/watch` without a goal.
    WatchUsage,
    ConfigShow,
    ConfigGet(String),
    ConfigSet { key: String, value: String },
    Empty,
    Unknown(String),
}

pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

/// `prefix` abbreviates `target` ("/he" for "/help").
fn abbreviates(prefix: &str, target: &str) -> bool {
    target.starts_with(prefix)
}

pub fn parse_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let Some(first) = lower.split_whitespace().next() else {
        return ChatCommand::Empty;
    };

    match first {
        _ if abbreviates(first, "/help") => ChatCommand::Help,
        _ if abbreviates(first, "/info") => ChatCommand::Info,
        _ if abbreviates(first, "/prepare") => ChatCommand::Prepare,
        _ if abbreviates(first, "/clear") => ChatCommand::Clear,
        _ if abbreviates(first, "/reset") => ChatCommand::Reset,
        _ if abbreviates(first, "/exit") => ChatCommand::Exit,
        _ if lower == "/watch off" || lower == "/w off" => ChatCommand::WatchOff,
        _ if abbreviates(first, "/squash") => ChatCommand::Squash,
        _ if abbreviates(first, "/watch") => {
            if words.len() > 1 {
                ChatCommand::Watch(words[1..].join(" "))
            } else {
                ChatCommand::WatchUsage
            }
        }
        _ if abbreviates(first, "/config") => {
            let sub = words.get(1).map(|w| w.to_lowercase());
            match (sub.as_deref(), words.get(2)) {
                (Some("set"), Some(key)) => ChatCommand::ConfigSet {
                    key: key.to_lowercase(),
                    value: words[3..].join(" "),
                },
                (Some("get"), Some(key)) => ChatCommand::ConfigGet(key.to_lowercase()),
                _ => ChatCommand::ConfigShow,
            }
        }
        _ => ChatCommand::Unknown(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        assert_eq!(parse_command("/help"), ChatCommand::Help);
        assert_eq!(parse_command("/he"), ChatCommand::Help);
        assert_eq!(parse_command("/i"), ChatCommand::Info);
        assert_eq!(parse_command("/p"), ChatCommand::Prepare);
        assert_eq!(parse_command("/c"), ChatCommand::Clear);
        assert_eq!(parse_command("/co"), ChatCommand::ConfigShow);
        assert_eq!(parse_command("/r"), ChatCommand::Reset);
        assert_eq!(parse_command("/e"), ChatCommand::Exit);
        assert_eq!(parse_command("/s"), ChatCommand::Squash);
        assert_eq!(parse_command("  /EXIT  "), ChatCommand::Exit);
    }

    #[test]
    fn watch_keeps_goal_case() {
        assert_eq!(
            parse_command("/watch Tell me about Errors"),
            ChatCommand::Watch("Tell me about Errors".into())
        );
        assert_eq!(parse_command("/w spot typos"), ChatCommand::Watch("spot typos".into()));
        assert_eq!(parse_command("/watch"), ChatCommand::WatchUsage);
    }

    #[test]
    fn watch_off() {
        assert_eq!(parse_command("/watch off"), ChatCommand::WatchOff);
        assert_eq!(parse_command("/W OFF"), ChatCommand::WatchOff);
        assert_eq!(
            parse_command("/watch off the logs"),
            ChatCommand::Watch("off the logs".into())
        );
    }

    #[test]
    fn config_forms() {
        assert_eq!(parse_command("/config"), ChatCommand::ConfigShow);
        assert_eq!(
            parse_command("/config get Wait_Interval"),
            ChatCommand::ConfigGet("wait_interval".into())
        );
        assert_eq!(
            parse_command("/config set openrouter.model Anthropic/Claude Big"),
            ChatCommand::ConfigSet {
                key: "openrouter.model".into(),
                value: "Anthropic/Claude Big".into()
            }
        );
        assert_eq!(
            parse_command("/config set exec_confirm"),
            ChatCommand::ConfigSet {
                key: "exec_confirm".into(),
                value: String::new()
            }
        );
    }

    #[test]
    fn unknown_and_empty() {
        assert_eq!(parse_command("/frobnicate"), ChatCommand::Unknown("/frobnicate".into()));
        assert_eq!(parse_command("   "), ChatCommand::Empty);
        assert!(is_command(" /help"));
        assert!(!is_command("help me"));
    }
}
