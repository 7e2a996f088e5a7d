//! Confirmation policy: decides whether an action needs a human yes.

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {list} pattern '{pattern}': {source}")]
pub struct PolicyError {
    pub list: &'static str,
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Outcome of the policy check, before any prompt is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmVerdict {
    AllowSilently,
    NeedsConfirmation,
}

/// Compiled allow (whitelist) and deny (blacklist) patterns.
#[derive(Debug, Clone, Default)]
pub struct ConfirmPolicy {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl ConfirmPolicy {
    /// Compile both lists. Empty patterns are ignored; invalid ones are
    /// skipped and returned so the caller can report them.
    pub fn compile(allow: &[String], deny: &[String]) -> (Self, Vec<PolicyError>) {
        let mut errors = Vec::new();
        let allow = compile_list("whitelist", allow, &mut errors);
        let deny = compile_list("blacklist", deny, &mut errors);
        (Self { allow, deny }, errors)
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        self.allow.iter().any(|re| re.is_match(command))
    }

    pub fn is_denied(&self, command: &str) -> bool {
        self.deny.iter().any(|re| re.is_match(command))
    }

    /// `confirm_kind` is the per-kind setting (`exec_confirm`,
    /// `send_keys_confirm`, `paste_multiline_confirm`). A deny match
    /// always asks, whatever that setting says.
    pub fn evaluate(&self, command: &str, confirm_kind: bool) -> ConfirmVerdict {
        let denied = self.is_denied(command);
        if denied {
            return ConfirmVerdict::NeedsConfirmation;
        }
        if self.is_allowed(command) || !confirm_kind {
            ConfirmVerdict::AllowSilently
        } else {
            ConfirmVerdict::NeedsConfirmation
        }
    }
}

fn compile_list(list: &'static str, patterns: &[String], errors: &mut Vec<PolicyError>) -> Vec<Regex> {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(source) => {
                errors.push(PolicyError {
                    list,
                    pattern: p.clone(),
                    source,
                });
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow: &[&str], deny: &[&str]) -> ConfirmPolicy {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let (policy, errors) = ConfirmPolicy::compile(&own(allow), &own(deny));
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        policy
    }

    #[test]
    fn allow_match_is_silent() {
        let p = policy(&["^ls"], &[]);
        assert_eq!(p.evaluate("ls -la", true), ConfirmVerdict::AllowSilently);
        assert_eq!(p.evaluate("rm foo", true), ConfirmVerdict::NeedsConfirmation);
    }

    #[test]
    fn deny_overrides_allow() {
        let p = policy(&[".*"], &["rm -rf"]);
        assert_eq!(p.evaluate("echo hi", true), ConfirmVerdict::AllowSilently);
        assert_eq!(p.evaluate("rm -rf /tmp/x", true), ConfirmVerdict::NeedsConfirmation);
    }

    #[test]
    fn deny_forces_confirmation_when_setting_is_off() {
        let p = policy(&[], &["^sudo"]);
        assert_eq!(p.evaluate("ls", false), ConfirmVerdict::AllowSilently);
        assert_eq!(p.evaluate("sudo reboot", false), ConfirmVerdict::NeedsConfirmation);
    }

    #[test]
    fn empty_lists_follow_setting() {
        let p = ConfirmPolicy::default();
        assert_eq!(p.evaluate("ls", true), ConfirmVerdict::NeedsConfirmation);
        assert_eq!(p.evaluate("ls", false), ConfirmVerdict::AllowSilently);
    }

    #[test]
    fn invalid_patterns_are_reported_and_skipped() {
        let (p, errors) = ConfirmPolicy::compile(
            &["(".to_string(), "^git status$".to_string(), String::new()],
            &["[".to_string()],
        );
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].list, "whitelist");
        assert_eq!(errors[1].list, "blacklist");
        assert!(errors[0].to_string().contains("'('"));
        assert!(p.is_allowed("git status"));
        assert!(!p.is_denied("anything"));
    }
}
