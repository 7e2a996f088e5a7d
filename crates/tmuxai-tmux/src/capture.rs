//! Pane content capture and keystroke injection.

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Named keys tmux understands without `-l`.
const KEY_NAMES: &[&str] = &[
    "Up", "Down", "Left", "Right", "BSpace", "BTab", "DC", "End", "Enter", "Escape", "Home",
    "IC", "NPage", "PageDown", "PgDn", "PPage", "PageUp", "PgUp", "Space", "Tab", "F1", "F2",
    "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
];

/// True for a tmux key name (`Enter`, `F5`) or a modified key (`C-c`, `M-x`, `S-Tab`).
pub fn is_key_name(token: &str) -> bool {
    if KEY_NAMES.contains(&token) {
        return true;
    }
    let mut rest = token;
    let mut modified = false;
    while let Some(tail) = rest
        .strip_prefix("C-")
        .or_else(|| rest.strip_prefix("M-"))
        .or_else(|| rest.strip_prefix("S-"))
    {
        rest = tail;
        modified = true;
    }
    modified && (rest.chars().count() == 1 || KEY_NAMES.contains(&rest))
}

/// Capture the last `lines` lines of a pane, without tmux's blank padding.
pub fn capture_pane(
    runner: &impl TmuxCommandRunner,
    pane_id: &str,
    lines: u32,
) -> Result<String, TmuxError> {
    let start_line = format!("-{lines}");
    let output = runner.run(&["capture-pane", "-p", "-t", pane_id, "-S", &start_line])?;
    Ok(output.trim_end_matches(['\n', ' ']).to_string())
}

/// Send one keystroke entry. Key names are sent as keys, anything else literally.
pub fn send_keys(runner: &impl TmuxCommandRunner, pane_id: &str, keys: &str) -> Result<(), TmuxError> {
    if keys.is_empty() {
        return Ok(());
    }
    if is_key_name(keys) {
        runner.run(&["send-keys", "-t", pane_id, keys])?;
    } else {
        runner.run(&["send-keys", "-t", pane_id, "-l", keys])?;
    }
    Ok(())
}

/// Type `text` into the pane, pressing Enter after every line.
pub fn send_command(
    runner: &impl TmuxCommandRunner,
    pane_id: &str,
    text: &str,
) -> Result<(), TmuxError> {
    for line in text.split('\n') {
        if !line.is_empty() {
            runner.run(&["send-keys", "-t", pane_id, "-l", line])?;
        }
        runner.run(&["send-keys", "-t", pane_id, "Enter"])?;
    }
    Ok(())
}

/// Split `target` horizontally without focusing the new pane; returns its id.
pub fn new_pane(runner: &impl TmuxCommandRunner, target: &str) -> Result<String, TmuxError> {
    let output = runner.run(&["split-window", "-d", "-h", "-t", target, "-P", "-F", "#{pane_id}"])?;
    let id = output.trim();
    if id.is_empty() {
        return Err(TmuxError::CommandFailed("split-window returned no pane id".into()));
    }
    Ok(id.to_string())
}

/// Clear the visible screen and the scrollback.
pub fn clear_pane(runner: &impl TmuxCommandRunner, pane_id: &str) -> Result<(), TmuxError> {
    runner.run(&["send-keys", "-t", pane_id, "C-l"])?;
    runner.run(&["clear-history", "-t", pane_id])?;
    Ok(())
}

/// Print a format string in the context of `pane_id`.
pub fn display(runner: &impl TmuxCommandRunner, pane_id: &str, format: &str) -> Result<String, TmuxError> {
    let output = runner.run(&["display-message", "-p", "-t", pane_id, format])?;
    Ok(output.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Vec<String>>>,
        reply: String,
    }

    impl TmuxCommandRunner for Recorder {
        fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
            self.calls
                .lock()
                .expect("lock")
                .push(args.iter().map(|s| s.to_string()).collect());
            Ok(self.reply.clone())
        }
    }

    impl Recorder {
        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[test]
    fn key_names() {
        assert!(is_key_name("Enter"));
        assert!(is_key_name("C-c"));
        assert!(is_key_name("M-a"));
        assert!(is_key_name("C-M-Left"));
        assert!(is_key_name("F12"));
        assert!(!is_key_name("ls -la"));
        assert!(!is_key_name("enter"));
        assert!(!is_key_name("C-"));
        assert!(!is_key_name(":set paste"));
    }

    #[test]
    fn capture_strips_padding() {
        let r = Recorder {
            reply: "line 1\nline 2\n\n\n".into(),
            ..Default::default()
        };
        let content = capture_pane(&r, "%1", 200).expect("should capture");
        assert_eq!(content, "line 1\nline 2");
        assert_eq!(r.calls()[0], ["capture-pane", "-p", "-t", "%1", "-S", "-200"]);
    }

    #[test]
    fn send_keys_literal_vs_named() {
        let r = Recorder::default();
        send_keys(&r, "%1", "vim notes.txt").expect("send");
        send_keys(&r, "%1", "Escape").expect("send");
        send_keys(&r, "%1", "").expect("send");
        let calls = r.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ["send-keys", "-t", "%1", "-l", "vim notes.txt"]);
        assert_eq!(calls[1], ["send-keys", "-t", "%1", "Escape"]);
    }

    #[test]
    fn send_command_presses_enter_per_line() {
        let r = Recorder::default();
        send_command(&r, "%2", "line a\n\nline b").expect("send");
        let calls = r.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], ["send-keys", "-t", "%2", "-l", "line a"]);
        assert_eq!(calls[1], ["send-keys", "-t", "%2", "Enter"]);
        assert_eq!(calls[2], ["send-keys", "-t", "%2", "Enter"]);
        assert_eq!(calls[4], ["send-keys", "-t", "%2", "Enter"]);
    }

    #[test]
    fn new_pane_returns_id() {
        let r = Recorder {
            reply: "%7\n".into(),
            ..Default::default()
        };
        assert_eq!(new_pane(&r, "%0").expect("split"), "%7");
    }

    #[test]
    fn new_pane_without_id_fails() {
        let r = Recorder::default();
        assert!(new_pane(&r, "%0").is_err());
    }

    #[test]
    fn clear_sends_ctrl_l_and_clears_history() {
        let r = Recorder::default();
        clear_pane(&r, "%4").expect("clear");
        let calls = r.calls();
        assert_eq!(calls[0], ["send-keys", "-t", "%4", "C-l"]);
        assert_eq!(calls[1], ["clear-history", "-t", "%4"]);
    }
}
