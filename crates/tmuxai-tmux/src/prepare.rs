//! Prompt installation for the exec pane.
//!
//! A prepared prompt ends with `[<status>]» ` so the transcript parser can
//! split commands and recover exit codes.

/// Shell command that installs the status-carrying prompt, or `None` when
/// the shell is not supported.
pub fn prompt_install_command(shell: &str) -> Option<&'static str> {
    match shell {
        "zsh" => Some(r"export PROMPT='%n@%m:%~[%T][%?]» '"),
        "bash" => Some(r"export PS1='\u@\h:\w[\A][$?]» '"),
        "fish" => Some(
            r#"function fish_prompt; set -l s $status; printf '%s@%s:%s[%s][%d]» ' $USER (hostname -s) (prompt_pwd) (date +"%H:%M") $s; end"#,
        ),
        _ => None,
    }
}

/// Key sent after installing the prompt so the screen starts clean.
pub const CLEAR_SCREEN_KEY: &str = "C-l";

#[cfg(test)]
mod tests {
    use super::*;
    use tmuxai_core::PROMPT_TERMINATOR;

    #[test]
    fn supported_shells() {
        for shell in ["zsh", "bash", "fish"] {
            let cmd = prompt_install_command(shell).expect("supported");
            assert!(cmd.contains(PROMPT_TERMINATOR), "{shell}: {cmd}");
        }
    }

    #[test]
    fn bash_prompt_exact() {
        assert_eq!(
            prompt_install_command("bash"),
            Some(r"export PS1='\u@\h:\w[\A][$?]» '")
        );
    }

    #[test]
    fn unsupported_shells() {
        assert_eq!(prompt_install_command("ksh"), None);
        assert_eq!(prompt_install_command("python"), None);
    }
}
