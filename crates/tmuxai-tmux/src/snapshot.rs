//! Bridge TmuxPaneInfo into the core PaneSnapshot.

use tmuxai_core::PaneSnapshot;

use crate::pane_info::TmuxPaneInfo;

/// Interactive shells whose prompt we know how to prepare or recognize.
const SHELL_CMDS: &[&str] = &["bash", "zsh", "fish", "sh", "dash", "ksh", "csh", "tcsh"];

/// Commands that open a shell on another host or container.
const SUB_SHELL_CMDS: &[&str] = &["ssh", "docker", "podman"];

pub fn is_shell_command(cmd: &str) -> bool {
    SHELL_CMDS.contains(&cmd)
}

pub fn is_sub_shell(cmd: &str) -> bool {
    SUB_SHELL_CMDS.contains(&cmd)
}

/// OS label shown for panes whose host we cannot know.
pub const SUB_SHELL_OS: &str = "OS Unknown (subshell)";

/// Convert TmuxPaneInfo into a PaneSnapshot without content.
///
/// `command_args` is the full argv of the pane's foreground process, when
/// known. `os` is the local OS label; sub-shell panes get [`SUB_SHELL_OS`].
/// Role flags (`is_tmuxai_pane`, `is_exec_pane`) are left to the caller.
pub fn to_pane_snapshot(pane: &TmuxPaneInfo, command_args: Option<String>, os: &str) -> PaneSnapshot {
    let is_sub_shell = is_sub_shell(&pane.current_cmd);
    PaneSnapshot {
        id: pane.pane_id.clone(),
        current_pid: pane.pane_pid,
        current_command: pane.current_cmd.clone(),
        current_command_args: command_args.unwrap_or_default(),
        shell: is_shell_command(&pane.current_cmd).then(|| pane.current_cmd.clone()),
        os: if is_sub_shell {
            SUB_SHELL_OS.to_string()
        } else {
            os.to_string()
        },
        is_active: pane.active,
        is_sub_shell,
        history_size: pane.history_size,
        history_limit: pane.history_limit,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_from_shell_pane() {
        let pane = TmuxPaneInfo {
            pane_id: "%1".to_string(),
            active: true,
            pane_pid: Some(77),
            current_cmd: "zsh".to_string(),
            history_size: 12,
            history_limit: 2000,
        };
        let snap = to_pane_snapshot(&pane, Some("-zsh".into()), "Linux - x86_64");
        assert_eq!(snap.id, "%1");
        assert_eq!(snap.current_pid, Some(77));
        assert_eq!(snap.shell.as_deref(), Some("zsh"));
        assert_eq!(snap.current_command_args, "-zsh");
        assert_eq!(snap.os, "Linux - x86_64");
        assert!(snap.is_active);
        assert!(!snap.is_sub_shell);
        assert_eq!(snap.history_limit, 2000);
        assert!(snap.content.is_empty());
    }

    #[test]
    fn sub_shell_hides_os() {
        let pane = TmuxPaneInfo {
            pane_id: "%2".to_string(),
            current_cmd: "ssh".to_string(),
            ..Default::default()
        };
        let snap = to_pane_snapshot(&pane, None, "Darwin - arm64");
        assert!(snap.is_sub_shell);
        assert_eq!(snap.shell, None);
        assert_eq!(snap.os, SUB_SHELL_OS);
    }

    #[test]
    fn shell_lists() {
        assert!(is_shell_command("fish"));
        assert!(!is_shell_command("vim"));
        assert!(is_sub_shell("podman"));
        assert!(!is_sub_shell("bash"));
    }
}
