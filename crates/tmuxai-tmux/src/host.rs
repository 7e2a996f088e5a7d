//! Local host probes: foreground process argv and OS label.

use std::process::Command;

use tracing::warn;

fn ps_command(pid: &str) -> Option<String> {
    let output = Command::new("ps")
        .args(["-p", pid, "-o", "command="])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Full command line of the process in a pane. Login shells (argv starting
/// with `-`) are looked through to their first non-shell child.
pub fn process_args(pid: u32) -> Option<String> {
    let pid = pid.to_string();
    let Some(own) = ps_command(&pid) else {
        warn!(%pid, "failed to read process command");
        return None;
    };
    if !own.starts_with('-') {
        return Some(own);
    }

    let children = Command::new("pgrep").args(["-P", &pid]).output().ok();
    let child = children
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|child| ps_command(child.trim()))
        .find(|cmd| !cmd.is_empty() && !cmd.starts_with('-'));
    Some(child.unwrap_or(own))
}

/// Human-readable OS label, e.g. `"Ubuntu 24.04 LTS (ubuntu) - x86_64"`.
pub fn os_details() -> String {
    let arch = std::env::consts::ARCH;
    match std::env::consts::OS {
        "linux" => match std::fs::read_to_string("/etc/os-release") {
            Ok(content) => format_os_release(&content, arch),
            Err(_) => format!("linux - {arch}"),
        },
        "macos" => {
            let output = Command::new("sw_vers").output().ok();
            match output.filter(|o| o.status.success()) {
                Some(out) => format!("{} - {arch}", format_sw_vers(&String::from_utf8_lossy(&out.stdout))),
                None => format!("macos - {arch}"),
            }
        }
        os => format!("{os} - {arch}"),
    }
}

fn format_os_release(content: &str, arch: &str) -> String {
    let field = |key: &str| {
        content
            .lines()
            .filter_map(|l| l.split_once('='))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.trim_matches('"').to_string())
            .unwrap_or_default()
    };
    format!("{} {} ({}) - {arch}", field("NAME"), field("VERSION"), field("ID"))
}

fn format_sw_vers(output: &str) -> String {
    output
        .lines()
        .filter_map(|l| l.split_once(':'))
        .map(|(_, v)| v.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_release_fields() {
        let content = "NAME=\"Ubuntu\"\nVERSION=\"24.04 LTS (Noble Numbat)\"\nID=ubuntu\n";
        assert_eq!(
            format_os_release(content, "x86_64"),
            "Ubuntu 24.04 LTS (Noble Numbat) (ubuntu) - x86_64"
        );
    }

    #[test]
    fn sw_vers_fields() {
        let out = "ProductName:\t\tmacOS\nProductVersion:\t\t14.5\nBuildVersion:\t\t23F79\n";
        assert_eq!(format_sw_vers(out), "macOS 14.5 23F79");
    }

    #[test]
    fn os_details_is_never_empty() {
        assert!(!os_details().is_empty());
    }
}
