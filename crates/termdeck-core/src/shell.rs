//! Platform defaults for launching shells

use std::path::{Path, PathBuf};

/// Program launched when no shell is configured
#[must_use]
pub fn default_shell() -> String {
    #[cfg(windows)]
    {
        std::env::var("COMSPEC")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "powershell.exe".to_string())
    }

    #[cfg(not(windows))]
    {
        if let Some(shell) = std::env::var("SHELL").ok().filter(|s| !s.trim().is_empty()) {
            return shell;
        }
        if Path::new("/bin/bash").exists() {
            "/bin/bash".to_string()
        } else {
            "/bin/sh".to_string()
        }
    }
}

/// Display name of a shell program: `/usr/bin/zsh` becomes `zsh`,
/// `C:\Windows\System32\cmd.exe` becomes `cmd`
#[must_use]
pub fn shell_name(program: &str) -> String {
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    let stem = base
        .strip_suffix(".exe")
        .or_else(|| base.strip_suffix(".EXE"))
        .unwrap_or(base);
    if stem.is_empty() {
        program.to_string()
    } else {
        stem.to_string()
    }
}

/// Working directory used when a create request has none
#[must_use]
pub fn default_cwd() -> PathBuf {
    dirs::home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// Operating system name passed to the command generator
#[must_use]
pub fn os_identifier() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "linux" => "Linux",
        "windows" => "Windows",
        other => other,
    }
}
