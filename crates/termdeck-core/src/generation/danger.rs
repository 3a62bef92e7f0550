//! Local risk heuristics for generated commands
//!
//! The model's own warning is advisory and can be wrong. These patterns give
//! a floor: a command matching one is flagged at least at the pattern's level.

use super::WarningLevel;
use regex::Regex;
use std::sync::LazyLock;

// ============================================================================
// Patterns
// ============================================================================

/// A command shape with a known risk
#[derive(Debug, Clone, Copy)]
pub struct DangerPattern {
    /// Pattern identifier
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Regular expression matched against the command
    pub pattern: &'static str,
    /// Minimum level for a match
    pub level: WarningLevel,
}

/// Known risky command shapes
pub const DANGER_PATTERNS: &[DangerPattern] = &[
    // Data destruction
    DangerPattern {
        id: "rm_recursive",
        description: "Recursively deletes files",
        pattern: r"\brm\s+(?:-\S+\s+)*-[a-zA-Z]*[rR]",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "rm",
        description: "Deletes files",
        pattern: r"(?:^|[;&|]\s*|\bsudo\s+)rm\s",
        level: WarningLevel::Caution,
    },
    DangerPattern {
        id: "mkfs",
        description: "Formats a filesystem",
        pattern: r"\bmkfs(?:\.\w+)?\b",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "dd_device",
        description: "Writes raw data to a device",
        pattern: r"\bdd\b.*\bof=/dev/",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "redirect_device",
        description: "Overwrites a block device",
        pattern: r">\s*/dev/(?:sd|nvme|hd|disk)",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "find_delete",
        description: "Deletes every file a search matches",
        pattern: r"\bfind\b.*\s-delete\b",
        level: WarningLevel::Caution,
    },
    DangerPattern {
        id: "remove_item_recurse",
        description: "Recursively deletes files",
        pattern: r"(?i)\bremove-item\b.*-recurse",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "windows_format",
        description: "Formats a drive",
        pattern: r"(?i)^\s*format\s+[a-z]:",
        level: WarningLevel::Dangerous,
    },
    // System state
    DangerPattern {
        id: "power",
        description: "Shuts down or restarts the machine",
        pattern: r"\b(?:shutdown|reboot|halt|poweroff)\b|\binit\s+[06]\b",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "fork_bomb",
        description: "Fork bomb",
        pattern: r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "kill_all",
        description: "Kills every process",
        pattern: r"\bkill\s+-9\s+-1\b",
        level: WarningLevel::Dangerous,
    },
    DangerPattern {
        id: "recursive_permissions",
        description: "Changes ownership or permissions recursively",
        pattern: r"\bch(?:mod|own|grp)\s+(?:-\S+\s+)*-[a-zA-Z]*R",
        level: WarningLevel::Caution,
    },
    DangerPattern {
        id: "sudo",
        description: "Runs with elevated privileges",
        pattern: r"\bsudo\b",
        level: WarningLevel::Caution,
    },
    // Remote code
    DangerPattern {
        id: "pipe_to_shell",
        description: "Runs a downloaded script",
        pattern: r"\b(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z|da|k)?sh\b",
        level: WarningLevel::Dangerous,
    },
    // History rewriting
    DangerPattern {
        id: "git_force_push",
        description: "Overwrites remote history",
        pattern: r"\bgit\s+push\b.*(?:--force\b|\s-f\b)",
        level: WarningLevel::Caution,
    },
    DangerPattern {
        id: "git_discard",
        description: "Discards uncommitted work",
        pattern: r"\bgit\s+(?:reset\s+--hard|clean\s+-[a-zA-Z]*f)",
        level: WarningLevel::Caution,
    },
    DangerPattern {
        id: "sql_drop",
        description: "Drops a database object",
        pattern: r"(?i)\bdrop\s+(?:table|database|schema)\b",
        level: WarningLevel::Caution,
    },
];

static COMPILED: LazyLock<Vec<(Regex, &'static DangerPattern)>> = LazyLock::new(|| {
    DANGER_PATTERNS
        .iter()
        .map(|p| {
            (
                Regex::new(p.pattern).expect("DANGER_PATTERNS are compile-time constants"),
                p,
            )
        })
        .collect()
});

/// Patterns `command` matches, most severe first
#[must_use]
pub fn matches(command: &str) -> Vec<&'static DangerPattern> {
    let mut found: Vec<&'static DangerPattern> = COMPILED
        .iter()
        .filter(|(re, _)| re.is_match(command))
        .map(|(_, p)| *p)
        .collect();
    found.sort_by(|a, b| b.level.cmp(&a.level));
    found
}

/// Highest level among matched patterns
#[must_use]
pub fn classify(command: &str) -> WarningLevel {
    matches(command)
        .first()
        .map_or(WarningLevel::Safe, |p| p.level)
}

/// Description of the most severe match, for display next to a preview
#[must_use]
pub fn explain(command: &str) -> Option<&'static str> {
    matches(command).first().map(|p| p.description)
}
