//! Plain-text history of a terminal, fed to the command generator

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

/// CSI, OSC and two-byte escape sequences
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]")
        .expect("ANSI_ESCAPE is a compile-time constant")
});

/// Bounded line buffer with escape sequences removed
#[derive(Debug, Clone)]
pub struct Scrollback {
    lines: VecDeque<String>,
    partial: String,
    pending_cr: bool,
    capacity: usize,
}

impl Scrollback {
    /// Keep at most `capacity` complete lines
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            partial: String::new(),
            pending_cr: false,
            capacity: capacity.max(1),
        }
    }

    /// Append raw terminal output
    pub fn push(&mut self, data: &str) {
        let clean = ANSI_ESCAPE.replace_all(data, "");
        for ch in clean.chars() {
            // a lone carriage return redraws the current line
            if std::mem::take(&mut self.pending_cr) && ch != '\n' && ch != '\r' {
                self.partial.clear();
            }
            match ch {
                '\n' => {
                    let line = std::mem::take(&mut self.partial);
                    self.lines.push_back(line);
                    if self.lines.len() > self.capacity {
                        self.lines.pop_front();
                    }
                }
                '\r' => self.pending_cr = true,
                '\x08' => {
                    self.partial.pop();
                }
                '\t' => self.partial.push(ch),
                c if c.is_control() => {}
                c => self.partial.push(c),
            }
        }
    }

    /// The last `n` lines, oldest first, including an unterminated line
    #[must_use]
    pub fn tail(&self, n: usize) -> Vec<String> {
        let partial = (!self.partial.is_empty()).then(|| self.partial.clone());
        let wanted_complete = n.saturating_sub(usize::from(partial.is_some()));
        let skip = self.lines.len().saturating_sub(wanted_complete);

        self.lines
            .iter()
            .skip(skip)
            .cloned()
            .chain(partial)
            .take(n)
            .collect()
    }

    /// Number of complete lines held
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }
}
