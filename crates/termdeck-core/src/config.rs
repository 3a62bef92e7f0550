//! Runtime settings consumed by the host and the tab controller
//!
//! The binary loads these from layered TOML and environment variables; the
//! defaults here match the embedded `config/default.toml`.

use crate::protocol::TermSize;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_cols() -> u16 {
    TermSize::DEFAULT.cols
}

fn default_rows() -> u16 {
    TermSize::DEFAULT.rows
}

fn default_flush_interval_ms() -> u64 {
    16
}

fn default_exit_close_delay_ms() -> u64 {
    1500
}

fn default_scrollback_lines() -> usize {
    2000
}

/// Terminal host settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Program to launch instead of the platform default shell
    #[serde(default)]
    pub shell: Option<String>,
    /// Columns when a create request omits them
    #[serde(default = "default_cols")]
    pub default_cols: u16,
    /// Rows when a create request omits them
    #[serde(default = "default_rows")]
    pub default_rows: u16,
    /// Output batching interval
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// How long an exited tab stays visible before it closes
    #[serde(default = "default_exit_close_delay_ms")]
    pub exit_close_delay_ms: u64,
    /// Lines of plain-text history kept per tab
    #[serde(default = "default_scrollback_lines")]
    pub scrollback_lines: usize,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            shell: None,
            default_cols: default_cols(),
            default_rows: default_rows(),
            flush_interval_ms: default_flush_interval_ms(),
            exit_close_delay_ms: default_exit_close_delay_ms(),
            scrollback_lines: default_scrollback_lines(),
        }
    }
}

impl TerminalConfig {
    /// Output batching interval, never zero
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }

    /// Delay before an exited tab closes
    #[must_use]
    pub fn exit_close_delay(&self) -> Duration {
        Duration::from_millis(self.exit_close_delay_ms)
    }

    /// Fallback size for create requests
    #[must_use]
    pub fn default_size(&self) -> TermSize {
        TermSize::or_default(
            Some(self.default_cols),
            Some(self.default_rows),
            TermSize::DEFAULT,
        )
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_context_lines() -> usize {
    300
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    512
}

/// Command generator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// `ollama`, `openai`, `mock` or `none`
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model name; the provider default when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint override
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Scrollback lines sent along with each request
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Transport timeout of the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Completion token cap
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key_env: None,
            context_lines: default_context_lines(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationConfig {
    /// HTTP timeout
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Whether command generation is turned off
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.provider.eq_ignore_ascii_case("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_section() {
        let config: TerminalConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, TerminalConfig::default());
        assert_eq!(config.flush_interval(), Duration::from_millis(16));
        assert_eq!(config.default_size(), TermSize::new(80, 24));
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = TerminalConfig {
            flush_interval_ms: 0,
            default_cols: 0,
            ..TerminalConfig::default()
        };
        assert_eq!(config.flush_interval(), Duration::from_millis(1));
        assert_eq!(config.default_size(), TermSize::new(80, 24));
    }

    #[test]
    fn test_generation_defaults() {
        let config: GenerationConfig = serde_json::from_str(r#"{"provider": "None"}"#).unwrap();
        assert!(config.is_disabled());
        assert_eq!(config.context_lines, 300);
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }
}
