//! Application configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use termdeck_core::{GenerationConfig, TerminalConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_level() -> String {
    "info".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
    /// Directory for the TUI's log files
    #[serde(default)]
    pub directory: Option<String>,
    /// Emit JSON records instead of text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Where log files go
    pub fn log_dir(&self) -> PathBuf {
        self.directory.as_ref().map(PathBuf::from).unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("termdeck")
                .join("logs")
        })
    }

    /// Filter directive for our crates at the configured level
    pub fn filter(&self) -> String {
        let level = self.level.trim();
        format!("termdeck={level},termdeck_core={level},termdeck_llm={level}")
    }
}
