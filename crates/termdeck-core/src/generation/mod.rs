//! Natural-language command generation
//!
//! The [`CommandGenerator`] trait is the external service seam; the
//! [`GenerationCoordinator`] is the per-terminal state machine that decides
//! which responses are still wanted.

mod coordinator;
pub mod danger;
mod service;

#[cfg(test)]
mod tests;

pub use coordinator::{
    CoordinatorState, GenerationCoordinator, GenerationTicket, GenerationToken, Resolution,
};
pub use service::LlmCommandGenerator;

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How risky a generated command looks
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// Nothing notable
    #[default]
    Safe,
    /// Changes state in ways worth a second look
    Caution,
    /// Destroys data or the system if run carelessly
    Dangerous,
}

impl WarningLevel {
    /// Whether the preview should carry a danger flag
    #[must_use]
    pub fn is_dangerous(&self) -> bool {
        *self == WarningLevel::Dangerous
    }

    /// Parse the loose labels models tend to produce
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "danger" | "dangerous" | "high" | "critical" | "destructive" => Self::Dangerous,
            "caution" | "warning" | "warn" | "medium" | "moderate" => Self::Caution,
            _ => Self::Safe,
        }
    }
}

/// Input to the command generator service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// What the user asked for
    pub natural_language_text: String,
    /// Shell the command will run in
    pub shell_name: String,
    /// Operating system name
    pub os_identifier: String,
    /// Recent terminal lines, oldest first
    pub scrollback_context: Vec<String>,
}

/// Output of the command generator service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCommand {
    /// Command text, without a trailing newline
    pub command: String,
    /// Risk classification
    pub warning_level: WarningLevel,
}

impl GeneratedCommand {
    /// Command with a level
    #[must_use]
    pub fn new(command: impl Into<String>, warning_level: WarningLevel) -> Self {
        Self {
            command: command.into(),
            warning_level,
        }
    }
}

/// Turns a request into a shell command
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CommandGenerator: Send + Sync {
    /// Generate one command
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedCommand>;
}
