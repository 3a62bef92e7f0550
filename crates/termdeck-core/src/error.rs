//! Error types for termdeck-core
//!
//! This module provides error types and user-friendly error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The shell could not be started
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying failure
        message: String,
    },

    /// No live session with this id
    #[error("terminal {0} not found")]
    SessionNotFound(String),

    /// A session with this id is already registered
    #[error("terminal {0} already exists")]
    SessionExists(String),

    /// The host task has stopped and no longer accepts requests
    #[error("terminal host is not running")]
    HostStopped,

    /// Reading, writing or resizing a pseudo-terminal failed
    #[error("pty error: {0}")]
    Pty(String),

    /// A generation request is already in flight or previewing
    #[error("a command is already being generated")]
    GenerationBusy,

    /// The natural-language request was blank
    #[error("nothing to generate")]
    EmptyRequest,

    /// The generator answered with something unusable
    #[error("generation error: {0}")]
    Generation(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] termdeck_llm::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
///
/// Provides human-readable error messages and suggestions for fixing.
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Spawn { program, message } => {
                format!("Could not start {}: {}", program, message)
            }
            Error::SessionNotFound(_) => "Terminal not found".to_string(),
            Error::SessionExists(id) => format!("Terminal {} already exists", id),
            Error::HostStopped => "The terminal host has stopped.".to_string(),
            Error::Pty(msg) => format!("Terminal I/O failed: {}", msg),
            Error::GenerationBusy => {
                "A command is already being generated for this terminal.".to_string()
            }
            Error::EmptyRequest => "Describe the command you want first.".to_string(),
            Error::Generation(msg) => format!("Command generation failed: {}", msg),
            Error::Llm(e) => match e {
                termdeck_llm::Error::Timeout(ms) => {
                    format!("The model did not answer within {} seconds.", ms / 1000)
                }
                termdeck_llm::Error::RateLimit => {
                    "The model provider is rate limiting requests.".to_string()
                }
                other => format!("Command generation failed: {}", other),
            },
            Error::Configuration(msg) => format!("Configuration error: {}", msg),
            Error::Io(e) => format!("I/O error: {}", e),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::Spawn { .. } => Some(
                "Check the `terminal.shell` setting or the TERMDECK_TERMINAL__SHELL variable."
                    .to_string(),
            ),
            Error::Llm(termdeck_llm::Error::NotConfigured(_)) => Some(
                "Set `generation.provider` and its API key, or run `termdeck doctor`.".to_string(),
            ),
            Error::Llm(termdeck_llm::Error::Unauthorized(_)) => Some(
                "Check the API key named by `generation.api_key_env`.".to_string(),
            ),
            Error::Llm(termdeck_llm::Error::ModelNotFound(_)) => Some(
                "Pull the model first (`ollama pull <model>`) or set `generation.model`."
                    .to_string(),
            ),
            Error::Llm(termdeck_llm::Error::Network(_)) => {
                Some("Is the model server running? Try `termdeck doctor`.".to_string())
            }
            Error::Llm(e) if e.is_transient() => Some("Wait a moment and try again.".to_string()),
            Error::Configuration(_) => {
                Some("Check config/local.toml and TERMDECK_* environment variables.".to_string())
            }
            _ => None,
        }
    }
}

/// Format an error for display in the CLI
pub fn format_error_for_cli(error: &Error) -> String {
    let mut output = error.user_message();
    output.push('\n');

    if let Some(suggestion) = error.suggestion() {
        output.push('\n');
        output.push_str(&suggestion);
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_matches_protocol_text() {
        let error = Error::SessionNotFound("abc".to_string());
        assert_eq!(error.user_message(), "Terminal not found");
        assert_eq!(error.to_string(), "terminal abc not found");
    }

    #[test]
    fn test_spawn_error_suggests_shell_setting() {
        let error = Error::Spawn {
            program: "/bin/nope".to_string(),
            message: "No such file or directory".to_string(),
        };

        assert!(error.user_message().contains("/bin/nope"));
        assert!(error.suggestion().unwrap().contains("terminal.shell"));
    }

    #[test]
    fn test_llm_timeout_message() {
        let error = Error::from(termdeck_llm::Error::Timeout(30_000));
        assert!(error.user_message().contains("30 seconds"));
        assert!(error.suggestion().unwrap().contains("try again"));
    }

    #[test]
    fn test_format_error_for_cli() {
        let error = Error::Llm(termdeck_llm::Error::NotConfigured(
            "OPENAI_API_KEY not set".to_string(),
        ));

        let output = format_error_for_cli(&error);
        assert!(output.contains("OPENAI_API_KEY"));
        assert!(output.contains("termdeck doctor"));
    }

    #[test]
    fn test_no_suggestion_for_busy() {
        assert!(Error::GenerationBusy.suggestion().is_none());
    }
}
