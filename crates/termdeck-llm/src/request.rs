//! Chat requests and replies shared by every provider

use serde::{Deserialize, Serialize};

/// Who said a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions
    System,
    /// The person asking
    User,
    /// An earlier model reply
    Assistant,
}

/// One chat turn
///
/// Serializes as `{"role": ..., "content": ...}`, which both the Ollama and
/// the OpenAI chat endpoints accept as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Text
    pub content: String,
}

impl Message {
    /// Instructions for the model
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A previous reply, for few-shot prompts
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Shape the reply must take
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Free text
    #[default]
    Text,
    /// A single JSON object, enforced by the server where supported
    Json,
}

/// A chat completion to run
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Model name; empty selects the provider's default
    pub model: String,
    /// Conversation so far
    pub messages: Vec<Message>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Requested reply format
    pub format: OutputFormat,
}

impl CompletionRequest {
    /// Empty request for `model`
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Append a message
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Cap the reply length
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask for a JSON object reply
    #[must_use]
    pub fn json(mut self) -> Self {
        self.format = OutputFormat::Json;
        self
    }

    /// `model`, or `default` when none was set
    pub(crate) fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.model.is_empty() {
            default
        } else {
            &self.model
        }
    }
}

/// What the model answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Reply text
    pub content: String,
    /// Model that produced it, as reported by the server
    pub model: String,
    /// Prompt plus reply tokens, when the server reports them
    pub total_tokens: Option<u32>,
}

impl CompletionResponse {
    /// Reply without token accounting
    #[must_use]
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            total_tokens: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_messages_and_options() {
        let request = CompletionRequest::new("qwen2.5-coder:7b")
            .with_message(Message::system("Reply with one shell command"))
            .with_message(Message::user("show disk usage"))
            .with_max_tokens(256)
            .with_temperature(0.1)
            .json();

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.max_tokens, Some(256));
        assert_eq!(request.format, OutputFormat::Json);
        assert_eq!(request.model_or("other"), "qwen2.5-coder:7b");
        assert_eq!(CompletionRequest::default().model_or("other"), "other");
    }

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_string(&Message::assistant("ls -la")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ls -la"}"#);
    }
}
