//! LLM-backed command generator

use super::{danger, CommandGenerator, GeneratedCommand, GenerationRequest, WarningLevel};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use termdeck_llm::{CompletionRequest, LlmProvider, Message};
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You translate requests into a single shell command. \
Reply with one JSON object and nothing else: \
{\"command\": \"<the command>\", \"warning\": \"safe\" | \"caution\" | \"dangerous\"}. \
Use \"dangerous\" for commands that delete data, change the system or cannot be undone. \
Do not explain. Do not wrap the command in markdown.";

#[derive(Debug, Deserialize)]
struct CommandReply {
    command: String,
    #[serde(default, alias = "warning_level", alias = "warningLevel", alias = "danger")]
    warning: Option<serde_json::Value>,
}

/// [`CommandGenerator`] that asks an [`LlmProvider`]
pub struct LlmCommandGenerator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
}

impl LlmCommandGenerator {
    /// Generator using the provider's default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: String::new(),
            max_tokens: 512,
        }
    }

    /// Use a specific model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Cap the reply length
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_prompt(request: &GenerationRequest) -> String {
        let mut prompt = format!(
            "Operating system: {}\nShell: {}\n",
            request.os_identifier, request.shell_name
        );
        if !request.scrollback_context.is_empty() {
            prompt.push_str("\nRecent terminal output:\n");
            for line in &request.scrollback_context {
                prompt.push_str(line);
                prompt.push('\n');
            }
        }
        prompt.push_str("\nRequest: ");
        prompt.push_str(request.natural_language_text.trim());
        prompt
    }
}

#[async_trait::async_trait]
impl CommandGenerator for LlmCommandGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GeneratedCommand> {
        let completion = CompletionRequest::new(self.model.clone())
            .with_message(Message::system(SYSTEM_PROMPT))
            .with_message(Message::user(Self::build_prompt(&request)))
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.1)
            .json();

        debug!(
            provider = %self.provider.name(),
            context_lines = request.scrollback_context.len(),
            "Requesting command"
        );

        let response = self.provider.complete(completion).await?;

        let generated = parse_reply(&response.content)?;
        if generated.warning_level.is_dangerous() {
            warn!(command = %generated.command, "Generated command flagged as dangerous");
        }
        Ok(generated)
    }
}

/// Interpret a model reply
///
/// Accepts a JSON object (optionally inside a code fence or surrounded by
/// prose) or, failing that, a bare one-line command. The warning is raised to
/// at least what the local classifier reports.
pub fn parse_reply(content: &str) -> Result<GeneratedCommand> {
    let body = strip_fences(content.trim());

    let (command, model_level) = match extract_object(body)
        .and_then(|json| serde_json::from_str::<CommandReply>(json).ok())
    {
        Some(reply) => (reply.command, reply.warning.map_or(WarningLevel::Safe, level_from_value)),
        None => {
            let line = body
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or_default();
            (line.trim_start_matches("$ ").to_string(), WarningLevel::Safe)
        }
    };

    let command = command.trim().trim_end_matches('\n').to_string();
    if command.is_empty() {
        return Err(Error::Generation("the model returned no command".to_string()));
    }

    let level = model_level.max(danger::classify(&command));
    Ok(GeneratedCommand::new(command, level))
}

fn level_from_value(value: serde_json::Value) -> WarningLevel {
    match value {
        serde_json::Value::String(label) => WarningLevel::from_label(&label),
        serde_json::Value::Bool(true) => WarningLevel::Dangerous,
        _ => WarningLevel::Safe,
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the language tag line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.rsplit_once("```").map_or(rest, |(body, _)| body).trim()
}

fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use termdeck_llm::MockProvider;

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest {
            natural_language_text: text.to_string(),
            shell_name: "zsh".to_string(),
            os_identifier: "macOS".to_string(),
            scrollback_context: vec!["$ cargo build".to_string(), "error[E0425]".to_string()],
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let cmd = parse_reply(r#"{"command": "ls -la", "warning": "safe"}"#).unwrap();
        assert_eq!(cmd, GeneratedCommand::new("ls -la", WarningLevel::Safe));
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let reply = "```json\nHere you go: {\"command\": \"du -sh *\", \"warning\": \"caution\"}\n```";
        let cmd = parse_reply(reply).unwrap();
        assert_eq!(cmd.command, "du -sh *");
        assert_eq!(cmd.warning_level, WarningLevel::Caution);
    }

    #[test]
    fn test_parse_bare_command() {
        let cmd = parse_reply("```bash\n$ git log --oneline -5\n```").unwrap();
        assert_eq!(cmd.command, "git log --oneline -5");
    }

    #[test]
    fn test_local_classifier_raises_level() {
        let cmd = parse_reply(r#"{"command": "rm -rf target", "warning": "safe"}"#).unwrap();
        assert_eq!(cmd.warning_level, WarningLevel::Dangerous);
    }

    #[test]
    fn test_model_level_is_kept_when_higher() {
        let cmd = parse_reply(r#"{"command": "ls", "warning": "dangerous"}"#).unwrap();
        assert_eq!(cmd.warning_level, WarningLevel::Dangerous);
        let cmd = parse_reply(r#"{"command": "ls", "danger": true}"#).unwrap();
        assert_eq!(cmd.warning_level, WarningLevel::Dangerous);
    }

    #[test]
    fn test_empty_command_is_an_error() {
        assert!(matches!(
            parse_reply(r#"{"command": "  "}"#),
            Err(Error::Generation(_))
        ));
        assert!(matches!(parse_reply(""), Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_generate_sends_context_and_parses() {
        let provider = MockProvider::new();
        provider.add_response(r#"{"command": "cargo build --verbose", "warning": "none"}"#);
        let generator = LlmCommandGenerator::new(Arc::new(provider.clone())).with_model("m1");

        let cmd = generator.generate(request("build verbosely")).await.unwrap();
        assert_eq!(cmd.command, "cargo build --verbose");
        assert_eq!(cmd.warning_level, WarningLevel::Safe);

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].model, "m1");
        assert_eq!(sent[0].format, termdeck_llm::OutputFormat::Json);
        let prompt = &sent[0].messages[1].content;
        assert!(prompt.contains("Shell: zsh"));
        assert!(prompt.contains("error[E0425]"));
        assert!(prompt.ends_with("Request: build verbosely"));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = MockProvider::new();
        provider.add_error(termdeck_llm::Error::RateLimit);
        let generator = LlmCommandGenerator::new(Arc::new(provider));

        let err = generator.generate(request("x")).await.unwrap_err();
        assert!(matches!(err, Error::Llm(termdeck_llm::Error::RateLimit)));
    }
}
