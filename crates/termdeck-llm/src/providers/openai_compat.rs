//! OpenAI-compatible provider
//!
//! Any server implementing `POST {base}/chat/completions` with bearer auth:
//! OpenAI itself, Groq, DeepSeek, OpenRouter, vLLM, llama.cpp.

use crate::error::{Error, Result};
use crate::http::{self, Endpoint};
use crate::provider::LlmProvider;
use crate::request::{CompletionRequest, CompletionResponse, Message, OutputFormat};
use crate::util::mask_api_key;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// OpenAI's public endpoint
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Variable the key is read from unless configured otherwise
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Settings for [`OpenAiCompatProvider`]
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Bearer token
    pub api_key: String,
    /// Name of the variable the key came from, for error hints
    pub api_key_env: String,
    /// API root without a trailing slash
    pub base_url: String,
    /// Model used when the request names none
    pub default_model: String,
    /// HTTP timeout
    pub timeout: Duration,
    /// Send `response_format` for JSON requests; some servers reject it
    pub json_mode: bool,
}

impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("api_key_env", &self.api_key_env)
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .field("json_mode", &self.json_mode)
            .finish()
    }
}

impl OpenAiCompatConfig {
    /// OpenAI defaults with `api_key`
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
            json_mode: true,
        }
    }

    /// Read the key from `key_env`
    pub fn from_env_var(key_env: &str) -> Result<Self> {
        let api_key = std::env::var(key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::NotConfigured(format!("{key_env} not set")))?;

        let mut config = Self::new(api_key);
        config.api_key_env = key_env.to_string();
        Ok(config)
    }

    /// Set the API root
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable `response_format`
    #[must_use]
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatReply {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Chat completions client
pub struct OpenAiCompatProvider {
    client: Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatProvider {
    /// Build the HTTP client
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout)?,
            config,
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        let json = self.config.json_mode && request.format == OutputFormat::Json;
        ChatBody {
            model: request.model_or(&self.config.default_model),
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

fn parse_reply(text: &str) -> Result<CompletionResponse> {
    let reply: ChatReply =
        serde_json::from_str(text).map_err(|e| Error::InvalidResponse(e.to_string()))?;
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

    Ok(CompletionResponse {
        content: choice.message.content.unwrap_or_default(),
        model: reply.model,
        total_tokens: reply.usage.map(|u| u.total_tokens),
    })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model_or(&self.config.default_model)))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let endpoint = Endpoint {
            provider: "OpenAI-compatible server",
            base_url: &self.config.base_url,
            timeout: self.config.timeout,
            credential: Some(&self.config.api_key_env),
        };
        let url = format!("{}/chat/completions", self.config.base_url);
        let post = self.client.post(url).bearer_auth(&self.config.api_key);
        let text = http::post_json(post, &self.body(&request), &endpoint).await?;
        parse_reply(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAiCompatConfig::new("test-key")
            .with_base_url("https://api.groq.com/openai/v1/")
            .with_model("llama-3.1-8b-instant")
            .with_json_mode(false);

        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.default_model, "llama-3.1-8b-instant");
        assert!(!config.json_mode);
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let err = OpenAiCompatConfig::from_env_var("TERMDECK_TEST_SURELY_UNSET_KEY").unwrap_err();
        assert!(
            matches!(err, Error::NotConfigured(msg) if msg.contains("TERMDECK_TEST_SURELY_UNSET_KEY"))
        );
    }

    #[test]
    fn test_debug_masks_key() {
        let config = OpenAiCompatConfig::new("sk-1234567890abcdefghijklmnop");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("1234567890abcdefghijkl"));
        assert!(debug.contains("sk-1...mnop"));
    }

    #[test]
    fn test_body_response_format() {
        let provider = OpenAiCompatProvider::new(OpenAiCompatConfig::new("k").with_model("m1")).unwrap();
        let request = CompletionRequest::default()
            .with_message(Message::user("list"))
            .json();

        let body = serde_json::to_value(provider.body(&request)).unwrap();
        assert_eq!(body["model"], "m1");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert!(body.get("max_tokens").is_none());

        let plain = serde_json::to_value(provider.body(&CompletionRequest::new("m2"))).unwrap();
        assert_eq!(plain["model"], "m2");
        assert!(plain.get("response_format").is_none());
    }

    #[test]
    fn test_parse_reply() {
        let text = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ls -la"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let response = parse_reply(text).unwrap();
        assert_eq!(response.content, "ls -la");
        assert_eq!(response.total_tokens, Some(13));
    }

    #[test]
    fn test_parse_empty_choices() {
        assert!(matches!(
            parse_reply(r#"{"model": "m", "choices": []}"#),
            Err(Error::InvalidResponse(_))
        ));
    }
}
