//! Ollama - local model server
//!
//! Command generation runs well on small local models, so this is the default
//! backend. Uses `POST /api/chat` without streaming; JSON replies are enforced
//! with Ollama's `format` option.

use crate::error::{Error, Result};
use crate::http::{self, Endpoint};
use crate::provider::LlmProvider;
use crate::request::{CompletionRequest, CompletionResponse, Message, OutputFormat};
use crate::util::{truncate_safe, MAX_ERROR_LEN};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "qwen2.5-coder:7b";

/// Where a stock Ollama listens
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Settings for [`OllamaProvider`]
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Server URL without a trailing slash
    pub base_url: String,
    /// Model used when the request names none
    pub default_model: String,
    /// Reply cap used when the request sets none
    pub default_max_tokens: u32,
    /// HTTP timeout; local inference on a cold model can be slow
    pub timeout: Duration,
    /// How long Ollama keeps the model loaded after a request
    pub keep_alive: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            default_max_tokens: 512,
            timeout: Duration::from_secs(120),
            keep_alive: None,
        }
    }
}

impl OllamaConfig {
    /// Defaults overridden by `OLLAMA_HOST` and `OLLAMA_MODEL`
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config = config.with_base_url(normalize_host(&host));
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            config.default_model = model;
        }
        config
    }

    /// Set the server URL
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

    /// Set the default reply cap
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep the model loaded for this long, e.g. `"10m"`
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }
}

/// `OLLAMA_HOST` may be a bare `host:port`
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<&'a str>,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatReply {
    model: String,
    message: ReplyMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

/// Ollama chat client
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Build the HTTP client
    pub fn new(config: OllamaConfig) -> Result<Self> {
        Ok(Self {
            client: http::client(config.timeout)?,
            config,
        })
    }

    /// Server this provider talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Whether the server answers `GET /api/tags`
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        matches!(self.client.get(&url).send().await, Ok(r) if r.status().is_success())
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ChatBody<'a> {
        ChatBody {
            model: request.model_or(&self.config.default_model),
            messages: &request.messages,
            stream: false,
            format: (request.format == OutputFormat::Json).then_some("json"),
            keep_alive: self.config.keep_alive.as_deref(),
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens.unwrap_or(self.config.default_max_tokens),
            },
        }
    }
}

fn parse_reply(text: &str) -> Result<CompletionResponse> {
    let reply: ChatReply = serde_json::from_str(text).map_err(|e| {
        Error::InvalidResponse(format!("{}: {}", e, truncate_safe(text, MAX_ERROR_LEN)))
    })?;
    let total_tokens = match (reply.prompt_eval_count, reply.eval_count) {
        (Some(prompt), Some(generated)) => Some(prompt + generated),
        _ => None,
    };
    Ok(CompletionResponse {
        content: reply.message.content,
        model: reply.model,
        total_tokens,
    })
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(model = %request.model_or(&self.config.default_model)))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let endpoint = Endpoint {
            provider: "Ollama",
            base_url: &self.config.base_url,
            timeout: self.config.timeout,
            credential: None,
        };
        let url = format!("{}/api/chat", self.config.base_url);
        let text = http::post_json(self.client.post(url), &self.body(&request), &endpoint).await?;
        parse_reply(&text)
    }
}
