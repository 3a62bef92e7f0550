//! termdeck LLM - chat completion providers
//!
//! The model backends behind command generation:
//! - Request: messages, options and the reply type
//! - Ollama: local server, the default
//! - OpenAI-compatible: any `/chat/completions` endpoint with a bearer key
//! - Mock: queued canned replies for tests and offline runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod http;
pub mod mock;
pub mod provider;
pub mod providers;
pub mod request;
pub mod util;

pub use error::{Error, Result};
pub use mock::MockProvider;
pub use provider::LlmProvider;
pub use providers::ollama::{OllamaConfig, OllamaProvider};
pub use providers::openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use request::{CompletionRequest, CompletionResponse, Message, OutputFormat, Role};
