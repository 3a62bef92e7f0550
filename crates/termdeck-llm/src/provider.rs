//! The provider seam

use crate::error::Result;
use crate::request::{CompletionRequest, CompletionResponse};

/// A chat model backend
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name for logs and diagnostics
    fn name(&self) -> &str;

    /// Model used when a request names none
    fn default_model(&self) -> &str;

    /// Run one non-streaming chat completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
