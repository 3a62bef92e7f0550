//! HTTP plumbing shared by the remote providers
//!
//! Sends a JSON body, maps transport and status failures onto [`Error`], and
//! scrubs server error text before it can reach the UI.

use crate::error::{Error, Result};
use crate::util::truncate_message;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Where a request is going, for error messages
pub(crate) struct Endpoint<'a> {
    pub provider: &'a str,
    pub base_url: &'a str,
    pub timeout: Duration,
    /// Credential hint for 401/403, e.g. the key's environment variable
    pub credential: Option<&'a str>,
}

pub(crate) fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Provider(format!("Failed to create HTTP client: {e}")))
}

/// Send `body` and return the successful response text
pub(crate) async fn post_json<T: Serialize>(
    request: RequestBuilder,
    body: &T,
    endpoint: &Endpoint<'_>,
) -> Result<String> {
    let response = request.json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout(endpoint.timeout.as_millis() as u64)
        } else if e.is_connect() {
            Error::Network(format!(
                "cannot reach {} at {}",
                endpoint.provider, endpoint.base_url
            ))
        } else {
            Error::Network(scrub(&e.to_string()))
        }
    })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Network(scrub(&e.to_string())))?;
    debug!(provider = endpoint.provider, %status, bytes = text.len(), "Provider replied");

    if status.is_success() {
        return Ok(text);
    }

    let message = scrub(&error_message(&text));
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Unauthorized(match endpoint.credential {
                Some(credential) => {
                    format!("{} rejected the key in {}", endpoint.provider, credential)
                }
                None => format!("{} rejected the request", endpoint.provider),
            })
        }
        StatusCode::NOT_FOUND if message.to_lowercase().contains("model") => {
            Error::ModelNotFound(message)
        }
        _ => Error::Api(format!("HTTP {}: {}", status.as_u16(), message)),
    })
}

/// Pull the message out of `{"error": "..."}` or `{"error": {"message": "..."}}`
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("error") {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(error) => error
            .get("message")
            .and_then(|m| m.as_str())
            .map_or_else(|| error.to_string(), str::to_string),
        None => body.trim().to_string(),
    }
}

/// Drop home paths and key-like tokens, then bound the length
pub(crate) fn scrub(message: &str) -> String {
    let words: Vec<String> = message
        .split(' ')
        .map(|word| {
            let lower = word.to_lowercase();
            if lower.contains("/home/")
                || lower.contains("/root/")
                || lower.contains("/users/")
                || lower.contains("\\users\\")
            {
                "<path>".to_string()
            } else if looks_like_key(word) {
                "<redacted>".to_string()
            } else {
                word.to_string()
            }
        })
        .collect();
    truncate_message(&words.join(" "))
}

fn looks_like_key(word: &str) -> bool {
    let token = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-' && c != '_');
    token.starts_with("sk-")
        || token.starts_with("gsk_")
        || (token.len() >= 32
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}
