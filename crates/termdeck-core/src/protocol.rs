//! Messages exchanged between a UI and the terminal host
//!
//! Both directions are closed sets of variants tagged with `type`, so every
//! consumer matches exhaustively. Field names follow the camelCase wire form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque session identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Terminal dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermSize {
    /// Columns
    pub cols: u16,
    /// Rows
    pub rows: u16,
}

impl TermSize {
    /// Size used when the caller does not supply one
    pub const DEFAULT: TermSize = TermSize { cols: 80, rows: 24 };

    /// Create a size
    #[must_use]
    pub const fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Build a size from optional parts, falling back per dimension when a
    /// value is missing or zero
    #[must_use]
    pub fn or_default(cols: Option<u16>, rows: Option<u16>, fallback: TermSize) -> Self {
        Self {
            cols: cols.filter(|c| *c > 0).unwrap_or(fallback.cols),
            rows: rows.filter(|r| *r > 0).unwrap_or(fallback.rows),
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parameters of a `create` request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Caller-chosen id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
    /// Initial columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
    /// Initial rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,
    /// Working directory; the home directory when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CreateRequest {
    /// Request a session with a known id
    #[must_use]
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Set the initial size
    #[must_use]
    pub fn with_size(mut self, size: TermSize) -> Self {
        self.cols = Some(size.cols);
        self.rows = Some(size.rows);
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Reply to a `create` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReply {
    /// Session id the reply refers to
    pub id: SessionId,
    /// Whether the shell is running
    pub success: bool,
    /// Shell program path on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Resolved working directory on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateReply {
    /// Successful reply
    #[must_use]
    pub fn started(id: SessionId, shell: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            id,
            success: true,
            shell: Some(shell.into()),
            cwd: Some(cwd),
            error: None,
        }
    }

    /// Failed reply
    #[must_use]
    pub fn failed(id: SessionId, error: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            shell: None,
            cwd: None,
            error: Some(error.into()),
        }
    }
}

/// Text of the failure reply for an unknown id
pub const TERMINAL_NOT_FOUND: &str = "Terminal not found";

/// Reply to a `kill` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillReply {
    /// Session id the reply refers to
    pub id: SessionId,
    /// Whether a session was found and torn down
    pub success: bool,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KillReply {
    /// Successful reply
    #[must_use]
    pub fn killed(id: SessionId) -> Self {
        Self {
            id,
            success: true,
            error: None,
        }
    }

    /// Reply for an id with no live session
    #[must_use]
    pub fn not_found(id: SessionId) -> Self {
        Self {
            id,
            success: false,
            error: Some(TERMINAL_NOT_FOUND.to_string()),
        }
    }
}

/// UI to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a shell
    Create(CreateRequest),
    /// Keystrokes or pasted text
    Input {
        /// Target session
        id: SessionId,
        /// Text to write
        data: String,
    },
    /// New viewport size
    Resize {
        /// Target session
        id: SessionId,
        /// Columns
        cols: u16,
        /// Rows
        rows: u16,
    },
    /// Terminate a shell
    Kill {
        /// Target session
        id: SessionId,
    },
}

/// Host to UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Answer to `create`
    CreateResult(CreateReply),
    /// Answer to `kill`
    KillResult(KillReply),
    /// A batch of terminal output
    Data {
        /// Source session
        id: SessionId,
        /// Output, concatenated in arrival order
        data: String,
    },
    /// The shell process ended
    Exit {
        /// Source session
        id: SessionId,
        /// Exit code, absent when killed by a signal
        #[serde(rename = "exitCode")]
        exit_code: Option<i32>,
        /// Terminating signal name, if any
        signal: Option<String>,
    },
}

impl ServerMessage {
    /// Session the message refers to
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        match self {
            ServerMessage::CreateResult(reply) => &reply.id,
            ServerMessage::KillResult(reply) => &reply.id,
            ServerMessage::Data { id, .. } | ServerMessage::Exit { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_parses_partial_fields() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "create", "cols": 120})).unwrap();

        match msg {
            ClientMessage::Create(req) => {
                assert_eq!(req.id, None);
                assert_eq!(req.cols, Some(120));
                assert_eq!(req.rows, None);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_exit_uses_camel_case_code() {
        let msg = ServerMessage::Exit {
            id: SessionId::from("t1"),
            exit_code: Some(0),
            signal: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "exit", "id": "t1", "exitCode": 0, "signal": null})
        );
    }

    #[test]
    fn test_kill_not_found_reply() {
        let value = serde_json::to_value(ServerMessage::KillResult(KillReply::not_found(
            SessionId::from("gone"),
        )))
        .unwrap();
        assert_eq!(
            value,
            json!({"type": "kill_result", "id": "gone", "success": false, "error": "Terminal not found"})
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_value(json!({"type": "paste", "id": "t1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_size_fallback_ignores_zero() {
        let size = TermSize::or_default(Some(0), Some(40), TermSize::DEFAULT);
        assert_eq!(size, TermSize::new(80, 40));
        assert_eq!(
            TermSize::or_default(None, None, TermSize::new(100, 30)),
            TermSize::new(100, 30)
        );
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }
}
