//! Per-terminal generation state machine
//!
//! Every attempt gets a token from a monotonically increasing epoch.
//! Cancelling bumps the epoch, so any response still in flight carries a
//! token that no longer matches and is discarded.

use super::{GeneratedCommand, GenerationRequest};
use crate::error::{Error, Result, UserFriendlyError};
use crate::scrollback::Scrollback;
use tracing::debug;

/// Identifies one generation attempt
///
/// Responses carrying a token that is no longer current are discarded, which
/// is how cancellation works without aborting the request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationToken(u64);

/// Where a terminal's command generation stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorState {
    /// Nothing in flight
    Idle,
    /// Waiting on the generator
    Generating {
        /// Current attempt
        token: GenerationToken,
        /// What the user asked for
        text: String,
    },
    /// A command is waiting to be executed or dismissed
    Previewing {
        /// The proposed command
        command: GeneratedCommand,
    },
}

/// A started generation; hand `request` to the generator and report back with `token`
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    /// Attempt identifier
    pub token: GenerationToken,
    /// Request to send
    pub request: GenerationRequest,
}

/// What happened to a generator response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The command is now previewed
    Preview(GeneratedCommand),
    /// Generation failed; the message is ready to show
    Failed(String),
    /// The response belonged to a cancelled or superseded attempt
    Discarded,
}

/// Per-terminal generation state machine
#[derive(Debug)]
pub struct GenerationCoordinator {
    state: CoordinatorState,
    epoch: u64,
    context_lines: usize,
}

impl GenerationCoordinator {
    /// Idle coordinator sending at most `context_lines` of scrollback
    #[must_use]
    pub fn new(context_lines: usize) -> Self {
        Self {
            state: CoordinatorState::Idle,
            epoch: 0,
            context_lines,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    /// Whether `token` is the attempt currently awaited
    #[must_use]
    pub fn is_current(&self, token: GenerationToken) -> bool {
        token.0 == self.epoch
            && matches!(self.state, CoordinatorState::Generating { token: t, .. } if t == token)
    }

    /// The previewed command, if any
    #[must_use]
    pub fn preview(&self) -> Option<&GeneratedCommand> {
        match &self.state {
            CoordinatorState::Previewing { command } => Some(command),
            _ => None,
        }
    }

    /// Start a generation
    ///
    /// Only allowed while idle. The request carries the last `context_lines`
    /// lines of `scrollback`.
    pub fn generate(
        &mut self,
        text: &str,
        shell_name: &str,
        os_identifier: &str,
        scrollback: &Scrollback,
    ) -> Result<GenerationTicket> {
        if self.state != CoordinatorState::Idle {
            return Err(Error::GenerationBusy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyRequest);
        }

        self.epoch += 1;
        let token = GenerationToken(self.epoch);
        self.state = CoordinatorState::Generating {
            token,
            text: text.to_string(),
        };
        debug!(token = self.epoch, "Generation started");

        Ok(GenerationTicket {
            token,
            request: GenerationRequest {
                natural_language_text: text.to_string(),
                shell_name: shell_name.to_string(),
                os_identifier: os_identifier.to_string(),
                scrollback_context: scrollback.tail(self.context_lines),
            },
        })
    }

    /// Abandon the in-flight attempt or dismiss the preview
    ///
    /// Returns whether there was anything to cancel.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            CoordinatorState::Idle => false,
            CoordinatorState::Generating { .. } => {
                debug!(token = self.epoch, "Generation cancelled");
                self.epoch += 1;
                self.state = CoordinatorState::Idle;
                true
            }
            CoordinatorState::Previewing { .. } => self.cancel_preview(),
        }
    }

    /// Apply a generator response
    pub fn resolve(
        &mut self,
        token: GenerationToken,
        result: Result<GeneratedCommand>,
    ) -> Resolution {
        if !self.is_current(token) {
            debug!(token = token.0, "Discarding stale generation result");
            return Resolution::Discarded;
        }

        match result {
            Ok(command) => {
                self.state = CoordinatorState::Previewing {
                    command: command.clone(),
                };
                Resolution::Preview(command)
            }
            Err(e) => {
                self.state = CoordinatorState::Idle;
                Resolution::Failed(e.user_message())
            }
        }
    }

    /// Take the previewed command as terminal input, newline included
    pub fn execute(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, CoordinatorState::Idle) {
            CoordinatorState::Previewing { command } => Some(format!("{}\n", command.command)),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Dismiss the preview without running it
    pub fn cancel_preview(&mut self) -> bool {
        if matches!(self.state, CoordinatorState::Previewing { .. }) {
            self.state = CoordinatorState::Idle;
            true
        } else {
            false
        }
    }
}
