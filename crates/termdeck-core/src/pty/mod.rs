//! Pseudo-terminal seam
//!
//! A [`PtySystem`] starts a shell and reports everything that happens to it as
//! typed [`PtyEvent`]s on a channel. The returned [`PtyProcess`] handle is the
//! only way to write to, resize or kill that shell.

mod decode;
pub mod mock;
mod native;

pub use decode::Utf8Decoder;
pub use mock::MockPtySystem;
pub use native::NativePtySystem;

use crate::error::Result;
use crate::protocol::{SessionId, TermSize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Everything needed to start one shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtySpawnSpec {
    /// Session the events will be tagged with
    pub id: SessionId,
    /// Program to execute
    pub program: String,
    /// Arguments after the program
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
    /// Initial size
    pub size: TermSize,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl PtySpawnSpec {
    /// Spec for an interactive shell with the terminal environment set
    #[must_use]
    pub fn shell(id: SessionId, program: impl Into<String>, cwd: PathBuf, size: TermSize) -> Self {
        Self {
            id,
            program: program.into(),
            args: Vec::new(),
            cwd,
            size,
            env: vec![
                ("TERM".to_string(), "xterm-256color".to_string()),
                ("COLORTERM".to_string(), "truecolor".to_string()),
            ],
        }
    }
}

/// How a shell ended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, absent when the process was killed by a signal
    pub code: Option<i32>,
    /// Signal name, if any
    pub signal: Option<String>,
}

impl ExitStatus {
    /// Normal exit with a code
    #[must_use]
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Termination by a signal
    #[must_use]
    pub fn signal(signal: impl Into<String>) -> Self {
        Self {
            code: None,
            signal: Some(signal.into()),
        }
    }
}

/// Something a running shell did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyEvent {
    /// Decoded output
    Output {
        /// Source session
        id: SessionId,
        /// Text read from the terminal
        data: String,
    },
    /// The process ended; sent after its last output
    Exited {
        /// Source session
        id: SessionId,
        /// Exit details
        status: ExitStatus,
    },
}

/// Handle to one running shell
pub trait PtyProcess: Send {
    /// OS process id, when known
    fn pid(&self) -> Option<u32>;

    /// Queue bytes for the shell's input
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Change the terminal size
    fn resize(&mut self, size: TermSize) -> Result<()>;

    /// Terminate the process
    fn kill(&mut self) -> Result<()>;
}

/// Factory for shells
pub trait PtySystem: Send + Sync + 'static {
    /// Start a shell; its output and exit are sent on `events`.
    ///
    /// Blocks while the process starts, so callers run it off the async
    /// executor.
    fn spawn(
        &self,
        spec: PtySpawnSpec,
        events: mpsc::UnboundedSender<PtyEvent>,
    ) -> Result<Box<dyn PtyProcess>>;
}
