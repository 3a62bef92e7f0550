//! termdeck core - terminal session host
//!
//! This crate holds everything between the pseudo-terminals and a UI:
//! - Protocol: tagged create/input/resize/kill requests and data/exit pushes
//! - PTY: the process seam, with a `portable-pty` backend and a scriptable mock
//! - Registry: per-session lifecycle and the 16 ms output flush batching
//! - Host: the single task that owns the registry, plus its cloneable handle
//! - Generation: natural-language to command requests with epoch cancellation
//! - Composition: IME-aware Enter handling for the command footer
//! - Tabs: binds terminal views to sessions for a front end

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod composition;
pub mod config;
pub mod error;
pub mod flush;
pub mod generation;
pub mod host;
pub mod protocol;
pub mod pty;
pub mod registry;
pub mod scrollback;
pub mod shell;
pub mod shutdown;
pub mod sink;
pub mod tabs;

pub use composition::{CompositionFilter, EnterAction};
pub use config::{GenerationConfig, TerminalConfig};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use generation::{
    CommandGenerator, GeneratedCommand, GenerationCoordinator, GenerationRequest,
    GenerationToken, LlmCommandGenerator, Resolution, WarningLevel,
};
pub use host::{HostHandle, TerminalHost};
pub use protocol::{
    ClientMessage, CreateReply, CreateRequest, KillReply, ServerMessage, SessionId, TermSize,
};
pub use pty::{ExitStatus, NativePtySystem, PtyEvent, PtyProcess, PtySpawnSpec, PtySystem};
pub use registry::{SessionRegistry, SessionStatus, SessionSummary};
pub use scrollback::Scrollback;
pub use shutdown::{wait_for_shutdown_signal, ShutdownController, ShutdownPhase};
pub use sink::{ChannelSink, ConsumerSink};
pub use tabs::{TabController, TabStatus, TerminalView, UiEvent};
