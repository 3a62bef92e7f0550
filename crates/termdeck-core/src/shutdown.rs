//! Graceful shutdown
//!
//! Cancels the host token, then gives the host task a bounded time to kill
//! its shells. The current [`ShutdownPhase`] is published on a watch channel.
//!
//! ## Usage
//!
//! ```ignore
//! let shutdown = ShutdownController::new();
//! let (host, task) = TerminalHost::spawn(pty, config, shutdown.token());
//!
//! wait_for_shutdown_signal().await;
//! shutdown.shutdown(Some(task)).await;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Time the host gets to close its terminals
const CLOSE_DEADLINE: Duration = Duration::from_secs(5);

/// Where shutdown stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Serving terminals
    Running,
    /// Token cancelled; the host is killing its shells
    Closing,
    /// The host closed every terminal
    Stopped,
    /// The host missed the deadline and its task was aborted
    Aborted,
}

impl fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Closing => "closing",
            Self::Stopped => "stopped",
            Self::Aborted => "aborted",
        })
    }
}

struct Shared {
    token: CancellationToken,
    phase: watch::Sender<ShutdownPhase>,
    started: AtomicBool,
    deadline: Duration,
}

/// Cloneable handle that owns the process-wide cancellation token
#[derive(Clone)]
pub struct ShutdownController {
    shared: Arc<Shared>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Controller with a five second close deadline
    #[must_use]
    pub fn new() -> Self {
        Self::with_deadline(CLOSE_DEADLINE)
    }

    /// Controller that aborts the host after `deadline`
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        let (phase, _) = watch::channel(ShutdownPhase::Running);
        Self {
            shared: Arc::new(Shared {
                token: CancellationToken::new(),
                phase,
                started: AtomicBool::new(false),
                deadline,
            }),
        }
    }

    /// A token cancelled when shutdown starts
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.shared.token.child_token()
    }

    /// Watch phase changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ShutdownPhase> {
        self.shared.phase.subscribe()
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> ShutdownPhase {
        *self.shared.phase.borrow()
    }

    /// Whether shutdown has started
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shared.started.load(Ordering::Acquire)
    }

    fn enter(&self, phase: ShutdownPhase) {
        self.shared.phase.send_replace(phase);
        debug!(%phase, "Shutdown phase");
    }

    /// Cancel the token and wait for `host` to finish its cleanup
    ///
    /// Ends in `Stopped`, or `Aborted` when the host misses the deadline.
    /// Only the first call does anything.
    pub async fn shutdown(&self, host: Option<JoinHandle<()>>) {
        if self.shared.started.swap(true, Ordering::AcqRel) {
            debug!("Shutdown already in progress");
            return;
        }

        info!("Closing terminals");
        self.enter(ShutdownPhase::Closing);
        self.shared.token.cancel();

        if let Some(mut task) = host {
            match tokio::time::timeout(self.shared.deadline, &mut task).await {
                Ok(Ok(())) => debug!("Terminal host finished"),
                Ok(Err(e)) => warn!(error = %e, "Terminal host task failed"),
                Err(_) => {
                    warn!(
                        deadline_ms = self.shared.deadline.as_millis() as u64,
                        "Terminal host missed the close deadline, aborting"
                    );
                    task.abort();
                    self.enter(ShutdownPhase::Aborted);
                    return;
                }
            }
        }

        self.enter(ShutdownPhase::Stopped);
    }
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A signal whose handler cannot be installed is never reported.
pub async fn wait_for_shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("Interrupted"),
        _ = terminate => info!("Terminated by SIGTERM"),
    }
}
