//! Terminal host
//!
//! One task owns the [`SessionRegistry`] and processes, one at a time:
//! requests from [`HostHandle`]s, PTY events, spawn completions and flush
//! deadlines. Spawning runs on the blocking pool; its result comes back to the
//! task as a message, so the registry is never touched concurrently.
//!
//! ## Usage
//!
//! ```ignore
//! let (host, task) = TerminalHost::spawn(Arc::new(NativePtySystem::new()), config, token);
//! let reply = host.create(CreateRequest::default(), sink).await;
//! host.write(&reply.id, "ls\n");
//! ```


use crate::config::TerminalConfig;
use crate::error::{Error, Result};
use crate::protocol::{CreateReply, CreateRequest, KillReply, SessionId, TermSize};
use crate::pty::{PtyEvent, PtyProcess, PtySpawnSpec, PtySystem};
use crate::registry::{SessionInfo, SessionRegistry, SessionSummary};
use crate::shell;
use crate::sink::ConsumerSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum HostRequest {
    Create {
        request: CreateRequest,
        sink: Box<dyn ConsumerSink>,
        reply: oneshot::Sender<CreateReply>,
    },
    Input {
        id: SessionId,
        data: String,
    },
    Resize {
        id: SessionId,
        size: TermSize,
    },
    Kill {
        id: SessionId,
        reply: oneshot::Sender<KillReply>,
    },
    List {
        reply: oneshot::Sender<Vec<SessionSummary>>,
    },
    CleanupAll {
        reply: oneshot::Sender<usize>,
    },
}

struct Spawned {
    id: SessionId,
    result: Result<Box<dyn PtyProcess>>,
}

/// Cloneable client of a running [`TerminalHost`]
///
/// `write` and `resize` are fire-and-forget. When every handle is dropped the
/// host tears down all sessions and stops.
#[derive(Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostRequest>,
}

impl HostHandle {
    /// Start a shell; resolves once it is running or has failed
    pub async fn create(&self, request: CreateRequest, sink: Box<dyn ConsumerSink>) -> CreateReply {
        let fallback_id = request.id.clone().unwrap_or_else(SessionId::generate);
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(HostRequest::Create {
                request,
                sink,
                reply,
            })
            .is_err()
        {
            return CreateReply::failed(fallback_id, Error::HostStopped.to_string());
        }
        rx.await
            .unwrap_or_else(|_| CreateReply::failed(fallback_id, Error::HostStopped.to_string()))
    }

    /// Send input to a session
    pub fn write(&self, id: &SessionId, data: impl Into<String>) {
        let _ = self.tx.send(HostRequest::Input {
            id: id.clone(),
            data: data.into(),
        });
    }

    /// Resize a session
    pub fn resize(&self, id: &SessionId, cols: u16, rows: u16) {
        let _ = self.tx.send(HostRequest::Resize {
            id: id.clone(),
            size: TermSize::new(cols, rows),
        });
    }

    /// Terminate a session
    pub async fn kill(&self, id: &SessionId) -> KillReply {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(HostRequest::Kill {
                id: id.clone(),
                reply,
            })
            .is_err()
        {
            return KillReply::not_found(id.clone());
        }
        rx.await.unwrap_or_else(|_| KillReply::not_found(id.clone()))
    }

    /// Snapshot of all sessions
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HostRequest::List { reply })
            .map_err(|_| Error::HostStopped)?;
        rx.await.map_err(|_| Error::HostStopped)
    }

    /// Tear down every session; returns how many were removed
    pub async fn cleanup_all(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HostRequest::CleanupAll { reply })
            .map_err(|_| Error::HostStopped)?;
        rx.await.map_err(|_| Error::HostStopped)
    }

    /// Whether the host task is still accepting requests
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// The session-owning task
pub struct TerminalHost {
    registry: SessionRegistry,
    pty: Arc<dyn PtySystem>,
    config: TerminalConfig,
    requests: mpsc::UnboundedReceiver<HostRequest>,
    pty_tx: mpsc::UnboundedSender<PtyEvent>,
    pty_rx: mpsc::UnboundedReceiver<PtyEvent>,
    spawned_tx: mpsc::UnboundedSender<Spawned>,
    spawned_rx: mpsc::UnboundedReceiver<Spawned>,
    pending_creates: HashMap<SessionId, oneshot::Sender<CreateReply>>,
    shutdown: CancellationToken,
}

impl TerminalHost {
    /// Start the host task
    ///
    /// The task stops when `shutdown` is cancelled or every handle is dropped,
    /// after tearing down all sessions.
    pub fn spawn(
        pty: Arc<dyn PtySystem>,
        config: TerminalConfig,
        shutdown: CancellationToken,
    ) -> (HostHandle, JoinHandle<()>) {
        let (tx, requests) = mpsc::unbounded_channel();
        let (pty_tx, pty_rx) = mpsc::unbounded_channel();
        let (spawned_tx, spawned_rx) = mpsc::unbounded_channel();

        let host = Self {
            registry: SessionRegistry::new(config.flush_interval()),
            pty,
            config,
            requests,
            pty_tx,
            pty_rx,
            spawned_tx,
            spawned_rx,
            pending_creates: HashMap::new(),
            shutdown,
        };

        let task = tokio::spawn(host.run());
        (HostHandle { tx }, task)
    }

    async fn run(mut self) {
        info!(
            flush_interval_ms = self.config.flush_interval().as_millis() as u64,
            "Terminal host started"
        );

        loop {
            let deadline = self.registry.next_deadline();
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("Terminal host received shutdown");
                    break;
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        debug!("All host handles dropped");
                        break;
                    }
                },
                Some(spawned) = self.spawned_rx.recv() => self.handle_spawned(spawned),
                Some(event) = self.pty_rx.recv() => self.handle_pty_event(event),
                _ = sleep_until(deadline) => {
                    self.registry.flush_due(Instant::now());
                }
            }
        }

        let removed = self.registry.cleanup_all();
        info!(removed, "Terminal host stopped");
    }

    fn handle_request(&mut self, request: HostRequest) {
        match request {
            HostRequest::Create {
                request,
                sink,
                reply,
            } => self.handle_create(request, sink, reply),
            HostRequest::Input { id, data } => self.registry.write(&id, &data),
            HostRequest::Resize { id, size } => self.registry.resize(&id, size),
            HostRequest::Kill { id, reply } => {
                let _ = reply.send(self.registry.kill(&id));
            }
            HostRequest::List { reply } => {
                let _ = reply.send(self.registry.list());
            }
            HostRequest::CleanupAll { reply } => {
                let _ = reply.send(self.registry.cleanup_all());
            }
        }
    }

    fn handle_create(
        &mut self,
        request: CreateRequest,
        sink: Box<dyn ConsumerSink>,
        reply: oneshot::Sender<CreateReply>,
    ) {
        let id = request.id.unwrap_or_else(SessionId::generate);
        if self.registry.contains(&id) || self.pending_creates.contains_key(&id) {
            let _ = reply.send(CreateReply::failed(
                id.clone(),
                Error::SessionExists(id.to_string()).to_string(),
            ));
            return;
        }

        let cwd = request.cwd.unwrap_or_else(shell::default_cwd);
        if !cwd.is_dir() {
            let _ = reply.send(CreateReply::failed(
                id,
                format!("Working directory does not exist: {}", cwd.display()),
            ));
            return;
        }

        let program = self
            .config
            .shell
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(shell::default_shell);
        let size = TermSize::or_default(request.cols, request.rows, self.config.default_size());

        let info = SessionInfo::new(program.clone(), cwd.clone(), size);
        if let Err(e) = self.registry.reserve(id.clone(), info, sink) {
            let _ = reply.send(CreateReply::failed(id, e.to_string()));
            return;
        }
        self.pending_creates.insert(id.clone(), reply);

        let spec = PtySpawnSpec::shell(id.clone(), program, cwd, size);
        let pty = Arc::clone(&self.pty);
        let events = self.pty_tx.clone();
        let done = self.spawned_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = pty.spawn(spec, events);
            if let Err(mpsc::error::SendError(Spawned {
                id,
                result: Ok(mut process),
            })) = done.send(Spawned { id, result })
            {
                debug!(%id, "Host gone before spawn finished, killing process");
                let _ = process.kill();
            }
        });
    }

    fn handle_spawned(&mut self, spawned: Spawned) {
        let Spawned { id, result } = spawned;
        let completion = self.registry.complete_spawn(&id, result);

        match self.pending_creates.remove(&id) {
            Some(reply) => {
                if reply.send(completion.reply).is_err() {
                    warn!(%id, "Create caller went away");
                }
            }
            None => warn!(%id, "Spawn finished without a pending create"),
        }

        if let Some(status) = completion.held_exit {
            self.registry.handle_exit(&id, status);
        }
    }

    fn handle_pty_event(&mut self, event: PtyEvent) {
        match event {
            PtyEvent::Output { id, data } => self.registry.push_output(&id, data, Instant::now()),
            PtyEvent::Exited { id, status } => {
                self.registry.handle_exit(&id, status);
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
