//! Session registry
//!
//! Maps session ids to their process handle, output buffer and consumer sink.
//! The registry is plain synchronous state: the host task owns it and feeds
//! it requests, PTY events and the current time, so every transition here is
//! serialized and testable without a runtime.
//!
//! A session is reserved in the `Starting` state before its process exists.
//! Input and resizes that arrive while starting are held and applied once the
//! spawn completes. A kill removes the reservation at once; the process that
//! lands afterwards finds no entry and is killed on arrival.


use crate::error::{Error, Result};
use crate::flush::OutputBuffer;
use crate::protocol::{CreateReply, KillReply, ServerMessage, SessionId, TermSize};
use crate::pty::{ExitStatus, PtyProcess};
use crate::shell;
use crate::sink::ConsumerSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Failure text when a session is killed or abandoned before its shell started
pub const CLOSED_BEFORE_START: &str = "Terminal was closed before it started";

/// Lifecycle of a registered session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Id reserved, process still spawning
    Starting,
    /// Process running
    Running,
}

/// Static facts about a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Program path
    pub program: String,
    /// Display name of the shell
    pub shell: String,
    /// Working directory
    pub cwd: PathBuf,
    /// Current size
    pub size: TermSize,
}

impl SessionInfo {
    /// Describe a session running `program`
    #[must_use]
    pub fn new(program: impl Into<String>, cwd: PathBuf, size: TermSize) -> Self {
        let program = program.into();
        Self {
            shell: shell::shell_name(&program),
            program,
            cwd,
            size,
        }
    }
}

/// Snapshot of a session for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Session id
    pub id: SessionId,
    /// Shell display name
    pub shell: String,
    /// Working directory
    pub cwd: PathBuf,
    /// Current size
    pub size: TermSize,
    /// Lifecycle state
    pub status: SessionStatus,
    /// OS process id once running
    pub pid: Option<u32>,
    /// Output chunks waiting for the next flush
    pub pending_chunks: usize,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

/// Result of finishing a spawn
#[derive(Debug)]
pub struct SpawnCompletion {
    /// Reply for the create request
    pub reply: CreateReply,
    /// Exit that arrived before the spawn finished; replay it after replying
    pub held_exit: Option<ExitStatus>,
}

#[derive(Default)]
struct PendingStart {
    writes: Vec<String>,
    resize: Option<TermSize>,
    early_exit: Option<ExitStatus>,
}

enum EntryState {
    Starting(PendingStart),
    Running(Box<dyn PtyProcess>),
}

struct SessionEntry {
    info: SessionInfo,
    created_at: DateTime<Utc>,
    state: EntryState,
    buffer: OutputBuffer,
    sink: Box<dyn ConsumerSink>,
}

impl SessionEntry {
    /// Deliver queued output. `false` when the consumer is gone.
    fn flush(&mut self, id: &SessionId) -> bool {
        let Some(data) = self.buffer.take() else {
            return true;
        };
        if !self.sink.is_valid() {
            return false;
        }
        trace!(%id, bytes = data.len(), "Flushing terminal output");
        self.sink.deliver(ServerMessage::Data {
            id: id.clone(),
            data,
        })
    }

    /// Drop queued output and stop the process if it is running
    ///
    /// A starting session has nothing to stop yet; once its entry is gone,
    /// [`SessionRegistry::complete_spawn`] kills the late process.
    fn terminate(&mut self, id: &SessionId) {
        self.buffer.clear();
        if let EntryState::Running(process) = &mut self.state {
            if let Err(e) = process.kill() {
                warn!(%id, error = %e, "Failed to kill terminal process");
            }
        }
    }
}

/// Owner of all live sessions
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionEntry>,
    flush_interval: Duration,
}

impl SessionRegistry {
    /// Empty registry batching output every `flush_interval`
    #[must_use]
    pub fn new(flush_interval: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            flush_interval,
        }
    }

    /// Whether `id` is registered (starting or running)
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of registered sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Lifecycle state of `id`
    #[must_use]
    pub fn status(&self, id: &SessionId) -> Option<SessionStatus> {
        self.sessions.get(id).map(|entry| match entry.state {
            EntryState::Starting(_) => SessionStatus::Starting,
            EntryState::Running(_) => SessionStatus::Running,
        })
    }

    /// Reserve `id` before its process is spawned
    pub fn reserve(
        &mut self,
        id: SessionId,
        info: SessionInfo,
        sink: Box<dyn ConsumerSink>,
    ) -> Result<()> {
        if self.sessions.contains_key(&id) {
            return Err(Error::SessionExists(id.to_string()));
        }
        debug!(%id, program = %info.program, cwd = %info.cwd.display(), "Reserving terminal");
        self.sessions.insert(
            id,
            SessionEntry {
                info,
                created_at: Utc::now(),
                state: EntryState::Starting(PendingStart::default()),
                buffer: OutputBuffer::new(self.flush_interval),
                sink,
            },
        );
        Ok(())
    }

    /// Attach the spawned process (or the spawn failure) to a reserved id
    pub fn complete_spawn(
        &mut self,
        id: &SessionId,
        result: Result<Box<dyn PtyProcess>>,
    ) -> SpawnCompletion {
        let closed = |id: &SessionId| SpawnCompletion {
            reply: CreateReply::failed(id.clone(), CLOSED_BEFORE_START),
            held_exit: None,
        };

        let Some(entry) = self.sessions.get_mut(id) else {
            if let Ok(mut process) = result {
                debug!(%id, "Terminal removed while starting, killing late process");
                let _ = process.kill();
            }
            return closed(id);
        };

        let mut process = match result {
            Ok(process) => process,
            Err(e) => {
                warn!(%id, error = %e, "Failed to start terminal");
                self.sessions.remove(id);
                return SpawnCompletion {
                    reply: CreateReply::failed(id.clone(), e.to_string()),
                    held_exit: None,
                };
            }
        };

        let EntryState::Starting(pending) = &mut entry.state else {
            warn!(%id, "Spawn completed twice, killing duplicate process");
            let _ = process.kill();
            return SpawnCompletion {
                reply: CreateReply::failed(id.clone(), Error::SessionExists(id.to_string()).to_string()),
                held_exit: None,
            };
        };
        let pending = std::mem::take(pending);

        if let Some(size) = pending.resize {
            match process.resize(size) {
                Ok(()) => entry.info.size = size,
                Err(e) => warn!(%id, error = %e, "Failed to apply queued resize"),
            }
        }
        for data in &pending.writes {
            if let Err(e) = process.write(data.as_bytes()) {
                warn!(%id, error = %e, "Failed to write queued input");
            }
        }

        info!(
            %id,
            shell = %entry.info.shell,
            pid = ?process.pid(),
            queued_writes = pending.writes.len(),
            "Terminal started"
        );
        entry.state = EntryState::Running(process);

        SpawnCompletion {
            reply: CreateReply::started(id.clone(), entry.info.program.clone(), entry.info.cwd.clone()),
            held_exit: pending.early_exit,
        }
    }

    /// Forward input; silently ignored for unknown sessions
    pub fn write(&mut self, id: &SessionId, data: &str) {
        let Some(entry) = self.sessions.get_mut(id) else {
            trace!(%id, "Input for unknown terminal ignored");
            return;
        };
        match &mut entry.state {
            EntryState::Starting(pending) => pending.writes.push(data.to_string()),
            EntryState::Running(process) => {
                if let Err(e) = process.write(data.as_bytes()) {
                    warn!(%id, error = %e, "Failed to write to terminal");
                }
            }
        }
    }

    /// Forward a resize; silently ignored for unknown sessions
    pub fn resize(&mut self, id: &SessionId, size: TermSize) {
        let Some(entry) = self.sessions.get_mut(id) else {
            trace!(%id, "Resize for unknown terminal ignored");
            return;
        };
        match &mut entry.state {
            EntryState::Starting(pending) => pending.resize = Some(size),
            EntryState::Running(process) => match process.resize(size) {
                Ok(()) => entry.info.size = size,
                Err(e) => warn!(%id, error = %e, "Failed to resize terminal"),
            },
        }
    }

    /// Flush, terminate and remove a session
    ///
    /// The entry is gone when this returns, even for a session still
    /// starting: its pending create is answered with a failure.
    pub fn kill(&mut self, id: &SessionId) -> KillReply {
        let Some(mut entry) = self.sessions.remove(id) else {
            return KillReply::not_found(id.clone());
        };

        entry.flush(id);
        if matches!(entry.state, EntryState::Starting(_)) {
            debug!(%id, "Terminal killed while starting");
        }
        entry.terminate(id);
        info!(%id, "Terminal killed");
        KillReply::killed(id.clone())
    }

    /// Tear down every session, including ones still starting
    ///
    /// Returns how many sessions were removed.
    pub fn cleanup_all(&mut self) -> usize {
        let count = self.sessions.len();
        for (id, mut entry) in self.sessions.drain() {
            entry.flush(&id);
            entry.terminate(&id);
        }
        if count > 0 {
            info!(count, "Cleaned up all terminals");
        }
        count
    }

    /// Queue output read from a session's PTY
    pub fn push_output(&mut self, id: &SessionId, data: String, now: Instant) {
        let Some(entry) = self.sessions.get_mut(id) else {
            trace!(%id, "Output for unknown terminal dropped");
            return;
        };
        entry.buffer.push(data, now);
    }

    /// Handle a process exit: flush, notify once, remove
    ///
    /// Returns `true` if an exit notice was produced now. An exit for a
    /// session that is still starting is held until [`Self::complete_spawn`].
    pub fn handle_exit(&mut self, id: &SessionId, status: ExitStatus) -> bool {
        let Some(entry) = self.sessions.get_mut(id) else {
            return false;
        };
        if let EntryState::Starting(pending) = &mut entry.state {
            pending.early_exit = Some(status);
            return false;
        }

        let Some(mut entry) = self.sessions.remove(id) else {
            return false;
        };
        if entry.flush(id) {
            entry.sink.deliver(ServerMessage::Exit {
                id: id.clone(),
                exit_code: status.code,
                signal: status.signal.clone(),
            });
        }
        info!(%id, code = ?status.code, signal = ?status.signal, "Terminal exited");
        true
    }

    /// Earliest pending flush deadline across all sessions
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sessions
            .values()
            .filter_map(|entry| entry.buffer.deadline())
            .min()
    }

    /// Deliver every buffer whose deadline has passed
    ///
    /// Sessions whose consumer is gone are abandoned: output dropped,
    /// process killed, entry removed. Returns the number of batches delivered.
    pub fn flush_due(&mut self, now: Instant) -> usize {
        let due: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.buffer.is_due(now))
            .map(|(id, _)| id.clone())
            .collect();

        let mut delivered = 0;
        for id in due {
            let Some(entry) = self.sessions.get_mut(&id) else {
                continue;
            };
            if entry.flush(&id) {
                delivered += 1;
                continue;
            }

            debug!(%id, "Consumer gone, abandoning terminal");
            if let Some(mut entry) = self.sessions.remove(&id) {
                entry.terminate(&id);
            }
        }
        delivered
    }

    /// Snapshot of all sessions, oldest first
    #[must_use]
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|(id, entry)| {
                let (status, pid) = match &entry.state {
                    EntryState::Starting(_) => (SessionStatus::Starting, None),
                    EntryState::Running(process) => (SessionStatus::Running, process.pid()),
                };
                SessionSummary {
                    id: id.clone(),
                    shell: entry.info.shell.clone(),
                    cwd: entry.info.cwd.clone(),
                    size: entry.info.size,
                    status,
                    pid,
                    pending_chunks: entry.buffer.len(),
                    created_at: entry.created_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}
