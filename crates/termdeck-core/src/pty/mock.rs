//! Scriptable in-memory PTY backend
//!
//! Tests drive output and exits by hand and inspect what the host wrote,
//! resized and killed. Killing a mock shell reports an exit by `SIGKILL`, as
//! a real one would.

use super::{ExitStatus, PtyEvent, PtyProcess, PtySpawnSpec, PtySystem};
use crate::error::{Error, Result};
use crate::protocol::{SessionId, TermSize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

#[derive(Default)]
struct MockShell {
    spec: Option<PtySpawnSpec>,
    events: Option<mpsc::UnboundedSender<PtyEvent>>,
    writes: Vec<String>,
    resizes: Vec<TermSize>,
    kills: usize,
}

#[derive(Default)]
struct MockState {
    shells: HashMap<SessionId, MockShell>,
    spawn_order: Vec<SessionId>,
    fail_next: Option<String>,
    fail_kill: bool,
}

/// In-memory [`PtySystem`]
#[derive(Clone, Default)]
pub struct MockPtySystem {
    state: Arc<Mutex<MockState>>,
}

impl MockPtySystem {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the next spawn fail with `message`
    pub fn fail_next_spawn(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(message.into());
    }

    /// Make every kill report an error (the shell is still marked killed)
    pub fn fail_kills(&self, fail: bool) {
        self.lock().fail_kill = fail;
    }

    /// Emit output as if the shell printed it
    pub fn emit_output(&self, id: &SessionId, data: &str) -> bool {
        self.send(
            id,
            PtyEvent::Output {
                id: id.clone(),
                data: data.to_string(),
            },
        )
    }

    /// Emit an exit as if the shell ended
    pub fn emit_exit(&self, id: &SessionId, status: ExitStatus) -> bool {
        self.send(
            id,
            PtyEvent::Exited {
                id: id.clone(),
                status,
            },
        )
    }

    fn send(&self, id: &SessionId, event: PtyEvent) -> bool {
        let state = self.lock();
        state
            .shells
            .get(id)
            .and_then(|shell| shell.events.as_ref())
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Ids in the order they were spawned
    #[must_use]
    pub fn spawned(&self) -> Vec<SessionId> {
        self.lock().spawn_order.clone()
    }

    /// Spec a shell was spawned with
    #[must_use]
    pub fn spec(&self, id: &SessionId) -> Option<PtySpawnSpec> {
        self.lock().shells.get(id).and_then(|s| s.spec.clone())
    }

    /// Everything written to a shell, one entry per write
    #[must_use]
    pub fn writes(&self, id: &SessionId) -> Vec<String> {
        self.lock()
            .shells
            .get(id)
            .map(|s| s.writes.clone())
            .unwrap_or_default()
    }

    /// Every resize applied to a shell
    #[must_use]
    pub fn resizes(&self, id: &SessionId) -> Vec<TermSize> {
        self.lock()
            .shells
            .get(id)
            .map(|s| s.resizes.clone())
            .unwrap_or_default()
    }

    /// How many times a shell was killed
    #[must_use]
    pub fn kill_count(&self, id: &SessionId) -> usize {
        self.lock().shells.get(id).map_or(0, |s| s.kills)
    }
}

impl PtySystem for MockPtySystem {
    fn spawn(
        &self,
        spec: PtySpawnSpec,
        events: mpsc::UnboundedSender<PtyEvent>,
    ) -> Result<Box<dyn PtyProcess>> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(Error::Spawn {
                program: spec.program,
                message,
            });
        }

        let id = spec.id.clone();
        state.spawn_order.push(id.clone());
        state.shells.insert(
            id.clone(),
            MockShell {
                spec: Some(spec),
                events: Some(events),
                ..MockShell::default()
            },
        );

        Ok(Box::new(MockPtyProcess {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockPtyProcess {
    id: SessionId,
    state: Arc<Mutex<MockState>>,
}

impl MockPtyProcess {
    fn with_shell<R>(&self, f: impl FnOnce(&mut MockShell, bool) -> R) -> Option<R> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let fail_kill = state.fail_kill;
        state.shells.get_mut(&self.id).map(|shell| f(shell, fail_kill))
    }
}

impl PtyProcess for MockPtyProcess {
    fn pid(&self) -> Option<u32> {
        None
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.with_shell(|shell, _| {
            shell
                .writes
                .push(String::from_utf8_lossy(data).into_owned())
        });
        Ok(())
    }

    fn resize(&mut self, size: TermSize) -> Result<()> {
        self.with_shell(|shell, _| shell.resizes.push(size));
        Ok(())
    }

    fn kill(&mut self) -> Result<()> {
        let id = self.id.clone();
        let failed = self.with_shell(|shell, fail_kill| {
            shell.kills += 1;
            if let Some(tx) = &shell.events {
                let _ = tx.send(PtyEvent::Exited {
                    id,
                    status: ExitStatus::signal("SIGKILL"),
                });
            }
            fail_kill
        });

        if failed == Some(true) {
            Err(Error::Pty("mock kill failure".to_string()))
        } else {
            Ok(())
        }
    }
}
