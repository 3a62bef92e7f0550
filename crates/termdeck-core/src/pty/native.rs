//! `portable-pty` backend
//!
//! Each shell gets two OS threads: a reader that decodes output and, once the
//! terminal closes, waits for the child and reports its exit; and a writer
//! fed by a channel so the host never blocks on a full PTY input buffer.

use super::{ExitStatus, PtyEvent, PtyProcess, PtySpawnSpec, PtySystem, Utf8Decoder};
use crate::error::{Error, Result};
use crate::protocol::{SessionId, TermSize};
use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc as std_mpsc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

const READ_CHUNK_SIZE: usize = 8192;

/// Shells on the host operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySystem;

impl NativePtySystem {
    /// Create the backend
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn to_pty_size(size: TermSize) -> PtySize {
    PtySize {
        rows: size.rows.max(1),
        cols: size.cols.max(1),
        pixel_width: 0,
        pixel_height: 0,
    }
}

impl PtySystem for NativePtySystem {
    fn spawn(
        &self,
        spec: PtySpawnSpec,
        events: mpsc::UnboundedSender<PtyEvent>,
    ) -> Result<Box<dyn PtyProcess>> {
        let spawn_error = |e: &dyn std::fmt::Display| Error::Spawn {
            program: spec.program.clone(),
            message: e.to_string(),
        };

        let pair = native_pty_system()
            .openpty(to_pty_size(spec.size))
            .map_err(|e| spawn_error(&e))?;

        let mut command = CommandBuilder::new(&spec.program);
        command.cwd(&spec.cwd);
        for arg in &spec.args {
            command.arg(arg);
        }
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = pair
            .slave
            .spawn_command(command)
            .map_err(|e| spawn_error(&e))?;
        drop(pair.slave);

        let io = pair
            .master
            .try_clone_reader()
            .and_then(|reader| Ok((reader, pair.master.take_writer()?)));
        let (reader, writer) = match io {
            Ok(io) => io,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(spawn_error(&e));
            }
        };

        let pid = child.process_id();
        let killer = child.clone_killer();
        debug!(id = %spec.id, program = %spec.program, ?pid, "Spawned shell");

        spawn_read_loop(spec.id.clone(), reader, child, events);
        let input = spawn_write_loop(spec.id, writer);

        Ok(Box::new(NativePtyProcess {
            master: pair.master,
            killer,
            input,
            pid,
        }))
    }
}

struct NativePtyProcess {
    master: Box<dyn MasterPty + Send>,
    killer: Box<dyn ChildKiller + Send + Sync>,
    input: std_mpsc::Sender<Vec<u8>>,
    pid: Option<u32>,
}

impl PtyProcess for NativePtyProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.input
            .send(data.to_vec())
            .map_err(|_| Error::Pty("shell input is closed".to_string()))
    }

    fn resize(&mut self, size: TermSize) -> Result<()> {
        self.master
            .resize(to_pty_size(size))
            .map_err(|e| Error::Pty(e.to_string()))
    }

    fn kill(&mut self) -> Result<()> {
        match self.killer.kill() {
            Ok(()) => Ok(()),
            // already reaped
            Err(e) if e.kind() == ErrorKind::InvalidInput || e.raw_os_error() == Some(3) => Ok(()),
            Err(e) => Err(Error::Pty(e.to_string())),
        }
    }
}

fn exit_status(status: &portable_pty::ExitStatus) -> ExitStatus {
    match status.signal() {
        Some(signal) => ExitStatus::signal(signal),
        None => ExitStatus::code(i32::try_from(status.exit_code()).unwrap_or(i32::MAX)),
    }
}

fn spawn_read_loop(
    id: SessionId,
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    events: mpsc::UnboundedSender<PtyEvent>,
) {
    std::thread::spawn(move || {
        let mut decoder = Utf8Decoder::new();
        let mut buffer = [0_u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => {
                    let data = decoder.decode(&buffer[..read]);
                    if data.is_empty() {
                        continue;
                    }
                    let event = PtyEvent::Output {
                        id: id.clone(),
                        data,
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                // EIO once the slave side is gone
                Err(error) => {
                    trace!(%id, %error, "PTY read ended");
                    break;
                }
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            let _ = events.send(PtyEvent::Output {
                id: id.clone(),
                data: tail,
            });
        }

        let status = match child.wait() {
            Ok(status) => exit_status(&status),
            Err(error) => {
                warn!(%id, %error, "Failed to wait for shell");
                ExitStatus::default()
            }
        };
        debug!(%id, code = ?status.code, signal = ?status.signal, "Shell exited");
        let _ = events.send(PtyEvent::Exited { id, status });
    });
}

fn spawn_write_loop(id: SessionId, mut writer: Box<dyn Write + Send>) -> std_mpsc::Sender<Vec<u8>> {
    let (tx, rx) = std_mpsc::channel::<Vec<u8>>();
    std::thread::spawn(move || {
        while let Ok(input) = rx.recv() {
            if input.is_empty() {
                continue;
            }
            if let Err(error) = writer.write_all(&input).and_then(|()| writer.flush()) {
                debug!(%id, %error, "PTY write failed");
                break;
            }
        }
    });
    tx
}
