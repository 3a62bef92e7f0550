//! JSON-lines bridge
//!
//! Reads [`ClientMessage`]s from stdin, one JSON object per line, and writes
//! [`ServerMessage`]s to stdout the same way, so an out-of-process UI can
//! drive the terminal host. Malformed lines are logged and skipped.

use crate::runtime::{self, AppConfig};
use anyhow::{Context, Result};
use termdeck_core::{
    wait_for_shutdown_signal, ChannelSink, ClientMessage, HostHandle, ServerMessage,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Serve the session protocol until stdin closes or a shutdown signal arrives
pub async fn run(config: AppConfig) -> Result<()> {
    let runtime = runtime::bootstrap(&config)?;
    let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let writer = tokio::spawn(write_messages(out_rx));

    info!("Bridge ready");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let signal = wait_for_shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            line = lines.next_line() => match line.context("Failed to read stdin")? {
                Some(line) => dispatch(&runtime.host, &out_tx, &line),
                None => {
                    debug!("stdin closed");
                    break;
                }
            },
        }
    }

    runtime.shutdown().await;
    drop(out_tx);
    writer.await.context("Bridge writer panicked")?
}

fn dispatch(host: &HostHandle, out: &mpsc::UnboundedSender<ServerMessage>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let message = match serde_json::from_str::<ClientMessage>(line) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Skipping malformed bridge message");
            return;
        }
    };

    match message {
        ClientMessage::Create(request) => {
            let host = host.clone();
            let out = out.clone();
            tokio::spawn(async move {
                let sink = ChannelSink::new(out.clone()).boxed();
                let reply = host.create(request, sink).await;
                let _ = out.send(ServerMessage::CreateResult(reply));
            });
        }
        ClientMessage::Input { id, data } => host.write(&id, data),
        ClientMessage::Resize { id, cols, rows } => host.resize(&id, cols, rows),
        ClientMessage::Kill { id } => {
            let host = host.clone();
            let out = out.clone();
            tokio::spawn(async move {
                let reply = host.kill(&id).await;
                let _ = out.send(ServerMessage::KillResult(reply));
            });
        }
    }
}

async fn write_messages(mut rx: mpsc::UnboundedReceiver<ServerMessage>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_string(&message).context("Failed to encode message")?;
        line.push('\n');
        stdout
            .write_all(line.as_bytes())
            .await
            .context("Failed to write stdout")?;
        stdout.flush().await.context("Failed to flush stdout")?;
    }
    Ok(())
}
