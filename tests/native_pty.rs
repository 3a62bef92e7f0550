//! Real shells through the terminal host
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;
use termdeck_core::{
    ChannelSink, CreateRequest, NativePtySystem, ServerMessage, SessionId, TermSize,
    TerminalConfig, TerminalHost,
};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(10);

fn sh_config() -> TerminalConfig {
    TerminalConfig {
        shell: Some("/bin/sh".to_string()),
        ..TerminalConfig::default()
    }
}

/// Collect output until `needle` shows up
async fn read_until(rx: &mut mpsc::UnboundedReceiver<ServerMessage>, needle: &str) -> String {
    let mut seen = String::new();
    while !seen.contains(needle) {
        match timeout(WAIT, rx.recv()).await {
            Ok(Some(ServerMessage::Data { data, .. })) => seen.push_str(&data),
            Ok(Some(other)) => panic!("unexpected message {:?}, output so far: {:?}", other, seen),
            Ok(None) => panic!("sink closed, output so far: {:?}", seen),
            Err(_) => panic!("timed out waiting for {:?}, output so far: {:?}", needle, seen),
        }
    }
    seen
}

#[tokio::test]
async fn test_shell_round_trip_and_exit_code() {
    let shutdown = CancellationToken::new();
    let (host, task) = TerminalHost::spawn(Arc::new(NativePtySystem::new()), sh_config(), shutdown.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let reply = host
        .create(
            CreateRequest::with_id(SessionId::from("real"))
                .with_cwd(std::env::temp_dir())
                .with_size(TermSize::new(100, 30)),
            ChannelSink::new(tx).boxed(),
        )
        .await;
    assert!(reply.success, "create failed: {:?}", reply.error);
    assert_eq!(reply.shell.as_deref(), Some("/bin/sh"));

    // The arithmetic keeps the echoed command line from matching
    host.write(&reply.id, "echo termdeck-$((40 + 2))\n");
    read_until(&mut rx, "termdeck-42").await;

    host.write(&reply.id, "exit 3\n");
    let exit = loop {
        match timeout(WAIT, rx.recv()).await {
            Ok(Some(ServerMessage::Data { .. })) => continue,
            Ok(Some(msg)) => break msg,
            other => panic!("no exit message: {:?}", other),
        }
    };
    assert_eq!(
        exit,
        ServerMessage::Exit {
            id: reply.id.clone(),
            exit_code: Some(3),
            signal: None,
        }
    );

    tokio_test::assert_ok!(host.list().await);
    assert!(host.list().await.unwrap().is_empty());

    shutdown.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn test_terminal_size_reaches_the_shell() {
    let shutdown = CancellationToken::new();
    let (host, task) = TerminalHost::spawn(Arc::new(NativePtySystem::new()), sh_config(), shutdown.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let reply = host
        .create(
            CreateRequest::default().with_size(TermSize::new(91, 27)),
            ChannelSink::new(tx).boxed(),
        )
        .await;
    assert!(reply.success, "create failed: {:?}", reply.error);

    host.write(&reply.id, "stty size | sed 's/ /x/'\n");
    read_until(&mut rx, "27x91").await;

    host.resize(&reply.id, 120, 40);
    host.write(&reply.id, "stty size | sed 's/ /x/'\n");
    read_until(&mut rx, "40x120").await;

    assert!(host.kill(&reply.id).await.success);
    shutdown.cancel();
    task.await.unwrap();
}
