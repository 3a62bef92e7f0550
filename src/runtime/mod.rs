//! Runtime wiring: configuration, logging and the composition root

pub mod config;
mod loader;
mod logging;
mod providers;

pub use config::AppConfig;
pub use loader::load_config;
pub use logging::{init_logging, LogTarget};
pub use providers::{resolve_generator, resolve_llm_provider};

use anyhow::Result;
use std::sync::Arc;
use termdeck_core::{CommandGenerator, HostHandle, NativePtySystem, ShutdownController, TerminalHost};
use tokio::task::JoinHandle;
use tracing::info;

/// Long-lived services shared by a front end
pub struct Runtime {
    pub host: HostHandle,
    pub host_task: JoinHandle<()>,
    pub shutdown: ShutdownController,
    pub generator: Option<Arc<dyn CommandGenerator>>,
}

/// Start the terminal host and resolve the command generator
pub fn bootstrap(config: &AppConfig) -> Result<Runtime> {
    let generator = resolve_generator(&config.generation)?;
    let shutdown = ShutdownController::new();
    let (host, host_task) = TerminalHost::spawn(
        Arc::new(NativePtySystem::new()),
        config.terminal.clone(),
        shutdown.token(),
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        generation = generator.is_some(),
        "termdeck runtime started"
    );

    Ok(Runtime {
        host,
        host_task,
        shutdown,
        generator,
    })
}

impl Runtime {
    /// Stop the host, killing every shell
    pub async fn shutdown(self) {
        let Runtime {
            host,
            host_task,
            shutdown,
            ..
        } = self;
        drop(host);
        shutdown.shutdown(Some(host_task)).await;
    }
}
