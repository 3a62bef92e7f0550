//! Tracing subscriber setup
//!
//! The TUI owns the screen, so it logs to a daily rolling file. The bridge
//! speaks on stdout and the doctor prints a report, so both log to stderr.

use super::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Where log records go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Daily rolling file under the configured directory
    File,
    /// Standard error
    Stderr,
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter()))
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits.
pub fn init_logging(config: &LoggingConfig, target: LogTarget) -> Result<Option<WorkerGuard>> {
    match target {
        LogTarget::File => {
            let dir = config.log_dir();
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::daily(&dir, "termdeck.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = if config.json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_filter(env_filter(config))
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(env_filter(config))
                    .boxed()
            };
            let _ = tracing_subscriber::registry().with(layer).try_init();
            Ok(Some(guard))
        }
        LogTarget::Stderr => {
            let layer = if config.json {
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter(config))
                    .boxed()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(env_filter(config))
                    .boxed()
            };
            let _ = tracing_subscriber::registry().with(layer).try_init();
            Ok(None)
        }
    }
}
