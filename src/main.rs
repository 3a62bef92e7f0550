//! termdeck - tabbed terminal with natural-language command generation
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};

mod cli;
mod runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = runtime::load_config()?;
    let _log_guard = runtime::init_logging(&config.logging, cli.log_target())?;

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to read .env: {}", e),
    }

    cli::run(cli, config).await
}
