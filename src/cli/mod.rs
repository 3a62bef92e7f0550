//! CLI module for termdeck
//!
//! Provides commands:
//! - `tui`: the tabbed terminal (default)
//! - `bridge`: the session protocol as JSON lines on stdin/stdout
//! - `doctor`: system diagnostics and health checks

use crate::runtime::{AppConfig, LogTarget};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod bridge;
pub mod doctor;
pub mod tui;

/// termdeck CLI
#[derive(Parser, Debug)]
#[command(name = "termdeck")]
#[command(about = "Tabbed terminal with natural-language command generation")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the terminal UI (default)
    Tui {
        /// Working directory for the first tab
        #[arg(long)]
        cwd: Option<PathBuf>,
    },
    /// Serve terminal sessions as JSON lines on stdin/stdout
    Bridge,
    /// Run system diagnostics
    Doctor,
}

impl Cli {
    /// Where this command should log
    pub fn log_target(&self) -> LogTarget {
        match self.command {
            None | Some(Commands::Tui { .. }) => LogTarget::File,
            Some(Commands::Bridge) | Some(Commands::Doctor) => LogTarget::Stderr,
        }
    }
}

/// Run the CLI command
pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command {
        None => tui::run(config, None).await,
        Some(Commands::Tui { cwd }) => tui::run(config, cwd).await,
        Some(Commands::Bridge) => bridge::run(config).await,
        Some(Commands::Doctor) => doctor::run(&config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_tui_with_file_logging() {
        let cli = Cli::parse_from(["termdeck"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.log_target(), LogTarget::File);
    }

    #[test]
    fn test_tui_cwd_flag() {
        let cli = Cli::parse_from(["termdeck", "tui", "--cwd", "/tmp"]);
        match cli.command {
            Some(Commands::Tui { cwd }) => assert_eq!(cwd, Some(PathBuf::from("/tmp"))),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bridge_logs_to_stderr() {
        let cli = Cli::parse_from(["termdeck", "bridge"]);
        assert_eq!(cli.log_target(), LogTarget::Stderr);
    }
}
