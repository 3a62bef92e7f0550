//! Full-screen terminal front end
//!
//! Renders one vt100 screen per tab with ratatui + crossterm, plus a footer
//! for natural-language command generation. Starts its own terminal host.

pub mod app;
pub mod event;
pub mod keys;
pub mod ui;
pub mod view;

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::runtime::{self, AppConfig};
use app::App;

/// Run the TUI until the user quits or the last tab closes.
pub async fn run(config: AppConfig, cwd: Option<PathBuf>) -> Result<()> {
    let runtime = runtime::bootstrap(&config)?;

    // ── Terminal setup ──────────────────────────────────────────────

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
        .context("Failed to enter alternate screen")?;

    // Lets Shift+Enter reach the footer on terminals that support it
    let enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )
        .context("Failed to enable keyboard enhancement")?;
    }

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
    let screen = terminal.size().context("Failed to read terminal size")?;

    let mut app = App::new(
        runtime.host.clone(),
        runtime.generator.clone(),
        &config,
        screen.width,
        screen.height,
    );
    app.open_tab(cwd);
    let body = app.body_size();
    info!(cols = body.cols, rows = body.rows, "TUI started");

    // ── Main loop ───────────────────────────────────────────────────

    let tick_rate = Duration::from_millis(config.terminal.flush_interval_ms.max(1));

    let run_result: Result<()> = loop {
        terminal.draw(|frame| ui::draw(frame, &mut app))?;

        if let Err(e) = event::handle_events(&mut app, tick_rate) {
            break Err(e);
        }

        if app.should_quit {
            break Ok(());
        }
    };

    // ── Restore terminal ────────────────────────────────────────────

    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags).ok();
    }
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    drop(app);
    runtime.shutdown().await;
    run_result
}
