//! Crossterm event handling for the TUI

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use super::app::{App, Focus};

/// Apply pending results, then wait up to `timeout` for one input event.
pub fn handle_events(app: &mut App, timeout: Duration) -> Result<()> {
    app.poll();

    if event::poll(timeout)? {
        match event::read()? {
            Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
            Event::Paste(text) => app.paste(&text),
            Event::Resize(cols, rows) => app.on_resize(cols, rows),
            _ => {}
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        // ── Quit ────────────────────────────────────────────────
        (KeyModifiers::CONTROL, KeyCode::Char('q')) => {
            app.should_quit = true;
        }

        // ── Tabs ────────────────────────────────────────────────
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => app.open_tab(None),
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => app.close_active(),
        (KeyModifiers::CONTROL, KeyCode::PageDown) => app.next_tab(),
        (KeyModifiers::CONTROL, KeyCode::PageUp) => app.prev_tab(),
        (KeyModifiers::ALT, KeyCode::Char(c @ '1'..='9')) => {
            app.select(c as usize - '1' as usize);
        }

        // ── Command footer ──────────────────────────────────────
        (KeyModifiers::CONTROL, KeyCode::Char('g')) => app.toggle_footer(),

        _ => match app.focus {
            Focus::Terminal => app.send_key(key),
            Focus::Footer => handle_footer_key(app, key),
        },
    }
}

fn handle_footer_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            let newline = key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT);
            app.submit_footer(newline);
        }
        KeyCode::Esc => app.escape_footer(),
        _ => app.footer_input(key),
    }
}
