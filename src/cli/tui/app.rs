//! TUI application state management

use crossterm::event::{Event, KeyEvent};
use ratatui::style::{Modifier, Style};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use termdeck_core::{
    CommandGenerator, EnterAction, HostHandle, SessionId, TabController, TabStatus, TermSize,
};
use tui_textarea::TextArea;

use super::keys::key_event_to_bytes;
use super::view::VtView;
use crate::runtime::AppConfig;

/// Rows taken by the tab bar and the footer
pub const CHROME_ROWS: u16 = 4;

const BRACKETED_PASTE_START: &str = "\x1b[200~";
const BRACKETED_PASTE_END: &str = "\x1b[201~";

/// Where keystrokes go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Terminal,
    Footer,
}

/// Main application state.
pub struct App {
    pub tabs: TabController<VtView>,
    pub footer: TextArea<'static>,
    pub focus: Focus,
    pub should_quit: bool,
    body: TermSize,
}

impl App {
    pub fn new(
        host: HostHandle,
        generator: Option<Arc<dyn CommandGenerator>>,
        config: &AppConfig,
        screen_cols: u16,
        screen_rows: u16,
    ) -> Self {
        Self {
            tabs: TabController::new(
                host,
                generator,
                config.terminal.clone(),
                &config.generation,
            ),
            footer: new_footer(),
            focus: Focus::Terminal,
            should_quit: false,
            body: body_size(screen_cols, screen_rows),
        }
    }

    pub fn body_size(&self) -> TermSize {
        self.body
    }

    fn active_id(&self) -> Option<SessionId> {
        self.tabs.active().map(|tab| tab.id().clone())
    }

    // ── tabs ─────────────────────────────────────────────────────────────

    /// Open a tab in `cwd`, or in the active tab's directory
    pub fn open_tab(&mut self, cwd: Option<PathBuf>) {
        let cwd = cwd.or_else(|| match self.tabs.active().map(|t| t.status()) {
            Some(TabStatus::Running { cwd, .. }) => Some(cwd.clone()),
            _ => None,
        });
        self.tabs.open_tab(VtView::new(self.body), cwd);
        self.reset_footer();
    }

    pub fn close_active(&mut self) {
        if let Some(id) = self.active_id() {
            self.tabs.close_tab(&id);
            self.reset_footer();
        }
    }

    pub fn select(&mut self, index: usize) {
        if self.tabs.select(index) {
            self.reset_footer();
        }
    }

    pub fn next_tab(&mut self) {
        self.tabs.next_tab();
        self.reset_footer();
    }

    pub fn prev_tab(&mut self) {
        self.tabs.prev_tab();
        self.reset_footer();
    }

    /// Apply host and generator results; quits once the last tab is gone
    pub fn poll(&mut self) {
        self.tabs.poll(Instant::now());
        if self.tabs.is_empty() {
            self.should_quit = true;
        }
    }

    /// The screen changed size
    pub fn on_resize(&mut self, cols: u16, rows: u16) {
        self.body = body_size(cols, rows);
        let ids: Vec<SessionId> = self.tabs.tabs().iter().map(|t| t.id().clone()).collect();
        for id in ids {
            if let Some(tab) = self.tabs.tab_mut(&id) {
                tab.view_mut().set_size(self.body);
            }
            self.tabs.resize(&id, self.body.cols, self.body.rows);
        }
    }

    // ── terminal ─────────────────────────────────────────────────────────

    /// Forward a key to the active shell
    pub fn send_key(&mut self, key: KeyEvent) {
        let Some(id) = self.active_id() else {
            return;
        };
        if let Some(input) = key_event_to_bytes(key).and_then(|b| String::from_utf8(b).ok()) {
            self.tabs.send_input(&id, &input);
        }
    }

    /// Pasted text goes to whatever has focus
    pub fn paste(&mut self, text: &str) {
        let Some(id) = self.active_id() else {
            return;
        };
        match self.focus {
            Focus::Terminal => {
                let bracketed = self
                    .tabs
                    .tab(&id)
                    .is_some_and(|t| t.view().bracketed_paste());
                if bracketed {
                    let wrapped = format!("{BRACKETED_PASTE_START}{text}{BRACKETED_PASTE_END}");
                    self.tabs.send_input(&id, &wrapped);
                } else {
                    self.tabs.send_input(&id, &text.replace('\n', "\r"));
                }
            }
            Focus::Footer => {
                // A paste is committed text; an Enter right behind it belongs to it
                self.tabs.footer_composition_start(&id);
                self.footer.insert_str(text);
                self.tabs.footer_composition_end(&id, Instant::now());
            }
        }
    }

    // ── footer ───────────────────────────────────────────────────────────

    pub fn toggle_footer(&mut self) {
        self.focus = match self.focus {
            Focus::Terminal => Focus::Footer,
            Focus::Footer => Focus::Terminal,
        };
    }

    /// The request text as typed
    pub fn footer_text(&self) -> String {
        self.footer.lines().join("\n")
    }

    pub fn footer_input(&mut self, key: KeyEvent) {
        if let Some(tab) = self.tabs.active_mut() {
            tab.dismiss_notice();
        }
        self.footer.input(Event::Key(key));
    }

    /// Enter in the footer: generate, run the preview, or add a line
    pub fn submit_footer(&mut self, newline: bool) {
        let Some(id) = self.active_id() else {
            return;
        };
        let had_preview = self
            .tabs
            .tab(&id)
            .is_some_and(|t| t.coordinator().preview().is_some());
        let text = self.footer_text();

        match self
            .tabs
            .footer_enter(&id, text.trim(), newline, Instant::now())
        {
            EnterAction::InsertNewline => self.footer.insert_newline(),
            EnterAction::Submit if had_preview => {
                self.reset_footer();
                self.focus = Focus::Terminal;
            }
            EnterAction::Submit | EnterAction::Suppress => {}
        }
    }

    /// Esc in the footer: cancel what is pending, otherwise leave the footer
    pub fn escape_footer(&mut self) {
        let cancelled = self
            .active_id()
            .is_some_and(|id| self.tabs.cancel_generation(&id));
        if !cancelled {
            self.focus = Focus::Terminal;
        }
    }

    fn reset_footer(&mut self) {
        self.footer = new_footer();
    }
}

fn new_footer() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_cursor_line_style(Style::default());
    textarea.set_cursor_style(Style::default().add_modifier(Modifier::REVERSED));
    textarea.set_placeholder_text("Describe a command, e.g. \"find files larger than 1GB\"");
    textarea
}

fn body_size(cols: u16, rows: u16) -> TermSize {
    TermSize::new(cols.max(1), rows.saturating_sub(CHROME_ROWS).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_size_leaves_room_for_chrome() {
        assert_eq!(body_size(120, 40), TermSize::new(120, 36));
        assert_eq!(body_size(0, 2), TermSize::new(1, 1));
    }

    #[test]
    fn test_new_footer_is_empty() {
        let footer = new_footer();
        assert_eq!(footer.lines(), [String::new()]);
    }
}
