//! TUI rendering with ratatui

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use termdeck_core::generation::{danger, CoordinatorState};
use termdeck_core::{TabStatus, WarningLevel};
use unicode_width::UnicodeWidthStr;

use super::app::{App, Focus};

const BAR_BG: Color = Color::Rgb(20, 20, 20);
const KEY_HINTS: &str = "^T new  ^W close  ^PgUp/^PgDn switch  ^G ask  ^Q quit ";

/// Main draw function, renders the full TUI layout.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // tab bar
            Constraint::Min(1),    // terminal
            Constraint::Length(3), // footer
        ])
        .split(frame.area());

    draw_tab_bar(frame, app, outer[0]);
    draw_terminal(frame, app, outer[1]);
    draw_footer(frame, app, outer[2]);
}

// ── tab bar ─────────────────────────────────────────────────────────────

fn draw_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.tabs.active_index();
    let mut spans: Vec<Span> = Vec::new();

    for (i, tab) in app.tabs.tabs().iter().enumerate() {
        let marker = match tab.status() {
            TabStatus::Starting => "…",
            TabStatus::Running { .. } => "",
            TabStatus::Exited { .. } => "✕",
            TabStatus::Failed(_) => "!",
        };
        let label = format!(" {}:{}{} ", i + 1, tab.title(), marker);
        let style = if i == active {
            Style::default().bg(Color::Blue).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(label, style));
    }

    let used: usize = spans.iter().map(|s| s.content.width()).sum();
    let remaining = (area.width as usize).saturating_sub(used);
    if remaining > KEY_HINTS.width() {
        spans.push(Span::raw(" ".repeat(remaining - KEY_HINTS.width())));
        spans.push(Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray)));
    }

    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(BAR_BG).fg(Color::White));
    frame.render_widget(p, area);
}

// ── terminal ────────────────────────────────────────────────────────────

fn draw_terminal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(tab) = app.tabs.active() else {
        return;
    };

    match tab.status() {
        TabStatus::Starting => {
            let p = Paragraph::new("Starting shell...").style(Style::default().fg(Color::DarkGray));
            frame.render_widget(p, area);
        }
        TabStatus::Failed(message) => {
            let p = Paragraph::new(vec![
                Line::from(Span::styled("Failed to start terminal", Style::default().fg(Color::Red).bold())),
                Line::from(message.as_str()),
            ])
            .wrap(Wrap { trim: false });
            frame.render_widget(p, area);
        }
        TabStatus::Running { .. } | TabStatus::Exited { .. } => {
            frame.render_widget(Paragraph::new(tab.view().render_lines()), area);
        }
    }

    if let Some(banner) = tab.view().banner() {
        if area.height > 0 {
            let row = Rect::new(area.x, area.bottom() - 1, area.width, 1);
            let p = Paragraph::new(banner).style(Style::default().bg(Color::Yellow).fg(Color::Black));
            frame.render_widget(p, row);
        }
    }
}

// ── footer ──────────────────────────────────────────────────────────────

fn draw_footer(frame: &mut Frame, app: &mut App, area: Rect) {
    let border = if app.focus == Focus::Footer {
        Style::default().fg(Color::Blue)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let (state, notice) = match app.tabs.active() {
        Some(tab) => (tab.coordinator().state().clone(), tab.notice().map(str::to_string)),
        None => (CoordinatorState::Idle, None),
    };

    match state {
        CoordinatorState::Previewing { command } => {
            let (title, title_style) = match command.warning_level {
                WarningLevel::Dangerous => (
                    match danger::explain(&command.command) {
                        Some(reason) => format!(" ⚠ Dangerous: {} ", reason),
                        None => " ⚠ Dangerous command ".to_string(),
                    },
                    Style::default().fg(Color::Red).bold(),
                ),
                WarningLevel::Caution => (" Caution ".to_string(), Style::default().fg(Color::Yellow)),
                WarningLevel::Safe => (" Suggested command ".to_string(), Style::default().fg(Color::Green)),
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(title, title_style))
                .title_bottom(" Enter run · Esc dismiss ");
            let p = Paragraph::new(Line::from(vec![
                Span::styled("$ ", Style::default().fg(Color::DarkGray)),
                Span::raw(command.command),
            ]))
            .block(block);
            frame.render_widget(p, area);
        }
        CoordinatorState::Generating { .. } => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(Span::styled(" Generating... (Esc to cancel) ", Style::default().fg(Color::Yellow)));
            app.footer.set_block(block);
            frame.render_widget(&app.footer, area);
        }
        CoordinatorState::Idle => {
            let title = match notice {
                Some(notice) => Span::styled(format!(" {} ", notice), Style::default().fg(Color::Red)),
                None => Span::raw(" Ask for a command (^G) "),
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title);
            app.footer.set_block(block);
            frame.render_widget(&app.footer, area);
        }
    }
}
