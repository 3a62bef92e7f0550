//! vt100-backed terminal view
//!
//! Converts vt100 screen state into ratatui Line/Span primitives. Cells with
//! the same style are batched into one span.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use termdeck_core::{TermSize, TerminalView};
use vt100::{Color as VtColor, Parser};

/// Lines of emulator scrollback kept per tab
const SCROLLBACK_ROWS: usize = 1000;

/// One tab's screen
pub struct VtView {
    parser: Parser,
    banner: Option<String>,
}

impl VtView {
    pub fn new(size: TermSize) -> Self {
        Self {
            parser: Parser::new(size.rows.max(1), size.cols.max(1), SCROLLBACK_ROWS),
            banner: None,
        }
    }

    pub fn set_size(&mut self, size: TermSize) {
        self.parser
            .screen_mut()
            .set_size(size.rows.max(1), size.cols.max(1));
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Whether the program in the shell asked for bracketed paste
    pub fn bracketed_paste(&self) -> bool {
        self.parser.screen().bracketed_paste()
    }

    /// Render the visible screen
    pub fn render_lines(&self) -> Vec<Line<'static>> {
        let screen = self.parser.screen();
        let (rows, cols) = screen.size();
        let (cursor_row, cursor_col) = screen.cursor_position();
        let show_cursor = !screen.hide_cursor() && screen.scrollback() == 0;

        let mut lines = Vec::with_capacity(rows as usize);
        for row in 0..rows {
            let mut batch = SpanBatch::default();
            for col in 0..cols {
                let Some(cell) = screen.cell(row, col) else {
                    batch.push(Style::default(), " ");
                    continue;
                };
                if cell.is_wide_continuation() {
                    continue;
                }

                let mut style = style_for_cell(cell);
                if show_cursor && row == cursor_row && col == cursor_col {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                if cell.has_contents() {
                    batch.push(style, &cell.contents());
                } else {
                    batch.push(style, " ");
                }
            }
            lines.push(batch.finish());
        }
        lines
    }
}

impl TerminalView for VtView {
    fn write(&mut self, data: &str) {
        self.parser.process(data.as_bytes());
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = Some(text.to_string());
    }

    fn size(&self) -> TermSize {
        let (rows, cols) = self.parser.screen().size();
        TermSize::new(cols, rows)
    }
}

#[derive(Default)]
struct SpanBatch {
    spans: Vec<Span<'static>>,
    text: String,
    style: Option<Style>,
}

impl SpanBatch {
    fn push(&mut self, style: Style, content: &str) {
        match self.style {
            Some(current) if current == style => {}
            Some(current) => {
                self.spans
                    .push(Span::styled(std::mem::take(&mut self.text), current));
                self.style = Some(style);
            }
            None => self.style = Some(style),
        }
        self.text.push_str(content);
    }

    fn finish(mut self) -> Line<'static> {
        if let Some(style) = self.style {
            self.spans.push(Span::styled(self.text, style));
        }
        Line::from(self.spans)
    }
}

fn style_for_cell(cell: &vt100::Cell) -> Style {
    let mut style = Style::default()
        .fg(map_color(cell.fgcolor()))
        .bg(map_color(cell.bgcolor()));

    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.dim() {
        style = style.add_modifier(Modifier::DIM);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn map_color(color: VtColor) -> Color {
    match color {
        VtColor::Default => Color::Reset,
        VtColor::Idx(idx) => Color::Indexed(idx),
        VtColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}
