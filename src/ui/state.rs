use std::time::Instant;

use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders};
use tui_textarea::TextArea;

/// Terminal-side state that the session knows nothing about.
pub struct UiState<'a> {
    pub textarea: TextArea<'a>,
    pub status: Option<String>,
    pub scroll_offset: u16,
    /// Keep the newest message in view until the user scrolls up.
    pub follow_bottom: bool,
    pub exit_requested: bool,
    pub pulse_start: Instant,
    max_scroll: u16,
    page_height: u16,
}

impl Default for UiState<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState<'_> {
    pub fn new() -> Self {
        Self {
            textarea: new_textarea(),
            status: None,
            scroll_offset: 0,
            follow_bottom: true,
            exit_requested: false,
            pulse_start: Instant::now(),
            max_scroll: 0,
            page_height: 0,
        }
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn clear_input(&mut self) {
        self.textarea = new_textarea();
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Called by the renderer once the transcript height is known.
    pub fn update_scroll_bounds(&mut self, total_lines: usize, visible_height: u16) {
        let total = u16::try_from(total_lines).unwrap_or(u16::MAX);
        self.page_height = visible_height;
        self.max_scroll = total.saturating_sub(visible_height);
        if self.follow_bottom || self.scroll_offset > self.max_scroll {
            self.scroll_offset = self.max_scroll;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.scroll_offset = self.scroll_offset.min(self.max_scroll).saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(self.max_scroll);
        self.follow_bottom = self.scroll_offset >= self.max_scroll;
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.page_height.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.page_height.max(1));
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.scroll_offset = self.max_scroll;
    }
}

fn new_textarea<'a>() -> TextArea<'a> {
    let mut textarea = TextArea::default();
    textarea.set_cursor_line_style(Style::default());
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Reset)),
    );
    textarea
}
