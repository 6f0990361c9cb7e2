use crate::core::message::Message;
use crate::core::session::ChatSession;
use crate::ui::state::UiState;
use crate::ui::wrap::wrap_text;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Frame,
};

/// Bubbles take at most this share of the transcript width.
const BUBBLE_WIDTH_PERCENT: usize = 70;
const MAX_INPUT_LINES: u16 = 6;

/// Read-only facts the renderer needs beyond the session.
pub struct ChatView<'a> {
    pub session: &'a ChatSession,
    pub model: &'a str,
    pub log_status: String,
}

pub fn ui(f: &mut Frame, view: &ChatView<'_>, state: &mut UiState<'_>) {
    let input_lines = (state.textarea.lines().len() as u16).clamp(1, MAX_INPUT_LINES);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(input_lines + 2), // +2 for borders
        ])
        .split(f.area());

    let mut lines = build_transcript_lines(view.session, chunks[0].width as usize);
    if view.session.is_waiting() {
        lines.push(waiting_line(view.session.selected(), state));
    }

    let available_height = chunks[0].height.saturating_sub(1); // title row
    state.update_scroll_bounds(lines.len(), available_height);

    let title = format!(
        "charchat v{} - {} ({}) • You: {} • Logging: {}",
        env!("CARGO_PKG_VERSION"),
        view.session.selected(),
        view.model,
        view.session.user_name().unwrap_or("not set"),
        view.log_status
    );

    let transcript = Paragraph::new(lines)
        .block(Block::default().title(title))
        .scroll((state.scroll_offset, 0));
    f.render_widget(transcript, chunks[0]);

    let input_title = format!(
        "Message {} (Enter to send, Alt+Enter for new line, Tab to switch character, Ctrl+C to quit)",
        view.session.selected()
    );
    let mut input_block = Block::bordered()
        .border_style(Style::default().fg(Color::Reset))
        .title(input_title);
    if let Some(status) = &state.status {
        input_block = input_block
            .title_bottom(Line::from(status.clone()).style(Style::default().fg(Color::Yellow)));
    }
    state.textarea.set_block(input_block);
    f.render_widget(&state.textarea, chunks[1]);
}

/// Pre-wrapped transcript: user bubbles right-aligned, character replies left.
pub fn build_transcript_lines(session: &ChatSession, width: usize) -> Vec<Line<'static>> {
    let bubble_width = (width * BUBBLE_WIDTH_PERCENT / 100).max(1);
    let user_label = session.user_name().unwrap_or("You").to_string();
    let mut lines = Vec::new();

    for message in session.history().snapshot() {
        lines.extend(message_lines(message, &user_label, session.selected(), bubble_width));
        lines.push(Line::default());
    }

    lines
}

fn message_lines(
    message: &Message,
    user_label: &str,
    character: &str,
    bubble_width: usize,
) -> Vec<Line<'static>> {
    let (label, alignment, style) = if message.is_user() {
        (user_label, Alignment::Right, Style::default().fg(Color::Cyan))
    } else {
        (character, Alignment::Left, Style::default())
    };

    let mut lines = vec![Line::from(Span::styled(
        label.to_string(),
        style.add_modifier(Modifier::BOLD),
    ))
    .alignment(alignment)];

    lines.extend(
        wrap_text(&message.content, bubble_width)
            .into_iter()
            .map(|text| Line::from(Span::styled(text, style)).alignment(alignment)),
    );
    lines
}

fn waiting_line(character: &str, state: &UiState<'_>) -> Line<'static> {
    let elapsed = state.pulse_start.elapsed().as_millis() as f32 / 1000.0;
    let phase = (elapsed * 2.0) % 2.0;
    let intensity = if phase < 1.0 { phase } else { 2.0 - phase };
    let symbol = if intensity < 0.33 {
        "○"
    } else if intensity < 0.66 {
        "◐"
    } else {
        "●"
    };

    Line::from(Span::styled(
        format!("{symbol} {character} is typing…"),
        Style::default().fg(Color::DarkGray),
    ))
}
