//! Interactive chat loop.
//!
//! Keyboard events are read on a background task and applied to the session
//! on this task. Each turn runs the completion pipeline on its own spawned
//! task; the reply comes back over a channel tagged with its [`PendingTurn`]
//! so a reply for a character that is no longer selected can be dropped.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::pipeline::{CompletionBackend, CompletionPipeline, PipelineError};
use crate::core::session::{ChatSession, PendingTurn, SessionError, TurnResolution, TurnStart};
use crate::ui::lifecycle::{restore_terminal, setup_terminal};
use crate::ui::renderer::{ui, ChatView};
use crate::ui::state::UiState;
use crate::utils::logging::TranscriptLog;

type TurnResult = (PendingTurn, Result<String, PipelineError>);

const SCROLL_STEP: u16 = 1;

#[derive(Debug, PartialEq, Eq)]
pub enum LoopCommand {
    Continue,
    Dispatch(PendingTurn),
    Exit,
}

/// Applies one key press to the session and UI state.
pub fn handle_key(
    session: &mut ChatSession,
    state: &mut UiState<'_>,
    log: &mut TranscriptLog,
    key: KeyEvent,
) -> LoopCommand {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Char('c') if ctrl => {
            state.exit_requested = true;
            LoopCommand::Exit
        }
        KeyCode::Char('l') if ctrl => {
            match log.toggle() {
                Ok(message) => state.set_status(message),
                Err(err) => state.set_status(format!("❌ {err}")),
            }
            LoopCommand::Continue
        }
        KeyCode::Enter if alt => {
            state.textarea.insert_str("\n");
            session.set_pending_input(state.input_text());
            LoopCommand::Continue
        }
        KeyCode::Enter => submit_input(session, state),
        KeyCode::Tab => {
            switch_character(session, state, log, true);
            LoopCommand::Continue
        }
        KeyCode::BackTab => {
            switch_character(session, state, log, false);
            LoopCommand::Continue
        }
        KeyCode::Up => {
            state.scroll_up(SCROLL_STEP);
            LoopCommand::Continue
        }
        KeyCode::Down => {
            state.scroll_down(SCROLL_STEP);
            LoopCommand::Continue
        }
        KeyCode::PageUp => {
            state.page_up();
            LoopCommand::Continue
        }
        KeyCode::PageDown => {
            state.page_down();
            LoopCommand::Continue
        }
        _ => {
            state.textarea.input(tui_textarea::Input::from(key));
            session.set_pending_input(state.input_text());
            LoopCommand::Continue
        }
    }
}

fn submit_input(session: &mut ChatSession, state: &mut UiState<'_>) -> LoopCommand {
    let text = state.input_text();
    session.set_pending_input(text.clone());

    match session.begin_turn(&text) {
        Ok(TurnStart::Ignored) => LoopCommand::Continue,
        Ok(TurnStart::Ended) => {
            state.exit_requested = true;
            LoopCommand::Exit
        }
        Ok(TurnStart::Dispatch(turn)) => {
            state.clear_input();
            state.clear_status();
            state.scroll_to_bottom();
            LoopCommand::Dispatch(turn)
        }
        Err(SessionError::TurnInFlight) if session.is_waiting() => {
            state.set_status(format!(
                "⏳ Still waiting for {}'s reply",
                session.selected()
            ));
            LoopCommand::Continue
        }
        Err(SessionError::TurnInFlight) => {
            state.set_status("⏳ Waiting for the previous character's reply to finish");
            LoopCommand::Continue
        }
        Err(err) => {
            state.set_status(format!("❌ {err}"));
            LoopCommand::Continue
        }
    }
}

fn switch_character(
    session: &mut ChatSession,
    state: &mut UiState<'_>,
    log: &TranscriptLog,
    forward: bool,
) {
    if !session.cycle_character(forward) {
        return;
    }
    if let Err(err) = log.log_character_switch(session.selected()) {
        warn!(error = %err, "Failed to write transcript log");
    }
    state.set_status(format!(
        "Now chatting with {} (conversation cleared)",
        session.selected()
    ));
    state.scroll_to_bottom();
}

/// Folds a finished pipeline call back into the session.
pub fn apply_turn_result(
    session: &mut ChatSession,
    state: &mut UiState<'_>,
    log: &TranscriptLog,
    turn: PendingTurn,
    result: Result<String, PipelineError>,
) {
    let utterance = turn.utterance.clone();
    let character = turn.character.clone();

    match session.finish_turn(turn, result) {
        Ok(TurnResolution::Recorded(reply)) => {
            let user_label = session.user_name().unwrap_or("User").to_string();
            if let Err(err) = log.log_turn(&user_label, &utterance, &character, &reply) {
                state.set_status(format!("❌ Failed to write log: {err}"));
            }
            state.scroll_to_bottom();
        }
        Ok(TurnResolution::Stale) => {}
        Err(SessionError::Pipeline(PipelineError::EmptyCompletion)) => {
            state.set_status(
                "⚠️ The model returned no reply; nothing was added to the conversation.",
            );
        }
        Err(err) => {
            warn!(error = %err, "Turn failed");
            state.set_status(format!("❌ {err}"));
        }
    }
}

pub(crate) fn sanitize_pasted_text(text: &str) -> String {
    let without_crlf = text.replace("\r\n", "\n");
    let without_cr = without_crlf.replace('\r', "\n");
    let expanded_tabs = without_cr.replace('\t', "    ");
    expanded_tabs
        .chars()
        .filter(|&c| c == '\n' || !c.is_control())
        .collect()
}

fn spawn_turn<B: CompletionBackend + 'static>(
    pipeline: Arc<CompletionPipeline<B>>,
    turn: PendingTurn,
    reply_tx: mpsc::UnboundedSender<TurnResult>,
) {
    tokio::spawn(async move {
        debug!(turn = turn.id, character = %turn.character, "Starting turn");
        let result = pipeline
            .complete(&turn.utterance, &turn.descriptor, &turn.history)
            .await;
        let _ = reply_tx.send((turn, result));
    });
}

fn spawn_event_reader(event_tx: mpsc::UnboundedSender<Event>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Ok(true) = event::poll(Duration::from_millis(10)) {
                match event::read() {
                    Ok(ev) => {
                        if event_tx.send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                }
            } else {
                tokio::task::yield_now().await;
            }
        }
    })
}

pub async fn run_chat<B: CompletionBackend + 'static>(
    mut session: ChatSession,
    pipeline: Arc<CompletionPipeline<B>>,
    mut log: TranscriptLog,
) -> Result<(), Box<dyn Error>> {
    log.log_session_start(session.selected())?;

    let mut terminal = setup_terminal()?;
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let event_reader_handle = spawn_event_reader(event_tx);
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<TurnResult>();

    let mut state = UiState::new();
    let mut request_redraw = true;
    let mut ended_by_stop = false;

    let result: Result<(), Box<dyn Error>> = 'main_loop: loop {
        if request_redraw {
            let view = ChatView {
                session: &session,
                model: pipeline.model(),
                log_status: log.status_string(),
            };
            if let Err(err) = terminal.draw(|f| ui(f, &view, &mut state)) {
                break 'main_loop Err(err.into());
            }
            request_redraw = false;
        }

        let mut activity = false;

        while let Ok(ev) = event_rx.try_recv() {
            activity = true;
            match ev {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let stop_typed = key.code == KeyCode::Enter
                        && !key.modifiers.contains(KeyModifiers::ALT);
                    match handle_key(&mut session, &mut state, &mut log, key) {
                        LoopCommand::Continue => {}
                        LoopCommand::Dispatch(turn) => {
                            spawn_turn(Arc::clone(&pipeline), turn, reply_tx.clone())
                        }
                        LoopCommand::Exit => {
                            ended_by_stop = stop_typed;
                            break 'main_loop Ok(());
                        }
                    }
                }
                Event::Paste(text) => {
                    state.textarea.insert_str(sanitize_pasted_text(&text));
                    session.set_pending_input(state.input_text());
                }
                _ => {}
            }
        }

        while let Ok((turn, result)) = reply_rx.try_recv() {
            activity = true;
            apply_turn_result(&mut session, &mut state, &log, turn, result);
        }

        if activity || session.is_waiting() {
            request_redraw = true;
        }
        if !activity {
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
    };

    event_reader_handle.abort();
    restore_terminal(&mut terminal)?;

    if ended_by_stop {
        println!("Chat ended. Thank you!");
    }

    result
}
