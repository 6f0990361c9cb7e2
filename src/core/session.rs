//! Per-session conversation state.
//!
//! [`ChatSession`] owns everything a single interactive session mutates: the
//! selected character, that character's conversation, the remembered user
//! name and the pending input. A turn is split into [`ChatSession::begin_turn`]
//! and [`ChatSession::finish_turn`] so the network call can run on another
//! task while the UI keeps rendering. At most one request is outstanding at
//! a time. A character switch does not cancel it, but its reply is dropped
//! when it arrives and no new turn starts until it has.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::character::{CharacterCatalog, UnknownCharacterError};
use crate::core::conversation::ConversationHistory;
use crate::core::message::Message;
use crate::core::name_capture::capture_name;
use crate::core::pipeline::{CompletionBackend, CompletionPipeline, PipelineError};

/// Input that ends the chat instead of being sent.
pub const STOP_COMMAND: &str = "stop";

#[derive(Debug)]
pub enum SessionError {
    /// A reply for an earlier submission is still outstanding.
    TurnInFlight,

    /// The pipeline failed; nothing was added to the conversation.
    Pipeline(PipelineError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::TurnInFlight => {
                write!(f, "Still waiting for the previous reply")
            }
            SessionError::Pipeline(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::TurnInFlight => None,
            SessionError::Pipeline(err) => Some(err),
        }
    }
}

impl From<PipelineError> for SessionError {
    fn from(err: PipelineError) -> Self {
        SessionError::Pipeline(err)
    }
}

/// Everything the pipeline needs for one turn, detached from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub id: u64,
    pub generation: u64,
    pub character: String,
    pub utterance: String,
    pub descriptor: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnStart {
    /// Blank input; nothing to do.
    Ignored,
    /// The user asked to end the chat.
    Ended,
    /// Run the pipeline for this turn, then call `finish_turn`.
    Dispatch(PendingTurn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResolution {
    /// The turn was appended to the conversation.
    Recorded(String),
    /// The character changed while the reply was outstanding; it was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ignored,
    Ended,
    Replied(String),
    Stale,
}

/// The request currently running against the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Outstanding {
    id: u64,
    generation: u64,
}

pub struct ChatSession {
    catalog: Arc<CharacterCatalog>,
    selected: String,
    history: ConversationHistory,
    user_name: Option<String>,
    pending_input: String,
    outstanding: Option<Outstanding>,
    generation: u64,
    next_turn_id: u64,
}

impl ChatSession {
    /// Starts a session on `initial`, or on the first catalog entry.
    pub fn new(
        catalog: Arc<CharacterCatalog>,
        initial: Option<&str>,
    ) -> Result<Self, UnknownCharacterError> {
        let selected = match initial {
            Some(name) if catalog.contains(name) => name.to_string(),
            Some(name) => {
                return Err(UnknownCharacterError {
                    name: name.to_string(),
                })
            }
            None => catalog
                .first()
                .ok_or_else(|| UnknownCharacterError {
                    name: String::new(),
                })?
                .to_string(),
        };

        Ok(Self {
            catalog,
            selected,
            history: ConversationHistory::new(),
            user_name: None,
            pending_input: String::new(),
            outstanding: None,
            generation: 0,
            next_turn_id: 1,
        })
    }

    pub fn catalog(&self) -> &CharacterCatalog {
        &self.catalog
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn descriptor(&self) -> &str {
        // `selected` is only ever set to a catalog name.
        self.catalog.descriptor(&self.selected).unwrap_or_default()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    /// True while a reply for the current character is outstanding.
    pub fn is_waiting(&self) -> bool {
        self.outstanding
            .is_some_and(|request| request.generation == self.generation)
    }

    /// True while any request is outstanding, including one whose reply will
    /// be dropped because the character changed.
    pub fn has_outstanding_request(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Switches character. Returns `false` when `name` is already selected.
    pub fn select_character(&mut self, name: &str) -> Result<bool, UnknownCharacterError> {
        if !self.catalog.contains(name) {
            return Err(UnknownCharacterError {
                name: name.to_string(),
            });
        }
        if name == self.selected {
            return Ok(false);
        }

        info!(
            from = %self.selected,
            to = %name,
            discarded_messages = self.history.len(),
            "Switching character"
        );
        self.selected = name.to_string();
        self.history.reset();
        self.generation += 1;
        Ok(true)
    }

    /// Selects the next (or previous) catalog entry, wrapping at the ends.
    pub fn cycle_character(&mut self, forward: bool) -> bool {
        let Some(next) = self
            .catalog
            .neighbor(&self.selected, forward)
            .map(str::to_string)
        else {
            return false;
        };
        self.select_character(&next).unwrap_or(false)
    }

    pub fn begin_turn(&mut self, input: &str) -> Result<TurnStart, SessionError> {
        if input.is_empty() {
            return Ok(TurnStart::Ignored);
        }
        if input.trim().eq_ignore_ascii_case(STOP_COMMAND) {
            return Ok(TurnStart::Ended);
        }
        if self.outstanding.is_some() {
            return Err(SessionError::TurnInFlight);
        }

        if let Some(name) = capture_name(input) {
            debug!(name, "Remembering user name");
            self.user_name = Some(name.to_string());
        }

        let id = self.next_turn_id;
        self.next_turn_id += 1;
        self.outstanding = Some(Outstanding {
            id,
            generation: self.generation,
        });
        self.pending_input.clear();

        Ok(TurnStart::Dispatch(PendingTurn {
            id,
            generation: self.generation,
            character: self.selected.clone(),
            utterance: input.to_string(),
            descriptor: self.descriptor().to_string(),
            history: self.history.snapshot().to_vec(),
        }))
    }

    pub fn finish_turn(
        &mut self,
        turn: PendingTurn,
        result: Result<String, PipelineError>,
    ) -> Result<TurnResolution, SessionError> {
        let was_outstanding = self.outstanding.is_some_and(|request| request.id == turn.id);
        if was_outstanding {
            self.outstanding = None;
        }
        if !was_outstanding || turn.generation != self.generation {
            debug!(turn = turn.id, character = %turn.character, "Dropping stale reply");
            return Ok(TurnResolution::Stale);
        }

        let reply = result?;
        self.history.record_turn(turn.utterance, reply.clone());
        Ok(TurnResolution::Recorded(reply))
    }

    /// Runs a whole turn inline. For callers without a UI to keep alive.
    pub async fn submit<B: CompletionBackend>(
        &mut self,
        pipeline: &CompletionPipeline<B>,
        input: &str,
    ) -> Result<SubmitOutcome, SessionError> {
        let turn = match self.begin_turn(input)? {
            TurnStart::Ignored => return Ok(SubmitOutcome::Ignored),
            TurnStart::Ended => return Ok(SubmitOutcome::Ended),
            TurnStart::Dispatch(turn) => turn,
        };

        let result = pipeline
            .complete(&turn.utterance, &turn.descriptor, &turn.history)
            .await;
        match self.finish_turn(turn, result)? {
            TurnResolution::Recorded(reply) => Ok(SubmitOutcome::Replied(reply)),
            TurnResolution::Stale => Ok(SubmitOutcome::Stale),
        }
    }
}
