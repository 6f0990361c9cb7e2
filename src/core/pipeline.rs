//! Completion pipeline: compose one prompt, dispatch it, extract the reply.
//!
//! The pipeline is stateless with respect to the conversation. Callers pass
//! in a history snapshot and decide what to append once a reply comes back.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::core::message::{Message, Role};

/// Model used when neither the CLI nor the config names one.
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Default number of history messages replayed into each prompt.
pub const DEFAULT_HISTORY_MESSAGES: usize = 40;

/// How much of the conversation is replayed into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// Replay everything; the prompt grows with the conversation.
    Unbounded,
    /// Replay only the most recent `n` messages.
    LastMessages(usize),
}

impl Default for HistoryWindow {
    fn default() -> Self {
        HistoryWindow::LastMessages(DEFAULT_HISTORY_MESSAGES)
    }
}

impl HistoryWindow {
    /// `0` is the config spelling of "no limit".
    pub fn from_setting(messages: Option<usize>) -> Self {
        match messages {
            None => HistoryWindow::default(),
            Some(0) => HistoryWindow::Unbounded,
            Some(n) => HistoryWindow::LastMessages(n),
        }
    }

    pub fn apply<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        match *self {
            HistoryWindow::Unbounded => history,
            HistoryWindow::LastMessages(n) => &history[history.len().saturating_sub(n)..],
        }
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryWindow::Unbounded => f.write_str("unbounded"),
            HistoryWindow::LastMessages(n) => write!(f, "last {n} messages"),
        }
    }
}

/// Failure talking to the completion service.
#[derive(Debug)]
pub enum DispatchError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    Transport(reqwest::Error),

    /// The service answered with a non-success status.
    Api { status: u16, message: String },

    /// The body of a successful response could not be decoded.
    Decode(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Transport(err) => write!(f, "Request failed: {err}"),
            DispatchError::Api { status, message } => {
                write!(f, "HTTP {status}: {message}")
            }
            DispatchError::Decode(msg) => write!(f, "Unreadable response: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Transport(err) => Some(err),
            DispatchError::Api { .. } | DispatchError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Transport(err)
    }
}

/// Failure producing a reply.
#[derive(Debug)]
pub enum PipelineError {
    /// The service returned no usable choice.
    EmptyCompletion,

    /// The request could not be completed.
    Dispatch(DispatchError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::EmptyCompletion => write!(f, "The model returned no reply"),
            PipelineError::Dispatch(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::EmptyCompletion => None,
            PipelineError::Dispatch(err) => Some(err),
        }
    }
}

impl From<DispatchError> for PipelineError {
    fn from(err: DispatchError) -> Self {
        PipelineError::Dispatch(err)
    }
}

/// A remote text-generation service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn dispatch(&self, request: &ChatRequest) -> Result<ChatResponse, DispatchError>;
}

/// Compose → dispatch → extract, with a model fixed at construction.
pub struct CompletionPipeline<B> {
    backend: B,
    model: String,
    window: HistoryWindow,
}

impl<B: CompletionBackend> CompletionPipeline<B> {
    pub fn new(backend: B, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            window: HistoryWindow::default(),
        }
    }

    pub fn with_window(mut self, window: HistoryWindow) -> Self {
        self.window = window;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn window(&self) -> HistoryWindow {
        self.window
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Builds the single flattened prompt sent to the service.
    pub fn compose(&self, utterance: &str, descriptor: &str, history: &[Message]) -> String {
        let replayed = self
            .window
            .apply(history)
            .iter()
            .map(Message::prompt_line)
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "As {descriptor}, continue the following conversation:\n{replayed}\n{}: {utterance}",
            Role::User
        )
    }

    /// Produces one assistant reply for `utterance`.
    pub async fn complete(
        &self,
        utterance: &str,
        descriptor: &str,
        history: &[Message],
    ) -> Result<String, PipelineError> {
        let prompt = self.compose(utterance, descriptor, history);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
        };

        debug!(
            model = %self.model,
            history = history.len(),
            replayed = self.window.apply(history).len(),
            prompt_bytes = request.messages[0].content.len(),
            "Dispatching completion"
        );

        let response = self.backend.dispatch(&request).await?;
        extract_reply(response)
    }
}

/// Text of the first choice. Missing choices or missing content are errors,
/// never an empty string.
pub fn extract_reply(response: ChatResponse) -> Result<String, PipelineError> {
    let Some(choice) = response.choices.into_iter().next() else {
        warn!("Completion response contained no choices");
        return Err(PipelineError::EmptyCompletion);
    };

    match choice.message.content {
        Some(content) => Ok(content),
        None => {
            warn!(
                finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
                "First completion choice has no content"
            );
            Err(PipelineError::EmptyCompletion)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays canned responses and records every request.
    #[derive(Default)]
    pub struct ScriptedBackend {
        responses: Mutex<VecDeque<Result<ChatResponse, DispatchError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn replying<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let backend = Self::new();
            for reply in replies {
                backend.push_reply(reply);
            }
            backend
        }

        pub fn push_reply(&self, reply: impl Into<String>) {
            self.push(Ok(ChatResponse::with_replies([reply.into()])));
        }

        pub fn push(&self, response: Result<ChatResponse, DispatchError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn dispatch(&self, request: &ChatRequest) -> Result<ChatResponse, DispatchError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DispatchError::Decode("no scripted response".into())))
        }
    }
}
