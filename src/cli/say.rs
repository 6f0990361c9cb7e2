//! TUI-less "say" command

use std::error::Error;

use crate::core::pipeline::{CompletionBackend, CompletionPipeline, PipelineError};
use crate::core::session::{ChatSession, SessionError, SubmitOutcome};
use crate::utils::logging::TranscriptLog;

pub async fn run_say<B: CompletionBackend>(
    prompt: Vec<String>,
    mut session: ChatSession,
    pipeline: &CompletionPipeline<B>,
    log: &TranscriptLog,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: charchat say <prompt>");
        std::process::exit(1);
    }

    match say_once(&mut session, pipeline, &prompt).await {
        Ok(Some(reply)) => {
            println!("{reply}");
            log.log_session_start(session.selected())?;
            log.log_turn(
                session.user_name().unwrap_or("User"),
                &prompt,
                session.selected(),
                &reply,
            )?;
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(SessionError::Pipeline(PipelineError::EmptyCompletion)) => {
            eprintln!("⚠️  The model returned no reply.");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

/// Sends one utterance. `None` means nothing was sent (blank input or "stop").
pub async fn say_once<B: CompletionBackend>(
    session: &mut ChatSession,
    pipeline: &CompletionPipeline<B>,
    prompt: &str,
) -> Result<Option<String>, SessionError> {
    match session.submit(pipeline, prompt).await? {
        SubmitOutcome::Replied(reply) => Ok(Some(reply)),
        SubmitOutcome::Ignored | SubmitOutcome::Ended | SubmitOutcome::Stale => Ok(None),
    }
}
