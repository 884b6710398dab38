use std::time::Duration;
use thiserror::Error;

pub type TurnResult<T> = Result<T, TurnError>;

/// Failure of a single conversational turn. Turn-level errors never
/// corrupt session state: the user turn stays recorded, no phantom
/// assistant turn is appended, and the conversation can continue on
/// the next utterance.
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("recognition failed: {0}")]
    Recognition(anyhow::Error),

    #[error("generation failed: {0}")]
    Generation(anyhow::Error),

    #[error("synthesis failed: {0}")]
    Synthesis(anyhow::Error),

    #[error("capability call timed out after {0:?}")]
    Timeout(Duration),

    #[error("turn state error: {0}")]
    State(String),
}
