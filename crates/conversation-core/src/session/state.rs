use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    AwaitingInput,
    Transcribed,
    ContextBuilt,
    Generating,
    Replied,
    Failed,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::AwaitingInput => write!(f, "AwaitingInput"),
            TurnPhase::Transcribed => write!(f, "Transcribed"),
            TurnPhase::ContextBuilt => write!(f, "ContextBuilt"),
            TurnPhase::Generating => write!(f, "Generating"),
            TurnPhase::Replied => write!(f, "Replied"),
            TurnPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Tracks one conversational turn through the pipeline. A turn moves
/// strictly forward; the only branch is Generating -> Failed when the
/// generation capability errors or times out.
pub struct TurnStateMachine {
    current_phase: TurnPhase,
}

impl TurnStateMachine {
    pub fn new() -> Self {
        Self {
            current_phase: TurnPhase::AwaitingInput,
        }
    }

    pub fn current_phase(&self) -> TurnPhase {
        self.current_phase
    }

    pub fn can_transition_to(&self, next: TurnPhase) -> bool {
        matches!(
            (self.current_phase, next),
            (TurnPhase::AwaitingInput, TurnPhase::Transcribed)
                | (TurnPhase::Transcribed, TurnPhase::ContextBuilt)
                | (TurnPhase::ContextBuilt, TurnPhase::Generating)
                | (TurnPhase::Generating, TurnPhase::Replied)
                | (TurnPhase::Generating, TurnPhase::Failed)
        )
    }

    pub fn transition_to(&mut self, next: TurnPhase) -> Result<(), String> {
        if self.can_transition_to(next) {
            self.current_phase = next;
            Ok(())
        } else {
            Err(format!(
                "Invalid turn transition from {} to {}",
                self.current_phase, next
            ))
        }
    }
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
