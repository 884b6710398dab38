pub mod context;
pub mod error;
pub mod ports;
pub mod session;

pub use context::{build_context, ChatMessage};
pub use error::{TurnError, TurnResult};
pub use ports::{GeneratePort, RecognizePort, SynthesizePort};
pub use session::{Role, Session, SessionConfig, SessionStore, Turn, TurnPhase, TurnStateMachine};

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

/// Persona used when the embedding layer does not supply its own.
pub const DEFAULT_SYSTEM_PREAMBLE: &str = "You are a helpful, friendly voice assistant in a \
natural spoken conversation. Keep replies concise and conversational, remember earlier turns \
and reference them when relevant, ask a clarifying question when intent is unclear, and say \
so honestly when you do not know something.";

/// Everything one full turn produced: what was heard, what was said
/// back, and the synthesized audio for playback.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub transcript: String,
    pub reply: String,
    pub audio: Vec<u8>,
}

/// Headless turn pipeline: consumes recognized speech through injected
/// capabilities and records the conversation in a shared session store.
/// Capability calls are the only suspension points; no store lock is
/// held across them.
pub struct PipelineOrchestrator<R: RecognizePort, G: GeneratePort, S: SynthesizePort> {
    store: Arc<SessionStore>,
    recognizer: R,
    generator: G,
    synthesizer: S,
    preamble: String,
    turn_timeout: Option<Duration>,
}

impl<R: RecognizePort, G: GeneratePort, S: SynthesizePort> PipelineOrchestrator<R, G, S> {
    pub fn new(store: Arc<SessionStore>, recognizer: R, generator: G, synthesizer: S) -> Self {
        Self {
            store,
            recognizer,
            generator,
            synthesizer,
            preamble: DEFAULT_SYSTEM_PREAMBLE.to_string(),
            turn_timeout: None,
        }
    }

    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Bounds every capability call; a stalled vendor becomes a
    /// turn-level failure instead of hanging the session's turn loop.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> Arc<SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn create_session(&self, id: Option<String>) -> String {
        self.store.create(id)
    }

    /// Full audio-in/audio-out turn: recognize, run the text turn, then
    /// synthesize the reply for playback.
    pub async fn handle_utterance(
        &self,
        session_id: &str,
        audio: &[u8],
        language: &str,
    ) -> TurnResult<TurnOutcome> {
        let transcript = match self
            .with_timeout(self.recognizer.recognize(audio, language))
            .await
        {
            Ok(Ok(transcript)) => transcript,
            Ok(Err(e)) => return Err(TurnError::Recognition(e)),
            Err(timeout) => return Err(timeout),
        };

        let reply = self.handle_user_utterance(session_id, &transcript).await?;
        let audio = self.speak(&reply).await?;

        Ok(TurnOutcome {
            transcript,
            reply,
            audio,
        })
    }

    /// One conversational turn from already-recognized text. An empty
    /// transcript is a valid (if unhelpful) turn and is still recorded,
    /// preserving turn ordering. A generation failure leaves the user
    /// turn in place with no phantom assistant turn.
    pub async fn handle_user_utterance(&self, session_id: &str, text: &str) -> TurnResult<String> {
        let mut turn = TurnStateMachine::new();
        turn.transition_to(TurnPhase::Transcribed)
            .map_err(TurnError::State)?;
        self.store.add_user_message(session_id, text, None);

        let context = build_context(&self.store, session_id, &self.preamble);
        turn.transition_to(TurnPhase::ContextBuilt)
            .map_err(TurnError::State)?;

        turn.transition_to(TurnPhase::Generating)
            .map_err(TurnError::State)?;
        let reply = match self.with_timeout(self.generator.generate(&context)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let _ = turn.transition_to(TurnPhase::Failed);
                warn!("generation failed for session {}: {}", session_id, e);
                return Err(TurnError::Generation(e));
            }
            Err(timeout) => {
                let _ = turn.transition_to(TurnPhase::Failed);
                warn!("generation timed out for session {}", session_id);
                return Err(timeout);
            }
        };

        self.store.add_assistant_message(session_id, &reply, None);
        turn.transition_to(TurnPhase::Replied)
            .map_err(TurnError::State)?;
        Ok(reply)
    }

    /// Synthesis entry for the playback layer.
    pub async fn speak(&self, text: &str) -> TurnResult<Vec<u8>> {
        match self.with_timeout(self.synthesizer.synthesize(text)).await {
            Ok(Ok(audio)) => Ok(audio),
            Ok(Err(e)) => Err(TurnError::Synthesis(e)),
            Err(timeout) => Err(timeout),
        }
    }

    /// Last `max_turns` turns as text, for introspection and tool use.
    pub fn session_summary(&self, session_id: &str, max_turns: usize) -> Option<String> {
        let history = self.store.history(session_id, Some(max_turns))?;
        if history.is_empty() {
            return Some("No conversation history yet.".to_string());
        }

        let lines: Vec<String> = history
            .iter()
            .map(|turn| {
                let content: String = if turn.content.chars().count() > 100 {
                    let truncated: String = turn.content.chars().take(100).collect();
                    format!("{}...", truncated)
                } else {
                    turn.content.clone()
                };
                format!("{}: {}", turn.role, content)
            })
            .collect();
        Some(lines.join("\n"))
    }

    pub fn remember_fact(&self, session_id: &str, key: &str, value: &str) -> bool {
        self.store.remember(session_id, key, value)
    }

    pub fn recall_fact(&self, session_id: &str, key: &str) -> Option<String> {
        self.store.recall(session_id, key)
    }

    pub fn sweep_expired(&self) -> usize {
        self.store.sweep_expired()
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<anyhow::Result<T>, TurnError> {
        match self.turn_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| TurnError::Timeout(limit)),
            None => Ok(call.await),
        }
    }
}

// Simple in-crate fakes for the demo binary and tests.
pub mod mocks {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    /// Always replies with the same text.
    pub struct FixedGenerate(pub String);

    #[async_trait]
    impl GeneratePort for FixedGenerate {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    /// Echoes the most recent user message back.
    pub struct EchoGenerate;

    #[async_trait]
    impl GeneratePort for EchoGenerate {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
            let last_user = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            if last_user.is_empty() {
                Ok("I did not catch that.".to_string())
            } else {
                Ok(format!("You said: {}", last_user))
            }
        }
    }

    pub struct FailingGenerate;

    #[async_trait]
    impl GeneratePort for FailingGenerate {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(anyhow!("generation backend unavailable"))
        }
    }

    /// Never completes in practice; exercises the turn timeout path.
    pub struct StallingGenerate;

    #[async_trait]
    impl GeneratePort for StallingGenerate {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    /// Pretends any audio buffer transcribed to the given text.
    pub struct FixedRecognize(pub String);

    #[async_trait]
    impl RecognizePort for FixedRecognize {
        async fn recognize(&self, _audio: &[u8], _language: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    /// Recognition that heard nothing: the empty-transcript contract.
    pub struct SilentRecognize;

    #[async_trait]
    impl RecognizePort for SilentRecognize {
        async fn recognize(&self, _audio: &[u8], _language: &str) -> Result<String> {
            Ok(String::new())
        }
    }

    /// "Synthesizes" by returning the text bytes, handy for assertions.
    pub struct TextBytesSynthesize;

    #[async_trait]
    impl SynthesizePort for TextBytesSynthesize {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    pub struct FailingSynthesize;

    #[async_trait]
    impl SynthesizePort for FailingSynthesize {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            Err(anyhow!("synthesis backend unavailable"))
        }
    }
}
