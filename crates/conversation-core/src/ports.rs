use anyhow::Result;
use async_trait::async_trait;

use crate::context::ChatMessage;

/// Speech-to-text capability. By contract a vendor failure surfaces as
/// an empty transcript, not an error; an Err from this port is treated
/// as a turn-level failure.
#[async_trait]
pub trait RecognizePort: Send + Sync {
    async fn recognize(&self, audio: &[u8], language: &str) -> Result<String>;
}

/// Language-generation capability over an ordered message list.
#[async_trait]
pub trait GeneratePort: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Text-to-speech capability returning an encoded audio buffer.
#[async_trait]
pub trait SynthesizePort: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
