use anyhow::{Context, Result};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub gemini_max_tokens: u32,

    /// Voice I/O is disabled when no Sarvam key is configured; the agent
    /// still runs as a text conversation.
    pub sarvam_api_key: Option<String>,
    pub sarvam_stt_url: String,
    pub sarvam_tts_url: String,
    pub sarvam_tts_speaker: String,
    pub sarvam_tts_language: String,
    pub stt_language: String,

    pub max_history_turns: usize,
    pub session_timeout_secs: u64,
    pub audio_out_dir: String,
}

impl Settings {
    /// Loads from the environment. A missing required credential fails
    /// here, before any session exists, so startup errors are never
    /// confused with turn-level failures.
    pub fn from_env() -> Result<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?;

        Ok(Self {
            gemini_api_key,
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_temperature: parse_or("GEMINI_TEMPERATURE", 0.7),
            gemini_max_tokens: parse_or("GEMINI_MAX_TOKENS", 1024),
            sarvam_api_key: std::env::var("SARVAM_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            sarvam_stt_url: env_or("SARVAM_STT_URL", stt::DEFAULT_STT_URL),
            sarvam_tts_url: env_or("SARVAM_TTS_URL", tts::DEFAULT_TTS_URL),
            sarvam_tts_speaker: env_or("SARVAM_TTS_SPEAKER", "anushka"),
            sarvam_tts_language: env_or("SARVAM_TTS_LANGUAGE", "en-IN"),
            stt_language: env_or("STT_LANGUAGE", "en-IN"),
            max_history_turns: parse_or("MAX_HISTORY_TURNS", 10),
            session_timeout_secs: parse_or("SESSION_TIMEOUT_SECS", 300),
            audio_out_dir: env_or("AUDIO_OUT_DIR", "audio-out"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
