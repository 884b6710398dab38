use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use conversation_core::SynthesizePort;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Sarvam caps synthesis input at 1500 characters.
const MAX_INPUT_CHARS: usize = 1500;

// Standard PCM WAV header length; the bytes after it are raw samples.
const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Deserialize)]
struct SarvamResponse {
    #[serde(default)]
    audios: Vec<String>,
}

pub struct SarvamTts {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    language: String,
    speaker: String,
    pitch: f32,
    pace: f32,
    loudness: f32,
    sample_rate: u32,
}

impl SarvamTts {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            language: "en-IN".to_string(),
            speaker: "anushka".to_string(),
            pitch: 0.0,
            pace: 1.0,
            loudness: 1.5,
            sample_rate: 24_000,
        }
    }

    pub fn with_voice(mut self, language: impl Into<String>, speaker: impl Into<String>) -> Self {
        self.language = language.into();
        self.speaker = speaker.into();
        self
    }

    /// Out-of-range values are clamped to what the vendor accepts.
    pub fn with_prosody(mut self, pitch: f32, pace: f32, loudness: f32) -> Self {
        self.pitch = pitch.clamp(-0.75, 0.75);
        self.pace = pace.clamp(0.5, 2.0);
        self.loudness = loudness.clamp(0.3, 3.0);
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[async_trait]
impl SynthesizePort for SarvamTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = json!({
            "text": truncate_input(text),
            "target_language_code": self.language,
            "speaker": self.speaker,
            "pitch": self.pitch,
            "pace": self.pace,
            "loudness": self.loudness,
            "speech_sample_rate": self.sample_rate,
            "output_audio_codec": "wav",
            "model": "bulbul:v2",
        });

        debug!(
            "sending {} chars to sarvam tts (speaker {})",
            text.chars().count(),
            self.speaker
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("api-subscription-key", &self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("sarvam tts request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("sarvam tts {}: {}", status, body));
        }

        let parsed: SarvamResponse = response
            .json()
            .await
            .context("sarvam tts returned unparseable body")?;
        let encoded = parsed
            .audios
            .first()
            .ok_or_else(|| anyhow!("sarvam tts response carried no audio"))?;

        let audio = BASE64
            .decode(encoded)
            .context("sarvam tts audio was not valid base64")?;
        Ok(strip_wav_header(audio))
    }
}

fn truncate_input(text: &str) -> String {
    if text.chars().count() > MAX_INPUT_CHARS {
        text.chars().take(MAX_INPUT_CHARS).collect()
    } else {
        text.to_string()
    }
}

fn strip_wav_header(audio: Vec<u8>) -> Vec<u8> {
    if audio.len() > WAV_HEADER_LEN {
        audio[WAV_HEADER_LEN..].to_vec()
    } else {
        warn!("received audio data is too small ({} bytes)", audio.len());
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prosody_clamping() {
        let tts = SarvamTts::new("key", "http://localhost").with_prosody(2.0, 10.0, 0.0);
        assert_eq!(tts.pitch, 0.75);
        assert_eq!(tts.pace, 2.0);
        assert_eq!(tts.loudness, 0.3);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let long = "é".repeat(2000);
        let truncated = truncate_input(&long);
        assert_eq!(truncated.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn test_strip_wav_header() {
        let mut audio = vec![0u8; WAV_HEADER_LEN];
        audio.extend_from_slice(&[1, 2, 3, 4]);
        assert_eq!(strip_wav_header(audio), vec![1, 2, 3, 4]);

        // A header-only (or shorter) payload yields no samples.
        assert!(strip_wav_header(vec![0u8; 10]).is_empty());
    }

    #[test]
    fn test_response_parsing() {
        let parsed: SarvamResponse =
            serde_json::from_str(r#"{"request_id": "r1", "audios": ["QUJD"]}"#).unwrap();
        assert_eq!(parsed.audios.len(), 1);
        assert_eq!(BASE64.decode(&parsed.audios[0]).unwrap(), b"ABC");
    }
}
