use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, error};

use conversation_core::RecognizePort;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SarvamResponse {
    #[serde(default)]
    transcript: String,
}

pub struct SarvamStt {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    default_language: String,
}

impl SarvamStt {
    pub fn new(
        api_key: impl Into<String>,
        api_url: impl Into<String>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
            default_language: default_language.into(),
        }
    }
}

#[async_trait]
impl RecognizePort for SarvamStt {
    /// Vendor failures and timeouts degrade to an empty transcript, per
    /// the recognize contract: the pipeline records a silent turn rather
    /// than failing the whole turn on a flaky transcription call.
    async fn recognize(&self, audio: &[u8], language: &str) -> Result<String> {
        let language = if language.is_empty() {
            self.default_language.as_str()
        } else {
            language
        };
        let form = build_recognize_form(audio.to_vec(), language)?;

        debug!(
            "sending {} bytes of audio to sarvam stt (language {})",
            audio.len(),
            language
        );

        let response = match self
            .client
            .post(&self.api_url)
            .header("api-subscription-key", &self.api_key)
            .multipart(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!("sarvam stt request failed: {}", e);
                return Ok(String::new());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("sarvam stt {}: {}", status, body);
            return Ok(String::new());
        }

        match response.json::<SarvamResponse>().await {
            Ok(parsed) => Ok(parsed.transcript),
            Err(e) => {
                error!("sarvam stt returned unparseable body: {}", e);
                Ok(String::new())
            }
        }
    }
}

fn build_recognize_form(wav_data: Vec<u8>, language: &str) -> Result<multipart::Form> {
    let form = multipart::Form::new()
        .text("language_code", language.to_string())
        .part(
            "file",
            multipart::Part::bytes(wav_data)
                .file_name("audio.wav")
                .mime_str("audio/wav")?,
        );

    Ok(form)
}
