use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client as Http;
use serde_json::{json, Value};

use conversation_core::{ChatMessage, GeneratePort, Role};

#[derive(Clone, Debug)]
pub enum Provider {
    Gemini, // add more later
}

#[derive(Clone, Debug)]
pub struct Client {
    http: Http,
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String, // provider-specific defaulted
}

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl Client {
    pub fn new(provider: Provider, api_key: String, model: String) -> Result<Self> {
        let base_url = match provider {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta".to_string(),
        };
        Ok(Self {
            http: Http::builder().pool_max_idle_per_host(8).build()?,
            provider,
            api_key,
            model,
            base_url,
        })
    }

    /// Convenience: pick up GEMINI_API_KEY from env for Gemini.
    pub fn from_env_gemini(model: &str) -> Result<Self> {
        let key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?;
        Self::new(Provider::Gemini, key, model.to_string())
    }

    pub async fn chat(&self, messages: &[ChatMessage], opts: ChatOptions) -> Result<String> {
        match self.provider {
            Provider::Gemini => self.chat_gemini(messages, opts).await,
        }
    }

    async fn chat_gemini(&self, messages: &[ChatMessage], opts: ChatOptions) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_generate_body(messages, &opts);

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("request failed")?;

        if !resp.status().is_success() {
            return Err(anyhow!(
                "gemini {}: {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            ));
        }

        let v: Value = resp.json().await.context("invalid json")?;
        let content = v
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|x| x.as_str())
            .ok_or_else(|| anyhow!("missing candidates[0].content.parts[0].text"))?;
        Ok(content.to_string())
    }

    /// Simple helper for one-shot prompts.
    pub async fn simple(&self, prompt: &str) -> Result<String> {
        let msgs = vec![ChatMessage::new(Role::User, prompt)];
        self.chat(&msgs, ChatOptions::default()).await
    }
}

// System messages collapse into systemInstruction; assistant turns map to
// the "model" role Gemini expects.
fn build_generate_body(messages: &[ChatMessage], opts: &ChatOptions) -> Value {
    let mut system_parts: Vec<Value> = Vec::new();
    let mut contents: Vec<Value> = Vec::new();

    for m in messages {
        match m.role {
            Role::System => system_parts.push(json!({ "text": m.content })),
            Role::User => contents.push(json!({ "role": "user", "parts": [{ "text": m.content }] })),
            Role::Assistant => {
                contents.push(json!({ "role": "model", "parts": [{ "text": m.content }] }))
            }
        }
    }

    let mut body = json!({ "contents": contents });
    if !system_parts.is_empty() {
        body["systemInstruction"] = json!({ "parts": system_parts });
    }

    let mut config = serde_json::Map::new();
    if let Some(t) = opts.temperature {
        config.insert("temperature".into(), json!(t));
    }
    if let Some(max) = opts.max_output_tokens {
        config.insert("maxOutputTokens".into(), json!(max));
    }
    if !config.is_empty() {
        body["generationConfig"] = Value::Object(config);
    }

    body
}

/// Generation capability backed by a Gemini chat client.
pub struct GeminiGenerate {
    client: Client,
    options: ChatOptions,
}

impl GeminiGenerate {
    pub fn new(client: Client, options: ChatOptions) -> Self {
        Self { client, options }
    }
}

#[async_trait]
impl GeneratePort for GeminiGenerate {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.client.chat(messages, self.options.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_role_mapping() {
        let messages = vec![
            ChatMessage::new(Role::System, "be brief"),
            ChatMessage::new(Role::User, "hi"),
            ChatMessage::new(Role::Assistant, "hello"),
        ];
        let body = build_generate_body(&messages, &ChatOptions::default());

        assert_eq!(
            body.pointer("/systemInstruction/parts/0/text")
                .and_then(|v| v.as_str()),
            Some("be brief")
        );
        assert_eq!(
            body.pointer("/contents/0/role").and_then(|v| v.as_str()),
            Some("user")
        );
        assert_eq!(
            body.pointer("/contents/1/role").and_then(|v| v.as_str()),
            Some("model")
        );
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_body_generation_config() {
        let messages = vec![ChatMessage::new(Role::User, "hi")];
        let opts = ChatOptions {
            temperature: Some(0.7),
            max_output_tokens: Some(1024),
        };
        let body = build_generate_body(&messages, &opts);

        assert_eq!(
            body.pointer("/generationConfig/maxOutputTokens")
                .and_then(|v| v.as_u64()),
            Some(1024)
        );
        assert!(body.get("systemInstruction").is_none());
    }
}
