//! Hosted LLM access.
//!
//! Sessions talk to an [`LlmClient`]; production uses [`GeminiClient`]
//! against the `generateContent` REST endpoint, tests use scripted doubles.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{AgentError, Result};
use crate::prompts::TRANSCRIBE_PROMPT;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A hosted model that can continue a conversation and transcribe speech.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the next model turn for `turns` under `system` instructions.
    async fn generate(&self, system: &str, turns: &[Turn]) -> Result<String>;

    /// Transcribe a mono WAV clip. Returns an empty string for silence.
    async fn transcribe(&self, wav: &[u8]) -> Result<String>;
}

/// Google Gemini over REST.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey);
        }
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (proxies, local emulators).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn post(&self, body: &Value) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini API error");
            return Err(AgentError::Api {
                status: status.as_u16(),
                body: body_text,
            });
        }
        debug!(bytes = body_text.len(), "Gemini response received");

        let parsed: GenerateResponse = serde_json::from_str(&body_text)
            .map_err(|e| AgentError::Malformed(e.to_string()))?;
        parsed.text().ok_or(AgentError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, system: &str, turns: &[Turn]) -> Result<String> {
        let contents: Vec<Value> = turns
            .iter()
            .map(|turn| json!({ "role": turn.role, "parts": [{ "text": turn.text }] }))
            .collect();
        let body = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": contents,
            "generationConfig": { "responseMimeType": "application/json" },
        });
        self.post(&body).await
    }

    async fn transcribe(&self, wav: &[u8]) -> Result<String> {
        let audio = base64::engine::general_purpose::STANDARD.encode(wav);
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIBE_PROMPT },
                    { "inlineData": { "mimeType": "audio/wav", "data": audio } },
                ],
            }],
        });
        match self.post(&body).await {
            Ok(text) => Ok(text.trim().to_string()),
            Err(AgentError::EmptyResponse) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

// Response shape of generateContent; only the text parts matter here.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"message\":" }, { "text": "\"hi\"}" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("{\"message\":\"hi\"}"));
    }

    #[test]
    fn test_blocked_response_has_no_text() {
        let parsed: GenerateResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_missing_key_rejected() {
        assert!(matches!(
            GeminiClient::new("  ", DEFAULT_MODEL),
            Err(AgentError::MissingApiKey)
        ));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let client = GeminiClient::new("k", "gemini-test")
            .unwrap()
            .with_base_url("http://localhost:9000/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9000/v1beta/models/gemini-test:generateContent"
        );
    }
}
