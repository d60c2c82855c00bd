//! [`TaskModel`] backed by the Gemini `generateContent` REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ai::{AiError, TaskModel};
use crate::config::AiConfig;

/// HTTP client for one Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Creates a client for `model` under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(e.to_string()))?;
        let model = model.strip_prefix("models/").unwrap_or(model);

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            api_key: api_key.to_string(),
            timeout_secs,
        })
    }

    /// Creates a client from `[ai]` settings. Returns `Ok(None)` when no
    /// API key is configured.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, AiError> {
        config
            .api_key
            .as_deref()
            .map(|key| Self::new(&config.base_url, &config.model, key, config.timeout_secs))
            .transpose()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text of the first part of each candidate that has one.
    fn into_texts(self) -> Vec<String> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content?.parts.into_iter().next()?.text)
            .collect()
    }
}

#[async_trait]
impl TaskModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<String>, AiError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AiError::Transport(format!("request timed out after {}s", self.timeout_secs))
                } else {
                    AiError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Response(e.to_string()))?;
        let texts = parsed.into_texts();
        tracing::debug!(candidates = texts.len(), "model replied");
        Ok(texts)
    }
}
