//! Google Gemini over the Generative Language REST API.
//!
//! Uses `models/{model}:generateContent` for text and
//! `models/{model}:embedContent` for vectors. No retries: a failed call is
//! reported as [`Error::Ai`] and the caller decides how to degrade.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{l2_normalize, GenerativeAi, EMBEDDING_DIM};
use crate::config::AiConfig;
use crate::error::{Error, Result};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl Content {
    fn user_text(text: &str) -> Self {
        Self {
            role: Some("user".into()),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    output_dimensionality: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// The key travels in this header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn build_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// POST `body` and return the response text, mapping non-2xx to [`Error::Ai`].
    async fn post<T: Serialize + ?Sized>(&self, model: &str, method: &str, body: &T) -> Result<String> {
        let response = self
            .client
            .post(self.build_url(model, method))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::ai(format!("request to Gemini failed: {}", e.without_url())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::ai(format!("failed to read Gemini response: {}", e.without_url())))?;

        if !status.is_success() {
            warn!(status = %status, method, "Gemini API error");
            return Err(map_api_error(status.as_u16(), &text));
        }
        Ok(text)
    }
}

fn map_api_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        429 => Error::ai("AI service quota exceeded, try again shortly"),
        401 | 403 => Error::ai(format!("Gemini rejected the API key ({status}): {message}")),
        _ => Error::ai(format!("Gemini API error ({status}): {message}")),
    }
}

#[async_trait]
impl GenerativeAi for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, text), fields(model = %self.embedding_model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content {
                role: None,
                parts: vec![Part { text: text.to_string() }],
            },
            output_dimensionality: EMBEDDING_DIM,
        };

        let body = self.post(&self.embedding_model, "embedContent", &request).await?;
        let parsed: EmbedResponse = serde_json::from_str(&body)
            .map_err(|e| Error::ai(format!("unexpected embedContent response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(Error::ai(format!("Gemini API error: {}", err.message)));
        }

        let values = parsed
            .embedding
            .map(|e| e.values)
            .ok_or_else(|| Error::ai("embedContent response had no embedding"))?;
        if values.len() != EMBEDDING_DIM {
            return Err(Error::ai(format!(
                "embedding has {} dimensions, expected {EMBEDDING_DIM}",
                values.len()
            )));
        }

        debug!("embedding received");
        l2_normalize(values)
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::user_text(prompt)],
            generation_config: GenerationConfig {
                temperature: 0.3,
                candidate_count: 1,
            },
        };

        let body = self.post(&self.model, "generateContent", &request).await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| Error::ai(format!("unexpected generateContent response: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(Error::ai(format!("Gemini API error: {}", err.message)));
        }

        let text: String = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::ai("Gemini returned no text"));
        }
        debug!(chars = text.len(), "generation received");
        Ok(text)
    }
}
