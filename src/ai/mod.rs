//! Generative-AI provider: embeddings and text generation.
//!
//! The [`GenerativeAi`] trait is the seam between server actions and the
//! remote API. [`create_client`] picks an implementation from config;
//! [`prompts`] builds the prompts and parses the model's replies.

pub mod gemini;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AiConfig;
use crate::error::{Error, Result};

/// Number of dimensions in stored note embeddings.
pub const EMBEDDING_DIM: usize = 768;

/// A remote model that can embed text and answer prompts.
///
/// Embeddings are L2-normalised and exactly [`EMBEDDING_DIM`] long.
#[async_trait]
pub trait GenerativeAi: Send + Sync {
    /// Provider identifier, e.g. `"gemini"`.
    fn name(&self) -> &'static str;

    /// Text generation model, recorded on stored analyses.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Provider used when AI is turned off or has no credentials. Every call
/// fails, so callers take their degraded path.
#[derive(Debug, Default)]
pub struct DisabledAi;

#[async_trait]
impl GenerativeAi for DisabledAi {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn model(&self) -> &str {
        "none"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::ai("AI provider is disabled"))
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(Error::ai("AI provider is disabled"))
    }
}

/// Build the configured provider.
pub fn create_client(config: &AiConfig) -> anyhow::Result<Arc<dyn GenerativeAi>> {
    match config.provider.as_str() {
        "gemini" if config.api_key.trim().is_empty() => {
            tracing::warn!("no Gemini API key configured (set GEMINI_API_KEY); AI features are disabled");
            Ok(Arc::new(DisabledAi))
        }
        "gemini" => Ok(Arc::new(gemini::GeminiClient::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledAi)),
        other => anyhow::bail!("unknown AI provider: {other}. Supported: gemini, disabled"),
    }
}

/// Scale `v` to unit length. A zero vector cannot be normalised.
pub fn l2_normalize(mut v: Vec<f32>) -> Result<Vec<f32>> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(Error::ai("provider returned a zero or non-finite embedding"));
    }
    for x in &mut v {
        *x /= norm;
    }
    Ok(v)
}
