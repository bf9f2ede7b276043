//! Crate-wide error type.
//!
//! Persistence and service functions return [`Result`]; the HTTP layer maps
//! each variant onto a status code (see `server::ApiError`).

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before touching the database.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid or expired session")]
    Unauthorized,

    /// The generative-AI provider failed or returned something unusable.
    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn ai(message: impl Into<String>) -> Self {
        Self::Ai(message.into())
    }

    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_request",
            Self::NotFound { .. } => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Ai(_) => "ai_error",
            Self::Database(_) | Self::Json(_) | Self::Internal(_) => "internal",
        }
    }
}
