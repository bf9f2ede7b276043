use serde::{Deserialize, Serialize};

use super::Brain;
use crate::brain::search::{self, NoteMatch};
use crate::error::{Error, Result};

const MAX_RESULTS: usize = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    /// Embedding the query failed; results come from full-text search.
    Keyword,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub results: Vec<NoteMatch>,
}

impl Brain {
    /// Semantic search over the user's notes. A blank query returns nothing
    /// and makes no AI call.
    pub async fn search(&self, user_id: &str, request: SearchRequest) -> Result<SearchResponse> {
        let query = request.q.trim().to_string();
        if query.is_empty() {
            return Ok(SearchResponse {
                query,
                mode: SearchMode::Semantic,
                results: Vec::new(),
            });
        }

        let threshold = request.threshold.unwrap_or(self.config.search.match_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::validation(format!(
                "threshold must be between 0 and 1, got {threshold}"
            )));
        }
        let count = request
            .limit
            .unwrap_or(self.config.search.match_count)
            .clamp(1, MAX_RESULTS);

        let uid = user_id.to_string();
        match self.ai.embed(&query).await {
            Ok(embedding) => {
                let results = self
                    .with_db(move |conn| search::match_notes(conn, &uid, &embedding, threshold, count))
                    .await?;
                tracing::info!(results = results.len(), threshold, "semantic search");
                Ok(SearchResponse {
                    query,
                    mode: SearchMode::Semantic,
                    results,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; falling back to keyword search");
                let q = query.clone();
                let results = self
                    .with_db(move |conn| search::keyword_search(conn, &uid, &q, count))
                    .await?;
                Ok(SearchResponse {
                    query,
                    mode: SearchMode::Keyword,
                    results,
                })
            }
        }
    }
}
