//! Server actions: validate, touch the database, optionally call the AI.
//!
//! [`Brain`] is the shared state behind every request. Database work runs on
//! the blocking pool while holding the connection mutex; AI calls happen
//! outside the lock.

mod notes;
mod search;
mod templates;

pub use notes::{AnalysisOutcome, ReembedReport, SavedNote};
pub use search::{SearchMode, SearchRequest, SearchResponse};
pub use templates::{AppliedTemplate, ApplyTemplate};

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::ai::GenerativeAi;
use crate::brain::profiles;
use crate::config::SynapseConfig;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct Brain {
    db: Arc<Mutex<Connection>>,
    ai: Arc<dyn GenerativeAi>,
    config: Arc<SynapseConfig>,
}

impl Brain {
    pub fn new(db: Arc<Mutex<Connection>>, ai: Arc<dyn GenerativeAi>, config: Arc<SynapseConfig>) -> Self {
        Self { db, ai, config }
    }

    pub fn from_connection(conn: Connection, ai: Arc<dyn GenerativeAi>, config: SynapseConfig) -> Self {
        Self::new(Arc::new(Mutex::new(conn)), ai, Arc::new(config))
    }

    pub fn config(&self) -> &SynapseConfig {
        &self.config
    }

    pub fn ai(&self) -> &dyn GenerativeAi {
        self.ai.as_ref()
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn with_db<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Internal(anyhow::anyhow!("db task failed: {e}")))?
    }

    /// Resolve a bearer token to the owning profile id.
    pub async fn authenticate(&self, token: String) -> Result<String> {
        self.with_db(move |conn| profiles::resolve_session(conn, &token)).await
    }

    pub async fn sign_out(&self, token: String) -> Result<bool> {
        self.with_db(move |conn| profiles::revoke_session(conn, &token)).await
    }
}
