#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use synapse::ai::{GenerativeAi, EMBEDDING_DIM};
use synapse::brain::profiles::{self, NewProfile};
use synapse::config::SynapseConfig;
use synapse::db;
use synapse::error::{Error, Result};
use synapse::service::Brain;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_in_memory().unwrap()
}

/// Create a profile and return its id.
pub fn test_user(conn: &Connection, email: &str) -> String {
    profiles::create_profile(
        conn,
        &NewProfile {
            email: email.to_string(),
            display_name: "Test User".to_string(),
        },
    )
    .unwrap()
    .id
}

/// Generate a deterministic 768-dim unit embedding with a spike at position `seed`.
/// Distinct seeds are orthogonal.
pub fn spike(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    v[seed % EMBEDDING_DIM] = 1.0;
    v
}

/// Stand-in for the remote model.
///
/// `embed` returns the spike of the first topic word found in the text
/// (or the last dimension when nothing matches). `generate` answers by
/// prompt kind from the configured replies; a missing reply is an error.
#[derive(Default)]
pub struct FakeAi {
    pub topics: Vec<(&'static str, usize)>,
    pub fail_embed: bool,
    pub summary: Option<String>,
    pub concepts: Option<String>,
    pub connections: Option<String>,
    /// When set, connection prompts are answered by linking every listed
    /// candidate (plus one unknown id) with this relationship label.
    pub link_candidates: Option<&'static str>,
    pub embed_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
}

impl FakeAi {
    pub fn with_topics(topics: &[(&'static str, usize)]) -> Self {
        Self {
            topics: topics.to_vec(),
            ..Default::default()
        }
    }

    pub fn embed_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeAi for FakeAi {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embed {
            return Err(Error::ai("embedding service unavailable"));
        }
        let text = text.to_lowercase();
        let seed = self
            .topics
            .iter()
            .find(|(word, _)| text.contains(word))
            .map(|(_, seed)| *seed)
            .unwrap_or(EMBEDDING_DIM - 1);
        Ok(spike(seed))
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let (Some(label), true) = (self.link_candidates, prompt.contains("Candidate notes:")) {
            let mut links: Vec<String> = prompt
                .lines()
                .filter_map(|line| line.trim().strip_prefix("- id: "))
                .map(|id| format!(r#"{{"target_id": "{id}", "relationship": "{label}", "strength": 0.8, "reason": "same topic"}}"#))
                .collect();
            links.push(r#"{"target_id": "unknown", "relationship": "related", "strength": 0.9}"#.to_string());
            return Ok(format!("[{}]", links.join(",")));
        }
        let reply = if prompt.starts_with("Summarize") {
            &self.summary
        } else if prompt.contains("key concepts") {
            &self.concepts
        } else {
            &self.connections
        };
        reply.clone().ok_or_else(|| Error::ai("generation failed"))
    }
}

pub fn test_config() -> SynapseConfig {
    let mut config = SynapseConfig::default();
    config.ai.provider = "disabled".into();
    config.ai.api_key = String::new();
    config
}

/// A brain over an in-memory database with one profile. Returns the brain,
/// the profile id and a valid session token.
pub fn test_brain(ai: Arc<FakeAi>) -> (Brain, String, String) {
    let conn = test_db();
    let user_id = test_user(&conn, "ada@example.com");
    let token = profiles::issue_session(&conn, &user_id, 30).unwrap().token;
    let brain = Brain::from_connection(conn, ai, test_config());
    (brain, user_id, token)
}
