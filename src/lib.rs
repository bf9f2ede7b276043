//! Synapse: a second-brain knowledge service.
//!
//! Profiles keep notes organized in folders, plus tasks, calendar events and
//! reusable note templates. Notes are embedded with an external generative AI
//! provider so they can be searched by meaning and linked to related notes.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 for keyword search and
//!   [sqlite-vec](https://github.com/asg017/sqlite-vec) for cosine similarity
//! - **AI**: Gemini over HTTP for embeddings (768 dimensions), summaries,
//!   concept extraction and connection suggestions. Every AI step is
//!   optional; failures degrade to plain storage and keyword search.
//! - **Transport**: JSON over HTTP (axum), bearer-token sessions per profile
//!
//! # Modules
//!
//! - [`config`]: TOML config file plus environment overrides
//! - [`db`]: connection setup, schema, migrations and health checks
//! - [`brain`]: per-entity persistence, always scoped to one profile
//! - [`ai`]: the [`ai::GenerativeAi`] seam, the Gemini client and prompt parsing
//! - [`service`]: [`service::Brain`], combining storage with AI steps
//! - [`server`]: HTTP routes, extractors and error responses
//! - [`error`]: the crate error type

pub mod ai;
pub mod brain;
pub mod config;
pub mod db;
pub mod error;
pub mod server;
pub mod service;
