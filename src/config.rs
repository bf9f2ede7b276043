use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SynapseConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub search: SearchConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    /// `"gemini"` or `"disabled"`.
    pub provider: String,
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    /// Embed notes on create/update so they show up in similarity search.
    pub auto_embed: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum cosine similarity for a note to count as a match.
    pub match_threshold: f64,
    pub match_count: usize,
    /// How many nearest notes are offered to the model when suggesting connections.
    pub connection_candidates: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_days: i64,
}

impl Default for SynapseConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            ai: AiConfig::default(),
            search: SearchConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_synapse_dir()
            .join("brain.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".into(),
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.5-flash".into(),
            embedding_model: "text-embedding-004".into(),
            timeout_secs: 30,
            auto_embed: true,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.7,
            match_count: 10,
            connection_candidates: 8,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_days: 30 }
    }
}

/// Returns `~/.synapse/`
pub fn default_synapse_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".synapse")
}

/// Returns the default config file path: `~/.synapse/config.toml`
pub fn default_config_path() -> PathBuf {
    default_synapse_dir().join("config.toml")
}

impl SynapseConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SynapseConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SYNAPSE_DB, SYNAPSE_HOST, SYNAPSE_PORT, SYNAPSE_LOG_LEVEL, GEMINI_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SYNAPSE_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("SYNAPSE_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SYNAPSE_PORT") {
            match val.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid SYNAPSE_PORT"),
            }
        }
        if let Ok(val) = std::env::var("SYNAPSE_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            self.ai.api_key = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
