//! Subcommands other than `serve`.

pub mod doctor;
pub mod export;
pub mod profile;
pub mod reembed;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use rusqlite::Connection;

use synapse::brain::profiles;
use synapse::config::SynapseConfig;
use synapse::db;

/// Open the configured database, creating it if needed.
pub(crate) fn open(config: &SynapseConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    db::open_database(&db_path).with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// Resolve `--email` to a profile id.
pub(crate) fn profile_id(conn: &Connection, email: &str) -> Result<String> {
    let profile = profiles::find_by_email(conn, email)?
        .with_context(|| format!("no profile with email {email}; create one with `synapse profile create`"))?;
    Ok(profile.id)
}
