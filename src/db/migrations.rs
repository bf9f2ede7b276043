//! Upgrades for an existing brain database.
//!
//! `schema_meta` is a small key/value table. It holds the schema version and
//! the embedding model behind the vectors in `notes_vec`, which `doctor` and
//! `serve` compare against the configured model.

use rusqlite::{Connection, OptionalExtension, Transaction};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

const SCHEMA_VERSION_KEY: &str = "schema_version";
const EMBEDDING_MODEL_KEY: &str = "embedding_model";

/// Model that embedded notes in version 1 databases, which did not record it.
const LEGACY_EMBEDDING_MODEL: &str = "text-embedding-004";

type Step = fn(&Transaction<'_>) -> rusqlite::Result<()>;

/// Upgrade steps keyed by the version they produce.
const STEPS: &[(u32, &str, Step)] = &[(2, "record note embedding model", record_legacy_model)];

fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO schema_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

/// Version of the brain schema on disk. Unreadable values count as 0.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(read_meta(conn, SCHEMA_VERSION_KEY)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// Model that produced the stored note vectors, if one was recorded.
pub fn get_embedding_model(conn: &Connection) -> rusqlite::Result<Option<String>> {
    read_meta(conn, EMBEDDING_MODEL_KEY)
}

pub fn set_embedding_model(conn: &Connection, model: &str) -> rusqlite::Result<()> {
    write_meta(conn, EMBEDDING_MODEL_KEY, model)
}

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`]. Each step commits
/// together with its version bump, so an interrupted upgrade resumes cleanly.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let from = get_schema_version(conn)?;
    tracing::debug!(schema_version = from, target = CURRENT_SCHEMA_VERSION, "checking brain schema");

    for &(version, label, step) in STEPS.iter().filter(|(v, _, _)| *v > from) {
        tracing::info!(to = version, step = label, "upgrading brain schema");
        let tx = conn.transaction()?;
        step(&tx)?;
        write_meta(&tx, SCHEMA_VERSION_KEY, &version.to_string())?;
        tx.commit()?;
    }

    Ok(())
}

/// Existing vectors predate model tracking; they came from the legacy model.
fn record_legacy_model(tx: &Transaction<'_>) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES (?1, ?2)",
        [EMBEDDING_MODEL_KEY, LEGACY_EMBEDDING_MODEL],
    )?;
    Ok(())
}
