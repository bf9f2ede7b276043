//! Persistence layer: one module per entity, all synchronous rusqlite calls.
//!
//! Every function takes the owning `user_id` and filters on it, so one
//! profile can never read or touch another profile's rows.

pub mod analysis;
pub mod connections;
pub mod events;
pub mod feedback;
pub mod folders;
pub mod notes;
pub mod profiles;
pub mod search;
pub mod stats;
pub mod tasks;
pub mod templates;
pub mod types;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Trim `value` and reject it if nothing is left.
pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Lower-case, strip leading `#`, drop blanks, dedup and sort.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().trim_start_matches('#').trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Truncate content to `max_chars` characters, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

pub(crate) fn json_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Distinguishes "field absent" (`None`) from "field set to null" (`Some(None)`)
/// in PATCH bodies.
pub(crate) fn double_option<'de, D, T>(de: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Fail with `NotFound` unless `id` is a row of `table` owned by `user_id`.
pub(crate) fn ensure_owned(
    conn: &rusqlite::Connection,
    table: &'static str,
    entity: &'static str,
    user_id: &str,
    id: &str,
) -> Result<()> {
    let exists: bool = conn.query_row(
        &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1 AND user_id = ?2"),
        rusqlite::params![id, user_id],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(Error::not_found(entity, id));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    use super::profiles::{create_profile, NewProfile};

    pub fn test_db() -> Connection {
        crate::db::open_in_memory().unwrap()
    }

    /// Create a profile and return its id.
    pub fn test_user(conn: &Connection, email: &str) -> String {
        create_profile(
            conn,
            &NewProfile {
                email: email.to_string(),
                display_name: "Test User".to_string(),
            },
        )
        .unwrap()
        .id
    }

    /// Unit vector with a spike at `seed`.
    pub fn spike(seed: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; crate::ai::EMBEDDING_DIM];
        v[seed % crate::ai::EMBEDDING_DIM] = 1.0;
        v
    }
}
