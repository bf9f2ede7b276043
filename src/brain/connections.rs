//! Directed, labelled links between two notes.
//!
//! A link is unique on (source, target, relationship); storing the same
//! triple twice returns the existing row.

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::types::{ConnectionOrigin, NoteConnection};
use super::{ensure_owned, new_id, now, required};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewConnection {
    pub target_id: String,
    pub relationship: String,
    #[serde(default = "default_strength")]
    pub strength: f64,
    pub reason: Option<String>,
}

fn default_strength() -> f64 {
    0.5
}

#[derive(Debug, Serialize)]
pub struct StoreConnectionResult {
    #[serde(flatten)]
    pub connection: NoteConnection,
    /// `true` if this exact triple already existed.
    pub deduplicated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A connection seen from one note, with the note on the other end.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedNote {
    #[serde(flatten)]
    pub connection: NoteConnection,
    pub direction: Direction,
    pub other_note_id: String,
    pub other_title: String,
}

/// Clamp to `[0, 1]`; NaN becomes 0.
pub fn clamp_strength(strength: f64) -> f64 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    }
}

fn normalize_relationship(relationship: &str) -> Result<String> {
    let rel = required(relationship, "relationship")?;
    Ok(rel
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_"))
}

const CONNECTION_COLUMNS: &str =
    "c.id, c.source_id, c.target_id, c.relationship, c.strength, c.origin, c.reason, c.created_at";

fn row_to_connection(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteConnection> {
    Ok(NoteConnection {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relationship: row.get(3)?,
        strength: row.get(4)?,
        origin: row.get(5)?,
        reason: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn get_connection(conn: &Connection, user_id: &str, id: &str) -> Result<NoteConnection> {
    conn.query_row(
        &format!("SELECT {CONNECTION_COLUMNS} FROM connections c WHERE c.id = ?1 AND c.user_id = ?2"),
        params![id, user_id],
        row_to_connection,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("connection", id))
}

pub fn create_connection(
    conn: &Connection,
    user_id: &str,
    source_id: &str,
    input: &NewConnection,
    origin: ConnectionOrigin,
) -> Result<StoreConnectionResult> {
    if source_id == input.target_id {
        return Err(Error::validation("a note cannot be connected to itself"));
    }
    let relationship = normalize_relationship(&input.relationship)?;
    ensure_owned(conn, "notes", "note", user_id, source_id)?;
    ensure_owned(conn, "notes", "note", user_id, &input.target_id)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM connections WHERE source_id = ?1 AND target_id = ?2 AND relationship = ?3",
            params![source_id, input.target_id, relationship],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(StoreConnectionResult {
            connection: get_connection(conn, user_id, &id)?,
            deduplicated: true,
        });
    }

    let id = new_id();
    let reason = input
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    conn.execute(
        "INSERT INTO connections (id, user_id, source_id, target_id, relationship, strength, origin, reason, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            user_id,
            source_id,
            input.target_id,
            relationship,
            clamp_strength(input.strength),
            origin.as_str(),
            reason,
            now(),
        ],
    )?;

    tracing::debug!(connection_id = %id, source = %source_id, target = %input.target_id, origin = %origin, "connection stored");
    Ok(StoreConnectionResult {
        connection: get_connection(conn, user_id, &id)?,
        deduplicated: false,
    })
}

/// All connections touching `note_id`, strongest first.
pub fn list_for_note(conn: &Connection, user_id: &str, note_id: &str) -> Result<Vec<LinkedNote>> {
    ensure_owned(conn, "notes", "note", user_id, note_id)?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {CONNECTION_COLUMNS}, n.id, n.title \
         FROM connections c \
         JOIN notes n ON n.id = CASE WHEN c.source_id = ?1 THEN c.target_id ELSE c.source_id END \
         WHERE c.user_id = ?2 AND (c.source_id = ?1 OR c.target_id = ?1) \
         ORDER BY c.strength DESC, c.created_at"
    ))?;
    let links = stmt
        .query_map(params![note_id, user_id], |row| {
            let connection = row_to_connection(row)?;
            let direction = if connection.source_id == note_id {
                Direction::Outgoing
            } else {
                Direction::Incoming
            };
            Ok(LinkedNote {
                connection,
                direction,
                other_note_id: row.get(8)?,
                other_title: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(links)
}

pub fn delete_connection(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM connections WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("connection", id));
    }
    Ok(())
}
