//! Stored AI analysis, one row per note.

use rusqlite::{params, Connection, OptionalExtension};

use super::types::AiAnalysis;
use super::{ensure_owned, json_list, new_id, normalize_tags, now};
use crate::error::{Error, Result};

fn row_to_analysis(row: &rusqlite::Row<'_>) -> rusqlite::Result<AiAnalysis> {
    Ok(AiAnalysis {
        id: row.get(0)?,
        note_id: row.get(1)?,
        summary: row.get(2)?,
        key_concepts: json_list(row.get(3)?),
        tags: json_list(row.get(4)?),
        model: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert or replace the analysis for `note_id`. The row id and `created_at`
/// survive re-analysis.
pub fn upsert_analysis(
    conn: &Connection,
    user_id: &str,
    note_id: &str,
    summary: &str,
    key_concepts: &[String],
    tags: &[String],
    model: &str,
) -> Result<AiAnalysis> {
    ensure_owned(conn, "notes", "note", user_id, note_id)?;

    let ts = now();
    conn.execute(
        "INSERT INTO ai_analyses (id, note_id, user_id, summary, key_concepts, tags, model, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) \
         ON CONFLICT(note_id) DO UPDATE SET \
           summary = excluded.summary, \
           key_concepts = excluded.key_concepts, \
           tags = excluded.tags, \
           model = excluded.model, \
           updated_at = excluded.updated_at",
        params![
            new_id(),
            note_id,
            user_id,
            summary.trim(),
            serde_json::to_string(key_concepts)?,
            serde_json::to_string(&normalize_tags(tags))?,
            model,
            ts,
        ],
    )?;

    tracing::debug!(note_id = %note_id, model = %model, "analysis stored");
    get_analysis(conn, user_id, note_id)?.ok_or_else(|| Error::not_found("analysis", note_id))
}

pub fn get_analysis(conn: &Connection, user_id: &str, note_id: &str) -> Result<Option<AiAnalysis>> {
    Ok(conn
        .query_row(
            "SELECT id, note_id, summary, key_concepts, tags, model, created_at, updated_at \
             FROM ai_analyses WHERE note_id = ?1 AND user_id = ?2",
            params![note_id, user_id],
            row_to_analysis,
        )
        .optional()?)
}

/// Returns `true` if an analysis existed.
pub fn delete_analysis(conn: &Connection, user_id: &str, note_id: &str) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM ai_analyses WHERE note_id = ?1 AND user_id = ?2",
        params![note_id, user_id],
    )?;
    Ok(rows > 0)
}
