//! User feedback on AI output.

use rusqlite::{params, Connection};
use serde::Deserialize;

use super::types::{Feedback, FeedbackTarget};
use super::{ensure_owned, new_id, now};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub note_id: Option<String>,
    pub target: FeedbackTarget,
    pub rating: Option<u8>,
    pub comment: Option<String>,
}

fn row_to_feedback(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        note_id: row.get(1)?,
        target: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn create_feedback(conn: &Connection, user_id: &str, input: &NewFeedback) -> Result<Feedback> {
    if let Some(rating) = input.rating {
        if !(1..=5).contains(&rating) {
            return Err(Error::validation(format!("rating must be between 1 and 5, got {rating}")));
        }
    }
    let comment = input
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if input.rating.is_none() && comment.is_none() {
        return Err(Error::validation("feedback needs a rating or a comment"));
    }
    if let Some(note_id) = &input.note_id {
        ensure_owned(conn, "notes", "note", user_id, note_id)?;
    }

    let id = new_id();
    conn.execute(
        "INSERT INTO feedback (id, user_id, note_id, target, rating, comment, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![id, user_id, input.note_id, input.target.as_str(), input.rating, comment, now()],
    )?;
    tracing::debug!(feedback_id = %id, target = %input.target, "feedback recorded");

    Ok(conn.query_row(
        "SELECT id, note_id, target, rating, comment, created_at FROM feedback WHERE id = ?1",
        params![id],
        row_to_feedback,
    )?)
}

/// Newest first, optionally only for one note.
pub fn list_feedback(conn: &Connection, user_id: &str, note_id: Option<&str>) -> Result<Vec<Feedback>> {
    let mut stmt = conn.prepare(
        "SELECT id, note_id, target, rating, comment, created_at FROM feedback \
         WHERE user_id = ?1 AND (?2 IS NULL OR note_id = ?2) \
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt
        .query_map(params![user_id, note_id], row_to_feedback)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
