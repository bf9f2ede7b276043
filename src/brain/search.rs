//! Similarity and keyword search over a user's notes.
//!
//! Similarity is `1 - vec_distance_cosine(...)` computed by sqlite-vec over
//! the user's embedded notes; a brute-force scan keeps the user filter exact.

use rusqlite::{params, Connection};
use serde::Serialize;

use super::{embedding_to_bytes, json_list, truncate_preview};
use crate::ai::EMBEDDING_DIM;
use crate::error::{Error, Result};

const PREVIEW_CHARS: usize = 200;

/// Search result: note identity plus a short preview and a score.
#[derive(Debug, Clone, Serialize)]
pub struct NoteMatch {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub summary: Option<String>,
    pub tags: Vec<String>,
    pub folder_id: Option<String>,
    /// Cosine similarity for vector matches; a positive relevance for keyword matches.
    pub similarity: f64,
    pub updated_at: String,
}

fn row_to_match(row: &rusqlite::Row<'_>) -> rusqlite::Result<NoteMatch> {
    let body: String = row.get(2)?;
    Ok(NoteMatch {
        id: row.get(0)?,
        title: row.get(1)?,
        preview: truncate_preview(&body, PREVIEW_CHARS),
        summary: row.get(3)?,
        tags: json_list(row.get(4)?),
        folder_id: row.get(5)?,
        similarity: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Notes whose embedding has cosine similarity `>= threshold` with `embedding`,
/// best first, at most `count`. Archived notes are skipped.
pub fn match_notes(
    conn: &Connection,
    user_id: &str,
    embedding: &[f32],
    threshold: f64,
    count: usize,
) -> Result<Vec<NoteMatch>> {
    if embedding.len() != EMBEDDING_DIM {
        return Err(Error::validation(format!(
            "query embedding has {} dimensions, expected {EMBEDDING_DIM}",
            embedding.len()
        )));
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, body, summary, tags, folder_id, similarity, updated_at FROM ( \
             SELECT n.id, n.title, n.body, n.summary, n.tags, n.folder_id, n.updated_at, \
                    1.0 - vec_distance_cosine(v.embedding, ?1) AS similarity \
             FROM notes_vec v \
             JOIN notes n ON n.id = v.note_id \
             WHERE n.user_id = ?2 AND n.is_archived = 0 \
         ) \
         WHERE similarity >= ?3 \
         ORDER BY similarity DESC \
         LIMIT ?4",
    )?;
    let matches = stmt
        .query_map(
            params![embedding_to_bytes(embedding), user_id, threshold, count as i64],
            row_to_match,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(user_id = %user_id, threshold, returned = matches.len(), "vector match");
    Ok(matches)
}

/// Nearest embedded notes to `note_id` (excluding itself), without a threshold.
/// Used to pick candidates for connection suggestions.
pub fn nearest_notes(
    conn: &Connection,
    user_id: &str,
    note_id: &str,
    embedding: &[f32],
    count: usize,
) -> Result<Vec<NoteMatch>> {
    let mut matches = match_notes(conn, user_id, embedding, -1.0, count + 1)?;
    matches.retain(|m| m.id != note_id);
    matches.truncate(count);
    Ok(matches)
}

/// Full-text search over titles and bodies. Each word is quoted, so FTS5
/// operators in user input are matched literally.
pub fn keyword_search(conn: &Connection, user_id: &str, query: &str, count: usize) -> Result<Vec<NoteMatch>> {
    let fts_query = escape_fts_query(query);
    if fts_query.is_empty() || count == 0 {
        return Ok(Vec::new());
    }

    // FTS5 rank is negative; more negative is better
    let mut stmt = conn.prepare(
        "SELECT n.id, n.title, n.body, n.summary, n.tags, n.folder_id, -notes_fts.rank, n.updated_at \
         FROM notes_fts \
         JOIN notes n ON n.id = notes_fts.note_id \
         WHERE notes_fts MATCH ?1 AND notes_fts.user_id = ?2 AND n.is_archived = 0 \
         ORDER BY notes_fts.rank \
         LIMIT ?3",
    )?;
    let matches = stmt
        .query_map(params![fts_query, user_id, count as i64], row_to_match)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(matches)
}

fn escape_fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "")))
        .filter(|w| w != "\"\"")
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::notes::{create_note, store_embedding, update_note, NewNote, NotePatch};
    use crate::brain::test_support::{spike, test_db, test_user};

    fn embedded(conn: &mut Connection, user: &str, title: &str, body: &str, vector: &[f32]) -> String {
        let id = create_note(
            conn,
            user,
            &NewNote {
                title: title.into(),
                body: body.into(),
                ..Default::default()
            },
        )
        .unwrap()
        .id;
        store_embedding(conn, user, &id, vector).unwrap();
        id
    }

    /// Unit vector mostly along `a` with some weight on `b`.
    fn blend(a: usize, b: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[a] = (1.0 - weight * weight).sqrt();
        v[b] = weight;
        v
    }

    #[test]
    fn escape_quotes_each_word() {
        assert_eq!(escape_fts_query("rust OR \"async\""), "\"rust\" \"OR\" \"async\"");
        assert_eq!(escape_fts_query("  \"\" "), "");
    }

    #[test]
    fn match_honours_threshold_and_order() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let exact = embedded(&mut conn, &user, "Exact", "", &spike(0));
        let close = embedded(&mut conn, &user, "Close", "", &blend(0, 1, 0.5));
        embedded(&mut conn, &user, "Orthogonal", "", &spike(5));

        let results = match_notes(&conn, &user, &spike(0), 0.7, 10).unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![exact.as_str(), close.as_str()]);
        assert!((results[0].similarity - 1.0).abs() < 1e-5);
        assert!(results[1].similarity >= 0.7 && results[1].similarity < 1.0);

        let top1 = match_notes(&conn, &user, &spike(0), 0.0, 1).unwrap();
        assert_eq!(top1.len(), 1);
        assert_eq!(top1[0].id, exact);
    }

    #[test]
    fn match_never_crosses_users() {
        let mut conn = test_db();
        let alice = test_user(&conn, "a@example.com");
        let bob = test_user(&conn, "b@example.com");
        embedded(&mut conn, &alice, "Alice's", "", &spike(3));

        assert!(match_notes(&conn, &bob, &spike(3), 0.0, 10).unwrap().is_empty());
        assert_eq!(match_notes(&conn, &alice, &spike(3), 0.0, 10).unwrap().len(), 1);
    }

    #[test]
    fn archived_notes_are_not_matched() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let id = embedded(&mut conn, &user, "Old", "", &spike(2));
        update_note(
            &conn,
            &user,
            &id,
            &NotePatch {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(match_notes(&conn, &user, &spike(2), 0.5, 10).unwrap().is_empty());
    }

    #[test]
    fn nearest_excludes_the_note_itself() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let me = embedded(&mut conn, &user, "Me", "", &spike(0));
        let other = embedded(&mut conn, &user, "Other", "", &blend(0, 1, 0.3));

        let near = nearest_notes(&conn, &user, &me, &spike(0), 5).unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].id, other);
    }

    #[test]
    fn keyword_search_finds_words_and_follows_updates() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let id = embedded(&mut conn, &user, "Sourdough", "Feed the starter twice daily", &spike(0));
        embedded(&mut conn, &user, "Taxes", "File before April", &spike(1));

        let hits = keyword_search(&conn, &user, "starter", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id);
        assert!(hits[0].similarity > 0.0);

        update_note(
            &conn,
            &user,
            &id,
            &NotePatch {
                body: Some("Bake on Sunday".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(keyword_search(&conn, &user, "starter", 10).unwrap().is_empty());
        assert_eq!(keyword_search(&conn, &user, "sunday", 10).unwrap().len(), 1);
    }

    #[test]
    fn keyword_search_is_user_scoped() {
        let mut conn = test_db();
        let alice = test_user(&conn, "a@example.com");
        let bob = test_user(&conn, "b@example.com");
        embedded(&mut conn, &alice, "Garden", "tomatoes", &spike(0));
        assert!(keyword_search(&conn, &bob, "tomatoes", 10).unwrap().is_empty());
        assert!(keyword_search(&conn, &alice, "   ", 10).unwrap().is_empty());
    }
}
