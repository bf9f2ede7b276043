//! Note CRUD, AI field updates and embedding storage.

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::Deserialize;

use super::types::Note;
use super::{double_option, embedding_to_bytes, ensure_owned, json_list, new_id, normalize_tags, now, required};
use crate::ai::EMBEDDING_DIM;
use crate::error::{Error, Result};

/// Longest accepted note title, in characters.
pub const MAX_TITLE_CHARS: usize = 300;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub folder_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    /// `Some(None)` moves the note to the root.
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub is_pinned: Option<bool>,
    pub is_archived: Option<bool>,
}

impl NotePatch {
    /// Whether the patch changes text that the embedding is computed from.
    pub fn touches_text(&self) -> bool {
        self.title.is_some() || self.body.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub folder_id: Option<String>,
    pub tag: Option<String>,
    /// Archived notes are hidden unless this is `true`.
    #[serde(default)]
    pub archived: bool,
    pub pinned: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

const NOTE_COLUMNS: &str = "id, folder_id, title, body, summary, tags, is_pinned, is_archived, created_at, updated_at";

pub(crate) fn row_to_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        title: row.get(2)?,
        body: row.get(3)?,
        summary: row.get(4)?,
        tags: json_list(row.get(5)?),
        is_pinned: row.get(6)?,
        is_archived: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn validate_title(title: &str) -> Result<String> {
    let title = required(title, "title")?;
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(Error::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title)
}

pub fn create_note(conn: &Connection, user_id: &str, input: &NewNote) -> Result<Note> {
    let title = validate_title(&input.title)?;
    if let Some(folder_id) = &input.folder_id {
        ensure_owned(conn, "folders", "folder", user_id, folder_id)?;
    }
    let tags = serde_json::to_string(&normalize_tags(&input.tags))?;

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO notes (id, user_id, folder_id, title, body, tags, is_pinned, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![id, user_id, input.folder_id, title, input.body, tags, input.is_pinned, ts],
    )?;

    tracing::debug!(note_id = %id, "note created");
    get_note(conn, user_id, &id)
}

pub fn get_note(conn: &Connection, user_id: &str, id: &str) -> Result<Note> {
    conn.query_row(
        &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        row_to_note,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("note", id))
}

/// Pinned notes first, then most recently updated.
pub fn list_notes(conn: &Connection, user_id: &str, filter: &NoteFilter) -> Result<Vec<Note>> {
    let mut sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = ?1 AND is_archived = ?2");
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string()), Box::new(filter.archived)];

    if let Some(folder_id) = &filter.folder_id {
        args.push(Box::new(folder_id.clone()));
        sql.push_str(&format!(" AND folder_id = ?{}", args.len()));
    }
    if let Some(tag) = &filter.tag {
        let tag = normalize_tags([tag]).into_iter().next().unwrap_or_default();
        args.push(Box::new(tag));
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each(notes.tags) WHERE json_each.value = ?{})",
            args.len()
        ));
    }
    if let Some(pinned) = filter.pinned {
        args.push(Box::new(pinned));
        sql.push_str(&format!(" AND is_pinned = ?{}", args.len()));
    }

    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
    args.push(Box::new(limit as i64));
    sql.push_str(&format!(" ORDER BY is_pinned DESC, updated_at DESC LIMIT ?{}", args.len()));
    args.push(Box::new(filter.offset.unwrap_or(0) as i64));
    sql.push_str(&format!(" OFFSET ?{}", args.len()));

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let notes = stmt
        .query_map(params.as_slice(), row_to_note)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(notes)
}

pub fn update_note(conn: &Connection, user_id: &str, id: &str, patch: &NotePatch) -> Result<Note> {
    let mut note = get_note(conn, user_id, id)?;

    if let Some(title) = &patch.title {
        note.title = validate_title(title)?;
    }
    if let Some(body) = &patch.body {
        note.body = body.clone();
    }
    if let Some(folder) = &patch.folder_id {
        if let Some(folder_id) = folder {
            ensure_owned(conn, "folders", "folder", user_id, folder_id)?;
        }
        note.folder_id = folder.clone();
    }
    if let Some(tags) = &patch.tags {
        note.tags = normalize_tags(tags);
    }
    if let Some(pinned) = patch.is_pinned {
        note.is_pinned = pinned;
    }
    if let Some(archived) = patch.is_archived {
        note.is_archived = archived;
    }

    conn.execute(
        "UPDATE notes SET title = ?1, body = ?2, folder_id = ?3, tags = ?4, is_pinned = ?5, is_archived = ?6, updated_at = ?7 \
         WHERE id = ?8 AND user_id = ?9",
        params![
            note.title,
            note.body,
            note.folder_id,
            serde_json::to_string(&note.tags)?,
            note.is_pinned,
            note.is_archived,
            now(),
            id,
            user_id,
        ],
    )?;

    get_note(conn, user_id, id)
}

/// Delete a note, its vector, and (via FK cascade) its analysis and connections.
pub fn delete_note(conn: &mut Connection, user_id: &str, id: &str) -> Result<()> {
    let tx = conn.transaction()?;
    let rows = tx.execute(
        "DELETE FROM notes WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("note", id));
    }
    tx.execute("DELETE FROM notes_vec WHERE note_id = ?1", params![id])?;
    tx.commit()?;

    tracing::debug!(note_id = %id, "note deleted");
    Ok(())
}

/// Copy AI-derived summary and tags onto the note. Tags merge with the user's own.
pub fn set_ai_fields(
    conn: &Connection,
    user_id: &str,
    id: &str,
    summary: Option<&str>,
    ai_tags: &[String],
) -> Result<Note> {
    let note = get_note(conn, user_id, id)?;
    let tags = normalize_tags(note.tags.iter().chain(ai_tags.iter()));
    let summary = summary.filter(|s| !s.trim().is_empty()).or(note.summary.as_deref());

    conn.execute(
        "UPDATE notes SET summary = ?1, tags = ?2 WHERE id = ?3 AND user_id = ?4",
        params![summary, serde_json::to_string(&tags)?, id, user_id],
    )?;
    get_note(conn, user_id, id)
}

/// Store (or replace) the note's embedding vector.
pub fn store_embedding(conn: &mut Connection, user_id: &str, id: &str, embedding: &[f32]) -> Result<()> {
    if embedding.len() != EMBEDDING_DIM {
        return Err(Error::validation(format!(
            "embedding has {} dimensions, expected {EMBEDDING_DIM}",
            embedding.len()
        )));
    }
    ensure_owned(conn, "notes", "note", user_id, id)?;

    // vec0 tables have no upsert
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM notes_vec WHERE note_id = ?1", params![id])?;
    tx.execute(
        "INSERT INTO notes_vec (note_id, embedding) VALUES (?1, ?2)",
        params![id, embedding_to_bytes(embedding)],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn has_embedding(conn: &Connection, id: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT COUNT(*) > 0 FROM notes_vec WHERE note_id = ?1",
        params![id],
        |row| row.get(0),
    )?)
}

/// Read a stored embedding back as f32s.
pub fn get_embedding(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Vec<f32>>> {
    ensure_owned(conn, "notes", "note", user_id, id)?;
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT embedding FROM notes_vec WHERE note_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    Ok(bytes.map(|b| {
        b.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }))
}

/// Notes to (re-)embed, across all users when `user_id` is `None`. Only notes
/// without a vector unless `all` is set. Returns `(user_id, note)` pairs,
/// oldest first.
pub fn notes_for_embedding(conn: &Connection, user_id: Option<&str>, all: bool) -> Result<Vec<(String, Note)>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, id, folder_id, title, body, summary, tags, is_pinned, is_archived, created_at, updated_at \
         FROM notes \
         WHERE (?1 IS NULL OR user_id = ?1) \
           AND (?2 OR id NOT IN (SELECT note_id FROM notes_vec)) \
         ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map(params![user_id, all], |row| {
            let owner: String = row.get(0)?;
            let note = Note {
                id: row.get(1)?,
                folder_id: row.get(2)?,
                title: row.get(3)?,
                body: row.get(4)?,
                summary: row.get(5)?,
                tags: json_list(row.get(6)?),
                is_pinned: row.get(7)?,
                is_archived: row.get(8)?,
                created_at: row.get(9)?,
                updated_at: row.get(10)?,
            };
            Ok((owner, note))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Drop a note's vector once it no longer matches the note's text.
pub fn delete_embedding(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    ensure_owned(conn, "notes", "note", user_id, id)?;
    Ok(conn.execute("DELETE FROM notes_vec WHERE note_id = ?1", params![id])? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::folders::{create_folder, delete_folder, NewFolder};
    use crate::brain::test_support::{spike, test_db, test_user};

    fn note(conn: &Connection, user: &str, title: &str) -> Note {
        create_note(
            conn,
            user,
            &NewNote {
                title: title.into(),
                body: format!("{title} body"),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn empty_title_is_a_validation_error() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");

        for title in ["", "   ", "\n\t"] {
            let err = create_note(
                &conn,
                &user,
                &NewNote {
                    title: title.into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "title {title:?} accepted");
        }
    }

    #[test]
    fn overlong_title_is_rejected() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let err = create_note(
            &conn,
            &user,
            &NewNote {
                title: "x".repeat(MAX_TITLE_CHARS + 1),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn tags_are_normalized_on_create() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let n = create_note(
            &conn,
            &user,
            &NewNote {
                title: "Tagged".into(),
                tags: vec!["#Rust".into(), "rust".into(), "Ideas".into()],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(n.tags, vec!["ideas", "rust"]);
    }

    #[test]
    fn notes_are_private_to_their_owner() {
        let conn = test_db();
        let alice = test_user(&conn, "a@example.com");
        let bob = test_user(&conn, "b@example.com");
        let n = note(&conn, &alice, "Secret");

        assert!(matches!(get_note(&conn, &bob, &n.id), Err(Error::NotFound { .. })));
        assert!(list_notes(&conn, &bob, &NoteFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn list_filters_by_tag_and_archive() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let a = create_note(
            &conn,
            &user,
            &NewNote {
                title: "A".into(),
                tags: vec!["work".into()],
                ..Default::default()
            },
        )
        .unwrap();
        let b = note(&conn, &user, "B");
        update_note(
            &conn,
            &user,
            &b.id,
            &NotePatch {
                is_archived: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        let active = list_notes(&conn, &user, &NoteFilter::default()).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, a.id);

        let tagged = list_notes(
            &conn,
            &user,
            &NoteFilter {
                tag: Some("#Work".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(tagged.len(), 1);

        let archived = list_notes(
            &conn,
            &user,
            &NoteFilter {
                archived: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, b.id);
    }

    #[test]
    fn pinned_notes_sort_first() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let first = create_note(
            &conn,
            &user,
            &NewNote {
                title: "Pinned".into(),
                is_pinned: true,
                ..Default::default()
            },
        )
        .unwrap();
        note(&conn, &user, "Later");

        let listed = list_notes(&conn, &user, &NoteFilter::default()).unwrap();
        assert_eq!(listed[0].id, first.id);
    }

    #[test]
    fn update_rejects_blank_title() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let n = note(&conn, &user, "Keep");
        let err = update_note(
            &conn,
            &user,
            &n.id,
            &NotePatch {
                title: Some(" ".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(get_note(&conn, &user, &n.id).unwrap().title, "Keep");
    }

    #[test]
    fn deleting_folder_moves_notes_to_root() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let folder = create_folder(
            &conn,
            &user,
            &NewFolder {
                name: "Inbox".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let n = create_note(
            &conn,
            &user,
            &NewNote {
                title: "Filed".into(),
                folder_id: Some(folder.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();

        delete_folder(&conn, &user, &folder.id).unwrap();
        assert!(get_note(&conn, &user, &n.id).unwrap().folder_id.is_none());
    }

    #[test]
    fn embedding_store_replace_and_delete() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let n = note(&conn, &user, "Vec");

        store_embedding(&mut conn, &user, &n.id, &spike(1)).unwrap();
        store_embedding(&mut conn, &user, &n.id, &spike(2)).unwrap();
        let stored = get_embedding(&conn, &user, &n.id).unwrap().unwrap();
        assert_eq!(stored[2], 1.0);
        assert_eq!(stored[1], 0.0);

        assert!(notes_for_embedding(&conn, Some(&user), false).unwrap().is_empty());
        assert_eq!(notes_for_embedding(&conn, Some(&user), true).unwrap().len(), 1);

        assert!(delete_embedding(&conn, &user, &n.id).unwrap());
        assert!(!has_embedding(&conn, &n.id).unwrap());
        assert_eq!(notes_for_embedding(&conn, None, false).unwrap().len(), 1);
        store_embedding(&mut conn, &user, &n.id, &spike(3)).unwrap();

        delete_note(&mut conn, &user, &n.id).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes_vec", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn wrong_dimension_embedding_is_rejected() {
        let mut conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let n = note(&conn, &user, "Vec");
        assert!(store_embedding(&mut conn, &user, &n.id, &[1.0, 0.0]).is_err());
    }

    #[test]
    fn set_ai_fields_merges_tags() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let n = create_note(
            &conn,
            &user,
            &NewNote {
                title: "Merge".into(),
                tags: vec!["mine".into()],
                ..Default::default()
            },
        )
        .unwrap();

        let updated = set_ai_fields(
            &conn,
            &user,
            &n.id,
            Some("A short summary"),
            &["AI".to_string(), "mine".to_string()],
        )
        .unwrap();
        assert_eq!(updated.summary.as_deref(), Some("A short summary"));
        assert_eq!(updated.tags, vec!["ai", "mine"]);
    }
}
