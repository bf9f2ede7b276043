//! Folder (and project) hierarchy.
//!
//! Folders nest through `parent_id`. Deleting a folder cascades to its
//! subfolders; the notes inside fall back to the root (`folder_id = NULL`).

use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use std::collections::HashMap;

use super::types::{Folder, FolderNode};
use super::{double_option, ensure_owned, new_id, now, required};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub parent_id: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub is_project: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderPatch {
    pub name: Option<String>,
    /// `Some(None)` moves the folder to the root.
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub color: Option<Option<String>>,
    pub is_project: Option<bool>,
}

const FOLDER_SELECT: &str = "SELECT f.id, f.parent_id, f.name, f.description, f.color, f.is_project, \
     (SELECT COUNT(*) FROM notes n WHERE n.folder_id = f.id), f.created_at, f.updated_at \
     FROM folders f";

fn row_to_folder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        is_project: row.get(5)?,
        note_count: row.get::<_, i64>(6)? as u64,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn create_folder(conn: &Connection, user_id: &str, input: &NewFolder) -> Result<Folder> {
    let name = required(&input.name, "folder name")?;
    if let Some(parent_id) = &input.parent_id {
        ensure_owned(conn, "folders", "parent folder", user_id, parent_id)?;
    }

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO folders (id, user_id, parent_id, name, description, color, is_project, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            user_id,
            input.parent_id,
            name,
            input.description,
            input.color,
            input.is_project,
            ts,
        ],
    )?;

    tracing::debug!(folder_id = %id, parent = ?input.parent_id, "folder created");
    get_folder(conn, user_id, &id)
}

pub fn get_folder(conn: &Connection, user_id: &str, id: &str) -> Result<Folder> {
    conn.query_row(
        &format!("{FOLDER_SELECT} WHERE f.id = ?1 AND f.user_id = ?2"),
        params![id, user_id],
        row_to_folder,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("folder", id))
}

/// All of the user's folders, flat, ordered by name.
pub fn list_folders(conn: &Connection, user_id: &str) -> Result<Vec<Folder>> {
    let mut stmt = conn.prepare(&format!(
        "{FOLDER_SELECT} WHERE f.user_id = ?1 ORDER BY f.name COLLATE NOCASE, f.created_at"
    ))?;
    let folders = stmt
        .query_map(params![user_id], row_to_folder)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(folders)
}

pub fn count_folders(conn: &Connection, user_id: &str) -> Result<u64> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM folders WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(n as u64)
}

/// The user's folders nested under their parents. Roots come back in name order.
pub fn folder_tree(conn: &Connection, user_id: &str) -> Result<Vec<FolderNode>> {
    let folders = list_folders(conn, user_id)?;

    let mut children: HashMap<Option<String>, Vec<Folder>> = HashMap::new();
    for folder in folders {
        children.entry(folder.parent_id.clone()).or_default().push(folder);
    }

    fn build(parent: Option<String>, children: &mut HashMap<Option<String>, Vec<Folder>>) -> Vec<FolderNode> {
        let Some(level) = children.remove(&parent) else {
            return Vec::new();
        };
        level
            .into_iter()
            .map(|folder| {
                let nested = build(Some(folder.id.clone()), children);
                FolderNode {
                    folder,
                    children: nested,
                }
            })
            .collect()
    }

    Ok(build(None, &mut children))
}

pub fn update_folder(
    conn: &Connection,
    user_id: &str,
    id: &str,
    patch: &FolderPatch,
) -> Result<Folder> {
    let mut folder = get_folder(conn, user_id, id)?;

    if let Some(name) = &patch.name {
        folder.name = required(name, "folder name")?;
    }
    if let Some(parent) = &patch.parent_id {
        if let Some(parent_id) = parent {
            ensure_owned(conn, "folders", "parent folder", user_id, parent_id)?;
            if would_cycle(conn, id, parent_id)? {
                return Err(Error::validation(
                    "a folder cannot be moved inside itself or one of its subfolders",
                ));
            }
        }
        folder.parent_id = parent.clone();
    }
    if let Some(description) = &patch.description {
        folder.description = description.clone();
    }
    if let Some(color) = &patch.color {
        folder.color = color.clone();
    }
    if let Some(is_project) = patch.is_project {
        folder.is_project = is_project;
    }

    conn.execute(
        "UPDATE folders SET name = ?1, parent_id = ?2, description = ?3, color = ?4, is_project = ?5, updated_at = ?6 \
         WHERE id = ?7 AND user_id = ?8",
        params![
            folder.name,
            folder.parent_id,
            folder.description,
            folder.color,
            folder.is_project,
            now(),
            id,
            user_id,
        ],
    )?;

    get_folder(conn, user_id, id)
}

/// `true` if `new_parent` is `folder_id` itself or one of its descendants.
fn would_cycle(conn: &Connection, folder_id: &str, new_parent: &str) -> Result<bool> {
    let mut cursor = Some(new_parent.to_string());
    while let Some(current) = cursor {
        if current == folder_id {
            return Ok(true);
        }
        cursor = conn
            .query_row(
                "SELECT parent_id FROM folders WHERE id = ?1",
                params![current],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten();
    }
    Ok(false)
}

/// Delete a folder and its subfolders. Notes inside are kept and moved to the root.
pub fn delete_folder(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM folders WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("folder", id));
    }
    tracing::debug!(folder_id = %id, "folder deleted");
    Ok(())
}
