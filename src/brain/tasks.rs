//! Tasks, optionally attached to a note.

use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::Deserialize;

use super::types::{Priority, Task, TaskStatus};
use super::{double_option, ensure_owned, new_id, now, required};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<String>,
    pub note_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub note_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub note_id: Option<String>,
    /// Only tasks due on or before this date (`YYYY-MM-DD`).
    pub due_before: Option<String>,
}

const TASK_COLUMNS: &str =
    "id, note_id, title, description, status, priority, due_date, completed_at, created_at, updated_at";

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        note_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        priority: row.get(5)?,
        due_date: row.get(6)?,
        completed_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn validate_date(date: &str) -> Result<String> {
    let date = date.trim();
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| Error::validation(format!("invalid due_date (expected YYYY-MM-DD): {date}")))
}

fn completed_stamp(status: TaskStatus) -> Option<String> {
    (status == TaskStatus::Done).then(now)
}

pub fn create_task(conn: &Connection, user_id: &str, input: &NewTask) -> Result<Task> {
    let title = required(&input.title, "title")?;
    let due_date = input.due_date.as_deref().map(validate_date).transpose()?;
    if let Some(note_id) = &input.note_id {
        ensure_owned(conn, "notes", "note", user_id, note_id)?;
    }

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO tasks (id, user_id, note_id, title, description, status, priority, due_date, completed_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            user_id,
            input.note_id,
            title,
            input.description,
            input.status.as_str(),
            input.priority.as_str(),
            due_date,
            completed_stamp(input.status),
            ts,
        ],
    )?;

    tracing::debug!(task_id = %id, status = %input.status, "task created");
    get_task(conn, user_id, &id)
}

pub fn get_task(conn: &Connection, user_id: &str, id: &str) -> Result<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        row_to_task,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("task", id))
}

/// Open tasks first (soonest due date first, undated last), then finished ones.
pub fn list_tasks(conn: &Connection, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
    let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1");
    let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(status) = filter.status {
        args.push(Box::new(status.as_str()));
        sql.push_str(&format!(" AND status = ?{}", args.len()));
    }
    if let Some(note_id) = &filter.note_id {
        args.push(Box::new(note_id.clone()));
        sql.push_str(&format!(" AND note_id = ?{}", args.len()));
    }
    if let Some(before) = &filter.due_before {
        args.push(Box::new(validate_date(before)?));
        sql.push_str(&format!(" AND due_date IS NOT NULL AND due_date <= ?{}", args.len()));
    }
    sql.push_str(
        " ORDER BY status = 'done', due_date IS NULL, due_date, \
         CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END, created_at",
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let tasks = stmt
        .query_map(params.as_slice(), row_to_task)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

pub fn update_task(conn: &Connection, user_id: &str, id: &str, patch: &TaskPatch) -> Result<Task> {
    let mut task = get_task(conn, user_id, id)?;

    if let Some(title) = &patch.title {
        task.title = required(title, "title")?;
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(due) = &patch.due_date {
        task.due_date = due.as_deref().map(validate_date).transpose()?;
    }
    if let Some(note) = &patch.note_id {
        if let Some(note_id) = note {
            ensure_owned(conn, "notes", "note", user_id, note_id)?;
        }
        task.note_id = note.clone();
    }
    if let Some(status) = patch.status {
        if status != task.status {
            task.completed_at = completed_stamp(status);
        }
        task.status = status;
    }

    conn.execute(
        "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4, due_date = ?5, \
         note_id = ?6, completed_at = ?7, updated_at = ?8 WHERE id = ?9 AND user_id = ?10",
        params![
            task.title,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date,
            task.note_id,
            task.completed_at,
            now(),
            id,
            user_id,
        ],
    )?;

    get_task(conn, user_id, id)
}

pub fn delete_task(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("task", id));
    }
    Ok(())
}
