//! Per-user counts for the dashboard and `synapse stats`.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct TaskCounts {
    pub todo: u64,
    pub in_progress: u64,
    pub done: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct BrainStats {
    pub folders: u64,
    pub projects: u64,
    pub notes: u64,
    pub archived_notes: u64,
    pub pinned_notes: u64,
    pub embedded_notes: u64,
    pub analyzed_notes: u64,
    pub tasks: TaskCounts,
    pub templates: u64,
    pub events: u64,
    pub connections: u64,
}

fn count(conn: &Connection, sql: &str, user_id: &str) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params![user_id], |row| row.get(0))?;
    Ok(n as u64)
}

pub fn brain_stats(conn: &Connection, user_id: &str) -> Result<BrainStats> {
    let mut stats = BrainStats {
        folders: count(conn, "SELECT COUNT(*) FROM folders WHERE user_id = ?1", user_id)?,
        projects: count(conn, "SELECT COUNT(*) FROM folders WHERE user_id = ?1 AND is_project = 1", user_id)?,
        notes: count(conn, "SELECT COUNT(*) FROM notes WHERE user_id = ?1 AND is_archived = 0", user_id)?,
        archived_notes: count(conn, "SELECT COUNT(*) FROM notes WHERE user_id = ?1 AND is_archived = 1", user_id)?,
        pinned_notes: count(conn, "SELECT COUNT(*) FROM notes WHERE user_id = ?1 AND is_pinned = 1", user_id)?,
        embedded_notes: count(
            conn,
            "SELECT COUNT(*) FROM notes_vec v JOIN notes n ON n.id = v.note_id WHERE n.user_id = ?1",
            user_id,
        )?,
        analyzed_notes: count(conn, "SELECT COUNT(*) FROM ai_analyses WHERE user_id = ?1", user_id)?,
        tasks: TaskCounts::default(),
        templates: count(conn, "SELECT COUNT(*) FROM templates WHERE user_id = ?1", user_id)?,
        events: count(conn, "SELECT COUNT(*) FROM calendar_events WHERE user_id = ?1", user_id)?,
        connections: count(conn, "SELECT COUNT(*) FROM connections WHERE user_id = ?1", user_id)?,
    };

    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks WHERE user_id = ?1 GROUP BY status")?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (status, n) = row?;
        match status.as_str() {
            "todo" => stats.tasks.todo = n as u64,
            "in_progress" => stats.tasks.in_progress = n as u64,
            "done" => stats.tasks.done = n as u64,
            _ => {}
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::folders::{create_folder, NewFolder};
    use crate::brain::notes::{create_note, store_embedding, NewNote};
    use crate::brain::tasks::{create_task, NewTask};
    use crate::brain::test_support::{spike, test_db, test_user};
    use crate::brain::types::TaskStatus;

    #[test]
    fn counts_are_per_user() {
        let mut conn = test_db();
        let alice = test_user(&conn, "a@example.com");
        let bob = test_user(&conn, "b@example.com");

        create_folder(
            &conn,
            &alice,
            &NewFolder {
                name: "Launch".into(),
                is_project: true,
                ..Default::default()
            },
        )
        .unwrap();
        let note = create_note(
            &conn,
            &alice,
            &NewNote {
                title: "One".into(),
                is_pinned: true,
                ..Default::default()
            },
        )
        .unwrap();
        store_embedding(&mut conn, &alice, &note.id, &spike(0)).unwrap();
        for status in [TaskStatus::Todo, TaskStatus::Todo, TaskStatus::Done] {
            create_task(
                &conn,
                &alice,
                &NewTask {
                    title: "t".into(),
                    status,
                    ..Default::default()
                },
            )
            .unwrap();
        }

        let stats = brain_stats(&conn, &alice).unwrap();
        assert_eq!(stats.folders, 1);
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.notes, 1);
        assert_eq!(stats.pinned_notes, 1);
        assert_eq!(stats.embedded_notes, 1);
        assert_eq!(
            stats.tasks,
            TaskCounts {
                todo: 2,
                in_progress: 0,
                done: 1
            }
        );

        let empty = brain_stats(&conn, &bob).unwrap();
        assert_eq!(empty.notes, 0);
        assert_eq!(empty.tasks, TaskCounts::default());
    }
}
