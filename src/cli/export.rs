//! CLI `export` command: dump one profile's data as JSON to stdout.

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use synapse::brain::types::{CalendarEvent, Feedback, Folder, Note, NoteConnection, Profile, Task, Template};
use synapse::brain::{connections, events, feedback, folders, notes, profiles, tasks, templates};
use synapse::config::SynapseConfig;

#[derive(Debug, Serialize)]
struct ExportData {
    exported_at: String,
    profile: Profile,
    folders: Vec<Folder>,
    notes: Vec<Note>,
    tasks: Vec<Task>,
    templates: Vec<Template>,
    events: Vec<CalendarEvent>,
    connections: Vec<NoteConnection>,
    feedback: Vec<Feedback>,
}

fn all_notes(conn: &Connection, user_id: &str) -> Result<Vec<Note>> {
    let mut out = Vec::new();
    for archived in [false, true] {
        let mut offset = 0;
        loop {
            let page = notes::list_notes(
                conn,
                user_id,
                &notes::NoteFilter {
                    archived,
                    limit: Some(200),
                    offset: Some(offset),
                    ..Default::default()
                },
            )?;
            let n = page.len();
            out.extend(page);
            if n < 200 {
                break;
            }
            offset += n;
        }
    }
    Ok(out)
}

pub fn export(config: &SynapseConfig, email: &str) -> Result<()> {
    let conn = super::open(config)?;
    let user_id = super::profile_id(&conn, email)?;

    let notes = all_notes(&conn, &user_id)?;
    let mut links = Vec::new();
    for note in &notes {
        for link in connections::list_for_note(&conn, &user_id, &note.id)? {
            // each link shows up from both ends; keep the source side
            if link.connection.source_id == note.id {
                links.push(link.connection);
            }
        }
    }

    let data = ExportData {
        exported_at: chrono::Utc::now().to_rfc3339(),
        profile: profiles::get_profile(&conn, &user_id)?,
        folders: folders::list_folders(&conn, &user_id)?,
        tasks: tasks::list_tasks(&conn, &user_id, &Default::default())?,
        templates: templates::list_templates(&conn, &user_id, None)?,
        events: events::list_events(&conn, &user_id, None, None)?,
        connections: links,
        feedback: feedback::list_feedback(&conn, &user_id, None)?,
        notes,
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    eprintln!(
        "Exported {} notes, {} folders, {} tasks, {} connections.",
        data.notes.len(),
        data.folders.len(),
        data.tasks.len(),
        data.connections.len()
    );
    Ok(())
}
