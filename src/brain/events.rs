//! Calendar events.
//!
//! Timestamps are accepted as RFC 3339 (or a bare `YYYY-MM-DD`, read as
//! midnight UTC) and stored normalised to UTC so text comparison orders them.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use super::types::CalendarEvent;
use super::{double_option, ensure_owned, new_id, now, required};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: String,
    /// Defaults to `starts_at`.
    pub ends_at: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub note_id: Option<String>,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub all_day: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub note_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub task_id: Option<Option<String>>,
}

/// Parse and normalise a timestamp to UTC RFC 3339.
pub fn parse_timestamp(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
        })
        .map_err(|_| Error::validation(format!("{field} is not a valid timestamp: {value}")))?;
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn check_order(starts_at: &str, ends_at: &str) -> Result<()> {
    if ends_at < starts_at {
        return Err(Error::validation("ends_at must not be before starts_at"));
    }
    Ok(())
}

const EVENT_COLUMNS: &str =
    "id, title, description, location, starts_at, ends_at, all_day, note_id, task_id, created_at, updated_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        starts_at: row.get(4)?,
        ends_at: row.get(5)?,
        all_day: row.get(6)?,
        note_id: row.get(7)?,
        task_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn check_links(conn: &Connection, user_id: &str, note_id: Option<&String>, task_id: Option<&String>) -> Result<()> {
    if let Some(note_id) = note_id {
        ensure_owned(conn, "notes", "note", user_id, note_id)?;
    }
    if let Some(task_id) = task_id {
        ensure_owned(conn, "tasks", "task", user_id, task_id)?;
    }
    Ok(())
}

pub fn create_event(conn: &Connection, user_id: &str, input: &NewEvent) -> Result<CalendarEvent> {
    let title = required(&input.title, "title")?;
    let starts_at = parse_timestamp(&input.starts_at, "starts_at")?;
    let ends_at = match &input.ends_at {
        Some(end) => parse_timestamp(end, "ends_at")?,
        None => starts_at.clone(),
    };
    check_order(&starts_at, &ends_at)?;
    check_links(conn, user_id, input.note_id.as_ref(), input.task_id.as_ref())?;

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO calendar_events (id, user_id, title, description, location, starts_at, ends_at, all_day, note_id, task_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            id,
            user_id,
            title,
            input.description,
            input.location,
            starts_at,
            ends_at,
            input.all_day,
            input.note_id,
            input.task_id,
            ts,
        ],
    )?;
    tracing::debug!(event_id = %id, starts_at = %starts_at, "event created");
    get_event(conn, user_id, &id)
}

pub fn get_event(conn: &Connection, user_id: &str, id: &str) -> Result<CalendarEvent> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        row_to_event,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("event", id))
}

/// Events overlapping `[from, to]`, by start time. Either bound may be open.
pub fn list_events(conn: &Connection, user_id: &str, from: Option<&str>, to: Option<&str>) -> Result<Vec<CalendarEvent>> {
    let from = from.map(|f| parse_timestamp(f, "from")).transpose()?;
    let to = to.map(|t| parse_timestamp(t, "to")).transpose()?;
    if let (Some(from), Some(to)) = (&from, &to) {
        if to < from {
            return Err(Error::validation("to must not be before from"));
        }
    }

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM calendar_events \
         WHERE user_id = ?1 \
           AND (?2 IS NULL OR ends_at >= ?2) \
           AND (?3 IS NULL OR starts_at <= ?3) \
         ORDER BY starts_at, title"
    ))?;
    let events = stmt
        .query_map(params![user_id, from, to], row_to_event)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

pub fn update_event(conn: &Connection, user_id: &str, id: &str, patch: &EventPatch) -> Result<CalendarEvent> {
    let mut event = get_event(conn, user_id, id)?;

    if let Some(title) = &patch.title {
        event.title = required(title, "title")?;
    }
    if let Some(description) = &patch.description {
        event.description = description.clone();
    }
    if let Some(location) = &patch.location {
        event.location = location.clone();
    }
    if let Some(starts_at) = &patch.starts_at {
        event.starts_at = parse_timestamp(starts_at, "starts_at")?;
    }
    if let Some(ends_at) = &patch.ends_at {
        event.ends_at = parse_timestamp(ends_at, "ends_at")?;
    }
    check_order(&event.starts_at, &event.ends_at)?;
    if let Some(all_day) = patch.all_day {
        event.all_day = all_day;
    }
    if let Some(note) = &patch.note_id {
        event.note_id = note.clone();
    }
    if let Some(task) = &patch.task_id {
        event.task_id = task.clone();
    }
    check_links(conn, user_id, event.note_id.as_ref(), event.task_id.as_ref())?;

    conn.execute(
        "UPDATE calendar_events SET title = ?1, description = ?2, location = ?3, starts_at = ?4, ends_at = ?5, \
         all_day = ?6, note_id = ?7, task_id = ?8, updated_at = ?9 WHERE id = ?10 AND user_id = ?11",
        params![
            event.title,
            event.description,
            event.location,
            event.starts_at,
            event.ends_at,
            event.all_day,
            event.note_id,
            event.task_id,
            now(),
            id,
            user_id,
        ],
    )?;
    get_event(conn, user_id, id)
}

pub fn delete_event(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM calendar_events WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("event", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::test_support::{test_db, test_user};

    fn event(conn: &Connection, user: &str, title: &str, start: &str, end: &str) -> CalendarEvent {
        create_event(
            conn,
            user,
            &NewEvent {
                title: title.into(),
                starts_at: start.into(),
                ends_at: Some(end.into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        assert_eq!(
            parse_timestamp("2026-01-10T10:00:00+02:00", "starts_at").unwrap(),
            "2026-01-10T08:00:00Z"
        );
        assert_eq!(parse_timestamp("2026-01-10", "starts_at").unwrap(), "2026-01-10T00:00:00Z");
        assert!(parse_timestamp("next tuesday", "starts_at").is_err());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let err = create_event(
            &conn,
            &user,
            &NewEvent {
                title: "Backwards".into(),
                starts_at: "2026-01-10T10:00:00Z".into(),
                ends_at: Some("2026-01-10T09:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn missing_end_defaults_to_start() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let e = create_event(
            &conn,
            &user,
            &NewEvent {
                title: "Reminder".into(),
                starts_at: "2026-01-10T10:00:00Z".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(e.starts_at, e.ends_at);
    }

    #[test]
    fn window_uses_overlap() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        event(&conn, &user, "Before", "2026-01-01T09:00:00Z", "2026-01-01T10:00:00Z");
        event(&conn, &user, "Straddles", "2026-01-04T22:00:00Z", "2026-01-05T02:00:00Z");
        event(&conn, &user, "Inside", "2026-01-06T09:00:00Z", "2026-01-06T10:00:00Z");
        event(&conn, &user, "After", "2026-02-01T09:00:00Z", "2026-02-01T10:00:00Z");

        let titles: Vec<String> = list_events(&conn, &user, Some("2026-01-05"), Some("2026-01-31"))
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["Straddles", "Inside"]);

        assert_eq!(list_events(&conn, &user, None, None).unwrap().len(), 4);
        assert!(list_events(&conn, &user, Some("2026-02-01"), Some("2026-01-01")).is_err());
    }

    #[test]
    fn update_revalidates_order() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");
        let e = event(&conn, &user, "Standup", "2026-01-06T09:00:00Z", "2026-01-06T09:15:00Z");

        let err = update_event(
            &conn,
            &user,
            &e.id,
            &EventPatch {
                starts_at: Some("2026-01-06T10:00:00Z".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let moved = update_event(
            &conn,
            &user,
            &e.id,
            &EventPatch {
                location: Some(Some("Room 4".into())),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(moved.location.as_deref(), Some("Room 4"));

        delete_event(&conn, &user, &e.id).unwrap();
        assert!(delete_event(&conn, &user, &e.id).is_err());
    }
}
