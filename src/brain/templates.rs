//! Note templates with `{{placeholder}}` substitution.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::types::Template;
use super::{double_option, new_id, now, required};
use crate::error::{Error, Result};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.-]*)\s*\}\}").expect("placeholder regex is valid")
});

/// Placeholders filled in automatically when the caller does not supply them.
pub const BUILTIN_PLACEHOLDERS: [&str; 4] = ["date", "time", "datetime", "title"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    pub body: Option<String>,
}

/// Result of filling a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub text: String,
    /// Placeholders with no value; they are left verbatim in `text`.
    pub missing: Vec<String>,
}

/// Distinct placeholder names in `body`, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PLACEHOLDER.captures_iter(body) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Replace every occurrence of every placeholder. Caller-supplied `vars` win
/// over the built-ins (`date`, `time`, `datetime`; `title` only if given).
pub fn render(body: &str, vars: &HashMap<String, String>) -> Rendered {
    let local = chrono::Local::now();
    let builtin = |name: &str| -> Option<String> {
        match name {
            "date" => Some(local.format("%Y-%m-%d").to_string()),
            "time" => Some(local.format("%H:%M").to_string()),
            "datetime" => Some(local.format("%Y-%m-%d %H:%M").to_string()),
            _ => None,
        }
    };

    let mut missing: Vec<String> = Vec::new();
    let text = PLACEHOLDER.replace_all(body, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.get(name).cloned().or_else(|| builtin(name)) {
            Some(value) => value,
            None => {
                if !missing.iter().any(|m| m == name) {
                    missing.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    Rendered {
        text: text.into_owned(),
        missing,
    }
}

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<Template> {
    let body: String = row.get(4)?;
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        placeholders: placeholders(&body),
        body,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

const TEMPLATE_COLUMNS: &str = "id, name, description, category, body, created_at, updated_at";

pub fn create_template(conn: &Connection, user_id: &str, input: &NewTemplate) -> Result<Template> {
    let name = required(&input.name, "template name")?;
    required(&input.body, "template body")?;

    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO templates (id, user_id, name, description, category, body, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![id, user_id, name, input.description, input.category, input.body, ts],
    )?;
    tracing::debug!(template_id = %id, "template created");
    get_template(conn, user_id, &id)
}

pub fn get_template(conn: &Connection, user_id: &str, id: &str) -> Result<Template> {
    conn.query_row(
        &format!("SELECT {TEMPLATE_COLUMNS} FROM templates WHERE id = ?1 AND user_id = ?2"),
        params![id, user_id],
        row_to_template,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("template", id))
}

/// Templates ordered by category, then name.
pub fn list_templates(conn: &Connection, user_id: &str, category: Option<&str>) -> Result<Vec<Template>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM templates \
         WHERE user_id = ?1 AND (?2 IS NULL OR category = ?2) \
         ORDER BY category IS NULL, category COLLATE NOCASE, name COLLATE NOCASE"
    ))?;
    let templates = stmt
        .query_map(params![user_id, category], row_to_template)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(templates)
}

pub fn update_template(conn: &Connection, user_id: &str, id: &str, patch: &TemplatePatch) -> Result<Template> {
    let mut template = get_template(conn, user_id, id)?;

    if let Some(name) = &patch.name {
        template.name = required(name, "template name")?;
    }
    if let Some(body) = &patch.body {
        required(body, "template body")?;
        template.body = body.clone();
    }
    if let Some(description) = &patch.description {
        template.description = description.clone();
    }
    if let Some(category) = &patch.category {
        template.category = category.clone();
    }

    conn.execute(
        "UPDATE templates SET name = ?1, description = ?2, category = ?3, body = ?4, updated_at = ?5 \
         WHERE id = ?6 AND user_id = ?7",
        params![
            template.name,
            template.description,
            template.category,
            template.body,
            now(),
            id,
            user_id,
        ],
    )?;
    get_template(conn, user_id, id)
}

pub fn delete_template(conn: &Connection, user_id: &str, id: &str) -> Result<()> {
    let rows = conn.execute(
        "DELETE FROM templates WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(Error::not_found("template", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::test_support::{test_db, test_user};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn placeholders_are_distinct_and_ordered() {
        let body = "{{name}} met {{ other }} about {{topic}}. {{name}} again.";
        assert_eq!(placeholders(body), vec!["name", "other", "topic"]);
    }

    #[test]
    fn render_replaces_every_occurrence() {
        let out = render("{{who}} and {{who}} and {{ who }}", &vars(&[("who", "Ada")]));
        assert_eq!(out.text, "Ada and Ada and Ada");
        assert!(out.missing.is_empty());
    }

    #[test]
    fn unknown_placeholders_are_left_and_reported() {
        let out = render("Hi {{name}}, see {{link}} / {{link}}", &vars(&[("name", "Bo")]));
        assert_eq!(out.text, "Hi Bo, see {{link}} / {{link}}");
        assert_eq!(out.missing, vec!["link"]);
    }

    #[test]
    fn builtins_fill_dates_but_caller_wins() {
        let out = render("{{date}}|{{time}}", &HashMap::new());
        assert!(out.missing.is_empty());
        let (date, time) = out.text.split_once('|').unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());
        assert_eq!(time.len(), 5);

        let fixed = render("{{date}}", &vars(&[("date", "someday")]));
        assert_eq!(fixed.text, "someday");

        // title is not invented
        assert_eq!(render("{{title}}", &HashMap::new()).missing, vec!["title"]);
    }

    #[test]
    fn single_braces_are_not_placeholders() {
        let out = render("{name} {{ }} {{1abc}}", &HashMap::new());
        assert_eq!(out.text, "{name} {{ }} {{1abc}}");
        assert!(out.missing.is_empty());
    }

    #[test]
    fn crud_round_trip() {
        let conn = test_db();
        let user = test_user(&conn, "a@example.com");

        assert!(matches!(
            create_template(
                &conn,
                &user,
                &NewTemplate {
                    name: "Empty".into(),
                    body: "  ".into(),
                    ..Default::default()
                }
            ),
            Err(Error::Validation(_))
        ));

        let t = create_template(
            &conn,
            &user,
            &NewTemplate {
                name: "Meeting".into(),
                category: Some("work".into()),
                body: "# {{title}}\nAttendees: {{attendees}}".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(t.placeholders, vec!["title", "attendees"]);

        let updated = update_template(
            &conn,
            &user,
            &t.id,
            &TemplatePatch {
                body: Some("{{agenda}}".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.placeholders, vec!["agenda"]);

        assert_eq!(list_templates(&conn, &user, Some("work")).unwrap().len(), 1);
        assert!(list_templates(&conn, &user, Some("home")).unwrap().is_empty());

        delete_template(&conn, &user, &t.id).unwrap();
        assert!(matches!(get_template(&conn, &user, &t.id), Err(Error::NotFound { .. })));
    }
}
