use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Brain, SavedNote};
use crate::brain::notes::NewNote;
use crate::brain::templates::{self, Rendered};
use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyTemplate {
    #[serde(default)]
    pub variables: HashMap<String, String>,
    /// Title for the rendered note; defaults to the template name.
    pub title: Option<String>,
    /// Also save the rendered text as a new note.
    #[serde(default)]
    pub create_note: bool,
    pub folder_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AppliedTemplate {
    pub title: String,
    #[serde(flatten)]
    pub rendered: Rendered,
    pub note: Option<SavedNote>,
}

impl Brain {
    pub async fn apply_template(&self, user_id: &str, template_id: &str, request: ApplyTemplate) -> Result<AppliedTemplate> {
        let (uid, tid) = (user_id.to_string(), template_id.to_string());
        let template = self
            .with_db(move |conn| templates::get_template(conn, &uid, &tid))
            .await?;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&template.name)
            .to_string();

        let mut variables = request.variables;
        variables.entry("title".into()).or_insert_with(|| title.clone());
        let rendered = templates::render(&template.body, &variables);

        let note = if request.create_note {
            let input = NewNote {
                title: title.clone(),
                body: rendered.text.clone(),
                folder_id: request.folder_id,
                tags: request.tags,
                is_pinned: false,
            };
            Some(self.create_note(user_id, input).await?)
        } else {
            None
        };

        tracing::debug!(template_id = %template.id, missing = rendered.missing.len(), created = note.is_some(), "template applied");
        Ok(AppliedTemplate { title, rendered, note })
    }
}
