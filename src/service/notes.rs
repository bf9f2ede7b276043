use serde::Serialize;

use super::Brain;
use crate::ai::prompts::{self, ConnectionCandidate};
use crate::brain::connections::{self, NewConnection};
use crate::brain::types::{AiAnalysis, ConnectionOrigin, Note, NoteConnection};
use crate::brain::{analysis, notes, search};
use crate::db::migrations;
use crate::error::Result;

/// A note after a create or update, with whether its vector is current.
#[derive(Debug, Serialize)]
pub struct SavedNote {
    #[serde(flatten)]
    pub note: Note,
    pub embedded: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalysisOutcome {
    pub note: Note,
    pub analysis: Option<AiAnalysis>,
    /// `true` if any AI call failed and its part of the result is empty.
    pub degraded: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct ReembedReport {
    pub embedded: usize,
    pub failed: usize,
}

/// Text sent to the embedding model for a note.
pub(crate) fn embedding_text(title: &str, body: &str) -> String {
    if body.trim().is_empty() {
        title.to_string()
    } else {
        format!("{title}\n\n{body}")
    }
}

impl Brain {
    /// Embed `note` and store the vector. Errors are returned, not swallowed.
    async fn embed_note(&self, user_id: &str, note: &Note) -> Result<()> {
        let vector = self.ai.embed(&embedding_text(&note.title, &note.body)).await?;
        let (uid, nid) = (user_id.to_string(), note.id.clone());
        self.with_db(move |conn| notes::store_embedding(conn, &uid, &nid, &vector))
            .await
    }

    /// Best-effort embedding used after writes.
    async fn try_embed(&self, user_id: &str, note: &Note) -> bool {
        if !self.config.ai.auto_embed {
            return false;
        }
        match self.embed_note(user_id, note).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(note_id = %note.id, error = %e, "embedding failed; note saved without vector");
                false
            }
        }
    }

    pub async fn create_note(&self, user_id: &str, input: notes::NewNote) -> Result<SavedNote> {
        let uid = user_id.to_string();
        let note = self
            .with_db(move |conn| notes::create_note(conn, &uid, &input))
            .await?;
        tracing::info!(note_id = %note.id, "note created");

        let embedded = self.try_embed(user_id, &note).await;
        Ok(SavedNote { note, embedded })
    }

    pub async fn update_note(&self, user_id: &str, id: &str, patch: notes::NotePatch) -> Result<SavedNote> {
        let reembed = patch.touches_text();
        let (uid, nid) = (user_id.to_string(), id.to_string());
        let note = self
            .with_db(move |conn| notes::update_note(conn, &uid, &nid, &patch))
            .await?;

        let embedded = if reembed {
            let embedded = self.try_embed(user_id, &note).await;
            if !embedded {
                // the old vector describes text the note no longer has
                let (uid, nid) = (user_id.to_string(), note.id.clone());
                self.with_db(move |conn| notes::delete_embedding(conn, &uid, &nid))
                    .await?;
            }
            embedded
        } else {
            let nid = note.id.clone();
            self.with_db(move |conn| notes::has_embedding(conn, &nid)).await?
        };
        Ok(SavedNote { note, embedded })
    }

    /// Summarise the note and extract concepts. Each AI call degrades to an
    /// empty value on failure; the analysis is stored only if something came back.
    pub async fn analyze_note(&self, user_id: &str, note_id: &str) -> Result<AnalysisOutcome> {
        let (uid, nid) = (user_id.to_string(), note_id.to_string());
        let note = self
            .with_db(move |conn| notes::get_note(conn, &uid, &nid))
            .await?;

        let mut degraded = false;
        let summary = match prompts::summarize(self.ai(), &note.title, &note.body).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(note_id = %note.id, error = %e, "summary failed");
                degraded = true;
                String::new()
            }
        };
        let concepts = match prompts::extract_concepts(self.ai(), &note.title, &note.body).await {
            Ok(concepts) => concepts,
            Err(e) => {
                tracing::warn!(note_id = %note.id, error = %e, "concept extraction failed");
                degraded = true;
                prompts::Concepts::default()
            }
        };

        if summary.is_empty() && concepts.is_empty() {
            let uid = user_id.to_string();
            let nid = note.id.clone();
            let existing = self
                .with_db(move |conn| analysis::get_analysis(conn, &uid, &nid))
                .await?;
            return Ok(AnalysisOutcome {
                note,
                analysis: existing,
                degraded: true,
            });
        }

        let model = self.ai.model().to_string();
        let (uid, nid) = (user_id.to_string(), note.id.clone());
        let (note, stored) = self
            .with_db(move |conn| {
                let stored = analysis::upsert_analysis(
                    conn,
                    &uid,
                    &nid,
                    &summary,
                    &concepts.key_concepts,
                    &concepts.tags,
                    &model,
                )?;
                let summary = (!summary.is_empty()).then_some(summary.as_str());
                let note = notes::set_ai_fields(conn, &uid, &nid, summary, &concepts.tags)?;
                Ok((note, stored))
            })
            .await?;

        tracing::info!(note_id = %note.id, degraded, "note analyzed");
        Ok(AnalysisOutcome {
            note,
            analysis: Some(stored),
            degraded,
        })
    }

    /// Ask the model which of the nearest notes relate to this one and store
    /// the answers as AI connections. Any AI failure yields an empty list.
    pub async fn suggest_connections(&self, user_id: &str, note_id: &str) -> Result<Vec<NoteConnection>> {
        let (uid, nid) = (user_id.to_string(), note_id.to_string());
        let (note, stored) = self
            .with_db(move |conn| {
                let note = notes::get_note(conn, &uid, &nid)?;
                let stored = notes::get_embedding(conn, &uid, &nid)?;
                Ok((note, stored))
            })
            .await?;

        let embedding = match stored {
            Some(v) => v,
            None => match self.ai.embed(&embedding_text(&note.title, &note.body)).await {
                Ok(v) => {
                    let (uid, nid, v2) = (user_id.to_string(), note.id.clone(), v.clone());
                    self.with_db(move |conn| notes::store_embedding(conn, &uid, &nid, &v2))
                        .await?;
                    v
                }
                Err(e) => {
                    tracing::warn!(note_id = %note.id, error = %e, "cannot suggest connections without an embedding");
                    return Ok(Vec::new());
                }
            },
        };

        let limit = self.config.search.connection_candidates;
        let (uid, nid) = (user_id.to_string(), note.id.clone());
        let nearest = self
            .with_db(move |conn| search::nearest_notes(conn, &uid, &nid, &embedding, limit))
            .await?;
        if nearest.is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<ConnectionCandidate> = nearest
            .into_iter()
            .map(|m| ConnectionCandidate {
                id: m.id,
                title: m.title,
                preview: m.summary.unwrap_or(m.preview),
            })
            .collect();

        let suggestions = match prompts::suggest_connections(self.ai(), &note.title, &note.body, &candidates).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(note_id = %note.id, error = %e, "connection suggestion failed");
                return Ok(Vec::new());
            }
        };

        let (uid, nid) = (user_id.to_string(), note.id.clone());
        let stored = self
            .with_db(move |conn| {
                let mut out = Vec::with_capacity(suggestions.len());
                for s in suggestions {
                    let input = NewConnection {
                        target_id: s.target_id,
                        relationship: s.relationship,
                        strength: s.strength,
                        reason: s.reason,
                    };
                    out.push(connections::create_connection(conn, &uid, &nid, &input, ConnectionOrigin::Ai)?.connection);
                }
                Ok(out)
            })
            .await?;

        tracing::info!(note_id = %note.id, suggested = stored.len(), "connections suggested");
        Ok(stored)
    }

    /// Embed every note lacking a vector. With `all`, every note is embedded
    /// again (after an embedding model change); each vector is replaced only
    /// once its new one is ready.
    /// `on_progress` gets `(done, total)` after each note.
    pub async fn reembed<F>(&self, user_id: Option<String>, all: bool, mut on_progress: F) -> Result<ReembedReport>
    where
        F: FnMut(usize, usize),
    {
        let model = self.config.ai.embedding_model.clone();
        let whole_db = user_id.is_none();
        let pending = self
            .with_db(move |conn| notes::notes_for_embedding(conn, user_id.as_deref(), all))
            .await?;

        let total = pending.len();
        let mut report = ReembedReport::default();
        for (i, (owner, note)) in pending.iter().enumerate() {
            match self.embed_note(owner, note).await {
                Ok(()) => report.embedded += 1,
                Err(e) => {
                    tracing::warn!(note_id = %note.id, error = %e, "re-embed failed");
                    report.failed += 1;
                }
            }
            on_progress(i + 1, total);
        }

        // the model marker covers every vector, so only a complete run may move it
        if whole_db && report.failed == 0 {
            self.with_db(move |conn| Ok(migrations::set_embedding_model(conn, &model)?))
                .await?;
        }
        tracing::info!(embedded = report.embedded, failed = report.failed, "re-embed finished");
        Ok(report)
    }
}
