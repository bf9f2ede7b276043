//! Note, analysis, connection and search routes.

use axum::extract::{Path, State};
use axum::Json;

use super::auth::AuthUser;
use super::error::{ApiError, ApiJson, ApiQuery, Deleted};
use crate::brain::analysis;
use crate::brain::connections::{self, LinkedNote, NewConnection, StoreConnectionResult};
use crate::brain::notes::{self, NewNote, NoteFilter, NotePatch};
use crate::brain::types::{AiAnalysis, ConnectionOrigin, Note, NoteConnection};
use crate::error::Error;
use crate::service::{AnalysisOutcome, Brain, SavedNote, SearchRequest, SearchResponse};

pub async fn list(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<NoteFilter>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let rows = brain
        .with_db(move |conn| notes::list_notes(conn, &user.user_id, &filter))
        .await?;
    Ok(Json(rows))
}

pub async fn create(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewNote>,
) -> Result<Json<SavedNote>, ApiError> {
    Ok(Json(brain.create_note(&user.user_id, input).await?))
}

pub async fn get(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Note>, ApiError> {
    let note = brain
        .with_db(move |conn| notes::get_note(conn, &user.user_id, &id))
        .await?;
    Ok(Json(note))
}

pub async fn update(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<NotePatch>,
) -> Result<Json<SavedNote>, ApiError> {
    Ok(Json(brain.update_note(&user.user_id, &id, patch).await?))
}

pub async fn delete(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| notes::delete_note(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("note deleted"))
}

pub async fn analyze(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    Ok(Json(brain.analyze_note(&user.user_id, &id).await?))
}

pub async fn get_analysis(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AiAnalysis>, ApiError> {
    let found = brain
        .with_db(move |conn| {
            notes::get_note(conn, &user.user_id, &id)?;
            analysis::get_analysis(conn, &user.user_id, &id)?.ok_or_else(|| Error::not_found("analysis", id.clone()))
        })
        .await?;
    Ok(Json(found))
}

pub async fn list_connections(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<LinkedNote>>, ApiError> {
    let links = brain
        .with_db(move |conn| connections::list_for_note(conn, &user.user_id, &id))
        .await?;
    Ok(Json(links))
}

pub async fn create_connection(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewConnection>,
) -> Result<Json<StoreConnectionResult>, ApiError> {
    let stored = brain
        .with_db(move |conn| connections::create_connection(conn, &user.user_id, &id, &input, ConnectionOrigin::Manual))
        .await?;
    Ok(Json(stored))
}

pub async fn suggest_connections(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<NoteConnection>>, ApiError> {
    Ok(Json(brain.suggest_connections(&user.user_id, &id).await?))
}

pub async fn delete_connection(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| connections::delete_connection(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("connection deleted"))
}

pub async fn search(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(request): ApiQuery<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    Ok(Json(brain.search(&user.user_id, request).await?))
}
