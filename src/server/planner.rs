//! Task and calendar event routes.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::error::{ApiError, ApiJson, ApiQuery, Deleted};
use crate::brain::events::{self, EventPatch, NewEvent};
use crate::brain::tasks::{self, NewTask, TaskFilter, TaskPatch};
use crate::brain::types::{CalendarEvent, Task};
use crate::service::Brain;

pub async fn list_tasks(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(filter): ApiQuery<TaskFilter>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let rows = brain
        .with_db(move |conn| tasks::list_tasks(conn, &user.user_id, &filter))
        .await?;
    Ok(Json(rows))
}

pub async fn create_task(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewTask>,
) -> Result<Json<Task>, ApiError> {
    let task = brain
        .with_db(move |conn| tasks::create_task(conn, &user.user_id, &input))
        .await?;
    Ok(Json(task))
}

pub async fn get_task(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Task>, ApiError> {
    let task = brain
        .with_db(move |conn| tasks::get_task(conn, &user.user_id, &id))
        .await?;
    Ok(Json(task))
}

pub async fn update_task(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let task = brain
        .with_db(move |conn| tasks::update_task(conn, &user.user_id, &id, &patch))
        .await?;
    Ok(Json(task))
}

pub async fn delete_task(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| tasks::delete_task(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("task deleted"))
}

#[derive(Debug, Default, Deserialize)]
pub struct EventWindow {
    from: Option<String>,
    to: Option<String>,
}

pub async fn list_events(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(window): ApiQuery<EventWindow>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError> {
    let rows = brain
        .with_db(move |conn| events::list_events(conn, &user.user_id, window.from.as_deref(), window.to.as_deref()))
        .await?;
    Ok(Json(rows))
}

pub async fn create_event(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewEvent>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let event = brain
        .with_db(move |conn| events::create_event(conn, &user.user_id, &input))
        .await?;
    Ok(Json(event))
}

pub async fn get_event(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let event = brain
        .with_db(move |conn| events::get_event(conn, &user.user_id, &id))
        .await?;
    Ok(Json(event))
}

pub async fn update_event(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<EventPatch>,
) -> Result<Json<CalendarEvent>, ApiError> {
    let event = brain
        .with_db(move |conn| events::update_event(conn, &user.user_id, &id, &patch))
        .await?;
    Ok(Json(event))
}

pub async fn delete_event(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| events::delete_event(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("event deleted"))
}
