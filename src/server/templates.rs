use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use super::auth::AuthUser;
use super::error::{ApiError, ApiJson, ApiQuery, Deleted};
use crate::brain::templates::{self, NewTemplate, TemplatePatch};
use crate::brain::types::Template;
use crate::service::{AppliedTemplate, ApplyTemplate, Brain};

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    category: Option<String>,
}

pub async fn list(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<TemplateQuery>,
) -> Result<Json<Vec<Template>>, ApiError> {
    let rows = brain
        .with_db(move |conn| templates::list_templates(conn, &user.user_id, query.category.as_deref()))
        .await?;
    Ok(Json(rows))
}

pub async fn create(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewTemplate>,
) -> Result<Json<Template>, ApiError> {
    let template = brain
        .with_db(move |conn| templates::create_template(conn, &user.user_id, &input))
        .await?;
    Ok(Json(template))
}

pub async fn get(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Template>, ApiError> {
    let template = brain
        .with_db(move |conn| templates::get_template(conn, &user.user_id, &id))
        .await?;
    Ok(Json(template))
}

pub async fn update(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TemplatePatch>,
) -> Result<Json<Template>, ApiError> {
    let template = brain
        .with_db(move |conn| templates::update_template(conn, &user.user_id, &id, &patch))
        .await?;
    Ok(Json(template))
}

pub async fn delete(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| templates::delete_template(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("template deleted"))
}

pub async fn apply(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<ApplyTemplate>,
) -> Result<Json<AppliedTemplate>, ApiError> {
    Ok(Json(brain.apply_template(&user.user_id, &id, request).await?))
}
