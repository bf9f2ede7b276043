//! Health, profile, session, stats and feedback routes.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::auth::AuthUser;
use super::error::{ApiError, ApiJson, ApiQuery, Deleted};
use crate::brain::feedback::{self, NewFeedback};
use crate::brain::profiles::{self, ProfilePatch};
use crate::brain::stats::{self, BrainStats};
use crate::brain::types::{Feedback, Profile};
use crate::service::Brain;

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
    ai_provider: &'static str,
}

pub async fn health(State(brain): State<Brain>) -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ai_provider: brain.ai().name(),
    })
}

pub async fn get_profile(State(brain): State<Brain>, user: AuthUser) -> Result<Json<Profile>, ApiError> {
    let profile = brain
        .with_db(move |conn| profiles::get_profile(conn, &user.user_id))
        .await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<Json<Profile>, ApiError> {
    let profile = brain
        .with_db(move |conn| profiles::update_profile(conn, &user.user_id, &patch))
        .await?;
    Ok(Json(profile))
}

/// Revoke the token used for this request.
pub async fn sign_out(State(brain): State<Brain>, user: AuthUser) -> Result<Json<Deleted>, ApiError> {
    brain.sign_out(user.token).await?;
    Ok(Deleted::new("signed out"))
}

pub async fn get_stats(State(brain): State<Brain>, user: AuthUser) -> Result<Json<BrainStats>, ApiError> {
    let stats = brain
        .with_db(move |conn| stats::brain_stats(conn, &user.user_id))
        .await?;
    Ok(Json(stats))
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    note_id: Option<String>,
}

pub async fn list_feedback(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<FeedbackQuery>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let rows = brain
        .with_db(move |conn| feedback::list_feedback(conn, &user.user_id, query.note_id.as_deref()))
        .await?;
    Ok(Json(rows))
}

pub async fn create_feedback(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewFeedback>,
) -> Result<Json<Feedback>, ApiError> {
    let row = brain
        .with_db(move |conn| feedback::create_feedback(conn, &user.user_id, &input))
        .await?;
    Ok(Json(row))
}
