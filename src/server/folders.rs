use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::auth::AuthUser;
use super::error::{ApiError, ApiJson, Deleted};
use crate::brain::folders::{self, FolderPatch, NewFolder};
use crate::brain::types::{Folder, FolderNode};
use crate::service::Brain;

#[derive(Serialize)]
pub struct FolderCount {
    count: u64,
}

pub async fn list(State(brain): State<Brain>, user: AuthUser) -> Result<Json<Vec<Folder>>, ApiError> {
    let rows = brain
        .with_db(move |conn| folders::list_folders(conn, &user.user_id))
        .await?;
    Ok(Json(rows))
}

pub async fn count(State(brain): State<Brain>, user: AuthUser) -> Result<Json<FolderCount>, ApiError> {
    let count = brain
        .with_db(move |conn| folders::count_folders(conn, &user.user_id))
        .await?;
    Ok(Json(FolderCount { count }))
}

pub async fn tree(State(brain): State<Brain>, user: AuthUser) -> Result<Json<Vec<FolderNode>>, ApiError> {
    let tree = brain
        .with_db(move |conn| folders::folder_tree(conn, &user.user_id))
        .await?;
    Ok(Json(tree))
}

pub async fn create(
    State(brain): State<Brain>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewFolder>,
) -> Result<Json<Folder>, ApiError> {
    let folder = brain
        .with_db(move |conn| folders::create_folder(conn, &user.user_id, &input))
        .await?;
    Ok(Json(folder))
}

pub async fn get(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Folder>, ApiError> {
    let folder = brain
        .with_db(move |conn| folders::get_folder(conn, &user.user_id, &id))
        .await?;
    Ok(Json(folder))
}

pub async fn update(
    State(brain): State<Brain>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<FolderPatch>,
) -> Result<Json<Folder>, ApiError> {
    let folder = brain
        .with_db(move |conn| folders::update_folder(conn, &user.user_id, &id, &patch))
        .await?;
    Ok(Json(folder))
}

pub async fn delete(State(brain): State<Brain>, user: AuthUser, Path(id): Path<String>) -> Result<Json<Deleted>, ApiError> {
    brain
        .with_db(move |conn| folders::delete_folder(conn, &user.user_id, &id))
        .await?;
    Ok(Deleted::new("folder deleted"))
}
