//! HTTP JSON API.
//!
//! Every `/api` route needs `Authorization: Bearer <token>`; tokens come from
//! `synapse profile create` / `synapse profile token`.

mod account;
pub mod auth;
pub mod error;
mod folders;
mod notes;
mod planner;
mod templates;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::SynapseConfig;
use crate::service::Brain;
use crate::{ai, db};

/// Build the router over shared state.
pub fn router(brain: Brain) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/profile", get(account::get_profile).patch(account::update_profile))
        .route("/session", delete(account::sign_out))
        .route("/stats", get(account::get_stats))
        .route("/feedback", get(account::list_feedback).post(account::create_feedback))
        .route("/folders", get(folders::list).post(folders::create))
        .route("/folders/count", get(folders::count))
        .route("/folders/tree", get(folders::tree))
        .route(
            "/folders/{id}",
            get(folders::get).patch(folders::update).delete(folders::delete),
        )
        .route("/notes", get(notes::list).post(notes::create))
        .route(
            "/notes/{id}",
            get(notes::get).patch(notes::update).delete(notes::delete),
        )
        .route("/notes/{id}/analyze", post(notes::analyze))
        .route("/notes/{id}/analysis", get(notes::get_analysis))
        .route(
            "/notes/{id}/connections",
            get(notes::list_connections).post(notes::create_connection),
        )
        .route("/notes/{id}/connections/suggest", post(notes::suggest_connections))
        .route("/connections/{id}", delete(notes::delete_connection))
        .route("/search", get(notes::search))
        .route("/tasks", get(planner::list_tasks).post(planner::create_task))
        .route(
            "/tasks/{id}",
            get(planner::get_task)
                .patch(planner::update_task)
                .delete(planner::delete_task),
        )
        .route("/events", get(planner::list_events).post(planner::create_event))
        .route(
            "/events/{id}",
            get(planner::get_event)
                .patch(planner::update_event)
                .delete(planner::delete_event),
        )
        .route("/templates", get(templates::list).post(templates::create))
        .route(
            "/templates/{id}",
            get(templates::get).patch(templates::update).delete(templates::delete),
        )
        .route("/templates/{id}/apply", post(templates::apply));

    Router::new()
        .route("/health", get(account::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(brain)
}

/// Open the database, build the AI client and shared state.
pub fn build_brain(config: SynapseConfig) -> Result<Brain> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    if let Ok(Some(stored)) = db::migrations::get_embedding_model(&conn) {
        if stored != config.ai.embedding_model {
            tracing::warn!(
                stored = %stored,
                configured = %config.ai.embedding_model,
                "embedding model changed; run `synapse reembed --all` to refresh note vectors"
            );
        }
    }

    let ai = ai::create_client(&config.ai)?;
    tracing::info!(provider = ai.name(), model = ai.model(), "AI provider ready");

    Ok(Brain::new(Arc::new(Mutex::new(conn)), ai, Arc::new(config)))
}

/// Serve the API until Ctrl-C.
pub async fn serve(config: SynapseConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let brain = build_brain(config)?;
    let app = router(brain);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Synapse API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
