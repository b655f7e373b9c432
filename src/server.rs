//! HTTP endpoint the dialogue engine calls to run custom actions.
//!
//! ```text
//! POST /webhook   run `next_action` against the posted tracker
//! GET  /health
//! GET  /actions   registered action names
//! ```

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::actions::{self, ACTION_NAMES, ActionContext};
use crate::error::{Error, Result};
use crate::tracker::ActionRequest;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<ActionContext>,
}

pub fn build_router(ctx: Arc<ActionContext>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .route("/actions", get(list_actions))
        .with_state(AppState { ctx })
}

async fn webhook(State(state): State<AppState>, Json(req): Json<ActionRequest>) -> Response {
    let name = req.next_action.as_str();
    match actions::run(name, &req.tracker, &state.ctx).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(Error::UnknownAction(action)) => {
            warn!(%action, sender = ?req.sender_id, "unknown action requested");
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No registered action found for name '{action}'."),
                    "action_name": action,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(action = name, "action failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string(), "action_name": name})),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn list_actions() -> Json<serde_json::Value> {
    let names: Vec<_> = ACTION_NAMES.iter().map(|n| json!({"name": n})).collect();
    Json(serde_json::Value::Array(names))
}

/// Bind `bind` and serve until Ctrl-C.
pub async fn serve(bind: &str, ctx: Arc<ActionContext>) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    info!(%addr, actions = ACTION_NAMES.len(), "action server listening");

    axum::serve(listener, build_router(ctx))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("could not install Ctrl-C handler: {e}");
            }
        })
        .await?;

    info!("action server shut down");
    Ok(())
}
