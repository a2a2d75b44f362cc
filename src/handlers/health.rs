use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness probe with a database ping
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match crate::db::check_connection(state.db.as_ref()).await {
        Ok(()) => "up",
        Err(_) => "down",
    };

    Json(json!({
        "status": if database == "up" { "ok" } else { "degraded" },
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
