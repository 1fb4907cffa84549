use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the entity store answers a query.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let streams = state.store.list_cursors().await?;
    Ok(Json(serde_json::json!({
        "status": "ready",
        "streams": streams.len(),
    })))
}
