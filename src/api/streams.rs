use crate::api::AppState;
use crate::error::AppError;
use crate::store::StreamCursor;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamsResponse {
    pub streams: Vec<StreamCursor>,
}

/// Watermark of every stream that has applied at least one event.
pub async fn get_streams(State(state): State<AppState>) -> Result<Json<StreamsResponse>, AppError> {
    let streams = state.store.list_cursors().await?;
    Ok(Json(StreamsResponse { streams }))
}
