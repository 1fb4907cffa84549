use crate::api::AppState;
use crate::domain::EntityKind;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityResponse {
    pub kind: EntityKind,
    pub id: String,
    pub entity: serde_json::Value,
}

/// Raw lookup of one derived entity.
///
/// Ids are tried verbatim first, then lowercased, since address-keyed
/// entities are stored lowercase.
pub async fn get_entity(
    Path((kind, id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<EntityResponse>, AppError> {
    let kind = EntityKind::from_str(&kind)
        .map_err(|_| AppError::BadRequest(format!("Unknown entity kind: {}", kind)))?;

    let mut found = state.store.load_raw(kind, &id).await?.map(|b| (id.clone(), b));
    if found.is_none() {
        let lowered = id.to_ascii_lowercase();
        if lowered != id {
            found = state.store.load_raw(kind, &lowered).await?.map(|b| (lowered, b));
        }
    }

    let Some((id, body)) = found else {
        return Err(AppError::NotFound(format!("{} {}", kind, id)));
    };
    let entity = serde_json::from_str(&body)
        .map_err(|e| AppError::Internal(format!("Corrupt {} {}: {}", kind, id, e)))?;

    Ok(Json(EntityResponse { kind, id, entity }))
}
