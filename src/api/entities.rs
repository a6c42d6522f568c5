use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_sessions::Session;

use crate::api::middleware::{auth::get_authenticated_actor, session::AppState};
use crate::error::Result;
use crate::models::entity_status::{EntityLifecycle, EntityStatus};

#[derive(Debug, Serialize)]
pub struct EntityStatusResponse {
    pub entity_type: String,
    pub entity_id: i64,
    pub status: EntityLifecycle,
    pub approval_request_id: Option<i64>,
}

impl EntityStatusResponse {
    /// Entities without a marker row are active
    fn from_marker(entity_type: String, entity_id: i64, marker: Option<EntityStatus>) -> Self {
        match marker {
            Some(marker) => Self {
                entity_type: marker.entity_type,
                entity_id: marker.entity_id,
                status: marker.status,
                approval_request_id: marker.approval_request_id,
            },
            None => Self {
                entity_type,
                entity_id,
                status: EntityLifecycle::Active,
                approval_request_id: None,
            },
        }
    }
}

/// Approval status of a single entity
async fn entity_status(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, i64)>,
    session: Session,
) -> Result<Json<EntityStatusResponse>> {
    get_authenticated_actor(&session).await?;

    let marker = EntityStatus::find(&state.pool, &entity_type, entity_id).await?;

    Ok(Json(EntityStatusResponse::from_marker(
        entity_type,
        entity_id,
        marker,
    )))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/entities/:entity_type/:entity_id/status",
        get(entity_status),
    )
}
