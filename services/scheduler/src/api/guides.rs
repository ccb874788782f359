//! Guide roster endpoints.
//!
//! The roster is owned by an external management surface; these routes are
//! the sync hook it calls plus a read for the scheduling UI.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Deserialize;

use tourdesk_types::{Guide, GuideId, GuideStatus};

use crate::api::error::ApiError;
use crate::state::AppState;
use crate::store::GuideStore;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_active_guides).put(upsert_guide))
}

#[derive(Debug, Deserialize)]
struct UpsertGuideRequest {
    id: GuideId,
    email: String,
    name: String,
    #[serde(default = "default_status")]
    status: GuideStatus,
}

fn default_status() -> GuideStatus {
    GuideStatus::Active
}

async fn list_active_guides(
    State(state): State<AppState>,
) -> Result<Json<Vec<Guide>>, ApiError> {
    let guides = state.stores().guides.list_active().await?;
    Ok(Json(guides))
}

async fn upsert_guide(
    State(state): State<AppState>,
    Json(request): Json<UpsertGuideRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .stores()
        .guides
        .upsert(Guide {
            id: request.id,
            email: request.email,
            name: request.name,
            status: request.status,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
