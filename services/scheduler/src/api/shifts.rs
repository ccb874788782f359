//! Shift scheduling endpoints.
//!
//! Operator actions (assign, unassign, seed) surface synchronous
//! success/failure. Guide availability posts are accepted and processed by
//! the dispatch worker; failures there are visible in logs only.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tourdesk_types::{GuideId, Shift, ShiftDate, Slot};

use crate::actions;
use crate::api::error::ApiError;
use crate::state::AppState;
use crate::store::ShiftStore;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_shifts))
        .route("/assign", post(assign_shift))
        .route("/unassign", post(unassign_shift))
        .route("/availability", post(set_availability))
        .route("/seed", post(seed_month))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListQuery {
    date: ShiftDate,
}

#[derive(Debug, Serialize)]
struct ShiftResponse {
    date: ShiftDate,
    slot: Slot,
    state: String,
    guide_id: Option<GuideId>,
}

impl From<Shift> for ShiftResponse {
    fn from(shift: Shift) -> Self {
        Self {
            date: shift.date,
            slot: shift.slot,
            state: shift.state.as_str().to_string(),
            guide_id: shift.guide_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    date: ShiftDate,
    slot: Slot,
    guide_id: GuideId,
}

#[derive(Debug, Deserialize)]
struct UnassignRequest {
    date: ShiftDate,
    slot: Slot,
}

#[derive(Debug, Deserialize)]
struct AvailabilityRequest {
    guide_id: GuideId,
    date: ShiftDate,
    slot: Slot,
    blocked: bool,
}

#[derive(Debug, Deserialize)]
struct SeedRequest {
    year: i32,
    month: u32,
}

#[derive(Debug, Serialize)]
struct SeedResponse {
    inserted: u64,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_shifts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ShiftResponse>>, ApiError> {
    let shifts = state.stores().shifts.list_for_date(query.date).await?;
    Ok(Json(shifts.into_iter().map(ShiftResponse::from).collect()))
}

async fn assign_shift(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<ShiftResponse>, ApiError> {
    let shift = actions::assign(&state, request.date, request.slot, request.guide_id).await?;
    Ok(Json(shift.into()))
}

async fn unassign_shift(
    State(state): State<AppState>,
    Json(request): Json<UnassignRequest>,
) -> Result<StatusCode, ApiError> {
    actions::operator_unassign(&state, request.date, request.slot).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Guide self-service block/unblock. Fire-and-forget from the guide's
/// perspective: always accepted, failures land in the logs.
async fn set_availability(
    State(state): State<AppState>,
    Json(request): Json<AvailabilityRequest>,
) -> impl IntoResponse {
    if let Err(err) = actions::set_availability(
        &state,
        request.guide_id,
        request.date,
        request.slot,
        request.blocked,
    )
    .await
    {
        warn!(
            guide_id = %request.guide_id,
            error = %err,
            "Availability write failed"
        );
    }
    StatusCode::ACCEPTED
}

async fn seed_month(
    State(state): State<AppState>,
    Json(request): Json<SeedRequest>,
) -> Result<Json<SeedResponse>, ApiError> {
    let inserted = actions::seed_month(&state, request.year, request.month).await?;
    Ok(Json(SeedResponse { inserted }))
}
