//! Operator and guide entry points.
//!
//! These are the synchronous halves of the flows: they commit the state
//! change (and its change-feed row); the dispatch worker carries out the
//! reconciliation and notification side effects afterwards.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{info, instrument, warn};

use tourdesk_calendar::TourCalendar;
use tourdesk_types::{GuideId, Shift, ShiftDate, ShiftState, Slot};

use crate::state::AppState;
use crate::store::{AvailabilityStore, GuideStore, ShiftStore, StoreError, StoreResult};

/// Errors surfaced to the operator-facing API.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The slot is already claimed (or otherwise not claimable).
    #[error("shift {date} {slot} is not available for assignment")]
    Conflict { date: ShiftDate, slot: Slot },

    /// The shift is not currently assigned, so there is nothing to release.
    #[error("shift {date} {slot} is not assigned")]
    NotAssigned { date: ShiftDate, slot: Slot },

    /// No shift record exists for the key.
    #[error("shift not found: {date} {slot}")]
    ShiftNotFound { date: ShiftDate, slot: Slot },

    /// The referenced guide is not on the roster.
    #[error("guide not found: {0}")]
    GuideNotFound(GuideId),

    /// Calendar-month arithmetic went out of range.
    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ShiftNotFound { date, slot } => ActionError::ShiftNotFound { date, slot },
            StoreError::StateConflict {
                date,
                slot,
                expected: ShiftState::Free,
                ..
            } => ActionError::Conflict { date, slot },
            StoreError::StateConflict {
                date,
                slot,
                expected: ShiftState::Assigned,
                ..
            } => ActionError::NotAssigned { date, slot },
            other => ActionError::Store(other),
        }
    }
}

/// Claim a shift for a guide.
///
/// The claim is a single conditional write: it succeeds only if the shift
/// is still `free` at commit time, so two concurrent claims for the same
/// slot cannot both land. Reconciliation against the tour registry happens
/// asynchronously and may still revert the claim.
#[instrument(skip(state))]
pub async fn assign(
    state: &AppState,
    date: ShiftDate,
    slot: Slot,
    guide_id: GuideId,
) -> Result<Shift, ActionError> {
    if state.stores().guides.get(guide_id).await?.is_none() {
        return Err(ActionError::GuideNotFound(guide_id));
    }

    let shift = state.stores().shifts.try_assign(date, slot, guide_id).await?;
    info!(%guide_id, "Shift claimed");
    Ok(shift)
}

/// Operator-initiated unassignment.
///
/// Unlike guide self-release, this path also removes the guide from the
/// external calendar event before freeing the shift. Calendar failures are
/// best-effort: the shift is freed regardless, since `free` is the safe
/// terminal state.
#[instrument(skip(state))]
pub async fn operator_unassign(
    state: &AppState,
    date: ShiftDate,
    slot: Slot,
) -> Result<(), ActionError> {
    let shift = state.stores().shifts.get(date, slot).await?;
    let Some(guide_id) = shift.guide_id.filter(|_| shift.state == ShiftState::Assigned) else {
        return Err(ActionError::NotAssigned { date, slot });
    };

    match state.calendar().validate_tour(date, slot).await {
        Ok(check) => {
            if let Some(event_id) = check.event_id.filter(|_| check.exists) {
                let email = match state.stores().guides.get(guide_id).await? {
                    Some(guide) => Some(guide.email),
                    None => {
                        warn!(%guide_id, "Guide missing from roster; skipping guest removal");
                        None
                    }
                };
                if let Some(email) = email {
                    if let Err(err) = state.calendar().remove_guide(&event_id, &email).await {
                        warn!(error = %err, event_id, "Guest removal failed; freeing shift anyway");
                    }
                }
            }
        }
        Err(err) => {
            warn!(error = %err, "Tour validation failed during unassign; freeing shift anyway");
        }
    }

    let prior = state.stores().shifts.release(date, slot).await?;
    info!(guide_id = %prior, "Shift released by operator");
    Ok(())
}

/// Guide self-service availability block/unblock.
///
/// Returns the store result so callers can log it, but the API treats this
/// as fire-and-forget: failures are never surfaced to the guide.
#[instrument(skip(state))]
pub async fn set_availability(
    state: &AppState,
    guide_id: GuideId,
    date: ShiftDate,
    slot: Slot,
    blocked: bool,
) -> StoreResult<()> {
    let target = if blocked {
        ShiftState::Unavailable
    } else {
        ShiftState::Free
    };

    let change = state
        .stores()
        .availability
        .set(guide_id, date, slot, target)
        .await?;

    if change.is_none() {
        info!("Availability write changed nothing; not dispatched");
    }
    Ok(())
}

/// Pre-create `free` shifts for every day and slot of a month.
///
/// Errors propagate to the caller so the invoking scheduler's platform
/// retry policy applies; this is the one path that delegates retries
/// outward instead of handling failure inline.
#[instrument(skip(state))]
pub async fn seed_month(state: &AppState, year: i32, month: u32) -> Result<u64, ActionError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(ActionError::InvalidMonth { year, month })?;

    let now = state.clock().now();
    let mut shifts = Vec::new();
    let mut day = first;
    while day.month() == month {
        for slot in Slot::ALL {
            shifts.push(Shift::free(ShiftDate::new(day), slot, now));
        }
        day = day
            .succ_opt()
            .ok_or(ActionError::InvalidMonth { year, month })?;
    }

    let inserted = state.stores().shifts.seed(shifts).await?;
    info!(year, month, inserted, "Seeded month");
    Ok(inserted)
}
