//! Assignment reconciliation.
//!
//! A shift entering `assigned` is only a claim until the external tour
//! registry confirms a tour actually exists at that date and slot. The
//! handler:
//!
//! 1. validates the tour; a missing tour silently reverts the claim
//!    (expected divergence, typically stale operator UI state)
//! 2. resolves the guide's email; an unresolvable guide is a data-integrity
//!    fault that is logged and left for manual intervention, without revert
//! 3. invites the guide onto the registry event; an invite failure keeps
//!    the assignment ("assigned but not yet invited" is a recoverable
//!    inconsistency retried out-of-band)
//! 4. appends a pending invite notification for the delivery worker
//!
//! Any unexpected failure in that sequence triggers the compensating
//! revert: the shift is forced back to `free`. A failed revert write is the
//! most severe local failure and is logged as such; the handler never
//! retries it.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use tourdesk_calendar::TourCalendar;
use tourdesk_types::{GuideId, Notification, NotificationKind, ShiftChange, ShiftDate, Slot};

use crate::clock::Clock;
use crate::store::{GuideStore, NotificationStore, ShiftStore};

use super::DispatchError;

/// Handles `Free -> Assigned` changes.
pub struct AssignmentHandler {
    shifts: Arc<dyn ShiftStore>,
    guides: Arc<dyn GuideStore>,
    notifications: Arc<dyn NotificationStore>,
    calendar: Arc<dyn TourCalendar>,
    clock: Arc<dyn Clock>,
}

impl AssignmentHandler {
    pub fn new(
        shifts: Arc<dyn ShiftStore>,
        guides: Arc<dyn GuideStore>,
        notifications: Arc<dyn NotificationStore>,
        calendar: Arc<dyn TourCalendar>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shifts,
            guides,
            notifications,
            calendar,
            clock,
        }
    }

    #[instrument(skip(self, change), fields(date = %change.date, slot = %change.slot))]
    pub async fn handle(&self, change: &ShiftChange) {
        let Some(guide_id) = change.guide_id else {
            warn!("Assignment change without a guide; skipping");
            return;
        };

        if let Err(err) = self.reconcile(change.date, change.slot, guide_id).await {
            error!(error = %err, "Assignment reconciliation failed, reverting shift");
            if let Err(revert_err) = self.shifts.force_free(change.date, change.slot).await {
                // Nothing further can be done inside this invocation.
                error!(
                    error = %revert_err,
                    "FATAL: compensating revert failed; shift left inconsistent"
                );
            }
        }
    }

    async fn reconcile(
        &self,
        date: ShiftDate,
        slot: Slot,
        guide_id: GuideId,
    ) -> Result<(), DispatchError> {
        let check = self.calendar.validate_tour(date, slot).await?;

        if !check.exists {
            // Expected divergence, not an error: the registry has no tour
            // here, so the claim is undone without any notification.
            info!("No tour exists at this slot; reverting assignment");
            self.shifts.force_free(date, slot).await?;
            return Ok(());
        }

        let Some(guide) = self.guides.get(guide_id).await? else {
            // Data-integrity fault: the shift stays assigned and an
            // operator has to sort the roster out.
            error!(%guide_id, "Assigned guide not found in roster; manual intervention required");
            return Ok(());
        };

        match &check.event_id {
            Some(event_id) => {
                if let Err(err) = self.calendar.add_guide(event_id, &guide.email).await {
                    // Assigned-but-not-invited is recoverable out-of-band.
                    warn!(error = %err, event_id, "Guest invite failed; assignment kept");
                }
            }
            None => {
                warn!("Registry reported an existing tour without an event id; invite skipped");
            }
        }

        self.notifications
            .append(Notification::pending(
                guide_id,
                NotificationKind::Invite,
                guide.email.clone(),
                self.clock.now(),
            ))
            .await?;

        info!(%guide_id, "Assignment reconciled against the tour registry");
        Ok(())
    }
}
