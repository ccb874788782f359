//! Availability aggregation.
//!
//! Reacts to guide-scoped availability changes and decides whether the
//! operator needs to hear about it. The evaluation is a full re-scan of the
//! active roster for the affected `(date, group)` rather than an
//! incrementally maintained counter; at roster scale that is a handful of
//! reads per trigger and keeps the logic stateless.

pub mod alerts;

pub use alerts::{AlertDispatcher, AlertMailer, LogMailer, MailerError, RelayMailer};

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use tourdesk_types::{AlertKind, ShiftChange, ShiftDate, SlotGroup};

use crate::clock::Clock;
use crate::store::{AlertStore, AvailabilityStore, GuideStore, StoreResult};

/// Recomputes group-level blockage on every availability change and raises
/// operator alerts when a threshold is crossed.
pub struct AvailabilityAggregator {
    guides: Arc<dyn GuideStore>,
    availability: Arc<dyn AvailabilityStore>,
    alerts: Arc<dyn AlertStore>,
    dispatcher: AlertDispatcher,
    clock: Arc<dyn Clock>,
    /// Lookback for the recovery-alert dedup check.
    window: chrono::Duration,
}

impl AvailabilityAggregator {
    pub fn new(
        guides: Arc<dyn GuideStore>,
        availability: Arc<dyn AvailabilityStore>,
        alerts: Arc<dyn AlertStore>,
        dispatcher: AlertDispatcher,
        clock: Arc<dyn Clock>,
        window: chrono::Duration,
    ) -> Self {
        Self {
            guides,
            availability,
            alerts,
            dispatcher,
            clock,
            window,
        }
    }

    /// Entry point for `Free <-> Unavailable` changes.
    ///
    /// Guide self-service is fire-and-forget: evaluation failures are
    /// logged, never surfaced or retried.
    #[instrument(skip(self, change), fields(date = %change.date, slot = %change.slot))]
    pub async fn handle(&self, change: &ShiftChange) {
        if change.guide_id.is_none() {
            warn!("Availability change without a guide; skipping");
            return;
        }

        let group = change.slot.group();
        if let Err(err) = self.evaluate(change.date, group).await {
            warn!(error = %err, group = %group, "Availability evaluation failed");
        }
    }

    /// Re-scan the active roster for `(date, group)` and alert on a
    /// threshold crossing.
    pub async fn evaluate(&self, date: ShiftDate, group: SlotGroup) -> StoreResult<()> {
        let guides = self.guides.list_active().await?;
        let total = guides.len();
        if total == 0 {
            debug!("No active guides; nothing to aggregate");
            return Ok(());
        }

        let mut blocked = 0usize;
        for guide in &guides {
            if self
                .availability
                .is_group_blocked(guide.id, date, group)
                .await?
            {
                blocked += 1;
            }
        }

        debug!(blocked, total, group = %group, "Aggregated availability");

        if blocked == total {
            self.dispatcher.send(date, group, AlertKind::Blocked).await;
            return Ok(());
        }

        // Capacity came back. Only worth an alert if the operator was told
        // the group was fully blocked recently and has not yet been told
        // about the recovery.
        let since = self.clock.now() - self.window;
        match self.alerts.latest_for(date, group, since).await? {
            Some(previous) if previous.kind == AlertKind::Blocked => {
                self.dispatcher.send(date, group, AlertKind::Available).await;
            }
            _ => {}
        }

        Ok(())
    }
}
