//! Release notification.
//!
//! A shift leaving `assigned` is already in its terminal safe state, so
//! there is nothing to compensate in this direction; every failure here is
//! log-only. The handler also never touches the external calendar: guest
//! removal belongs to the operator-initiated unassignment path, not to
//! guide self-release.

use std::sync::Arc;

use tracing::{instrument, warn};

use tourdesk_types::{Notification, NotificationKind, ShiftChange};

use crate::clock::Clock;
use crate::store::{GuideStore, NotificationStore};

/// Handles `Assigned -> Free` changes.
pub struct ReleaseHandler {
    guides: Arc<dyn GuideStore>,
    notifications: Arc<dyn NotificationStore>,
    clock: Arc<dyn Clock>,
}

impl ReleaseHandler {
    pub fn new(
        guides: Arc<dyn GuideStore>,
        notifications: Arc<dyn NotificationStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            guides,
            notifications,
            clock,
        }
    }

    #[instrument(skip(self, change), fields(date = %change.date, slot = %change.slot))]
    pub async fn handle(&self, change: &ShiftChange) {
        let Some(prev_guide) = change.prev_guide else {
            warn!("Release change without a prior guide; skipping");
            return;
        };

        let guide = match self.guides.get(prev_guide).await {
            Ok(Some(guide)) => guide,
            Ok(None) => {
                warn!(%prev_guide, "Released guide not found in roster; no notification");
                return;
            }
            Err(err) => {
                warn!(%prev_guide, error = %err, "Guide lookup failed; no notification");
                return;
            }
        };

        let notification = Notification::pending(
            prev_guide,
            NotificationKind::Release,
            guide.email,
            self.clock.now(),
        );
        if let Err(err) = self.notifications.append(notification).await {
            warn!(%prev_guide, error = %err, "Release notification write failed");
        }
    }
}
