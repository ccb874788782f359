//! Notification outbox records.
//!
//! Handlers append these with status `pending`; an external delivery worker
//! owns the transition to `sent`/`failed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::ids::GuideId;

/// Why the guide is being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The guide was invited onto an external tour event.
    Invite,
    /// The guide's claim on a shift was released.
    Release,
}

impl NotificationKind {
    /// Stable string form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Invite => "invite",
            NotificationKind::Release => "release",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "invite" => Ok(NotificationKind::Invite),
            "release" => Ok(NotificationKind::Release),
            other => Err(ParseError::NotificationKind(other.to_string())),
        }
    }
}

/// Delivery status, owned by the external delivery worker after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    /// Stable string form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "sent" => Ok(NotificationStatus::Sent),
            "failed" => Ok(NotificationStatus::Failed),
            other => Err(ParseError::NotificationStatus(other.to_string())),
        }
    }
}

/// An outbox record for one guide-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub guide_id: GuideId,
    pub kind: NotificationKind,
    pub target_email: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// A freshly created, undelivered notification.
    #[must_use]
    pub fn pending(
        guide_id: GuideId,
        kind: NotificationKind,
        target_email: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            guide_id,
            kind,
            target_email: target_email.into(),
            status: NotificationStatus::Pending,
            created_at: now,
        }
    }
}
