//! Availability alert audit records.
//!
//! Written once after an operator alert is delivered and read back only by
//! the aggregator's dedup lookup. Never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::shift::ShiftDate;
use crate::slot::SlotGroup;

/// Direction of an availability alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Every active guide is blocked for the group.
    Blocked,
    /// At least one guide became available again after a blocked alert.
    Available,
}

impl AlertKind {
    /// Stable string form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Blocked => "blocked",
            AlertKind::Available => "available",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "blocked" => Ok(AlertKind::Blocked),
            "available" => Ok(AlertKind::Available),
            other => Err(ParseError::AlertKind(other.to_string())),
        }
    }
}

/// Audit record of one delivered operator alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityAlert {
    pub date: ShiftDate,
    pub slot_group: SlotGroup,
    pub kind: AlertKind,
    pub sent_to: String,
    pub created_at: DateTime<Utc>,
}
