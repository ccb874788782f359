//! Guide roster entries.
//!
//! Guides are owned by an external management surface; the core reads them
//! to resolve `guide_id -> email` and to enumerate active guides during
//! availability aggregation.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::ids::GuideId;

/// Whether a guide participates in scheduling and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideStatus {
    Active,
    Inactive,
}

impl GuideStatus {
    /// Stable string form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GuideStatus::Active => "active",
            GuideStatus::Inactive => "inactive",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "active" => Ok(GuideStatus::Active),
            "inactive" => Ok(GuideStatus::Inactive),
            other => Err(ParseError::GuideStatus(other.to_string())),
        }
    }
}

/// A roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guide {
    pub id: GuideId,
    pub email: String,
    pub name: String,
    pub status: GuideStatus,
}

impl Guide {
    /// Returns true if the guide participates in scheduling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GuideStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        assert_eq!(
            GuideStatus::parse(GuideStatus::Active.as_str()).unwrap(),
            GuideStatus::Active
        );
        assert_eq!(
            GuideStatus::parse(GuideStatus::Inactive.as_str()).unwrap(),
            GuideStatus::Inactive
        );
        assert!(GuideStatus::parse("retired").is_err());
    }
}
