//! Shift records, availability records, and the transition function that
//! decides what the dispatcher does with a state change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::ids::GuideId;
use crate::slot::Slot;

/// A calendar day in string-sortable ISO form (`YYYY-MM-DD`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ShiftDate(NaiveDate);

impl ShiftDate {
    /// Wraps a calendar day.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses the ISO `YYYY-MM-DD` form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        s.parse::<NaiveDate>()
            .map(Self)
            .map_err(|_| ParseError::Date(s.to_string()))
    }

    /// The underlying calendar day.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for ShiftDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for ShiftDate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveDate> for ShiftDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Lifecycle state of a shift or availability record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftState {
    /// The slot is open. Initial state.
    Free,
    /// A guide has claimed the slot.
    Assigned,
    /// A guide has blocked their own availability for the slot.
    Unavailable,
}

impl ShiftState {
    /// Stable string form used on the wire and in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftState::Free => "free",
            ShiftState::Assigned => "assigned",
            ShiftState::Unavailable => "unavailable",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "free" => Ok(ShiftState::Free),
            "assigned" => Ok(ShiftState::Assigned),
            "unavailable" => Ok(ShiftState::Unavailable),
            other => Err(ParseError::ShiftState(other.to_string())),
        }
    }
}

impl std::fmt::Display for ShiftState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bookable slot in the pool-wide assignment partition.
///
/// Identity is `(date, slot)`.
///
/// # Invariants
///
/// - `state == Assigned` iff `guide_id.is_some()`
/// - `state == Free` implies `guide_id.is_none()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    pub date: ShiftDate,
    pub slot: Slot,
    pub state: ShiftState,
    pub guide_id: Option<GuideId>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// A freshly seeded, unclaimed shift.
    #[must_use]
    pub fn free(date: ShiftDate, slot: Slot, now: DateTime<Utc>) -> Self {
        Self {
            date,
            slot,
            state: ShiftState::Free,
            guide_id: None,
            updated_at: now,
        }
    }

    /// Checks the state/guide consistency invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match self.state {
            ShiftState::Assigned => self.guide_id.is_some(),
            ShiftState::Free | ShiftState::Unavailable => self.guide_id.is_none(),
        }
    }
}

/// A guide-scoped availability record.
///
/// Identity is `(guide_id, date, slot)`. Only `Free` and `Unavailable` are
/// meaningful states here; assignment never touches this partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub guide_id: GuideId,
    pub date: ShiftDate,
    pub slot: Slot,
    pub state: ShiftState,
    pub updated_at: DateTime<Utc>,
}

/// What the dispatcher should do with an observed state change.
///
/// This is the explicit transition function of the shift state machine:
/// only the literal `(before, after)` pair is inspected, intermediate
/// states are never replayed, and a write that does not change state is
/// never dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftTrigger {
    /// `Free -> Assigned`: run the assignment handler.
    Assigned,
    /// `Assigned -> Free`: run the release handler.
    Released,
    /// `Free <-> Unavailable`: re-evaluate the availability group.
    AvailabilityChanged,
}

impl ShiftTrigger {
    /// Classifies a `(before, after)` pair.
    ///
    /// Returns `None` for pairs the core does not act on; the dispatcher
    /// logs those and moves on.
    #[must_use]
    pub fn classify(before: ShiftState, after: ShiftState) -> Option<Self> {
        use ShiftState::*;
        match (before, after) {
            (Free, Assigned) => Some(ShiftTrigger::Assigned),
            (Assigned, Free) => Some(ShiftTrigger::Released),
            (Free, Unavailable) | (Unavailable, Free) => Some(ShiftTrigger::AvailabilityChanged),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_date_is_iso_and_sortable() {
        let a = ShiftDate::parse("2025-11-10").unwrap();
        let b = ShiftDate::parse("2025-12-01").unwrap();
        assert!(a < b);
        assert_eq!(a.to_string(), "2025-11-10");
    }

    #[test]
    fn shift_date_rejects_garbage() {
        assert!(ShiftDate::parse("10/11/2025").is_err());
        assert!(ShiftDate::parse("2025-13-40").is_err());
    }

    #[test]
    fn free_shift_is_consistent() {
        let shift = Shift::free(
            ShiftDate::parse("2025-11-10").unwrap(),
            Slot::Morning,
            Utc::now(),
        );
        assert!(shift.is_consistent());
        assert_eq!(shift.state, ShiftState::Free);
        assert!(shift.guide_id.is_none());
    }

    #[test]
    fn assigned_without_guide_is_inconsistent() {
        let mut shift = Shift::free(
            ShiftDate::parse("2025-11-10").unwrap(),
            Slot::Morning,
            Utc::now(),
        );
        shift.state = ShiftState::Assigned;
        assert!(!shift.is_consistent());
    }

    #[test]
    fn classify_covers_the_legal_transitions() {
        use ShiftState::*;
        assert_eq!(
            ShiftTrigger::classify(Free, Assigned),
            Some(ShiftTrigger::Assigned)
        );
        assert_eq!(
            ShiftTrigger::classify(Assigned, Free),
            Some(ShiftTrigger::Released)
        );
        assert_eq!(
            ShiftTrigger::classify(Free, Unavailable),
            Some(ShiftTrigger::AvailabilityChanged)
        );
        assert_eq!(
            ShiftTrigger::classify(Unavailable, Free),
            Some(ShiftTrigger::AvailabilityChanged)
        );
    }

    #[test]
    fn classify_ignores_everything_else() {
        use ShiftState::*;
        for state in [Free, Assigned, Unavailable] {
            assert_eq!(ShiftTrigger::classify(state, state), None);
        }
        assert_eq!(ShiftTrigger::classify(Assigned, Unavailable), None);
        assert_eq!(ShiftTrigger::classify(Unavailable, Assigned), None);
    }
}
