//! The durable shift change feed.
//!
//! Every state-changing write to a shift or availability record appends one
//! of these in the same transaction. The dispatch worker consumes the feed
//! behind a persisted checkpoint, which is what turns the platform's
//! at-least-once write semantics into exactly-once handler dispatch per
//! partition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChangeId, GuideId};
use crate::shift::{ShiftState, ShiftTrigger};
use crate::slot::Slot;
use crate::ShiftDate;

/// One committed state change, as appended by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftChange {
    /// Monotonic feed cursor, assigned by the store on append.
    pub change_id: ChangeId,

    pub date: ShiftDate,
    pub slot: Slot,

    /// For availability changes: the guide whose record changed.
    /// For assignment changes: the guide now holding the shift, if any.
    pub guide_id: Option<GuideId>,

    /// The guide that held the shift before the change, if any. The release
    /// handler needs this; the shift record itself no longer carries it.
    pub prev_guide: Option<GuideId>,

    pub prev_state: ShiftState,
    pub new_state: ShiftState,

    pub recorded_at: DateTime<Utc>,
}

impl ShiftChange {
    /// The dispatcher action for this change, if any.
    #[must_use]
    pub fn trigger(&self) -> Option<ShiftTrigger> {
        ShiftTrigger::classify(self.prev_state, self.new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(prev: ShiftState, new: ShiftState) -> ShiftChange {
        ShiftChange {
            change_id: ChangeId::new(1),
            date: ShiftDate::parse("2025-11-10").unwrap(),
            slot: Slot::Morning,
            guide_id: None,
            prev_guide: None,
            prev_state: prev,
            new_state: new,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn trigger_delegates_to_the_transition_function() {
        assert_eq!(
            change(ShiftState::Free, ShiftState::Assigned).trigger(),
            Some(ShiftTrigger::Assigned)
        );
        assert_eq!(
            change(ShiftState::Unavailable, ShiftState::Assigned).trigger(),
            None
        );
    }
}
