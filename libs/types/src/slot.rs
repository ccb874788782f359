//! Daily time slots and the groups availability alerting reasons about.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One of the fixed daily bookable time windows.
///
/// There is one morning window and three afternoon sub-windows. For
/// availability purposes the afternoon sub-windows are treated as a single
/// group (see [`SlotGroup`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Morning,
    #[serde(rename = "afternoon_1")]
    Afternoon1,
    #[serde(rename = "afternoon_2")]
    Afternoon2,
    #[serde(rename = "afternoon_3")]
    Afternoon3,
}

impl Slot {
    /// All slots, in daily order.
    pub const ALL: [Slot; 4] = [
        Slot::Morning,
        Slot::Afternoon1,
        Slot::Afternoon2,
        Slot::Afternoon3,
    ];

    /// Stable string form used on the wire and in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Afternoon1 => "afternoon_1",
            Slot::Afternoon2 => "afternoon_2",
            Slot::Afternoon3 => "afternoon_3",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "morning" => Ok(Slot::Morning),
            "afternoon_1" => Ok(Slot::Afternoon1),
            "afternoon_2" => Ok(Slot::Afternoon2),
            "afternoon_3" => Ok(Slot::Afternoon3),
            other => Err(ParseError::Slot(other.to_string())),
        }
    }

    /// The availability group this slot belongs to.
    #[must_use]
    pub fn group(&self) -> SlotGroup {
        match self {
            Slot::Morning => SlotGroup::Morning,
            Slot::Afternoon1 | Slot::Afternoon2 | Slot::Afternoon3 => SlotGroup::Afternoon,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Slot {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The unit availability aggregation operates on.
///
/// A change to any afternoon sub-slot re-evaluates the whole afternoon group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotGroup {
    Morning,
    Afternoon,
}

impl SlotGroup {
    /// The slots belonging to this group.
    #[must_use]
    pub fn slots(&self) -> &'static [Slot] {
        match self {
            SlotGroup::Morning => &[Slot::Morning],
            SlotGroup::Afternoon => &[Slot::Afternoon1, Slot::Afternoon2, Slot::Afternoon3],
        }
    }

    /// Stable string form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotGroup::Morning => "morning",
            SlotGroup::Afternoon => "afternoon",
        }
    }

    /// Parses the stable string form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        match s {
            "morning" => Ok(SlotGroup::Morning),
            "afternoon" => Ok(SlotGroup::Afternoon),
            other => Err(ParseError::SlotGroup(other.to_string())),
        }
    }
}

impl std::fmt::Display for SlotGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_round_trips() {
        for slot in Slot::ALL {
            assert_eq!(Slot::parse(slot.as_str()).unwrap(), slot);
        }
    }

    #[test]
    fn afternoon_sub_slots_share_a_group() {
        assert_eq!(Slot::Morning.group(), SlotGroup::Morning);
        assert_eq!(Slot::Afternoon1.group(), SlotGroup::Afternoon);
        assert_eq!(Slot::Afternoon2.group(), SlotGroup::Afternoon);
        assert_eq!(Slot::Afternoon3.group(), SlotGroup::Afternoon);
    }

    #[test]
    fn group_slots_cover_all_slots_exactly_once() {
        let mut covered: Vec<Slot> = Vec::new();
        covered.extend_from_slice(SlotGroup::Morning.slots());
        covered.extend_from_slice(SlotGroup::Afternoon.slots());
        covered.sort();
        let mut all = Slot::ALL.to_vec();
        all.sort();
        assert_eq!(covered, all);
    }

    #[test]
    fn unknown_slot_is_an_error() {
        assert!(matches!(Slot::parse("evening"), Err(ParseError::Slot(_))));
    }
}
