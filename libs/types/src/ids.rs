//! Typed IDs.
//!
//! [`GuideId`] is ULID-based for sortability and uniqueness and carries a
//! `gd` prefix in its string form. [`ChangeId`] is the monotonic cursor into
//! the shift change feed and is a plain integer.

use ulid::Ulid;

use crate::error::IdError;

/// A typed ID for a guide roster entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuideId(Ulid);

impl GuideId {
    /// The prefix for this ID type.
    pub const PREFIX: &'static str = "gd";

    /// Creates a new ID with a fresh ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn ulid(&self) -> Ulid {
        self.0
    }

    /// Parses an ID from a string in the format `gd_{ulid}`.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        let Some((prefix, ulid_str)) = s.split_once('_') else {
            return Err(IdError::MissingSeparator);
        };

        if prefix != Self::PREFIX {
            return Err(IdError::InvalidPrefix {
                expected: Self::PREFIX,
                actual: prefix.to_string(),
            });
        }

        let ulid = ulid_str
            .parse::<Ulid>()
            .map_err(|e| IdError::InvalidUlid(e.to_string()))?;

        Ok(Self(ulid))
    }
}

impl Default for GuideId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GuideId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl std::str::FromStr for GuideId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for GuideId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for GuideId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Cursor into the shift change feed. Assigned monotonically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangeId(i64);

impl ChangeId {
    /// Creates a new ChangeId from an i64.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the underlying i64 value.
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChangeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ChangeId> for i64 {
    fn from(id: ChangeId) -> Self {
        id.0
    }
}

impl serde::Serialize for ChangeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ChangeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let id = i64::deserialize(deserializer)?;
        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_id_round_trips_through_string() {
        let id = GuideId::new();
        let s = id.to_string();
        assert!(s.starts_with("gd_"));
        assert_eq!(GuideId::parse(&s).unwrap(), id);
    }

    #[test]
    fn guide_id_rejects_wrong_prefix() {
        let id = GuideId::new();
        let s = id.to_string().replace("gd_", "node_");
        assert!(matches!(
            GuideId::parse(&s),
            Err(IdError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn guide_id_rejects_empty_and_separator_less() {
        assert_eq!(GuideId::parse(""), Err(IdError::Empty));
        assert_eq!(GuideId::parse("gd"), Err(IdError::MissingSeparator));
    }

    #[test]
    fn guide_id_serde_form_is_the_prefixed_string() {
        let id = GuideId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: GuideId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn change_id_orders_by_value() {
        assert!(ChangeId::new(1) < ChangeId::new(2));
        assert_eq!(i64::from(ChangeId::new(7)), 7);
    }
}
