//! Error types for parsing domain values.

use thiserror::Error;

/// Errors produced when parsing a typed ID from a string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    /// The input string was empty.
    #[error("id string is empty")]
    Empty,

    /// The input had no `_` separator between prefix and ULID.
    #[error("id string is missing the prefix separator")]
    MissingSeparator,

    /// The prefix did not match the expected resource prefix.
    #[error("invalid id prefix: expected {expected}, got {actual}")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The ULID portion failed to parse.
    #[error("invalid ulid: {0}")]
    InvalidUlid(String),
}

/// Errors produced when parsing enum-like domain values from their
/// wire/database string forms.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown slot: {0}")]
    Slot(String),

    #[error("unknown slot group: {0}")]
    SlotGroup(String),

    #[error("unknown shift state: {0}")]
    ShiftState(String),

    #[error("unknown guide status: {0}")]
    GuideStatus(String),

    #[error("unknown notification kind: {0}")]
    NotificationKind(String),

    #[error("unknown notification status: {0}")]
    NotificationStatus(String),

    #[error("unknown alert kind: {0}")]
    AlertKind(String),

    #[error("invalid shift date: {0}")]
    Date(String),
}
