//! # tourdesk-calendar
//!
//! Capability interface for the external tour registry, the sole source of
//! truth for whether a bookable tour exists at a given date and slot.
//!
//! ## Design Principles
//!
//! - The registry is reached through the [`TourCalendar`] trait so handlers
//!   take a swappable capability, never a module-level HTTP function closing
//!   over secrets.
//! - The core never caches or owns registry entities beyond one handler
//!   invocation; every call re-queries.
//! - A client-side timeout is the same failure class as any other failed
//!   call. Callers decide whether a failure compensates or is merely logged.

mod http;

pub use http::HttpTourCalendar;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tourdesk_types::{ShiftDate, Slot};

/// Errors from the external tour registry.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// Transport-level failure, including client-side timeouts.
    #[error("calendar transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The registry answered with a non-2xx status.
    #[error("calendar returned status {0}")]
    Status(u16),

    /// The registry answered 2xx but flagged an application error.
    #[error("calendar error: {0}")]
    Remote(String),

    /// A guest mutation answered `success: false` without an error message.
    #[error("calendar rejected the mutation")]
    Rejected,

    /// The response body did not match the expected shape.
    #[error("malformed calendar response: {0}")]
    Decode(String),
}

/// Result of a tour existence check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourCheck {
    /// Whether a bookable tour exists at the queried date and slot.
    pub exists: bool,
    /// Registry event id, present when the tour exists.
    pub event_id: Option<String>,
    /// Human-readable tour summary, when provided.
    pub summary: Option<String>,
}

/// Detail view of one registry event.
///
/// The description is free text; a guest roster is encoded inside it as
/// delimiter-separated blocks parsed by a separate, non-core component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub start: DateTime<Utc>,
    pub description: String,
    pub link: String,
}

/// Client capability for the external tour registry.
#[async_trait]
pub trait TourCalendar: Send + Sync {
    /// Checks whether a bookable tour exists at `(date, slot)`.
    async fn validate_tour(&self, date: ShiftDate, slot: Slot) -> Result<TourCheck, CalendarError>;

    /// Adds a guide as an invitee on an event. Harmlessly repeatable.
    async fn add_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError>;

    /// Removes a guide from an event's guest list.
    async fn remove_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError>;

    /// Fetches the detail view of an event.
    async fn event_details(&self, event_id: &str) -> Result<EventDetails, CalendarError>;
}
