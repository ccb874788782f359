//! reqwest-backed implementation of the tour registry protocol.
//!
//! The registry exposes a single URL; every operation is a `GET` with query
//! parameters, selected by an `endpoint` parameter for the event-scoped
//! calls. Responses are small JSON objects that either carry the payload or
//! `{error: true, message}`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use tourdesk_types::{ShiftDate, Slot};

use crate::{CalendarError, EventDetails, TourCalendar, TourCheck};

/// HTTP client for the external tour registry.
#[derive(Debug, Clone)]
pub struct HttpTourCalendar {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTourCalendar {
    /// Creates a client with a short request timeout.
    ///
    /// The timeout is deliberately on the order of seconds: a slow registry
    /// is treated the same as an unreachable one, and the caller's
    /// compensation path applies.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn get_json<T>(&self, query: &[(&str, &str)]) -> Result<T, CalendarError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(&self.base_url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalendarError::Status(status.as_u16()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CalendarError::Decode(e.to_string()))
    }
}

/// Common error envelope the registry may return instead of a payload.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: bool,
    message: Option<String>,
}

impl ErrorEnvelope {
    fn check(&self) -> Result<(), CalendarError> {
        if self.error {
            let message = self
                .message
                .clone()
                .unwrap_or_else(|| "unspecified".to_string());
            return Err(CalendarError::Remote(message));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(flatten)]
    envelope: ErrorEnvelope,
    exists: Option<bool>,
    #[serde(rename = "eventId")]
    event_id: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MutateResponse {
    #[serde(flatten)]
    envelope: ErrorEnvelope,
    success: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(flatten)]
    envelope: ErrorEnvelope,
    start: Option<DateTime<Utc>>,
    description: Option<String>,
    link: Option<String>,
}

#[async_trait]
impl TourCalendar for HttpTourCalendar {
    async fn validate_tour(&self, date: ShiftDate, slot: Slot) -> Result<TourCheck, CalendarError> {
        let date_str = date.to_string();
        let response: ValidateResponse = self
            .get_json(&[("date", date_str.as_str()), ("slot", slot.as_str())])
            .await?;
        response.envelope.check()?;

        let exists = response
            .exists
            .ok_or_else(|| CalendarError::Decode("missing 'exists' field".to_string()))?;

        debug!(date = %date, slot = %slot, exists, "Validated tour");

        Ok(TourCheck {
            exists,
            event_id: response.event_id,
            summary: response.summary,
        })
    }

    async fn add_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError> {
        let response: MutateResponse = self
            .get_json(&[
                ("endpoint", "addGuideToEvent"),
                ("eventId", event_id),
                ("guideEmail", guide_email),
            ])
            .await?;
        response.envelope.check()?;

        if response.success != Some(true) {
            return Err(CalendarError::Rejected);
        }

        debug!(event_id, guide_email, "Added guide to event");
        Ok(())
    }

    async fn remove_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError> {
        let response: MutateResponse = self
            .get_json(&[
                ("endpoint", "removeGuideFromEvent"),
                ("eventId", event_id),
                ("guideEmail", guide_email),
            ])
            .await?;
        response.envelope.check()?;

        if response.success != Some(true) {
            return Err(CalendarError::Rejected);
        }

        debug!(event_id, guide_email, "Removed guide from event");
        Ok(())
    }

    async fn event_details(&self, event_id: &str) -> Result<EventDetails, CalendarError> {
        let response: DetailsResponse = self
            .get_json(&[("endpoint", "getEventDetails"), ("eventId", event_id)])
            .await?;
        response.envelope.check()?;

        let start = response
            .start
            .ok_or_else(|| CalendarError::Decode("missing 'start' field".to_string()))?;

        Ok(EventDetails {
            start,
            description: response.description.unwrap_or_default(),
            link: response.link.unwrap_or_default(),
        })
    }
}
