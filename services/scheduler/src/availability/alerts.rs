//! Operator alert delivery and audit trail.
//!
//! The mail transport is a capability: production posts to a relay
//! endpoint, dev mode logs, and tests record. The audit record is appended
//! only after a successful send: a failed send must not leave behind a
//! record that would suppress a later recovery alert nobody received.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use tourdesk_types::{AlertKind, AvailabilityAlert, ShiftDate, SlotGroup};

use crate::clock::Clock;
use crate::store::AlertStore;

/// Errors delivering an operator alert.
#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail relay transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail relay returned status {0}")]
    Status(u16),
}

/// Outbound mail capability.
#[async_trait]
pub trait AlertMailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError>;
}

/// Posts alert mail to a configured relay endpoint.
pub struct RelayMailer {
    client: reqwest::Client,
    relay_url: String,
}

impl RelayMailer {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: relay_url.into(),
        }
    }
}

#[async_trait]
impl AlertMailer for RelayMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.relay_url)
            .json(&serde_json::json!({
                "to": to,
                "subject": subject,
                "body": body,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Logs alerts instead of sending them. Dev-mode fallback when no relay is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl AlertMailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailerError> {
        info!(to, subject, "Operator alert (log-only mailer)");
        Ok(())
    }
}

/// Sends one operator alert and appends its audit record.
pub struct AlertDispatcher {
    mailer: Arc<dyn AlertMailer>,
    alerts: Arc<dyn AlertStore>,
    clock: Arc<dyn Clock>,
    recipient: String,
}

impl AlertDispatcher {
    pub fn new(
        mailer: Arc<dyn AlertMailer>,
        alerts: Arc<dyn AlertStore>,
        clock: Arc<dyn Clock>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            alerts,
            clock,
            recipient: recipient.into(),
        }
    }

    /// Compose, send, and (on success) audit one alert.
    ///
    /// Delivery failure is not compensated; it is logged and the audit
    /// record is withheld so the dedup lookup stays truthful.
    pub async fn send(&self, date: ShiftDate, group: SlotGroup, kind: AlertKind) {
        let (subject, body) = compose(date, group, kind);

        if let Err(err) = self.mailer.send(&self.recipient, &subject, &body).await {
            warn!(
                error = %err,
                date = %date,
                group = %group,
                kind = ?kind,
                "Operator alert send failed; audit record withheld"
            );
            return;
        }

        let alert = AvailabilityAlert {
            date,
            slot_group: group,
            kind,
            sent_to: self.recipient.clone(),
            created_at: self.clock.now(),
        };
        if let Err(err) = self.alerts.append(alert).await {
            warn!(error = %err, "Alert audit write failed");
        }

        info!(date = %date, group = %group, kind = ?kind, "Operator alert sent");
    }
}

fn compose(date: ShiftDate, group: SlotGroup, kind: AlertKind) -> (String, String) {
    match kind {
        AlertKind::Blocked => (
            format!("All guides blocked: {date} ({group})"),
            format!(
                "Every active guide has blocked availability for {date}, {group} slots. \
                 Tours in this window cannot be staffed."
            ),
        ),
        AlertKind::Available => (
            format!("Guide availability restored: {date} ({group})"),
            format!(
                "At least one guide is available again for {date}, {group} slots."
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_mentions_the_date_and_group() {
        let date = ShiftDate::parse("2025-12-01").unwrap();
        let (subject, body) = compose(date, SlotGroup::Morning, AlertKind::Blocked);
        assert!(subject.contains("2025-12-01"));
        assert!(body.contains("morning"));

        let (subject, _) = compose(date, SlotGroup::Afternoon, AlertKind::Available);
        assert!(subject.contains("restored"));
    }
}
