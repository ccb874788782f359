use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;

use crate::store::postgres::DbConfig;

/// Service configuration, loaded from the environment.
///
/// The alert recipient and dedup window live here rather than being read
/// ambiently: the aggregator takes them by constructor so its behavior is
/// deterministic under test.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    /// In dev mode the service runs on in-memory stores and skips Postgres.
    pub dev_mode: bool,
    pub database: DbConfig,

    /// Base URL of the external tour registry.
    pub calendar_url: String,
    pub calendar_api_key: String,
    /// Client-side timeout for registry calls.
    pub calendar_timeout: Duration,

    /// Single operator address availability alerts are sent to.
    pub alert_email: String,
    /// Optional mail relay endpoint; alerts are logged when unset.
    pub alert_relay_url: Option<String>,
    /// Lookback window for the recovery-alert dedup check.
    pub alert_window: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("TOURDESK_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = std::env::var("TOURDESK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let dev_mode = std::env::var("TOURDESK_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let database = DbConfig::from_env();

        let calendar_url = std::env::var("TOURDESK_CALENDAR_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:9090/registry".to_string());
        let calendar_api_key = std::env::var("TOURDESK_CALENDAR_API_KEY").unwrap_or_default();
        let calendar_timeout_secs = std::env::var("TOURDESK_CALENDAR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let alert_email = std::env::var("TOURDESK_ALERT_EMAIL")
            .unwrap_or_else(|_| "operator@localhost".to_string());
        let alert_relay_url = std::env::var("TOURDESK_ALERT_RELAY_URL").ok();
        let alert_window_hours: i64 = std::env::var("TOURDESK_ALERT_WINDOW_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(24);

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            database,
            calendar_url,
            calendar_api_key,
            calendar_timeout: Duration::from_secs(calendar_timeout_secs),
            alert_email,
            alert_relay_url,
            alert_window: chrono::Duration::hours(alert_window_hours),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.alert_window, chrono::Duration::hours(24));
        assert_eq!(config.calendar_timeout, Duration::from_secs(5));
    }
}
