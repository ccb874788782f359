//! Application state shared across request handlers.

use std::sync::Arc;

use tourdesk_calendar::TourCalendar;

use crate::clock::Clock;
use crate::config::Config;
use crate::store::Stores;

/// Shared application state, passed to handlers via axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    calendar: Arc<dyn TourCalendar>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl AppState {
    pub fn new(
        stores: Stores,
        calendar: Arc<dyn TourCalendar>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                stores,
                calendar,
                clock,
                config,
            }),
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    pub fn calendar(&self) -> &Arc<dyn TourCalendar> {
        &self.inner.calendar
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
