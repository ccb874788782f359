#![allow(dead_code)] // Each test binary uses a different subset of the fixtures.

//! Shared fixtures for the scheduler integration tests.
//!
//! Everything runs on in-memory stores, a scriptable registry client, a
//! recording mailer, and a manual clock, so the suites are deterministic
//! and need no external services.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use tourdesk_calendar::{CalendarError, EventDetails, TourCalendar, TourCheck};
use tourdesk_scheduler::{
    availability::{AlertDispatcher, AlertMailer, AvailabilityAggregator, MailerError},
    clock::{Clock, ManualClock},
    config::Config,
    dispatch::{
        AssignmentHandler, DispatchWorker, DispatchWorkerConfig, Dispatcher, ReleaseHandler,
    },
    state::AppState,
    store::{memory::MemoryStore, GuideStore, ShiftStore, Stores},
};
use tourdesk_types::{Guide, GuideId, GuideStatus, Shift, ShiftDate, Slot};

pub const OPERATOR_EMAIL: &str = "operator@example.com";

/// Scriptable registry client. Each call pops the front of its queue; an
/// empty queue falls back to "tour exists with an event id".
pub struct FakeCalendar {
    validations: Mutex<Vec<Result<TourCheck, CalendarError>>>,
    add_results: Mutex<Vec<Result<(), CalendarError>>>,
    pub added: Mutex<Vec<(String, String)>>,
    pub removed: Mutex<Vec<(String, String)>>,
}

impl FakeCalendar {
    pub fn new() -> Self {
        Self {
            validations: Mutex::new(Vec::new()),
            add_results: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn push_validation(&self, result: Result<TourCheck, CalendarError>) {
        self.validations.lock().unwrap().push(result);
    }

    pub fn push_add_result(&self, result: Result<(), CalendarError>) {
        self.add_results.lock().unwrap().push(result);
    }

    pub fn tour_exists(event_id: &str) -> TourCheck {
        TourCheck {
            exists: true,
            event_id: Some(event_id.to_string()),
            summary: Some("City walking tour".to_string()),
        }
    }

    pub fn no_tour() -> TourCheck {
        TourCheck {
            exists: false,
            event_id: None,
            summary: None,
        }
    }
}

#[async_trait]
impl TourCalendar for FakeCalendar {
    async fn validate_tour(&self, _date: ShiftDate, _slot: Slot) -> Result<TourCheck, CalendarError> {
        let mut queue = self.validations.lock().unwrap();
        if queue.is_empty() {
            return Ok(Self::tour_exists("evt-default"));
        }
        queue.remove(0)
    }

    async fn add_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError> {
        let mut queue = self.add_results.lock().unwrap();
        let result = if queue.is_empty() {
            Ok(())
        } else {
            queue.remove(0)
        };
        if result.is_ok() {
            self.added
                .lock()
                .unwrap()
                .push((event_id.to_string(), guide_email.to_string()));
        }
        result
    }

    async fn remove_guide(&self, event_id: &str, guide_email: &str) -> Result<(), CalendarError> {
        self.removed
            .lock()
            .unwrap()
            .push((event_id.to_string(), guide_email.to_string()));
        Ok(())
    }

    async fn event_details(&self, _event_id: &str) -> Result<EventDetails, CalendarError> {
        Ok(EventDetails {
            start: Utc::now(),
            description: String::new(),
            link: String::new(),
        })
    }
}

/// Records sent mail; can be told to fail every send.
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent_subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, subject)| subject.clone())
            .collect()
    }
}

#[async_trait]
impl AlertMailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailerError> {
        if *self.fail.lock().unwrap() {
            return Err(MailerError::Status(502));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string()));
        Ok(())
    }
}

/// Everything a scenario needs, wired over one in-memory store.
pub struct Harness {
    pub stores: Stores,
    pub state: AppState,
    pub worker: DispatchWorker,
    pub calendar: Arc<FakeCalendar>,
    pub mailer: Arc<RecordingMailer>,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    harness_with_window(chrono::Duration::hours(24))
}

pub fn harness_with_window(window: chrono::Duration) -> Harness {
    let stores = MemoryStore::new().stores();
    let calendar = Arc::new(FakeCalendar::new());
    let mailer = Arc::new(RecordingMailer::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap(),
    ));

    let dispatcher = Dispatcher::new(
        AssignmentHandler::new(
            stores.shifts.clone(),
            stores.guides.clone(),
            stores.notifications.clone(),
            calendar.clone(),
            clock.clone(),
        ),
        ReleaseHandler::new(
            stores.guides.clone(),
            stores.notifications.clone(),
            clock.clone(),
        ),
        AvailabilityAggregator::new(
            stores.guides.clone(),
            stores.availability.clone(),
            stores.alerts.clone(),
            AlertDispatcher::new(
                mailer.clone(),
                stores.alerts.clone(),
                clock.clone(),
                OPERATOR_EMAIL,
            ),
            clock.clone(),
            window,
        ),
    );

    let worker = DispatchWorker::new(
        stores.clone(),
        dispatcher,
        DispatchWorkerConfig::default(),
    );

    let config = Config::from_env().expect("test config");
    let state = AppState::new(
        stores.clone(),
        calendar.clone(),
        clock.clone(),
        config,
    );

    Harness {
        stores,
        state,
        worker,
        calendar,
        mailer,
        clock,
    }
}

pub fn shift_date(s: &str) -> ShiftDate {
    ShiftDate::parse(s).expect("valid date")
}

pub async fn seed_day(harness: &Harness, date: ShiftDate) {
    let now = harness.clock.now();
    let shifts = Slot::ALL
        .into_iter()
        .map(|slot| Shift::free(date, slot, now))
        .collect();
    harness.stores.shifts.seed(shifts).await.expect("seed");
}

pub async fn roster_guide(harness: &Harness, email: &str) -> GuideId {
    let id = GuideId::new();
    harness
        .stores
        .guides
        .upsert(Guide {
            id,
            email: email.to_string(),
            name: email.split('@').next().unwrap_or("guide").to_string(),
            status: GuideStatus::Active,
        })
        .await
        .expect("upsert guide");
    id
}
