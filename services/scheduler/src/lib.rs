//! tourdesk scheduler service.
//!
//! The scheduler owns the shift assignment state machine and the
//! availability alerting subsystem:
//!
//! - Operator and guide actions write shift / availability state through
//!   conditional store writes; every committed state change lands on a
//!   durable change feed.
//! - A background dispatch worker consumes the feed behind a persisted
//!   checkpoint and routes each change to the assignment handler, the
//!   release handler, or the availability aggregator.
//! - The assignment handler reconciles against the external tour registry
//!   and compensates by reverting the shift when reconciliation fails.

pub mod actions;
pub mod api;
pub mod availability;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod state;
pub mod store;
