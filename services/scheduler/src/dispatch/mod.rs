//! Change dispatch.
//!
//! The dispatcher inspects each committed change's `(before, after)` state
//! pair and routes it:
//!
//! - `Free -> Assigned` to the assignment handler
//! - `Assigned -> Free` to the release handler
//! - `Free <-> Unavailable` to the availability aggregator
//!
//! Every other pair is logged and skipped. Handler failures never stall the
//! feed: each handler owns its own compensation (or deliberate lack of it),
//! and the worker advances the checkpoint either way.

mod assignment;
mod release;
pub mod worker;

pub use assignment::AssignmentHandler;
pub use release::ReleaseHandler;
pub use worker::{DispatchWorker, DispatchWorkerConfig};

use thiserror::Error;
use tracing::debug;

use tourdesk_types::{ShiftChange, ShiftTrigger};

use crate::availability::AvailabilityAggregator;
use crate::store::StoreError;
use tourdesk_calendar::CalendarError;

/// Errors inside a single handler invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Routes one change to the component that reacts to it.
pub struct Dispatcher {
    assignment: AssignmentHandler,
    release: ReleaseHandler,
    availability: AvailabilityAggregator,
}

impl Dispatcher {
    pub fn new(
        assignment: AssignmentHandler,
        release: ReleaseHandler,
        availability: AvailabilityAggregator,
    ) -> Self {
        Self {
            assignment,
            release,
            availability,
        }
    }

    /// Dispatch a single committed change.
    ///
    /// Always returns: anything that goes wrong inside a handler is the
    /// handler's business to log or compensate for.
    pub async fn dispatch(&self, change: &ShiftChange) {
        match change.trigger() {
            Some(ShiftTrigger::Assigned) => self.assignment.handle(change).await,
            Some(ShiftTrigger::Released) => self.release.handle(change).await,
            Some(ShiftTrigger::AvailabilityChanged) => self.availability.handle(change).await,
            None => {
                debug!(
                    change_id = %change.change_id,
                    prev_state = %change.prev_state,
                    new_state = %change.new_state,
                    "Ignoring transition the core does not act on"
                );
            }
        }
    }
}
