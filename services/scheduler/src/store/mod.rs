//! Persistence capabilities.
//!
//! Every store is a trait so the dispatch pipeline can run against Postgres
//! in production and in-memory implementations in dev mode and tests. The
//! consistency rules live in the trait contracts:
//!
//! - [`ShiftStore::try_assign`] and [`ShiftStore::release`] are atomic
//!   conditional writes. There is no scan-then-write window in which two
//!   concurrent claims can both succeed.
//! - Every state-changing write appends a [`ShiftChange`] to the change
//!   feed atomically with the write itself. A write that does not change
//!   state appends nothing.
//! - The dispatcher checkpoint is durable; combined with the feed it gives
//!   exactly-once dispatch per shift partition.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use tourdesk_types::{
    AvailabilityAlert, AvailabilityRecord, ChangeId, Guide, GuideId, Notification, Shift,
    ShiftChange, ShiftDate, ShiftState, Slot, SlotGroup,
};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No shift record exists for the key. Shifts are pre-seeded; a missing
    /// record means the slot was never generated.
    #[error("shift not found: {date} {slot}")]
    ShiftNotFound { date: ShiftDate, slot: Slot },

    /// A conditional write found the shift in a different state.
    #[error("shift {date} {slot} is {actual}, expected {expected}")]
    StateConflict {
        date: ShiftDate,
        slot: Slot,
        actual: ShiftState,
        expected: ShiftState,
    },

    /// A stored value failed to parse back into its domain type.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Pool-wide shift records, keyed by `(date, slot)`.
#[async_trait]
pub trait ShiftStore: Send + Sync {
    async fn get(&self, date: ShiftDate, slot: Slot) -> StoreResult<Shift>;

    async fn list_for_date(&self, date: ShiftDate) -> StoreResult<Vec<Shift>>;

    /// Inserts the given shifts, skipping keys that already exist.
    /// Returns the number inserted. Seeding creates `free` records and
    /// appends no changes.
    async fn seed(&self, shifts: Vec<Shift>) -> StoreResult<u64>;

    /// Atomically claims a `free` shift for a guide.
    ///
    /// Fails with [`StoreError::StateConflict`] if the shift is not `free`
    /// at commit time. On success the `Free -> Assigned` change is on the
    /// feed.
    async fn try_assign(&self, date: ShiftDate, slot: Slot, guide: GuideId) -> StoreResult<Shift>;

    /// Atomically releases an `assigned` shift, returning the guide that
    /// held it. On success the `Assigned -> Free` change is on the feed.
    async fn release(&self, date: ShiftDate, slot: Slot) -> StoreResult<GuideId>;

    /// Compensating write: forces the shift to `free` with no guide,
    /// whatever its current state. A no-op (already free) appends nothing.
    async fn force_free(&self, date: ShiftDate, slot: Slot) -> StoreResult<()>;
}

/// Guide-scoped availability records, keyed by `(guide, date, slot)`.
///
/// A missing record counts as `free`.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Writes the record, appending a change only when the state actually
    /// changed. Returns the appended change, if any.
    async fn set(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
        state: ShiftState,
    ) -> StoreResult<Option<ShiftChange>>;

    async fn get(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
    ) -> StoreResult<Option<AvailabilityRecord>>;

    /// True when every slot of the group is `unavailable` for the guide.
    async fn is_group_blocked(
        &self,
        guide: GuideId,
        date: ShiftDate,
        group: SlotGroup,
    ) -> StoreResult<bool>;
}

/// Read/write access to the externally-owned guide roster.
#[async_trait]
pub trait GuideStore: Send + Sync {
    async fn get(&self, id: GuideId) -> StoreResult<Option<Guide>>;

    async fn list_active(&self) -> StoreResult<Vec<Guide>>;

    async fn upsert(&self, guide: Guide) -> StoreResult<()>;
}

/// Append-only notification outbox.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, notification: Notification) -> StoreResult<()>;

    async fn list_for_guide(&self, guide: GuideId) -> StoreResult<Vec<Notification>>;
}

/// Append-only alert audit trail, read back only for deduplication.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, alert: AvailabilityAlert) -> StoreResult<()>;

    /// The newest alert of either kind for `(date, group)` created at or
    /// after `since`.
    async fn latest_for(
        &self,
        date: ShiftDate,
        group: SlotGroup,
        since: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<Option<AvailabilityAlert>>;
}

/// The durable change feed plus the dispatcher's checkpoint.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Changes strictly after `cursor`, oldest first, at most `limit`.
    async fn query_after(&self, cursor: ChangeId, limit: i64) -> StoreResult<Vec<ShiftChange>>;

    async fn checkpoint(&self) -> StoreResult<ChangeId>;

    /// Advances the checkpoint; never moves it backwards.
    async fn advance(&self, to: ChangeId) -> StoreResult<()>;
}

/// Handle bundle passed around the service.
#[derive(Clone)]
pub struct Stores {
    pub shifts: Arc<dyn ShiftStore>,
    pub availability: Arc<dyn AvailabilityStore>,
    pub guides: Arc<dyn GuideStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub alerts: Arc<dyn AlertStore>,
    pub changes: Arc<dyn ChangeLog>,
}
