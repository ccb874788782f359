//! In-memory store implementations.
//!
//! Used in dev mode and by the test suites. One [`MemoryStore`] implements
//! every store trait over a single mutex-guarded state, so a shift write
//! and its change-feed append are atomic exactly like the Postgres
//! transaction is.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tourdesk_types::{
    AvailabilityAlert, AvailabilityRecord, ChangeId, Guide, GuideId, GuideStatus, Notification,
    Shift, ShiftChange, ShiftDate, ShiftState, Slot, SlotGroup,
};

use super::{
    AlertStore, AvailabilityStore, ChangeLog, GuideStore, NotificationStore, ShiftStore,
    StoreError, StoreResult, Stores,
};

#[derive(Default)]
struct Inner {
    shifts: BTreeMap<(ShiftDate, Slot), Shift>,
    availability: BTreeMap<(GuideId, ShiftDate, Slot), AvailabilityRecord>,
    guides: BTreeMap<GuideId, Guide>,
    notifications: Vec<Notification>,
    alerts: Vec<AvailabilityAlert>,
    changes: Vec<ShiftChange>,
    checkpoint: i64,
}

impl Inner {
    fn append_change(
        &mut self,
        date: ShiftDate,
        slot: Slot,
        guide_id: Option<GuideId>,
        prev_guide: Option<GuideId>,
        prev_state: ShiftState,
        new_state: ShiftState,
    ) -> ShiftChange {
        let change = ShiftChange {
            change_id: ChangeId::new(self.changes.len() as i64 + 1),
            date,
            slot,
            guide_id,
            prev_guide,
            prev_state,
            new_state,
            recorded_at: Utc::now(),
        };
        self.changes.push(change.clone());
        change
    }
}

/// All store traits over one shared in-memory state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`Stores`] bundle where every handle points at this store.
    pub fn stores(&self) -> Stores {
        Stores {
            shifts: Arc::new(self.clone()),
            availability: Arc::new(self.clone()),
            guides: Arc::new(self.clone()),
            notifications: Arc::new(self.clone()),
            alerts: Arc::new(self.clone()),
            changes: Arc::new(self.clone()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl ShiftStore for MemoryStore {
    async fn get(&self, date: ShiftDate, slot: Slot) -> StoreResult<Shift> {
        self.lock()
            .shifts
            .get(&(date, slot))
            .cloned()
            .ok_or(StoreError::ShiftNotFound { date, slot })
    }

    async fn list_for_date(&self, date: ShiftDate) -> StoreResult<Vec<Shift>> {
        let inner = self.lock();
        Ok(inner
            .shifts
            .values()
            .filter(|s| s.date == date)
            .cloned()
            .collect())
    }

    async fn seed(&self, shifts: Vec<Shift>) -> StoreResult<u64> {
        let mut inner = self.lock();
        let mut inserted = 0;
        for shift in shifts {
            let key = (shift.date, shift.slot);
            if !inner.shifts.contains_key(&key) {
                inner.shifts.insert(key, shift);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn try_assign(&self, date: ShiftDate, slot: Slot, guide: GuideId) -> StoreResult<Shift> {
        let mut inner = self.lock();
        let current = inner
            .shifts
            .get(&(date, slot))
            .cloned()
            .ok_or(StoreError::ShiftNotFound { date, slot })?;

        if current.state != ShiftState::Free {
            return Err(StoreError::StateConflict {
                date,
                slot,
                actual: current.state,
                expected: ShiftState::Free,
            });
        }

        let updated = Shift {
            state: ShiftState::Assigned,
            guide_id: Some(guide),
            updated_at: Utc::now(),
            ..current
        };
        inner.shifts.insert((date, slot), updated.clone());
        inner.append_change(
            date,
            slot,
            Some(guide),
            None,
            ShiftState::Free,
            ShiftState::Assigned,
        );
        Ok(updated)
    }

    async fn release(&self, date: ShiftDate, slot: Slot) -> StoreResult<GuideId> {
        let mut inner = self.lock();
        let current = inner
            .shifts
            .get(&(date, slot))
            .cloned()
            .ok_or(StoreError::ShiftNotFound { date, slot })?;

        let Some(prev_guide) = current.guide_id.filter(|_| current.state == ShiftState::Assigned)
        else {
            return Err(StoreError::StateConflict {
                date,
                slot,
                actual: current.state,
                expected: ShiftState::Assigned,
            });
        };

        let updated = Shift {
            state: ShiftState::Free,
            guide_id: None,
            updated_at: Utc::now(),
            ..current
        };
        inner.shifts.insert((date, slot), updated);
        inner.append_change(
            date,
            slot,
            None,
            Some(prev_guide),
            ShiftState::Assigned,
            ShiftState::Free,
        );
        Ok(prev_guide)
    }

    async fn force_free(&self, date: ShiftDate, slot: Slot) -> StoreResult<()> {
        let mut inner = self.lock();
        let current = inner
            .shifts
            .get(&(date, slot))
            .cloned()
            .ok_or(StoreError::ShiftNotFound { date, slot })?;

        if current.state == ShiftState::Free && current.guide_id.is_none() {
            return Ok(());
        }

        let prev_state = current.state;
        let prev_guide = current.guide_id;
        let updated = Shift {
            state: ShiftState::Free,
            guide_id: None,
            updated_at: Utc::now(),
            ..current
        };
        inner.shifts.insert((date, slot), updated);
        inner.append_change(date, slot, None, prev_guide, prev_state, ShiftState::Free);
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for MemoryStore {
    async fn set(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
        state: ShiftState,
    ) -> StoreResult<Option<ShiftChange>> {
        let mut inner = self.lock();
        let prev_state = inner
            .availability
            .get(&(guide, date, slot))
            .map(|r| r.state)
            .unwrap_or(ShiftState::Free);

        if prev_state == state {
            return Ok(None);
        }

        inner.availability.insert(
            (guide, date, slot),
            AvailabilityRecord {
                guide_id: guide,
                date,
                slot,
                state,
                updated_at: Utc::now(),
            },
        );
        let change = inner.append_change(date, slot, Some(guide), None, prev_state, state);
        Ok(Some(change))
    }

    async fn get(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
    ) -> StoreResult<Option<AvailabilityRecord>> {
        Ok(self.lock().availability.get(&(guide, date, slot)).cloned())
    }

    async fn is_group_blocked(
        &self,
        guide: GuideId,
        date: ShiftDate,
        group: SlotGroup,
    ) -> StoreResult<bool> {
        let inner = self.lock();
        Ok(group.slots().iter().all(|slot| {
            inner
                .availability
                .get(&(guide, date, *slot))
                .map(|r| r.state == ShiftState::Unavailable)
                .unwrap_or(false)
        }))
    }
}

#[async_trait]
impl GuideStore for MemoryStore {
    async fn get(&self, id: GuideId) -> StoreResult<Option<Guide>> {
        Ok(self.lock().guides.get(&id).cloned())
    }

    async fn list_active(&self) -> StoreResult<Vec<Guide>> {
        Ok(self
            .lock()
            .guides
            .values()
            .filter(|g| g.status == GuideStatus::Active)
            .cloned()
            .collect())
    }

    async fn upsert(&self, guide: Guide) -> StoreResult<()> {
        self.lock().guides.insert(guide.id, guide);
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn append(&self, notification: Notification) -> StoreResult<()> {
        self.lock().notifications.push(notification);
        Ok(())
    }

    async fn list_for_guide(&self, guide: GuideId) -> StoreResult<Vec<Notification>> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .filter(|n| n.guide_id == guide)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn append(&self, alert: AvailabilityAlert) -> StoreResult<()> {
        self.lock().alerts.push(alert);
        Ok(())
    }

    async fn latest_for(
        &self,
        date: ShiftDate,
        group: SlotGroup,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<AvailabilityAlert>> {
        Ok(self
            .lock()
            .alerts
            .iter()
            .filter(|a| a.date == date && a.slot_group == group && a.created_at >= since)
            .max_by_key(|a| a.created_at)
            .cloned())
    }
}

#[async_trait]
impl ChangeLog for MemoryStore {
    async fn query_after(&self, cursor: ChangeId, limit: i64) -> StoreResult<Vec<ShiftChange>> {
        Ok(self
            .lock()
            .changes
            .iter()
            .filter(|c| c.change_id > cursor)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn checkpoint(&self) -> StoreResult<ChangeId> {
        Ok(ChangeId::new(self.lock().checkpoint))
    }

    async fn advance(&self, to: ChangeId) -> StoreResult<()> {
        let mut inner = self.lock();
        if to.value() > inner.checkpoint {
            inner.checkpoint = to.value();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> ShiftDate {
        ShiftDate::parse("2025-11-10").unwrap()
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed(vec![Shift::free(date(), Slot::Morning, Utc::now())])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn try_assign_claims_a_free_shift_and_appends_a_change() {
        let store = seeded().await;
        let guide = GuideId::new();

        let shift = store.try_assign(date(), Slot::Morning, guide).await.unwrap();
        assert_eq!(shift.state, ShiftState::Assigned);
        assert_eq!(shift.guide_id, Some(guide));

        let changes = store.query_after(ChangeId::new(0), 10).await.unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_state, ShiftState::Assigned);
    }

    #[tokio::test]
    async fn second_claim_on_the_same_slot_conflicts() {
        let store = seeded().await;
        store
            .try_assign(date(), Slot::Morning, GuideId::new())
            .await
            .unwrap();

        let err = store
            .try_assign(date(), Slot::Morning, GuideId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StateConflict { .. }));
    }

    #[tokio::test]
    async fn release_returns_the_prior_guide() {
        let store = seeded().await;
        let guide = GuideId::new();
        store.try_assign(date(), Slot::Morning, guide).await.unwrap();

        let prior = store.release(date(), Slot::Morning).await.unwrap();
        assert_eq!(prior, guide);

        let shift = ShiftStore::get(&store, date(), Slot::Morning).await.unwrap();
        assert_eq!(shift.state, ShiftState::Free);
        assert!(shift.guide_id.is_none());
    }

    #[tokio::test]
    async fn force_free_on_a_free_shift_appends_nothing() {
        let store = seeded().await;
        store.force_free(date(), Slot::Morning).await.unwrap();
        assert!(store
            .query_after(ChangeId::new(0), 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn availability_set_is_change_on_transition_only() {
        let store = MemoryStore::new();
        let guide = GuideId::new();

        let first = store
            .set(guide, date(), Slot::Morning, ShiftState::Unavailable)
            .await
            .unwrap();
        assert!(first.is_some());

        // Same state again: no change appended.
        let second = store
            .set(guide, date(), Slot::Morning, ShiftState::Unavailable)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn group_blocked_requires_every_slot_in_the_group() {
        let store = MemoryStore::new();
        let guide = GuideId::new();

        store
            .set(guide, date(), Slot::Afternoon1, ShiftState::Unavailable)
            .await
            .unwrap();
        store
            .set(guide, date(), Slot::Afternoon2, ShiftState::Unavailable)
            .await
            .unwrap();
        assert!(!store
            .is_group_blocked(guide, date(), SlotGroup::Afternoon)
            .await
            .unwrap());

        store
            .set(guide, date(), Slot::Afternoon3, ShiftState::Unavailable)
            .await
            .unwrap();
        assert!(store
            .is_group_blocked(guide, date(), SlotGroup::Afternoon)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn checkpoint_never_moves_backwards() {
        let store = MemoryStore::new();
        store.advance(ChangeId::new(5)).await.unwrap();
        store.advance(ChangeId::new(3)).await.unwrap();
        assert_eq!(store.checkpoint().await.unwrap(), ChangeId::new(5));
    }
}
