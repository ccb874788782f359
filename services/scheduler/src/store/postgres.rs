//! Postgres implementations of the store capabilities.
//!
//! Conditional writes take a row lock, check the precondition, and append
//! the change-feed row inside the same transaction. There is deliberately
//! no read-then-write gap visible outside a transaction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use tourdesk_types::{
    AlertKind, AvailabilityAlert, AvailabilityRecord, ChangeId, Guide, GuideId, GuideStatus,
    Notification, Shift, ShiftChange, ShiftDate, ShiftState, Slot, SlotGroup,
};

use super::{
    AlertStore, AvailabilityStore, ChangeLog, GuideStore, NotificationStore, ShiftStore,
    StoreError, StoreResult, Stores,
};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/tourdesk".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/tourdesk".to_string());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        Self {
            database_url,
            max_connections,
            ..Default::default()
        }
    }
}

/// Connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new connection pool.
    pub async fn connect(config: &DbConfig) -> StoreResult<Self> {
        info!(
            max_connections = config.max_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run pending migrations from the crate's `migrations/` directory.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        let candidates = [
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/scheduler/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];

        for dir in &candidates {
            if let Ok(migrator) = sqlx::migrate::Migrator::new(dir.clone()).await {
                info!(migrations_dir = %dir.display(), "Running database migrations");
                migrator
                    .run(&self.pool)
                    .await
                    .map_err(|e| StoreError::Corrupt(format!("migration failed: {e}")))?;
                return Ok(());
            }
        }

        Err(StoreError::Corrupt(
            "migration directory not found; run from repo root or services/scheduler".to_string(),
        ))
    }

    /// A [`Stores`] bundle backed by this pool.
    pub fn stores(&self) -> Stores {
        let store = PgStore {
            pool: self.pool.clone(),
        };
        Stores {
            shifts: Arc::new(store.clone()),
            availability: Arc::new(store.clone()),
            guides: Arc::new(store.clone()),
            notifications: Arc::new(store.clone()),
            alerts: Arc::new(store.clone()),
            changes: Arc::new(store),
        }
    }
}

/// All store traits over one Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn parse_state(s: &str) -> StoreResult<ShiftState> {
    ShiftState::parse(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_slot(s: &str) -> StoreResult<Slot> {
    Slot::parse(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_guide(s: &str) -> StoreResult<GuideId> {
    GuideId::parse(s).map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn parse_opt_guide(s: Option<String>) -> StoreResult<Option<GuideId>> {
    s.as_deref().map(parse_guide).transpose()
}

fn shift_from_row(row: &PgRow) -> StoreResult<Shift> {
    let date: NaiveDate = row.try_get("date")?;
    let slot: String = row.try_get("slot")?;
    let state: String = row.try_get("state")?;
    let guide_id: Option<String> = row.try_get("guide_id")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Shift {
        date: ShiftDate::new(date),
        slot: parse_slot(&slot)?,
        state: parse_state(&state)?,
        guide_id: parse_opt_guide(guide_id)?,
        updated_at,
    })
}

fn change_from_row(row: &PgRow) -> StoreResult<ShiftChange> {
    let change_id: i64 = row.try_get("change_id")?;
    let date: NaiveDate = row.try_get("date")?;
    let slot: String = row.try_get("slot")?;
    let guide_id: Option<String> = row.try_get("guide_id")?;
    let prev_guide: Option<String> = row.try_get("prev_guide")?;
    let prev_state: String = row.try_get("prev_state")?;
    let new_state: String = row.try_get("new_state")?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at")?;

    Ok(ShiftChange {
        change_id: ChangeId::new(change_id),
        date: ShiftDate::new(date),
        slot: parse_slot(&slot)?,
        guide_id: parse_opt_guide(guide_id)?,
        prev_guide: parse_opt_guide(prev_guide)?,
        prev_state: parse_state(&prev_state)?,
        new_state: parse_state(&new_state)?,
        recorded_at,
    })
}

async fn append_change_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    date: ShiftDate,
    slot: Slot,
    guide_id: Option<GuideId>,
    prev_guide: Option<GuideId>,
    prev_state: ShiftState,
    new_state: ShiftState,
) -> StoreResult<ShiftChange> {
    let row = sqlx::query(
        r#"
        INSERT INTO shift_changes (date, slot, guide_id, prev_guide, prev_state, new_state)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING change_id, recorded_at
        "#,
    )
    .bind(date.date())
    .bind(slot.as_str())
    .bind(guide_id.map(|g| g.to_string()))
    .bind(prev_guide.map(|g| g.to_string()))
    .bind(prev_state.as_str())
    .bind(new_state.as_str())
    .fetch_one(&mut **tx)
    .await?;

    Ok(ShiftChange {
        change_id: ChangeId::new(row.try_get("change_id")?),
        date,
        slot,
        guide_id,
        prev_guide,
        prev_state,
        new_state,
        recorded_at: row.try_get("recorded_at")?,
    })
}

async fn lock_shift_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    date: ShiftDate,
    slot: Slot,
) -> StoreResult<(ShiftState, Option<GuideId>)> {
    let row = sqlx::query("SELECT state, guide_id FROM shifts WHERE date = $1 AND slot = $2 FOR UPDATE")
        .bind(date.date())
        .bind(slot.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StoreError::ShiftNotFound { date, slot })?;

    let state: String = row.try_get("state")?;
    let guide_id: Option<String> = row.try_get("guide_id")?;
    Ok((parse_state(&state)?, parse_opt_guide(guide_id)?))
}

#[async_trait]
impl ShiftStore for PgStore {
    async fn get(&self, date: ShiftDate, slot: Slot) -> StoreResult<Shift> {
        let row = sqlx::query(
            "SELECT date, slot, state, guide_id, updated_at FROM shifts WHERE date = $1 AND slot = $2",
        )
        .bind(date.date())
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::ShiftNotFound { date, slot })?;

        shift_from_row(&row)
    }

    async fn list_for_date(&self, date: ShiftDate) -> StoreResult<Vec<Shift>> {
        let rows = sqlx::query(
            "SELECT date, slot, state, guide_id, updated_at FROM shifts WHERE date = $1 ORDER BY slot",
        )
        .bind(date.date())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(shift_from_row).collect()
    }

    async fn seed(&self, shifts: Vec<Shift>) -> StoreResult<u64> {
        let mut inserted = 0;
        let mut tx = self.pool.begin().await?;
        for shift in shifts {
            let result = sqlx::query(
                r#"
                INSERT INTO shifts (date, slot, state, guide_id, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (date, slot) DO NOTHING
                "#,
            )
            .bind(shift.date.date())
            .bind(shift.slot.as_str())
            .bind(shift.state.as_str())
            .bind(shift.guide_id.map(|g| g.to_string()))
            .bind(shift.updated_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn try_assign(&self, date: ShiftDate, slot: Slot, guide: GuideId) -> StoreResult<Shift> {
        let mut tx = self.pool.begin().await?;

        let (state, _) = lock_shift_tx(&mut tx, date, slot).await?;
        if state != ShiftState::Free {
            return Err(StoreError::StateConflict {
                date,
                slot,
                actual: state,
                expected: ShiftState::Free,
            });
        }

        let row = sqlx::query(
            r#"
            UPDATE shifts SET state = 'assigned', guide_id = $3, updated_at = now()
            WHERE date = $1 AND slot = $2
            RETURNING updated_at
            "#,
        )
        .bind(date.date())
        .bind(slot.as_str())
        .bind(guide.to_string())
        .fetch_one(&mut *tx)
        .await?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        append_change_tx(
            &mut tx,
            date,
            slot,
            Some(guide),
            None,
            ShiftState::Free,
            ShiftState::Assigned,
        )
        .await?;
        tx.commit().await?;

        Ok(Shift {
            date,
            slot,
            state: ShiftState::Assigned,
            guide_id: Some(guide),
            updated_at,
        })
    }

    async fn release(&self, date: ShiftDate, slot: Slot) -> StoreResult<GuideId> {
        let mut tx = self.pool.begin().await?;

        let (state, guide_id) = lock_shift_tx(&mut tx, date, slot).await?;
        let Some(prev_guide) = guide_id.filter(|_| state == ShiftState::Assigned) else {
            return Err(StoreError::StateConflict {
                date,
                slot,
                actual: state,
                expected: ShiftState::Assigned,
            });
        };

        sqlx::query(
            r#"
            UPDATE shifts SET state = 'free', guide_id = NULL, updated_at = now()
            WHERE date = $1 AND slot = $2
            "#,
        )
        .bind(date.date())
        .bind(slot.as_str())
        .execute(&mut *tx)
        .await?;

        append_change_tx(
            &mut tx,
            date,
            slot,
            None,
            Some(prev_guide),
            ShiftState::Assigned,
            ShiftState::Free,
        )
        .await?;
        tx.commit().await?;

        Ok(prev_guide)
    }

    async fn force_free(&self, date: ShiftDate, slot: Slot) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let (state, guide_id) = lock_shift_tx(&mut tx, date, slot).await?;
        if state == ShiftState::Free && guide_id.is_none() {
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE shifts SET state = 'free', guide_id = NULL, updated_at = now()
            WHERE date = $1 AND slot = $2
            "#,
        )
        .bind(date.date())
        .bind(slot.as_str())
        .execute(&mut *tx)
        .await?;

        append_change_tx(&mut tx, date, slot, None, guide_id, state, ShiftState::Free).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn set(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
        state: ShiftState,
    ) -> StoreResult<Option<ShiftChange>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT state FROM availability
            WHERE guide_id = $1 AND date = $2 AND slot = $3
            FOR UPDATE
            "#,
        )
        .bind(guide.to_string())
        .bind(date.date())
        .bind(slot.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let prev_state = match row {
            Some(row) => {
                let s: String = row.try_get("state")?;
                parse_state(&s)?
            }
            None => ShiftState::Free,
        };

        if prev_state == state {
            return Ok(None);
        }

        sqlx::query(
            r#"
            INSERT INTO availability (guide_id, date, slot, state, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (guide_id, date, slot)
            DO UPDATE SET state = EXCLUDED.state, updated_at = now()
            "#,
        )
        .bind(guide.to_string())
        .bind(date.date())
        .bind(slot.as_str())
        .bind(state.as_str())
        .execute(&mut *tx)
        .await?;

        let change =
            append_change_tx(&mut tx, date, slot, Some(guide), None, prev_state, state).await?;
        tx.commit().await?;
        Ok(Some(change))
    }

    async fn get(
        &self,
        guide: GuideId,
        date: ShiftDate,
        slot: Slot,
    ) -> StoreResult<Option<AvailabilityRecord>> {
        let row = sqlx::query(
            r#"
            SELECT state, updated_at FROM availability
            WHERE guide_id = $1 AND date = $2 AND slot = $3
            "#,
        )
        .bind(guide.to_string())
        .bind(date.date())
        .bind(slot.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let state: String = row.try_get("state")?;
        Ok(Some(AvailabilityRecord {
            guide_id: guide,
            date,
            slot,
            state: parse_state(&state)?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn is_group_blocked(
        &self,
        guide: GuideId,
        date: ShiftDate,
        group: SlotGroup,
    ) -> StoreResult<bool> {
        let slots: Vec<String> = group.slots().iter().map(|s| s.as_str().to_string()).collect();
        let row = sqlx::query(
            r#"
            SELECT count(*) AS blocked FROM availability
            WHERE guide_id = $1 AND date = $2 AND slot = ANY($3) AND state = 'unavailable'
            "#,
        )
        .bind(guide.to_string())
        .bind(date.date())
        .bind(&slots)
        .fetch_one(&self.pool)
        .await?;

        let blocked: i64 = row.try_get("blocked")?;
        Ok(blocked as usize == group.slots().len())
    }
}

#[async_trait]
impl GuideStore for PgStore {
    async fn get(&self, id: GuideId) -> StoreResult<Option<Guide>> {
        let row = sqlx::query("SELECT email, name, status FROM guides WHERE id = $1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.try_get("status")?;
        Ok(Some(Guide {
            id,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            status: GuideStatus::parse(&status).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        }))
    }

    async fn list_active(&self) -> StoreResult<Vec<Guide>> {
        let rows = sqlx::query("SELECT id, email, name, status FROM guides WHERE status = 'active'")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let id: String = row.try_get("id")?;
                Ok(Guide {
                    id: parse_guide(&id)?,
                    email: row.try_get("email")?,
                    name: row.try_get("name")?,
                    status: GuideStatus::Active,
                })
            })
            .collect()
    }

    async fn upsert(&self, guide: Guide) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO guides (id, email, name, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id)
            DO UPDATE SET email = EXCLUDED.email, name = EXCLUDED.name, status = EXCLUDED.status
            "#,
        )
        .bind(guide.id.to_string())
        .bind(&guide.email)
        .bind(&guide.name)
        .bind(guide.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn append(&self, notification: Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (guide_id, kind, target_email, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(notification.guide_id.to_string())
        .bind(notification.kind.as_str())
        .bind(&notification.target_email)
        .bind(notification.status.as_str())
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_guide(&self, guide: GuideId) -> StoreResult<Vec<Notification>> {
        let rows = sqlx::query(
            r#"
            SELECT kind, target_email, status, created_at FROM notifications
            WHERE guide_id = $1 ORDER BY created_at
            "#,
        )
        .bind(guide.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let kind: String = row.try_get("kind")?;
                let status: String = row.try_get("status")?;
                Ok(Notification {
                    guide_id: guide,
                    kind: tourdesk_types::NotificationKind::parse(&kind)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    target_email: row.try_get("target_email")?,
                    status: tourdesk_types::NotificationStatus::parse(&status)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AlertStore for PgStore {
    async fn append(&self, alert: AvailabilityAlert) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO availability_alerts (date, slot_group, kind, sent_to, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(alert.date.date())
        .bind(alert.slot_group.as_str())
        .bind(alert.kind.as_str())
        .bind(&alert.sent_to)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_for(
        &self,
        date: ShiftDate,
        group: SlotGroup,
        since: DateTime<Utc>,
    ) -> StoreResult<Option<AvailabilityAlert>> {
        let row = sqlx::query(
            r#"
            SELECT kind, sent_to, created_at FROM availability_alerts
            WHERE date = $1 AND slot_group = $2 AND created_at >= $3
            ORDER BY created_at DESC LIMIT 1
            "#,
        )
        .bind(date.date())
        .bind(group.as_str())
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let kind: String = row.try_get("kind")?;
        Ok(Some(AvailabilityAlert {
            date,
            slot_group: group,
            kind: AlertKind::parse(&kind).map_err(|e| StoreError::Corrupt(e.to_string()))?,
            sent_to: row.try_get("sent_to")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

#[async_trait]
impl ChangeLog for PgStore {
    async fn query_after(&self, cursor: ChangeId, limit: i64) -> StoreResult<Vec<ShiftChange>> {
        let rows = sqlx::query(
            r#"
            SELECT change_id, date, slot, guide_id, prev_guide, prev_state, new_state, recorded_at
            FROM shift_changes
            WHERE change_id > $1
            ORDER BY change_id ASC
            LIMIT $2
            "#,
        )
        .bind(cursor.value())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(change_from_row).collect()
    }

    async fn checkpoint(&self) -> StoreResult<ChangeId> {
        let row =
            sqlx::query("SELECT last_change_id FROM dispatcher_checkpoint WHERE name = 'dispatch'")
                .fetch_optional(&self.pool)
                .await?;

        let cursor = match row {
            Some(row) => row.try_get("last_change_id")?,
            None => 0,
        };
        Ok(ChangeId::new(cursor))
    }

    async fn advance(&self, to: ChangeId) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO dispatcher_checkpoint (name, last_change_id)
            VALUES ('dispatch', $1)
            ON CONFLICT (name) DO UPDATE
            SET last_change_id = GREATEST(dispatcher_checkpoint.last_change_id, EXCLUDED.last_change_id),
                updated_at = now()
            "#,
        )
        .bind(to.value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
