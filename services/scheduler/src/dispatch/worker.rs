//! Background dispatch worker.
//!
//! The worker continuously drains the shift change feed:
//! 1. Load the durable checkpoint
//! 2. Fetch the next batch of changes after it
//! 3. Dispatch each change, advancing the checkpoint as it goes
//! 4. Sleep when the feed is empty, then repeat
//!
//! Changes appended while a handler runs (compensating reverts included)
//! simply land later in the feed and are picked up in order. Restarts
//! resume from the persisted checkpoint, which is what keeps dispatch
//! exactly-once per partition even though the underlying writes are
//! delivered at least once.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::store::{ChangeLog, StoreResult, Stores};

use super::Dispatcher;

/// Configuration for the dispatch worker.
#[derive(Debug, Clone)]
pub struct DispatchWorkerConfig {
    /// Maximum number of changes to fetch per batch.
    pub batch_size: i64,

    /// How long to sleep when the feed is empty.
    pub poll_interval: Duration,
}

impl Default for DispatchWorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Background worker that drains the change feed through the dispatcher.
pub struct DispatchWorker {
    stores: Stores,
    dispatcher: Dispatcher,
    config: DispatchWorkerConfig,
}

impl DispatchWorker {
    pub fn new(stores: Stores, dispatcher: Dispatcher, config: DispatchWorkerConfig) -> Self {
        Self {
            stores,
            dispatcher,
            config,
        }
    }

    /// Run the worker until the shutdown signal is received.
    #[instrument(skip(self, shutdown), name = "dispatch_worker")]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> StoreResult<()> {
        let mut cursor = self.stores.changes.checkpoint().await?;
        info!(cursor = %cursor, "Starting dispatch worker");

        let mut dispatched: u64 = 0;

        loop {
            if *shutdown.borrow() {
                info!(dispatched, "Shutdown signal received, stopping dispatch worker");
                break;
            }

            let batch = self
                .stores
                .changes
                .query_after(cursor, self.config.batch_size)
                .await?;

            if batch.is_empty() {
                tokio::select! {
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!(dispatched, "Shutdown signal received during poll wait");
                            break;
                        }
                    }
                    _ = sleep(self.config.poll_interval) => {}
                }
                continue;
            }

            debug!(count = batch.len(), "Processing change batch");

            for change in batch {
                self.dispatcher.dispatch(&change).await;
                self.stores.changes.advance(change.change_id).await?;
                cursor = change.change_id;
                dispatched += 1;
            }
        }

        Ok(())
    }

    /// Drain everything currently on the feed, including changes appended
    /// by the handlers themselves, then return. Test and dev-tool entry
    /// point; production uses [`run`](Self::run).
    pub async fn drain(&self) -> StoreResult<u64> {
        let mut cursor = self.stores.changes.checkpoint().await?;
        let mut dispatched = 0;

        loop {
            let batch = self
                .stores
                .changes
                .query_after(cursor, self.config.batch_size)
                .await?;
            if batch.is_empty() {
                return Ok(dispatched);
            }
            for change in batch {
                self.dispatcher.dispatch(&change).await;
                self.stores.changes.advance(change.change_id).await?;
                cursor = change.change_id;
                dispatched += 1;
            }
        }
    }
}
