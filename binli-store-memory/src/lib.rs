//! In-memory bin store with a broadcast change feed.
//!
//! Records live in a map keyed by [`BinType`], so an upsert always replaces.
//! Every successful write is announced on a `tokio::sync::broadcast` channel.

use std::collections::BTreeMap;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use binli_core::{
    model::{BinChange, BinRecord, BinType},
    ports::{BinSource, BinStore, ChangeFeed, ChangeStream, PortError},
};

/// Number of notifications buffered per subscriber before it is told to resync.
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Keyed in-memory store that also acts as its own change feed.
pub struct MemoryBinStore {
    records: RwLock<BTreeMap<BinType, BinRecord>>,
    changes: broadcast::Sender<BinChange>,
}

impl MemoryBinStore {
    /// Create an empty store whose feed buffers `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            records: RwLock::new(BTreeMap::new()),
            changes,
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn publish(&self, change: BinChange) {
        if self.changes.send(change).is_err() {
            debug!(?change, "no subscribers for bin change");
        }
    }
}

impl Default for MemoryBinStore {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

#[async_trait]
impl BinSource for MemoryBinStore {
    async fn fetch_all(&self) -> Result<Vec<BinRecord>, PortError> {
        Ok(self.records.read().values().cloned().collect())
    }
}

#[async_trait]
impl BinStore for MemoryBinStore {
    async fn upsert(&self, record: BinRecord) -> Result<BinRecord, PortError> {
        let bin_type = record.bin_type;
        self.records.write().insert(bin_type, record.clone());

        self.publish(BinChange::Upserted { bin_type });
        Ok(record)
    }
}

#[async_trait]
impl ChangeFeed for MemoryBinStore {
    async fn subscribe(&self) -> Result<ChangeStream, PortError> {
        let mut receiver = self.changes.subscribe();

        Ok(Box::pin(stream! {
            loop {
                match receiver.recv().await {
                    Ok(change) => {
                        yield Ok(change);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "bin change subscriber lagged");
                        yield Ok(BinChange::Resync);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }))
    }
}
