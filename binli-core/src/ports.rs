//! Traits describing the external collaborators and shared error type.

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Error as ReqwestError;

use crate::model::{BinChange, BinRecord};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to a store or change feed.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// A payload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The storage backend rejected or failed the operation.
    #[error("Storage error: {0}")]
    Storage(String),
    /// The change feed was closed by the publisher.
    #[error("Change feed closed")]
    FeedClosed,
    /// Internal collaborator error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stream of change notifications. Dropping it ends the subscription.
pub type ChangeStream = BoxStream<'static, Result<BinChange, PortError>>;

#[async_trait]
/// Read access to the current set of bin records.
pub trait BinSource: Send + Sync {
    /// Return every stored record ordered by bin type.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the backend cannot be read.
    async fn fetch_all(&self) -> Result<Vec<BinRecord>, PortError>;
}

#[async_trait]
/// Keyed store holding one record per bin type.
pub trait BinStore: BinSource {
    /// Insert or replace the record keyed by its bin type and return what was stored.
    ///
    /// Concurrent writes for the same key resolve as last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the write fails.
    async fn upsert(&self, record: BinRecord) -> Result<BinRecord, PortError>;
}

#[async_trait]
/// Publish/subscribe channel announcing changes to the stored bin set.
pub trait ChangeFeed: Send + Sync {
    /// Open a new subscription.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the subscription cannot be established.
    async fn subscribe(&self) -> Result<ChangeStream, PortError>;
}
