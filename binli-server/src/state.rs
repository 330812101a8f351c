//! Application state shared by all handlers.

use std::sync::Arc;

use binli_core::{BinStore, ChangeFeed, IngestionProcessor};

/// Collaborators built once at startup and handed to every request.
#[derive(Clone)]
pub struct AppState {
    /// Ingestion pipeline bound to the bin store.
    pub processor: Arc<IngestionProcessor>,
    /// Change feed relayed to event-stream clients.
    pub feed: Arc<dyn ChangeFeed>,
}

impl AppState {
    /// Wire the ingestion pipeline to `store` and relay `feed` to listeners.
    #[must_use]
    pub fn new(store: Arc<dyn BinStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            processor: Arc::new(IngestionProcessor::new(store)),
            feed,
        }
    }
}
