//! Core types and pipeline wiring for the binli waste bin monitor.

/// Aggregation view model turning stored bin records into dashboard state.
pub mod dashboard;
/// Ingestion pipeline converting distance readings into stored bin records.
pub mod ingest;
/// Domain models and identifiers shared by every crate.
pub mod model;
/// Traits describing the storage and change-notification collaborators.
pub mod ports;

pub use dashboard::*;
pub use ingest::*;
pub use model::*;
pub use ports::*;
