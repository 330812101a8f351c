//! HTTP surface of binli.
//!
//! Sensors post distance readings to `POST /bins`; dashboards read
//! `GET /bins` and listen on `GET /bins/events` for change notifications.

/// Environment-driven server settings.
pub mod config;
/// Request and response bodies.
pub mod dto;
/// Error responses.
pub mod error;
/// Route handlers.
pub mod handlers;
/// Route table and middleware.
pub mod router;
/// Shared handler state.
pub mod state;

pub use config::ServerConfig;
pub use router::create_router;
pub use state::AppState;
