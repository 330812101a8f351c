//! Route table and middleware.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the application router.
///
/// `/update-bin-data` is an alias of `/bins` for sensor firmware that
/// still posts to the old function path.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/bins",
            get(handlers::list_bins).post(handlers::ingest_reading),
        )
        .route(
            "/update-bin-data",
            get(handlers::list_bins).post(handlers::ingest_reading),
        )
        .route("/bins/events", get(handlers::bin_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
