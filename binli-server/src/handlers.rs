//! HTTP handlers. Each one delegates to the ingestion processor or the change feed.

use std::convert::Infallible;
use std::time::Duration;

use async_stream::stream;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use tracing::{error, warn};

use binli_core::IngestError;

use crate::dto::{BinsResponse, HealthResponse, IngestRequest, IngestResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, ApiError>;

/// Name of the server-sent event carrying a bin change.
pub const BIN_CHANGE_EVENT: &str = "bin_change";

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /bins
///
/// Validate a reading, compute its fill level and status, and upsert the record.
pub async fn ingest_reading(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> HandlerResult<IngestResponse> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(%rejection, "malformed bin reading body");
        ApiError::MalformedBody(rejection.body_text())
    })?;
    let parts = request.into_parts();

    let record = state
        .processor
        .ingest(&parts.bin_type, parts.distance_cm, parts.bin_height_cm)
        .await
        .map_err(|err| match err {
            IngestError::Validation(err) => ApiError::Validation(err),
            IngestError::Storage(_) => ApiError::Storage("Failed to update bin data"),
        })?;

    let message = record.summary();
    Ok(Json(IngestResponse {
        success: true,
        data: record,
        message,
    }))
}

/// GET /bins
///
/// Every stored record ordered by bin type.
pub async fn list_bins(State(state): State<AppState>) -> HandlerResult<BinsResponse> {
    let data = state
        .processor
        .bins()
        .await
        .map_err(|err| {
            warn!(%err, "listing bins failed");
            ApiError::Storage("Failed to fetch bin data")
        })?;

    Ok(Json(BinsResponse {
        success: true,
        data,
    }))
}

/// GET /bins/events
///
/// Server-sent events, one `bin_change` event per stored change.
pub async fn bin_events(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let mut changes = state.feed.subscribe().await.map_err(|err| {
        error!(%err, "failed to subscribe to bin changes");
        ApiError::Storage("Failed to subscribe to bin changes")
    })?;

    let events = stream! {
        while let Some(change) = changes.next().await {
            let change = match change {
                Ok(change) => change,
                Err(err) => {
                    warn!(%err, "bin change feed ended");
                    break;
                }
            };
            match Event::default().event(BIN_CHANGE_EVENT).json_data(change) {
                Ok(event) => {
                    yield Ok(event);
                }
                Err(err) => warn!(%err, "failed to encode bin change"),
            }
        }
    };

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    ))
}
