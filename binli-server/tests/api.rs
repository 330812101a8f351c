//! Router-level tests for the HTTP API, driven without a network socket.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use futures::{FutureExt, StreamExt};
use serde_json::{Value, json};
use tower::ServiceExt;

use binli_core::{BinRecord, BinSource, BinStore, ChangeFeed, ChangeStream, PortError};
use binli_server::{AppState, create_router};
use binli_store_memory::MemoryBinStore;

fn app() -> (Router, Arc<MemoryBinStore>) {
    let store = Arc::new(MemoryBinStore::default());
    let state = AppState::new(Arc::<MemoryBinStore>::clone(&store), Arc::<MemoryBinStore>::clone(&store));
    (create_router(state), store)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

struct OfflineStore;

#[async_trait]
impl BinSource for OfflineStore {
    async fn fetch_all(&self) -> Result<Vec<BinRecord>, PortError> {
        Err(PortError::Storage("connection refused".into()))
    }
}

#[async_trait]
impl BinStore for OfflineStore {
    async fn upsert(&self, _record: BinRecord) -> Result<BinRecord, PortError> {
        Err(PortError::Storage("connection refused".into()))
    }
}

#[async_trait]
impl ChangeFeed for OfflineStore {
    async fn subscribe(&self) -> Result<ChangeStream, PortError> {
        Err(PortError::FeedClosed)
    }
}

#[tokio::test]
async fn valid_reading_is_stored_and_summarised() {
    let (app, store) = app();

    let (status, body) = send(
        &app,
        post_json("/bins", &json!({"bin_type": "dry", "distance_cm": 15, "bin_height_cm": 30})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["bin_type"], "dry");
    assert_eq!(body["data"]["fill_level"], 50.0);
    assert_eq!(body["data"]["status"], "medium");
    assert_eq!(body["data"]["distance_cm"], 15.0);
    assert_eq!(body["data"]["bin_height_cm"], 30.0);
    assert_eq!(body["message"], "dry bin updated: 50% full (medium)");

    assert_eq!(store.fetch_all().await.expect("fetch").len(), 1);
}

#[tokio::test]
async fn height_defaults_to_thirty_centimetres() {
    let (app, _store) = app();

    let (status, body) = send(
        &app,
        post_json("/update-bin-data", &json!({"bin_type": "metal", "distance_cm": 35})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bin_height_cm"], 30.0);
    assert_eq!(body["data"]["fill_level"], 0.0);
    assert_eq!(body["data"]["status"], "empty");
}

#[tokio::test]
async fn unknown_bin_type_is_rejected_without_side_effects() {
    let (app, store) = app();
    let mut changes = store.subscribe().await.expect("subscribe");

    let (status, body) = send(
        &app,
        post_json("/bins", &json!({"bin_type": "plastic", "distance_cm": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["field"], "bin_type");
    assert!(store.fetch_all().await.expect("fetch").is_empty());
    assert!(changes.next().now_or_never().is_none());
}

#[tokio::test]
async fn bad_distances_name_the_field() {
    let (app, store) = app();

    for distance in [json!(-1), json!("12"), Value::Null] {
        let (status, body) = send(
            &app,
            post_json("/bins", &json!({"bin_type": "wet", "distance_cm": distance})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "distance {distance}");
        assert_eq!(body["field"], "distance_cm");
    }

    let (status, body) = send(
        &app,
        post_json("/bins", &json!({"bin_type": "wet", "distance_cm": 3, "bin_height_cm": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "bin_height_cm");

    assert!(store.fetch_all().await.expect("fetch").is_empty());
}

#[tokio::test]
async fn first_offending_field_wins_when_several_are_bad() {
    let (app, store) = app();

    let (status, body) = send(
        &app,
        post_json(
            "/bins",
            &json!({"bin_type": "plastic", "distance_cm": -1, "bin_height_cm": "tall"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "bin_type");

    let (status, body) = send(
        &app,
        post_json(
            "/bins",
            &json!({"bin_type": "dry", "distance_cm": "far", "bin_height_cm": "tall"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "distance_cm");

    let (status, body) = send(
        &app,
        post_json(
            "/bins",
            &json!({"bin_type": "dry", "distance_cm": 4, "bin_height_cm": "tall"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "bin_height_cm");

    assert!(store.fetch_all().await.expect("fetch").is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _store) = app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/bins")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"bin_type\": "))
        .expect("request");
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn read_all_lists_bins_by_type() {
    let (app, _store) = app();

    for (bin_type, distance) in [("wet", 3), ("metal", 12), ("dry", 27), ("wet", 30)] {
        let (status, _) = send(
            &app,
            post_json("/bins", &json!({"bin_type": bin_type, "distance_cm": distance})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get("/bins")).await;

    assert_eq!(status, StatusCode::OK);
    let types: Vec<&str> = body["data"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|record| record["bin_type"].as_str())
        .collect();
    assert_eq!(types, vec!["dry", "metal", "wet"]);
    assert_eq!(body["data"][2]["fill_level"], 0.0);
}

#[tokio::test]
async fn storage_failures_are_server_errors() {
    let store = Arc::new(OfflineStore);
    let app = create_router(AppState::new(
        Arc::<OfflineStore>::clone(&store),
        store,
    ));

    let (status, body) = send(
        &app,
        post_json("/bins", &json!({"bin_type": "dry", "distance_cm": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to update bin data");

    let (status, body) = send(&app, get("/bins")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to fetch bin data");

    let (status, _) = send(&app, get("/bins/events")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_and_method_handling() {
    let (app, _store) = app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/bins")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn event_stream_announces_upserts() {
    let (app, store) = app();

    let response = app.clone().oneshot(get("/bins/events")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    assert!(content_type.starts_with("text/event-stream"));

    let mut frames = response.into_body().into_data_stream();

    let (status, _) = send(
        &app,
        post_json("/bins", &json!({"bin_type": "wet", "distance_cm": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let frame = frames.next().await.expect("frame").expect("bytes");
    let text = String::from_utf8(frame.to_vec()).expect("utf8");
    assert!(text.contains("event: bin_change"), "{text}");
    assert!(text.contains("\"bin_type\":\"wet\""), "{text}");

    drop(frames);
    assert_eq!(store.subscriber_count(), 0);
}
