//! Server, HTTP client and dashboard view model wired together over loopback.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpListener;
use tokio::time::timeout;

use binli_client::BinliClient;
use binli_core::{
    BinChange, BinSource, BinType, ChangeFeed, DashboardModel, DashboardUpdate, IngestionStatus,
};
use binli_server::{AppState, create_router};
use binli_store_memory::MemoryBinStore;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_server() -> String {
    let store = Arc::new(MemoryBinStore::default());
    let app = create_router(AppState::new(
        Arc::<MemoryBinStore>::clone(&store),
        store,
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn client_submits_reads_and_listens() {
    let base_url = spawn_server().await;
    let client = BinliClient::new(reqwest::Client::new(), base_url);

    let mut changes = client.subscribe().await.expect("subscribe");

    let stored = client
        .submit_reading(BinType::Wet, 3.0, None)
        .await
        .expect("submit");
    assert_eq!(stored.fill_level, 90.0);
    assert_eq!(stored.status, IngestionStatus::Full);

    let change = timeout(STEP_TIMEOUT, changes.next())
        .await
        .expect("change in time")
        .expect("open stream")
        .expect("decoded change");
    assert_eq!(
        change,
        BinChange::Upserted {
            bin_type: BinType::Wet
        }
    );

    let records = client.fetch_all().await.expect("fetch");
    assert_eq!(records, vec![stored]);
}

#[tokio::test]
async fn rejected_readings_surface_as_errors() {
    let base_url = spawn_server().await;
    let client = BinliClient::new(reqwest::Client::new(), base_url);

    assert!(client.submit_reading(BinType::Dry, -4.0, None).await.is_err());
    assert!(client.fetch_all().await.expect("fetch").is_empty());
}

#[tokio::test]
async fn dashboard_follows_pushed_changes() {
    let base_url = spawn_server().await;
    let client = Arc::new(BinliClient::new(reqwest::Client::new(), base_url));
    let mut model = DashboardModel::new(
        Arc::<BinliClient>::clone(&client),
        Arc::<BinliClient>::clone(&client),
    );
    let mut updates = model.updates();

    let initial = timeout(STEP_TIMEOUT, updates.next())
        .await
        .expect("initial load in time")
        .expect("update");
    assert_eq!(initial, DashboardUpdate::Snapshot(Vec::new()));

    for (bin_type, distance) in [
        (BinType::Dry, 0.0),
        (BinType::Wet, 4.5),
        (BinType::Metal, 27.0),
    ] {
        client
            .submit_reading(bin_type, distance, None)
            .await
            .expect("submit");
        let update = timeout(STEP_TIMEOUT, updates.next())
            .await
            .expect("update in time")
            .expect("update");
        model.apply(update, chrono::Utc::now());
    }

    // dry 100 % full, wet 85 % warning, metal 10 % normal
    assert_eq!(model.state().cards.len(), 3);
    assert_eq!(model.state().compliance_score, 65);
}
