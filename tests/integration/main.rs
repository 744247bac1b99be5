//! Integration tests for Safer Streets
//!
//! A real server on an ephemeral port, loaded from a fixture data directory,
//! driven through the client crate.

use std::sync::Arc;
use std::time::Duration;

use safer_streets_client::{ApiClient, ClientConfig, ClientError, PersistenceView, Session};
use safer_streets_core::test_utils::*;
use safer_streets_core::Repository;
use safer_streets_server::{ApiCredential, ApiServer, ServerConfig};
use safer_streets_watcher::ReloadService;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::{sleep, Instant};

const KEY: &str = "abc123";

struct TestServer {
    root: TempDir,
    repository: Arc<Repository>,
    url: String,
}

async fn start_server() -> TestServer {
    let root = create_test_data_root();
    let repository = Arc::new(Repository::load(root.path()).unwrap());

    // Configured the way an operator would: from a stored digest
    let stored = ApiCredential::from_secret("integration", KEY).unwrap().encode();
    let credential = ApiCredential::parse(&stored).unwrap();

    let server = ApiServer::new(Arc::clone(&repository), credential, ServerConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(server.serve(listener));

    TestServer { root, repository, url }
}

fn client(url: &str, key: &str) -> ApiClient {
    ApiClient::new(ClientConfig::new(url, key).with_timeout(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn test_end_to_end_area_lookup() {
    let server = start_server().await;

    let area = client(&server.url, KEY).area("West Yorkshire").await.unwrap();
    assert_eq!(area.id.as_str(), WEST_YORKSHIRE);

    let err = client(&server.url, "wrong").area("West Yorkshire").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));

    let err = client(&server.url, KEY).area("Nonexistent County").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
    assert!(err.user_message().starts_with("Not found"));
}

#[tokio::test]
async fn test_health_reports_loaded_data() {
    let server = start_server().await;
    let health = client(&server.url, "not-needed").health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.data.areas, 4);
    assert_eq!(health.data.categories, 2);
}

#[tokio::test]
async fn test_resolution_is_stable_across_requests() {
    let server = start_server().await;
    let client = client(&server.url, KEY);
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(client.area("wyp").await.unwrap().id);
    }
    assert!(ids.iter().all(|id| id.as_str() == WEST_YORKSHIRE));
}

#[tokio::test]
async fn test_persistence_through_session() {
    let server = start_server().await;
    let mut session = Session::new(client(&server.url, KEY));

    let view = PersistenceView::load(&mut session, "SYP", "risk").await.unwrap();
    assert_eq!(view.report.present, 2);
    assert_eq!(view.report.gaps, vec!["2024-02".to_string()]);
    assert_eq!(view.label, "stable");
}

#[tokio::test]
async fn test_watch_reload_is_visible_to_clients() {
    let server = start_server().await;
    let service = ReloadService::with_debounce(Arc::clone(&server.repository), Duration::from_millis(100)).unwrap();
    let watcher = tokio::spawn(service.run());

    write_json(&server.root.path().join("datasets/officers.json"), &json!({
        "schema_version": 1,
        "records": [{ "area_id": WEST_YORKSHIRE, "values": { "officers": 5800 } }]
    }));

    let client = client(&server.url, KEY);
    let deadline = Instant::now() + Duration::from_secs(10);
    let record = loop {
        match client.record("officers", "West Yorkshire").await {
            Ok(record) => break record,
            Err(ClientError::NotFound(_)) if Instant::now() < deadline => {
                sleep(Duration::from_millis(100)).await
            }
            Err(e) => panic!("reload never became visible: {e}"),
        }
    };
    watcher.abort();
    assert_eq!(record.values["officers"], 5800);
}

#[tokio::test]
async fn test_concurrent_clients() {
    let server = start_server().await;
    let mut handles = Vec::new();
    for force in ["WYP", "SYP", "NYP", "The Met"] {
        let client = client(&server.url, KEY);
        handles.push(tokio::spawn(async move { client.area(force).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}
