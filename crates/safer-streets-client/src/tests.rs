//! Client tests against a live server on an ephemeral port

use std::sync::Arc;
use std::time::Duration;

use safer_streets_core::test_utils::*;
use safer_streets_core::{Month, Repository};
use safer_streets_server::{ApiCredential, ApiServer, ServerConfig};
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

use crate::*;

const KEY: &str = "abc123";

async fn spawn_server() -> (TempDir, String) {
    let root = create_test_data_root();
    let repository = Arc::new(Repository::load(root.path()).unwrap());
    let credential = ApiCredential::from_secret("client-tests", KEY).unwrap();
    let server = ApiServer::new(repository, credential, ServerConfig::default());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(server.serve(listener));
    (root, base_url)
}

fn session(base_url: &str, key: &str) -> Session {
    Session::new(ApiClient::new(ClientConfig::new(base_url, key)).unwrap())
}

#[tokio::test]
async fn test_session_caches_successes() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);

    let first = session.area("West Yorkshire").await.unwrap();
    let second = session.area("West Yorkshire").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(session.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });

    session.refresh();
    assert_eq!(session.stats().entries, 0);
    session.area("West Yorkshire").await.unwrap();
    assert_eq!(session.stats().misses, 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);

    for _ in 0..2 {
        let err = session.area("Nonexistent County").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }
    assert_eq!(session.stats(), CacheStats { entries: 0, hits: 0, misses: 2 });
}

#[tokio::test]
async fn test_sessions_do_not_share_cache() {
    let (_root, url) = spawn_server().await;
    let mut alice = session(&url, KEY);
    let mut bob = session(&url, KEY);

    alice.forces().await.unwrap();
    bob.forces().await.unwrap();
    assert_eq!(alice.stats().misses, 1);
    assert_eq!(bob.stats().misses, 1);
    assert_eq!(bob.stats().hits, 0);
}

#[tokio::test]
async fn test_wrong_key_is_unauthorized() {
    let (_root, url) = spawn_server().await;
    let client = ApiClient::new(ClientConfig::new(&url, "wrong")).unwrap();
    let err = client.area("West Yorkshire").await.unwrap_err();
    assert!(matches!(err, ClientError::Unauthorized(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_ambiguous_carries_candidates() {
    let (_root, url) = spawn_server().await;
    let client = ApiClient::new(ClientConfig::new(&url, KEY)).unwrap();
    match client.area("Yorkshire").await.unwrap_err() {
        ClientError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn test_refused_connection_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = ApiClient::new(ClientConfig::new(&url, KEY)).unwrap();
    let err = client.forces().await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_timeout_is_unavailable_not_missing() {
    // accepts connections and never answers
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let config = ClientConfig::new(&url, KEY).with_timeout(Duration::from_millis(300));
    let client = ApiClient::new(config).unwrap();
    let err = client.area("West Yorkshire").await.unwrap_err();
    assert!(matches!(err, ClientError::Unavailable(_)));
}

#[tokio::test]
async fn test_hexes_and_reload() {
    let (root, url) = spawn_server().await;
    let client = ApiClient::new(ClientConfig::new(&url, KEY)).unwrap();

    let hexes = client.hexes(&[101, 103]).await.unwrap();
    assert_eq!(hexes["features"].as_array().unwrap().len(), 2);

    write_json(&root.path().join("datasets/officers.json"), &json!({
        "schema_version": 1,
        "records": [{ "area_id": METROPOLITAN, "values": { "officers": 33000 } }]
    }));
    let reloaded = client.reload().await.unwrap();
    assert_eq!(reloaded.data.datasets, 5);
    let record = client.record("officers", "The Met").await.unwrap();
    assert_eq!(record.values["officers"], 33000);
}

#[tokio::test]
async fn test_area_view() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);
    let view = AreaView::load(&mut session, "wyp").await.unwrap();
    assert_eq!(view.area.id.as_str(), WEST_YORKSHIRE);
    assert_eq!(view.area_km2, Some(2029.0));
    assert_eq!(view.to_string(), "West Yorkshire (E23000010): 2029.0 km²");
}

#[tokio::test]
async fn test_demographics_view() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);
    let view = DemographicsView::load(&mut session, "South Yorkshire", "demographics")
        .await
        .unwrap();
    assert_eq!(view.values["population"], 1379900);
    assert!(view.classification.is_none());
}

#[tokio::test]
async fn test_comparison_view() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);
    let view = ComparisonView::load(&mut session, "demographics", &["WYP", "SYP", "The Met"])
        .await
        .unwrap();
    assert_eq!(view.rows.len(), 3);
    assert!(view.rows[2].record.is_none());
    assert_eq!(
        view.column("population"),
        vec![Some(&json!(2351600)), Some(&json!(1379900)), None]
    );

    let err = ComparisonView::load(&mut session, "demographics", &["WYP", "Yorkshire"])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Ambiguous { .. }));
}

#[tokio::test]
async fn test_persistence_view() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);

    let view = PersistenceView::load(&mut session, "West Yorkshire", "risk").await.unwrap();
    assert_eq!(view.report.stability, Some(0.5));
    assert_eq!(view.label, "mixed");

    let err = PersistenceView::load(&mut session, "The Met", "risk").await.unwrap_err();
    assert!(matches!(err, ClientError::InsufficientData(_)));
}

#[tokio::test]
async fn test_hotspot_view() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);
    let request = RepetitionRequest {
        window: Some(3),
        step: Some(3),
        prediction: Some(3),
        n_hotspots: Some(1),
        ..Default::default()
    };
    let view = HotspotView::load(&mut session, "WYP", "burglary", &request).await.unwrap();
    assert_eq!(view.windows.len(), 2);
    assert_eq!(view.windows[0].label, "2024-01 to 2024-03");
    let predicted = view.mean_predicted_pct.unwrap();
    assert!((predicted - 100.0 * 24.0 / 53.0).abs() < 1e-9);
    let recurring: Vec<_> = view.recurring.iter().map(|c| c.spatial_unit).collect();
    assert_eq!(recurring, vec![101, 102]);
    assert_eq!(view.windows[0].l_50, 0.25);
}

#[tokio::test]
async fn test_national_hotspots_cached_per_month_set() {
    let (_root, url) = spawn_server().await;
    let mut session = session(&url, KEY);
    let months: Vec<Month> = ["2024-04", "2024-05", "2024-06"]
        .iter()
        .map(|m| m.parse().unwrap())
        .collect();

    let national = session.national_hotspots("burglary", &months, 3).await.unwrap();
    let forces: Vec<_> = national.hotspots.iter().map(|h| h.area_id.as_str()).collect();
    assert_eq!(forces, vec![WEST_YORKSHIRE, WEST_YORKSHIRE, SOUTH_YORKSHIRE]);

    session.national_hotspots("burglary", &months, 3).await.unwrap();
    session.national_hotspots("burglary", &months[..1], 3).await.unwrap();
    assert_eq!(session.stats(), CacheStats { entries: 2, hits: 1, misses: 2 });
}
