//! Failure tests for the collection loop
//!
//! The loop must survive unreachable servers, HTTP errors and malformed
//! responses: a failed cycle is logged and retried after the configured
//! pause, never escalated.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xroad_telemetry::actors::collector::CollectorHandle;
use xroad_telemetry::backoff::FixedDelay;
use xroad_telemetry::storage::{SqliteStore, TelemetryStore};

use crate::helpers::*;

async fn store_in(db_dir: &tempfile::TempDir) -> Arc<SqliteStore> {
    Arc::new(
        SqliteStore::new(db_dir.path().join("test.db"))
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn test_cycle_fails_without_crashing_when_server_unreachable() {
    // Nothing is listening on the discard port
    let db_dir = tempfile::tempdir().unwrap();
    let store = store_in(&db_dir).await;

    let config = test_config("http://127.0.0.1:9", &db_dir.path().join("test.db"));
    let handle = CollectorHandle::spawn(
        &config,
        store.clone(),
        Box::new(FixedDelay::new(Duration::from_secs(60))),
    )
    .unwrap();

    let result = handle.collect_now().await;
    assert!(result.is_err(), "cycle should fail for unreachable server");

    // Nothing was persisted
    let since = Utc::now() - chrono::Duration::hours(24);
    assert!(store.query_operational(None, since).await.unwrap().is_empty());
    assert!(store.latest_health_per_service().await.unwrap().is_empty());

    // The loop is still alive and can be driven again
    let result = handle.collect_now().await;
    assert!(result.is_err());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_fails_on_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let db_dir = tempfile::tempdir().unwrap();
    let store = store_in(&db_dir).await;

    let config = test_config(&mock_server.uri(), &db_dir.path().join("test.db"));
    let handle = CollectorHandle::spawn(
        &config,
        store.clone(),
        Box::new(FixedDelay::new(Duration::from_secs(60))),
    )
    .unwrap();

    let result = handle.collect_now().await;
    assert!(result.is_err(), "cycle should fail on HTTP 500");

    let since = Utc::now() - chrono::Duration::hours(24);
    assert!(store.query_operational(None, since).await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_malformed_responses_degrade_to_empty_batches() {
    let mock_server = MockServer::start().await;

    // 200 OK but not XML - a document-level parse failure, not a cycle
    // failure
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not xml at all"))
        .mount(&mock_server)
        .await;

    let db_dir = tempfile::tempdir().unwrap();
    let store = store_in(&db_dir).await;

    let config = test_config(&mock_server.uri(), &db_dir.path().join("test.db"));
    let handle = CollectorHandle::spawn(
        &config,
        store.clone(),
        Box::new(FixedDelay::new(Duration::from_secs(60))),
    )
    .unwrap();

    let outcome = handle.collect_now().await.unwrap();
    assert_eq!(outcome.operational_received, 0);
    assert_eq!(outcome.operational_inserted, 0);
    assert_eq!(outcome.health_services, 0);

    let since = Utc::now() - chrono::Duration::hours(24);
    assert!(store.query_operational(None, since).await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_operational_data_survives_health_step_failure() {
    let mock_server = MockServer::start().await;

    let base = Utc::now().timestamp_millis();
    Mock::given(method("POST"))
        .and(body_string_contains("getSecurityServerOperationalData"))
        .respond_with(ResponseTemplate::new(200).set_body_string(operational_response(
            &operational_record_xml("svc-a", "cli-1", base, base + 100, true),
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("getSecurityServerHealthData"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let db_dir = tempfile::tempdir().unwrap();
    let store = store_in(&db_dir).await;

    let config = test_config(&mock_server.uri(), &db_dir.path().join("test.db"));
    let handle = CollectorHandle::spawn(
        &config,
        store.clone(),
        Box::new(FixedDelay::new(Duration::from_secs(60))),
    )
    .unwrap();

    // The cycle ends early at the health step, but the operational batch
    // persisted before it is kept
    let result = handle.collect_now().await;
    assert!(result.is_err());

    let since = Utc::now() - chrono::Duration::hours(24);
    assert_eq!(store.query_operational(None, since).await.unwrap().len(), 1);
    assert!(store.latest_health_per_service().await.unwrap().is_empty());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_cycle_is_retried_after_backoff_pause() {
    let mock_server = MockServer::start().await;

    let request_count = Arc::new(AtomicUsize::new(0));
    let request_count_clone = request_count.clone();

    Mock::given(method("POST"))
        .respond_with(move |_req: &wiremock::Request| {
            request_count_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500)
        })
        .mount(&mock_server)
        .await;

    let db_dir = tempfile::tempdir().unwrap();
    let store = store_in(&db_dir).await;

    let config = test_config(&mock_server.uri(), &db_dir.path().join("test.db"));
    let handle = CollectorHandle::spawn(
        &config,
        store,
        Box::new(FixedDelay::new(Duration::from_millis(100))),
    )
    .unwrap();

    // The first cycle runs at spawn and fails; with a 100ms pause the loop
    // should have retried at least once well within half a second.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let count = request_count.load(Ordering::SeqCst);
    assert!(count >= 2, "expected at least 2 attempts, got {}", count);

    handle.shutdown().await.unwrap();
}
