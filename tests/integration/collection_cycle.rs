//! End-to-end collection cycle tests against a mock security server

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wiremock::MockServer;
use xroad_telemetry::actors::collector::CollectorHandle;
use xroad_telemetry::backoff::FixedDelay;
use xroad_telemetry::storage::{SqliteStore, TelemetryStore};

use crate::helpers::*;

async fn spawn_collector(
    endpoint: &str,
    db_dir: &tempfile::TempDir,
) -> (CollectorHandle, Arc<SqliteStore>) {
    let db_path = db_dir.path().join("test.db");
    let store = Arc::new(SqliteStore::new(&db_path).await.unwrap());

    let config = test_config(endpoint, &db_path);
    let handle = CollectorHandle::spawn(
        &config,
        store.clone(),
        Box::new(FixedDelay::new(Duration::from_secs(60))),
    )
    .unwrap();

    (handle, store)
}

#[tokio::test]
async fn test_full_cycle_persists_operational_and_health_data() {
    let mock_server = MockServer::start().await;

    let base = Utc::now().timestamp_millis();
    let records = format!(
        "{}{}",
        operational_record_xml("svc-a", "cli-1", base, base + 150, true),
        operational_record_xml("svc-b", "cli-2", base + 1000, base + 1400, false),
    );
    mount_monitoring_mocks(
        &mock_server,
        operational_response(&records),
        health_response(&service_health_xml("getPerson", 41, 2, 12.5)),
    )
    .await;

    let db_dir = tempfile::tempdir().unwrap();
    let (handle, store) = spawn_collector(&mock_server.uri(), &db_dir).await;

    let outcome = handle.collect_now().await.unwrap();
    assert_eq!(outcome.operational_received, 2);
    assert_eq!(outcome.health_services, 1);

    let since = Utc::now() - chrono::Duration::hours(1);
    let stored = store.query_operational(None, since).await.unwrap();
    assert_eq!(stored.len(), 2);

    let svc_a = stored.iter().find(|r| r.service_id == "svc-a").unwrap();
    assert!(svc_a.succeeded);
    assert_eq!(svc_a.duration_ms, Some(150));
    assert_eq!(svc_a.request_size, 512);

    let health = store.latest_health_per_service().await.unwrap();
    assert_eq!(health.len(), 1);
    assert_eq!(health[0].service_code, "getPerson");
    assert_eq!(health[0].successful_count, 41);
    assert_eq!(health[0].avg_duration_ms, 12.5);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_repeated_cycles_do_not_duplicate_operational_records() {
    let mock_server = MockServer::start().await;

    let base = Utc::now().timestamp_millis();
    let records = format!(
        "{}{}",
        operational_record_xml("svc-a", "cli-1", base, base + 100, true),
        operational_record_xml("svc-a", "cli-1", base + 1000, base + 1100, true),
    );
    mount_monitoring_mocks(
        &mock_server,
        operational_response(&records),
        health_response(&service_health_xml("getPerson", 1, 0, 5.0)),
    )
    .await;

    let db_dir = tempfile::tempdir().unwrap();
    let (handle, store) = spawn_collector(&mock_server.uri(), &db_dir).await;

    let first = handle.collect_now().await.unwrap();
    assert_eq!(first.operational_received, 2);

    // Same response again - everything is already known
    let second = handle.collect_now().await.unwrap();
    assert_eq!(second.operational_received, 2);
    assert_eq!(second.operational_inserted, 0);

    let since = Utc::now() - chrono::Duration::hours(1);
    let stored = store.query_operational(None, since).await.unwrap();
    assert_eq!(stored.len(), 2);

    // Health snapshots are point-in-time facts, one batch per cycle
    let health_count = store.latest_health_per_service().await.unwrap().len();
    assert_eq!(health_count, 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_dashboard_read_interface() {
    let mock_server = MockServer::start().await;

    let base = Utc::now().timestamp_millis();
    let records = format!(
        "{}{}{}",
        operational_record_xml("svc-a", "cli-1", base, base + 100, true),
        operational_record_xml("svc-a", "cli-2", base + 1000, base + 1300, true),
        operational_record_xml("svc-b", "cli-1", base + 2000, base + 2050, false),
    );
    mount_monitoring_mocks(
        &mock_server,
        operational_response(&records),
        health_response(&format!(
            "{}{}",
            service_health_xml("svc-a", 10, 1, 20.0),
            service_health_xml("svc-b", 3, 4, 80.0),
        )),
    )
    .await;

    let db_dir = tempfile::tempdir().unwrap();
    let (handle, store) = spawn_collector(&mock_server.uri(), &db_dir).await;

    handle.collect_now().await.unwrap();

    let since = Utc::now() - chrono::Duration::hours(24);

    let counts = store.status_counts(since).await.unwrap();
    assert_eq!(counts.succeeded, 2);
    assert_eq!(counts.failed, 1);

    let series = store.response_time_series(Some("svc-a"), since).await.unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[0].duration_ms, 100);
    assert_eq!(series[1].duration_ms, 300);

    let health = store.latest_health_per_service().await.unwrap();
    assert_eq!(health.len(), 2);

    handle.shutdown().await.unwrap();
}
