//! Telemetry store trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{HealthSnapshot, OperationalRecord};

use super::error::StorageResult;

/// Success/failure totals over a time range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub succeeded: u64,
    pub failed: u64,
}

/// One point in a response-time series
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseTimePoint {
    pub service_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: i64,
}

/// Trait for telemetry persistence backends.
///
/// Implementations must be `Send + Sync`; the collector holds the store
/// behind an `Arc` and dashboards may read concurrently with appends.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Append operational records, skipping ones already known under the
    /// natural key `(service_id, client_id, request_timestamp)`.
    ///
    /// Returns the number of records actually inserted.
    async fn append_operational(&self, records: Vec<OperationalRecord>) -> StorageResult<usize>;

    /// Append health snapshots unconditionally.
    async fn append_health(&self, snapshots: Vec<HealthSnapshot>) -> StorageResult<()>;

    /// Query operational records with a request timestamp at or after
    /// `since`, optionally restricted to one service.
    ///
    /// Results are ordered by request timestamp (oldest first). Records
    /// without a request timestamp are not range-queryable and are never
    /// returned here.
    async fn query_operational(
        &self,
        service_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<OperationalRecord>>;

    /// Latest health snapshot per service ("current status").
    async fn latest_health_per_service(&self) -> StorageResult<Vec<HealthSnapshot>>;

    /// Success/failure counts over operational records since `since`.
    async fn status_counts(&self, since: DateTime<Utc>) -> StorageResult<StatusCounts>;

    /// Response-time series since `since`, optionally restricted to one
    /// service. Records without a duration are excluded.
    async fn response_time_series(
        &self,
        service_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> StorageResult<Vec<ResponseTimePoint>>;

    /// Human-readable backend statistics.
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources.
    async fn close(&self) -> StorageResult<()>;
}
