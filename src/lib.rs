pub mod actors;
pub mod analytics;
pub mod backoff;
pub mod client;
pub mod config;
pub mod identifier;
pub mod protocol;
pub mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged request/response exchange handled by the security server.
///
/// Records are produced by the response parser and immutable afterwards.
/// `duration_ms` is present iff both timestamps are present and is always
/// non-negative; a wire record whose response precedes its request is
/// rejected during parsing and never reaches storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalRecord {
    pub service_id: String,
    pub client_id: String,
    pub producer_id: String,
    pub request_timestamp: Option<DateTime<Utc>>,
    pub response_timestamp: Option<DateTime<Utc>>,
    pub request_size: u64,
    pub response_size: u64,
    pub succeeded: bool,
    pub error_message: Option<String>,
    pub duration_ms: Option<i64>,
}

/// Point-in-time summary of one service's recent request statistics, as
/// reported by the security server's health monitoring.
///
/// Snapshots are stamped with `collected_at` once per collection cycle and
/// never mutated; each cycle appends new facts rather than updating counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub service_code: String,
    pub last_successful_request: Option<DateTime<Utc>>,
    pub last_unsuccessful_request: Option<DateTime<Utc>>,
    pub successful_count: u64,
    pub unsuccessful_count: u64,
    pub avg_duration_ms: f64,
    pub collected_at: DateTime<Utc>,
}
