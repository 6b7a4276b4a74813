//! Time-windowed aggregation over persisted operational records
//!
//! Summaries are computed in code rather than in SQL so the edge rules are
//! explicit: records without a duration count toward totals but never
//! toward duration aggregates, and an empty window yields zero counts with
//! absent aggregates instead of NaN.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use crate::OperationalRecord;
use crate::storage::{StorageResult, TelemetryStore};

/// Aggregates over one set of operational records.
///
/// Duration and size aggregates are `None` when no record contributed to
/// them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_duration_ms: Option<f64>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub avg_request_size: Option<f64>,
    pub avg_response_size: Option<f64>,
}

impl Summary {
    /// Fold a set of records into a summary. Pure.
    pub fn from_records(records: &[OperationalRecord]) -> Self {
        let mut summary = Summary::default();

        let mut duration_sum: i64 = 0;
        let mut duration_count: u64 = 0;
        let mut request_size_sum: u64 = 0;
        let mut response_size_sum: u64 = 0;

        for record in records {
            summary.total_requests += 1;
            if record.succeeded {
                summary.successful_requests += 1;
            } else {
                summary.failed_requests += 1;
            }

            request_size_sum += record.request_size;
            response_size_sum += record.response_size;

            if let Some(duration) = record.duration_ms {
                duration_sum += duration;
                duration_count += 1;
                summary.min_duration_ms = Some(match summary.min_duration_ms {
                    Some(min) => min.min(duration),
                    None => duration,
                });
                summary.max_duration_ms = Some(match summary.max_duration_ms {
                    Some(max) => max.max(duration),
                    None => duration,
                });
            }
        }

        if duration_count > 0 {
            summary.avg_duration_ms = Some(duration_sum as f64 / duration_count as f64);
        }

        if summary.total_requests > 0 {
            let total = summary.total_requests as f64;
            summary.avg_request_size = Some(request_size_sum as f64 / total);
            summary.avg_response_size = Some(response_size_sum as f64 / total);
        }

        summary
    }
}

/// Summary for one service in a global query
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSummary {
    pub service_id: String,
    pub summary: Summary,
}

/// Read-side analytics over a telemetry store
pub struct AnalyticsEngine {
    store: Arc<dyn TelemetryStore>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Summarize one service over a trailing window.
    pub async fn summarize(
        &self,
        service_id: &str,
        window: chrono::Duration,
    ) -> StorageResult<Summary> {
        let since = Utc::now() - window;
        let records = self.store.query_operational(Some(service_id), since).await?;
        Ok(Summary::from_records(&records))
    }

    /// Summarize every service seen in a trailing window, busiest first.
    pub async fn summarize_all(
        &self,
        window: chrono::Duration,
    ) -> StorageResult<Vec<ServiceSummary>> {
        let since = Utc::now() - window;
        let records = self.store.query_operational(None, since).await?;

        let mut by_service: HashMap<String, Vec<OperationalRecord>> = HashMap::new();
        for record in records {
            by_service
                .entry(record.service_id.clone())
                .or_default()
                .push(record);
        }

        let mut summaries: Vec<ServiceSummary> = by_service
            .into_iter()
            .map(|(service_id, records)| ServiceSummary {
                service_id,
                summary: Summary::from_records(&records),
            })
            .collect();

        // Descending traffic, service id as tie-breaker for stable output.
        summaries.sort_by(|a, b| {
            b.summary
                .total_requests
                .cmp(&a.summary.total_requests)
                .then_with(|| a.service_id.cmp(&b.service_id))
        });

        Ok(summaries)
    }
}
