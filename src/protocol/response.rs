//! Tolerant parsing of monitoring response documents
//!
//! The security server's responses are heterogeneous: most payload fields
//! are optional and real deployments omit them freely. Extraction therefore
//! follows one discipline throughout:
//!
//! - a missing field gets a documented default (`"Unknown"` for identifiers,
//!   `0` for sizes and counts, `false` for success, absent for timestamps);
//! - a malformed record is skipped with a warning, the rest of the batch
//!   survives;
//! - a document that is not well-formed XML yields an empty result and a
//!   warning. Nothing in this module raises past its caller.
//!
//! Wire timestamps are epoch milliseconds; millisecond precision is
//! preserved in the parsed records.

use chrono::{DateTime, Utc};
use roxmltree::{Document, Node};
use tracing::warn;

use crate::{HealthSnapshot, OperationalRecord};

use super::MONITORING_NS;

/// Parsed `getSecurityServerHealthData` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    pub startup_timestamp: Option<DateTime<Utc>>,
    pub statistics_period_seconds: Option<u64>,
    pub services: Vec<ServiceHealth>,
}

/// Health figures for one service, before the collection cycle stamps them
/// into a [`HealthSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceHealth {
    pub service_code: String,
    pub last_successful_request: Option<DateTime<Utc>>,
    pub last_unsuccessful_request: Option<DateTime<Utc>>,
    pub successful_count: u64,
    pub unsuccessful_count: u64,
    pub avg_duration_ms: f64,
}

impl ServiceHealth {
    /// Freeze these figures into an immutable point-in-time snapshot.
    pub fn into_snapshot(self, collected_at: DateTime<Utc>) -> HealthSnapshot {
        HealthSnapshot {
            service_code: self.service_code,
            last_successful_request: self.last_successful_request,
            last_unsuccessful_request: self.last_unsuccessful_request,
            successful_count: self.successful_count,
            unsuccessful_count: self.unsuccessful_count,
            avg_duration_ms: self.avg_duration_ms,
            collected_at,
        }
    }
}

/// Decode an operational data response into typed records.
///
/// Returns one record per well-formed `operationalDataRecord` element;
/// malformed records are skipped individually, an unparseable document
/// yields an empty batch.
pub fn parse_operational_data(document: &str) -> Vec<OperationalRecord> {
    let doc = match Document::parse(document) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("discarding unparseable operational data response: {e}");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for node in monitoring_elements(&doc, "operationalDataRecord") {
        match extract_record(node) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("skipping malformed operational record: {reason}"),
        }
    }
    records
}

/// Decode a health data response.
///
/// Each service entry and its nested statistics block are independently
/// optional; an unparseable document yields an empty report.
pub fn parse_health_data(document: &str) -> HealthReport {
    let doc = match Document::parse(document) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("discarding unparseable health data response: {e}");
            return HealthReport::default();
        }
    };

    let root = doc.root();
    let services = monitoring_elements(&doc, "serviceEvents")
        .map(extract_service_health)
        .collect();

    HealthReport {
        startup_timestamp: millis_field(root, "monitoringStartupTimestamp"),
        statistics_period_seconds: integer_field(root, "statisticsPeriodSeconds"),
        services,
    }
}

fn extract_record(node: Node<'_, '_>) -> Result<OperationalRecord, String> {
    let request_timestamp = millis_field_strict(node, "requestInTs")?;
    let response_timestamp = millis_field_strict(node, "responseOutTs")?;

    let duration_ms = match (request_timestamp, response_timestamp) {
        (Some(request), Some(response)) => {
            let delta = response.signed_duration_since(request).num_milliseconds();
            if delta < 0 {
                return Err(format!("response precedes request by {}ms", -delta));
            }
            Some(delta)
        }
        _ => None,
    };

    Ok(OperationalRecord {
        service_id: text_field(node, "serviceXRoadRequestId")
            .unwrap_or("Unknown")
            .to_string(),
        client_id: text_field(node, "clientXRoadRequestId")
            .unwrap_or("Unknown")
            .to_string(),
        producer_id: text_field(node, "producerId").unwrap_or("Unknown").to_string(),
        request_timestamp,
        response_timestamp,
        request_size: size_field(node, "requestSize")?,
        response_size: size_field(node, "responseSize")?,
        succeeded: text_field(node, "succeeded")
            .map(|raw| raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        error_message: text_field(node, "faultString").map(str::to_string),
        duration_ms,
    })
}

fn extract_service_health(node: Node<'_, '_>) -> ServiceHealth {
    let stats = descendant(node, "lastPeriodStatistics");

    let (successful_count, unsuccessful_count, avg_duration_ms) = match stats {
        Some(stats) => (
            integer_field(stats, "successfulRequestCount").unwrap_or(0),
            integer_field(stats, "unsuccessfulRequestCount").unwrap_or(0),
            float_field(stats, "requestMinDuration").unwrap_or(0.0),
        ),
        None => (0, 0, 0.0),
    };

    ServiceHealth {
        service_code: text_field(node, "serviceCode").unwrap_or("Unknown").to_string(),
        last_successful_request: millis_field(node, "lastSuccessfulRequestTimestamp"),
        last_unsuccessful_request: millis_field(node, "lastUnsuccessfulRequestTimestamp"),
        successful_count,
        unsuccessful_count,
        avg_duration_ms,
    }
}

fn monitoring_elements<'a, 'input>(
    doc: &'a Document<'input>,
    local_name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    doc.root().descendants().filter(move |n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace() == Some(MONITORING_NS)
    })
}

fn descendant<'a, 'input>(scope: Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    scope.descendants().find(|n| {
        n.is_element()
            && n.tag_name().name() == local_name
            && n.tag_name().namespace() == Some(MONITORING_NS)
    })
}

fn text_field<'a>(scope: Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    descendant(scope, local_name)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Epoch-millisecond timestamp; a present-but-invalid value makes the whole
/// record malformed.
fn millis_field_strict(
    scope: Node<'_, '_>,
    local_name: &str,
) -> Result<Option<DateTime<Utc>>, String> {
    match text_field(scope, local_name) {
        None => Ok(None),
        Some(raw) => {
            let millis: i64 = raw
                .parse()
                .map_err(|_| format!("{local_name} is not an integer: '{raw}'"))?;
            DateTime::from_timestamp_millis(millis)
                .map(Some)
                .ok_or_else(|| format!("{local_name} is out of range: '{raw}'"))
        }
    }
}

/// Epoch-millisecond timestamp; an invalid value is treated as absent.
fn millis_field(scope: Node<'_, '_>, local_name: &str) -> Option<DateTime<Utc>> {
    let raw = text_field(scope, local_name)?;
    match raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis) {
        Some(ts) => Some(ts),
        None => {
            warn!("ignoring invalid {local_name} value '{raw}'");
            None
        }
    }
}

fn size_field(scope: Node<'_, '_>, local_name: &str) -> Result<u64, String> {
    match text_field(scope, local_name) {
        None => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("{local_name} is not a non-negative integer: '{raw}'")),
    }
}

fn integer_field(scope: Node<'_, '_>, local_name: &str) -> Option<u64> {
    let raw = text_field(scope, local_name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {local_name} value '{raw}'");
            None
        }
    }
}

fn float_field(scope: Node<'_, '_>, local_name: &str) -> Option<f64> {
    let raw = text_field(scope, local_name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring invalid {local_name} value '{raw}'");
            None
        }
    }
}
