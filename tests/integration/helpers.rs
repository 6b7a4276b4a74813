//! Helper functions for integration tests

use std::path::Path;

use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xroad_telemetry::config::Config;

pub fn test_config(endpoint: &str, db_path: &Path) -> Config {
    Config {
        xroad_server: endpoint.to_string(),
        client_id: "GOV/70000000".to_string(),
        xroad_instance: "DEV".to_string(),
        timeout: 2,
        ssl_verify: true,
        collection_window_hours: 1,
        poll_interval_minutes: 60,
        retry_pause_seconds: 60,
        database_path: db_path.to_path_buf(),
        client_filter: None,
    }
}

pub fn operational_record_xml(
    service: &str,
    client: &str,
    request_ts: i64,
    response_ts: i64,
    succeeded: bool,
) -> String {
    format!(
        r#"<m:operationalDataRecord>
            <m:serviceXRoadRequestId>{service}</m:serviceXRoadRequestId>
            <m:clientXRoadRequestId>{client}</m:clientXRoadRequestId>
            <m:requestInTs>{request_ts}</m:requestInTs>
            <m:responseOutTs>{response_ts}</m:responseOutTs>
            <m:requestSize>512</m:requestSize>
            <m:responseSize>2048</m:responseSize>
            <m:succeeded>{succeeded}</m:succeeded>
        </m:operationalDataRecord>"#
    )
}

pub fn operational_response(records: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
                   xmlns:m="http://x-road.eu/xsd/monitoring">
    <SOAP-ENV:Body>
        <m:getSecurityServerOperationalDataResponse>
            <m:operationalDataRecords>{records}</m:operationalDataRecords>
        </m:getSecurityServerOperationalDataResponse>
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

pub fn service_health_xml(code: &str, successful: u64, unsuccessful: u64, avg_ms: f64) -> String {
    format!(
        r#"<m:serviceEvents>
            <m:serviceCode>{code}</m:serviceCode>
            <m:lastSuccessfulRequestTimestamp>1700000100000</m:lastSuccessfulRequestTimestamp>
            <m:lastPeriodStatistics>
                <m:successfulRequestCount>{successful}</m:successfulRequestCount>
                <m:unsuccessfulRequestCount>{unsuccessful}</m:unsuccessfulRequestCount>
                <m:requestMinDuration>{avg_ms}</m:requestMinDuration>
            </m:lastPeriodStatistics>
        </m:serviceEvents>"#
    )
}

pub fn health_response(services: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
                   xmlns:m="http://x-road.eu/xsd/monitoring">
    <SOAP-ENV:Body>
        <m:getSecurityServerHealthDataResponse>
            <m:monitoringStartupTimestamp>1700000000000</m:monitoringStartupTimestamp>
            <m:statisticsPeriodSeconds>600</m:statisticsPeriodSeconds>
            <m:servicesEvents>{services}</m:servicesEvents>
        </m:getSecurityServerHealthDataResponse>
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

/// Mount responders for both monitoring services. The two request kinds
/// are told apart by the service code embedded in the request body.
pub async fn mount_monitoring_mocks(
    server: &MockServer,
    operational_body: String,
    health_body: String,
) {
    Mock::given(method("POST"))
        .and(body_string_contains("getSecurityServerOperationalData"))
        .respond_with(ResponseTemplate::new(200).set_body_string(operational_body))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("getSecurityServerHealthData"))
        .respond_with(ResponseTemplate::new(200).set_body_string(health_body))
        .mount(server)
        .await;
}
