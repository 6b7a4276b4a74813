//! SOAP request builders for the monitoring services
//!
//! Both builders are pure functions of their inputs: no I/O, and the only
//! failure mode is a malformed identifier. The monitoring services live on
//! a well-known operator member (`GOV/MONITORING`) in the target instance.

use chrono::{DateTime, Utc};

use crate::identifier::{IdentifierError, IdentifierResult, XRoadIdentifier};

use super::PROTOCOL_VERSION;

/// Member class of the monitoring service operator
const MONITORING_MEMBER_CLASS: &str = "GOV";

/// Member code of the monitoring service operator
const MONITORING_MEMBER_CODE: &str = "MONITORING";

/// Service code for the operational data query
pub const OPERATIONAL_DATA_SERVICE: &str = "getSecurityServerOperationalData";

/// Service code for the health data query
pub const HEALTH_DATA_SERVICE: &str = "getSecurityServerHealthData";

/// Search window for an operational data query.
///
/// On the wire the bounds are encoded as whole-second epoch values;
/// sub-second precision is truncated. This is the protocol contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Build a `getSecurityServerOperationalData` request document.
///
/// When `client_filter` is given, a filter clause restricting results to
/// that member is embedded in the search criteria; absence means all
/// clients.
pub fn build_operational_data_request(
    window: &SearchWindow,
    requester: &XRoadIdentifier,
    client_filter: Option<&XRoadIdentifier>,
    instance: &str,
) -> IdentifierResult<String> {
    let records_from = window.from.timestamp();
    let records_to = window.to.timestamp();

    let client_filter_xml = match client_filter {
        Some(member) => {
            member.require_member()?;
            format!(
                r#"
                <m:client>
                    <id:xRoadInstance>{instance}</id:xRoadInstance>
                    <id:memberClass>{class}</id:memberClass>
                    <id:memberCode>{code}</id:memberCode>
                </m:client>"#,
                instance = xml_escape(instance),
                class = xml_escape(&member.member_class),
                code = xml_escape(&member.member_code),
            )
        }
        None => String::new(),
    };

    let body = format!(
        r#"<m:getSecurityServerOperationalData>
            <m:searchCriteria>
                <m:recordsFrom>{records_from}</m:recordsFrom>
                <m:recordsTo>{records_to}</m:recordsTo>{client_filter_xml}
            </m:searchCriteria>
        </m:getSecurityServerOperationalData>"#
    );

    build_envelope(requester, instance, OPERATIONAL_DATA_SERVICE, &body)
}

/// Build a `getSecurityServerHealthData` request document.
///
/// Health data is always current state, so the body carries no search
/// criteria.
pub fn build_health_data_request(
    requester: &XRoadIdentifier,
    instance: &str,
) -> IdentifierResult<String> {
    build_envelope(
        requester,
        instance,
        HEALTH_DATA_SERVICE,
        "<m:getSecurityServerHealthData/>",
    )
}

/// Wrap a body element into the common request envelope.
///
/// The header carries the requesting member, the fixed monitoring target
/// service, a timestamp-derived correlation id and the protocol version.
fn build_envelope(
    requester: &XRoadIdentifier,
    instance: &str,
    service_code: &str,
    body: &str,
) -> IdentifierResult<String> {
    if instance.is_empty() {
        return Err(IdentifierError::Malformed(
            "instance must be non-empty".to_string(),
        ));
    }
    requester.require_member()?;

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope
    xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/"
    xmlns:id="http://x-road.eu/xsd/identifiers"
    xmlns:m="http://x-road.eu/xsd/monitoring"
    xmlns:xrd="http://x-road.eu/xsd/xroad.xsd">
    <SOAP-ENV:Header>
        <xrd:client id:objectType="MEMBER">
            <id:xRoadInstance>{instance}</id:xRoadInstance>
            <id:memberClass>{client_class}</id:memberClass>
            <id:memberCode>{client_code}</id:memberCode>
        </xrd:client>
        <xrd:service id:objectType="SERVICE">
            <id:xRoadInstance>{instance}</id:xRoadInstance>
            <id:memberClass>{monitoring_class}</id:memberClass>
            <id:memberCode>{monitoring_code}</id:memberCode>
            <id:serviceCode>{service_code}</id:serviceCode>
        </xrd:service>
        <xrd:id>{correlation_id}</xrd:id>
        <xrd:protocolVersion>{protocol_version}</xrd:protocolVersion>
    </SOAP-ENV:Header>
    <SOAP-ENV:Body>
        {body}
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        instance = xml_escape(instance),
        client_class = xml_escape(&requester.member_class),
        client_code = xml_escape(&requester.member_code),
        monitoring_class = MONITORING_MEMBER_CLASS,
        monitoring_code = MONITORING_MEMBER_CODE,
        correlation_id = correlation_id(),
        protocol_version = PROTOCOL_VERSION,
    ))
}

/// Timestamp-derived per-request id.
///
/// Monotonic enough for correlating logs; global uniqueness is not a
/// contract of the protocol.
fn correlation_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
