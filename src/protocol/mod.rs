//! X-Road monitoring protocol documents
//!
//! Request construction and response parsing for the security server's
//! monitoring services. The SOAP/XML encoding is confined to this module:
//! everything above it works with typed records, everything below it is
//! plain strings on the wire.
//!
//! ## Namespaces
//!
//! - `http://schemas.xmlsoap.org/soap/envelope/` - SOAP envelope
//! - `http://x-road.eu/xsd/xroad.xsd` - request header elements
//! - `http://x-road.eu/xsd/identifiers` - actor identifiers
//! - `http://x-road.eu/xsd/monitoring` - monitoring payloads

pub mod request;
pub mod response;

pub use request::{SearchWindow, build_health_data_request, build_operational_data_request};
pub use response::{HealthReport, ServiceHealth, parse_health_data, parse_operational_data};

/// Namespace of the monitoring payload elements
pub const MONITORING_NS: &str = "http://x-road.eu/xsd/monitoring";

/// Protocol version carried in every request header
pub const PROTOCOL_VERSION: &str = "4.0";
