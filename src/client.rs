//! HTTP transport for the monitoring services
//!
//! `MetricsClient` posts the SOAP request documents built by
//! [`crate::protocol::request`] to the security server and feeds the
//! response bodies through the tolerant parsers. Transport failures
//! (unreachable server, timeout, non-2xx status) surface as errors for the
//! collection cycle to handle; document-level parse failures have already
//! been absorbed by the parser and show up as empty batches.

use anyhow::{Context, Result};
use tracing::{instrument, trace};

use crate::OperationalRecord;
use crate::config::Config;
use crate::identifier::XRoadIdentifier;
use crate::protocol::{
    HealthReport, SearchWindow, build_health_data_request, build_operational_data_request,
    parse_health_data, parse_operational_data,
};

/// Client for a single security server's monitoring endpoint.
///
/// The underlying HTTP client is reused across requests.
pub struct MetricsClient {
    client: reqwest::Client,
    endpoint: String,
    requester: XRoadIdentifier,
    instance: String,
    client_header: String,
}

impl MetricsClient {
    pub fn new(config: &Config) -> Result<Self> {
        let requester = XRoadIdentifier::parse_compact(&config.client_id)
            .context("invalid client_id in configuration")?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.xroad_server.clone(),
            requester,
            instance: config.xroad_instance.clone(),
            client_header: config.client_id.clone(),
        })
    }

    /// Fetch operational records for a search window.
    #[instrument(skip(self, client_filter), fields(endpoint = %self.endpoint))]
    pub async fn fetch_operational_data(
        &self,
        window: &SearchWindow,
        client_filter: Option<&XRoadIdentifier>,
    ) -> Result<Vec<OperationalRecord>> {
        let envelope = build_operational_data_request(
            window,
            &self.requester,
            client_filter,
            &self.instance,
        )?;

        let body = self.post(envelope).await?;
        let records = parse_operational_data(&body);
        trace!("received {} operational records", records.len());
        Ok(records)
    }

    /// Fetch the current health report.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn fetch_health_data(&self) -> Result<HealthReport> {
        let envelope = build_health_data_request(&self.requester, &self.instance)?;

        let body = self.post(envelope).await?;
        let report = parse_health_data(&body);
        trace!("received health data for {} services", report.services.len());
        Ok(report)
    }

    async fn post(&self, envelope: String) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .header("X-Road-Client", &self.client_header)
            .body(envelope)
            .send()
            .await
            .context("failed to reach security server")?;

        if !response.status().is_success() {
            anyhow::bail!("security server returned HTTP {}", response.status());
        }

        response
            .text()
            .await
            .context("failed to read security server response")
    }
}
