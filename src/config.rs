use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Collector configuration.
///
/// Loaded from a JSON file; everything except the security server endpoint
/// and the client identifier has a default.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// URL of the security server's monitoring endpoint
    pub xroad_server: String,

    /// Compact member identifier of the requesting client (`CLASS/CODE[/...]`)
    pub client_id: String,

    /// X-Road instance the identifiers belong to
    #[serde(default = "default_instance")]
    pub xroad_instance: String,

    /// Transport timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Verify the server's TLS certificate
    #[serde(default = "default_ssl_verify")]
    pub ssl_verify: bool,

    /// Trailing window queried for operational data, in hours
    #[serde(default = "default_collection_window_hours")]
    pub collection_window_hours: u32,

    /// Pause between successful collection cycles, in minutes
    #[serde(default = "default_poll_interval_minutes")]
    pub poll_interval_minutes: u32,

    /// Pause after a failed collection cycle, in seconds
    #[serde(default = "default_retry_pause_seconds")]
    pub retry_pause_seconds: u64,

    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Optional compact member identifier restricting operational data
    /// collection to exchanges involving that member
    pub client_filter: Option<String>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes as u64 * 60)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_secs(self.retry_pause_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn collection_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.collection_window_hours as i64)
    }
}

fn default_instance() -> String {
    "DEV".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_ssl_verify() -> bool {
    true
}

fn default_collection_window_hours() -> u32 {
    2
}

fn default_poll_interval_minutes() -> u32 {
    15
}

fn default_retry_pause_seconds() -> u64 {
    60
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./xroad_telemetry.db")
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
