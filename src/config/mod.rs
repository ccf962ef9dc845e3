// Configuration management from environment variables

use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::record_service::WriteAcknowledgement;
use crate::models::DEFAULT_MAX_IMAGE_BYTES;
use crate::store::{ReconciliationPolicy, StoreOptions};

/// Compiled-in record service endpoint. Empty until a deployment provides one
/// through `RECORD_SERVICE_URL` or the settings file.
pub const DEFAULT_RECORD_SERVICE_URL: &str = "";

/// Configuration settings for the inventory dashboard server
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    // Server configuration
    pub host: String,
    pub port: u16,
    /// Base URL encoded into scan links
    pub public_base_url: String,

    // Record service configuration
    pub record_service_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub write_acknowledgement: WriteAcknowledgement,

    // Store configuration
    pub reconciliation: ReconciliationPolicy,
    pub max_image_bytes: usize,

    /// Persisted user settings (endpoint override)
    pub settings_path: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl DashboardConfig {
    /// Creates configuration instance from environment variables with defaults
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup, falling back to defaults
    /// for missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let host = text("HOST", "0.0.0.0");
        let port = lookup("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(3000);
        let public_base_url = text("PUBLIC_BASE_URL", &format!("http://localhost:{}/", port));

        let record_service_url = text("RECORD_SERVICE_URL", DEFAULT_RECORD_SERVICE_URL);
        let request_timeout_secs = parsed("REQUEST_TIMEOUT_SECS").unwrap_or(30);
        let connect_timeout_secs = parsed("CONNECT_TIMEOUT_SECS").unwrap_or(5);
        let write_acknowledgement = lookup("WRITE_ACKNOWLEDGEMENT")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let reconciliation = lookup("RECONCILIATION_POLICY")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let max_image_bytes = parsed("MAX_IMAGE_BYTES")
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_MAX_IMAGE_BYTES);

        let settings_path = PathBuf::from(text("SETTINGS_PATH", "inventory-settings.json"));

        Self {
            host,
            port,
            public_base_url,
            record_service_url,
            request_timeout_secs,
            connect_timeout_secs,
            write_acknowledgement,
            reconciliation,
            max_image_bytes,
            settings_path,
        }
    }

    /// Returns formatted server address string (host:port)
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Largest request body the API accepts: a base64 image at the cap plus
    /// room for the rest of the record
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes / 3 * 4 + 64 * 1024
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            reconciliation: self.reconciliation,
            max_image_bytes: self.max_image_bytes,
            ..StoreOptions::default()
        }
    }
}
