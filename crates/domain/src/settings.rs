use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::errors::{Error, Result};
use crate::events::{DEFAULT_EVENT_SOURCE, DEFAULT_REGION};

pub const DEFAULT_QUEUE_HOST: &str = "localhost";
pub const DEFAULT_QUEUE_PORT: u16 = 4576;
pub const DEFAULT_LAMBDA_ENDPOINT: &str = "http://localhost:3002";

/// `serverless-offline` section, only the invocation endpoint matters here
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OfflineSettings {
    pub endpoint: Option<String>,
}

impl OfflineSettings {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_LAMBDA_ENDPOINT)
    }
}

/// Queue runtime section as written in the service definition
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueRuntimeSettings {
    pub endpoint: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(default)]
    pub https: bool,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub auto_create: bool,
    pub event_source: Option<String>,
    pub idle_delay_ms: Option<u64>,
    pub retry_initial_ms: Option<u64>,
    pub retry_max_ms: Option<u64>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Pacing of one poll loop
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollingSettings {
    /// Pause after an empty receive. Zero re-polls immediately.
    pub idle_delay: Duration,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            idle_delay: Duration::ZERO,
            retry_initial: Duration::from_millis(200),
            retry_max: Duration::from_secs(10),
        }
    }
}

/// Resolved queue runtime configuration, read-only once polling starts
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueueRuntimeConfig {
    pub host: String,
    pub port: Option<u16>,
    pub endpoint: String,
    pub region: String,
    pub auto_create: bool,
    pub credentials: Option<StaticCredentials>,
    pub event_source: String,
    pub polling: PollingSettings,
}

impl QueueRuntimeSettings {
    /// Derives host and port from an explicit endpoint, or builds the endpoint
    /// from host and port. `fallback_region` applies when no region is set here.
    pub fn resolve(&self, fallback_region: Option<&str>) -> Result<QueueRuntimeConfig> {
        let (host, port, endpoint) = match &self.endpoint {
            Some(endpoint) => {
                let url = Url::parse(endpoint).map_err(|e| Error::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                })?;
                let host = url.host_str().ok_or_else(|| Error::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    message: "missing host".to_string(),
                })?;
                (host.to_string(), url.port_or_known_default(), endpoint.clone())
            }
            None => {
                let host = self.host.as_deref().unwrap_or(DEFAULT_QUEUE_HOST);
                let port = self.port.unwrap_or(DEFAULT_QUEUE_PORT);
                let scheme = if self.https { "https" } else { "http" };
                (host.to_string(), Some(port), format!("{scheme}://{host}:{port}"))
            }
        };

        let credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StaticCredentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            _ => None,
        };

        let defaults = PollingSettings::default();
        let polling = PollingSettings {
            idle_delay: self
                .idle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.idle_delay),
            retry_initial: self
                .retry_initial_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_initial),
            retry_max: self
                .retry_max_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max),
        };

        Ok(QueueRuntimeConfig {
            host,
            port,
            endpoint,
            region: self
                .region
                .as_deref()
                .or(fallback_region)
                .unwrap_or(DEFAULT_REGION)
                .to_string(),
            auto_create: self.auto_create,
            credentials,
            event_source: self
                .event_source
                .clone()
                .unwrap_or_else(|| DEFAULT_EVENT_SOURCE.to_string()),
            polling,
        })
    }
}
