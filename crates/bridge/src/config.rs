use std::{env, fs, path::Path, sync::Arc};

use domain::{QueueRuntimeConfig, ServiceDefinition};

use crate::error::Result;

pub const SERVICE_FILE_VAR: &str = "OFFLINE_SQS_SERVICE_FILE";
pub const DEFAULT_SERVICE_FILE: &str = "serverless.json";
pub const QUEUE_ENDPOINT_VAR: &str = "OFFLINE_SQS_ENDPOINT";
pub const LAMBDA_ENDPOINT_VAR: &str = "OFFLINE_LAMBDA_ENDPOINT";

/// Endpoint overrides taken from the process environment
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub queue_endpoint: Option<String>,
    pub lambda_endpoint: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            queue_endpoint: env::var(QUEUE_ENDPOINT_VAR).ok(),
            lambda_endpoint: env::var(LAMBDA_ENDPOINT_VAR).ok(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub service: Arc<ServiceDefinition>,
    pub queue: QueueRuntimeConfig,
    pub lambda_endpoint: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let path = env::var(SERVICE_FILE_VAR).unwrap_or(DEFAULT_SERVICE_FILE.to_string());
        Self::load(path, Overrides::from_env())
    }

    pub fn load(path: impl AsRef<Path>, overrides: Overrides) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents, overrides)
    }

    pub fn from_json(contents: &str, overrides: Overrides) -> Result<Self> {
        let mut service: ServiceDefinition = serde_json::from_str(contents)?;

        if let Some(endpoint) = overrides.queue_endpoint {
            service.custom.sqs.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = overrides.lambda_endpoint {
            service.custom.offline.endpoint = Some(endpoint);
        }

        let queue = service
            .custom
            .sqs
            .resolve(service.provider.region.as_deref())?;
        let lambda_endpoint = service.custom.offline.endpoint().to_string();

        Ok(Self {
            service: Arc::new(service),
            queue,
            lambda_endpoint,
        })
    }

    /// Region the function host is addressed in
    pub fn region(&self) -> &str {
        self.service
            .provider
            .region
            .as_deref()
            .unwrap_or(domain::events::DEFAULT_REGION)
    }
}
