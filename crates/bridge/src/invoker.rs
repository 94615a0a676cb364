use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_lambda::{
    config::Credentials, error::DisplayErrorContext, primitives::Blob, types::InvocationType,
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use derive_new::new;
use domain::EnvironmentView;
use serde::Serialize;

use crate::error::{Error, Result};

/// Lambda rejects client contexts above this many bytes
pub const MAX_CLIENT_CONTEXT: usize = 3583;

const LOCAL_ACCESS_KEY: &str = "offline";
const LOCAL_SECRET_KEY: &str = "offline";

/// One event delivery to a function
#[derive(Clone, Debug, new)]
pub struct InvokeRequest {
    /// Identifier the function host knows the function by
    pub function: String,
    pub payload: Vec<u8>,
    pub environment: EnvironmentView,
}

/// Fire-and-forget delivery of an event to a function
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, request: InvokeRequest) -> Result<()>;
}

/// [`FunctionInvoker`] over the Lambda API of a local function host
pub struct LambdaInvoker {
    client: Client,
}

impl LambdaInvoker {
    pub async fn connect(endpoint: &str, region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(endpoint)
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                LOCAL_ACCESS_KEY,
                LOCAL_SECRET_KEY,
                None,
                None,
                "offline-lambda",
            ))
            .load()
            .await;

        tracing::info!("Lambda client initialized for {}", endpoint);

        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<()> {
        let InvokeRequest {
            function,
            payload,
            environment,
        } = request;

        let output = self
            .client
            .invoke()
            .function_name(&function)
            .invocation_type(InvocationType::Event)
            .set_client_context(client_context(&environment)?)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| Error::invocation(&function, DisplayErrorContext(e)))?;

        if let Some(function_error) = output.function_error() {
            return Err(Error::invocation(function, function_error));
        }

        tracing::debug!("Invoked {} (status {})", function, output.status_code());
        Ok(())
    }
}

#[derive(Serialize)]
struct ClientContext<'a> {
    env: BTreeMap<&'a str, &'a str>,
}

/// Base64 JSON client context carrying the configured part of the environment.
/// `None` when it would not fit the Lambda limit.
pub fn client_context(environment: &EnvironmentView) -> Result<Option<String>> {
    let context = ClientContext {
        env: environment.configured(),
    };
    let encoded = STANDARD.encode(serde_json::to_vec(&context)?);

    if encoded.len() > MAX_CLIENT_CONTEXT {
        tracing::warn!(
            "Environment of {} bytes does not fit the client context, sending none",
            encoded.len()
        );
        return Ok(None);
    }

    Ok(Some(encoded))
}
