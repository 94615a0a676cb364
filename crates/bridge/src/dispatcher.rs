use std::{env, sync::Arc};

use domain::{
    events::DEFAULT_REGION, service::Environment, EnvironmentView, InvocationEvent,
    ServiceDefinition,
};

use crate::error::Result;
use crate::invoker::{FunctionInvoker, InvokeRequest};

/// Delivers invocation events to the functions of one service
pub struct Dispatcher<I> {
    invoker: Arc<I>,
    service: Arc<ServiceDefinition>,
}

impl<I: FunctionInvoker> Dispatcher<I> {
    pub fn new(invoker: Arc<I>, service: Arc<ServiceDefinition>) -> Self {
        Self { invoker, service }
    }

    /// Environment `function` is invoked with, on top of `process`
    pub fn environment<P>(&self, function: &str, process: P) -> EnvironmentView
    where
        P: IntoIterator<Item = (String, String)>,
    {
        let empty = Environment::new();
        let region = self
            .service
            .provider
            .region
            .as_deref()
            .unwrap_or(DEFAULT_REGION);

        EnvironmentView::layered(
            region,
            process,
            &self.service.provider.environment,
            self.service.function_environment(function).unwrap_or(&empty),
        )
    }

    pub async fn dispatch(&self, function: &str, event: &InvocationEvent) -> Result<()> {
        let environment = self.environment(function, process_environment());
        let payload = serde_json::to_vec(event)?;
        let request = InvokeRequest::new(
            self.service.function_identifier(function),
            payload,
            environment,
        );

        self.invoker.invoke(request).await
    }
}

fn process_environment() -> impl Iterator<Item = (String, String)> {
    // non-UTF-8 variables cannot be forwarded
    env::vars_os().filter_map(|(key, value)| {
        Some((key.into_string().ok()?, value.into_string().ok()?))
    })
}
