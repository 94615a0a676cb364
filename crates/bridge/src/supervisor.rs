use std::sync::Arc;

use domain::{
    queues::{resolve_creation_properties, resolve_queue_name},
    EventSource, QueueBinding, QueueRuntimeConfig, ServiceDefinition,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::invoker::FunctionInvoker;
use crate::poller::{LoopReport, PollLoop};
use crate::queue::QueueService;

/// A binding whose setup failed; other bindings are unaffected
#[derive(Debug)]
pub struct BindingFailure {
    pub function: String,
    pub error: Error,
}

/// Owns one poll loop per queue binding
pub struct Supervisor {
    tasks: JoinSet<LoopReport>,
    cancel: CancellationToken,
    failures: Vec<BindingFailure>,
}

impl Supervisor {
    /// Sets up every binding of the service and starts its loop. Each loop
    /// stops when `cancel` fires.
    pub async fn start<Q, I>(
        service: Arc<ServiceDefinition>,
        config: &QueueRuntimeConfig,
        queue: Arc<Q>,
        invoker: Arc<I>,
        cancel: CancellationToken,
    ) -> Self
    where
        Q: QueueService + 'static,
        I: FunctionInvoker + 'static,
    {
        tracing::info!("Starting Offline SQS.");

        let dispatcher = Arc::new(Dispatcher::new(invoker, service.clone()));
        let mut supervisor = Self {
            tasks: JoinSet::new(),
            cancel,
            failures: Vec::new(),
        };

        for binding in QueueBinding::collect(&service) {
            tracing::info!("SQS for {}:", binding.function);

            let function = binding.function.clone();
            match prepare(binding, &service, config, &queue, &dispatcher).await {
                Ok(poll_loop) => {
                    supervisor
                        .tasks
                        .spawn(poll_loop.run(supervisor.cancel.child_token()));
                }
                Err(error) => {
                    tracing::error!("Queue setup for {} failed: {}", function, error);
                    supervisor.failures.push(BindingFailure { function, error });
                }
            }
        }

        supervisor
    }

    /// Number of loops still running
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    pub fn failures(&self) -> &[BindingFailure] {
        &self.failures
    }

    /// Stops every loop and waits for them to finish
    pub async fn shutdown(mut self) -> Vec<LoopReport> {
        self.cancel.cancel();

        let mut reports = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => tracing::error!("Poll loop ended abnormally: {}", err),
            }
        }
        reports
    }
}

async fn prepare<Q, I>(
    binding: QueueBinding,
    service: &ServiceDefinition,
    config: &QueueRuntimeConfig,
    queue: &Arc<Q>,
    dispatcher: &Arc<Dispatcher<I>>,
) -> Result<PollLoop<Q, I>>
where
    Q: QueueService,
    I: FunctionInvoker,
{
    let queue_name = resolve_queue_name(&binding, &service.resources)?;
    tracing::info!("Queue Name: {}", queue_name);

    if config.auto_create {
        let attributes = resolve_creation_properties(&binding, &service.resources)?;
        queue.ensure_queue(&queue_name, &attributes).await?;
    }

    let queue_url = queue.resolve_url(&queue_name).await?;
    let source = EventSource::for_binding(&binding, &queue_name, service, &config.event_source);

    Ok(PollLoop::new(
        binding,
        queue_name,
        queue_url,
        source,
        config.polling,
        queue.clone(),
        dispatcher.clone(),
    ))
}
