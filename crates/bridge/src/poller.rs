use std::{sync::Arc, time::Duration};

use domain::{events::translate, EventSource, PollingSettings, QueueBinding};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::invoker::FunctionInvoker;
use crate::queue::QueueService;

/// Result of one receive, dispatch, acknowledge cycle
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CycleOutcome {
    /// The long poll returned no message
    Idle,
    /// A batch of this many messages was delivered and deleted
    Delivered(usize),
}

/// Counters of a stopped loop
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LoopReport {
    pub function: String,
    pub queue: String,
    pub cycles: u64,
    pub batches: u64,
    pub messages: u64,
    pub failures: u64,
}

/// Continuously moves messages of one queue to one function.
///
/// Cycles never overlap: a batch is deleted only after its dispatch
/// completed, and the next receive starts only after that.
pub struct PollLoop<Q, I> {
    binding: QueueBinding,
    queue_name: String,
    queue_url: String,
    source: EventSource,
    polling: PollingSettings,
    queue: Arc<Q>,
    dispatcher: Arc<Dispatcher<I>>,
}

impl<Q, I> PollLoop<Q, I>
where
    Q: QueueService,
    I: FunctionInvoker,
{
    pub fn new(
        binding: QueueBinding,
        queue_name: String,
        queue_url: String,
        source: EventSource,
        polling: PollingSettings,
        queue: Arc<Q>,
        dispatcher: Arc<Dispatcher<I>>,
    ) -> Self {
        Self {
            binding,
            queue_name,
            queue_url,
            source,
            polling,
            queue,
            dispatcher,
        }
    }

    /// Polls until `cancel` fires. Cycle failures are logged and retried
    /// after a growing pause; the failed batch stays on the queue.
    pub async fn run(self, cancel: CancellationToken) -> LoopReport {
        let mut report = LoopReport {
            function: self.binding.function.clone(),
            queue: self.queue_name.clone(),
            ..Default::default()
        };
        let mut backoff = Backoff::new(self.polling.retry_initial, self.polling.retry_max);

        tracing::info!(
            function = %self.binding.function,
            queue = %self.queue_name,
            "Polling {}",
            self.queue_url
        );

        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.cycle() => outcome,
            };
            report.cycles += 1;

            let pause = match outcome {
                Ok(CycleOutcome::Idle) => {
                    backoff.reset();
                    self.polling.idle_delay
                }
                Ok(CycleOutcome::Delivered(count)) => {
                    backoff.reset();
                    report.batches += 1;
                    report.messages += count as u64;
                    Duration::ZERO
                }
                Err(err) => {
                    report.failures += 1;
                    tracing::error!(
                        function = %self.binding.function,
                        queue = %self.queue_name,
                        "Poll cycle failed: {}",
                        err
                    );
                    backoff.next_delay()
                }
            };

            if pause.is_zero() {
                // keep sibling loops scheduled on the shared runtime
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        tracing::info!(
            function = %report.function,
            queue = %report.queue,
            "Stopped after {} cycles",
            report.cycles
        );
        report
    }

    /// Receive, translate, dispatch, then acknowledge the whole batch.
    pub async fn cycle(&self) -> Result<CycleOutcome> {
        let messages = self
            .queue
            .receive(&self.queue_url, self.binding.batch_size)
            .await?;
        if messages.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        tracing::info!(
            function = %self.binding.function,
            queue = %self.queue_name,
            messages = messages.len(),
            "{} (λ: {})",
            self.queue_name,
            self.binding.function
        );

        let event = translate(&self.source, &messages);
        self.dispatcher
            .dispatch(&self.binding.function, &event)
            .await?;
        self.queue.delete_batch(&self.queue_url, &messages).await?;

        Ok(CycleOutcome::Delivered(messages.len()))
    }
}

/// Exponential pause between failed cycles
#[derive(Clone, Debug)]
struct Backoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Backoff {
    fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial,
            Some(current) => current.saturating_mul(2),
        }
        .min(self.max);
        self.current = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{capture_logs, message, queue_url, FakeInvoker, FakeQueue};
    use crate::Error;
    use domain::ServiceDefinition;
    use serde_json::Value;

    fn binding() -> QueueBinding {
        QueueBinding {
            function: "worker".to_string(),
            arn: Some("arn:aws:sqs:us-east-1:000000000000:test-sqs".to_string()),
            batch_size: 10,
            ..Default::default()
        }
    }

    fn instant() -> PollingSettings {
        PollingSettings {
            idle_delay: Duration::ZERO,
            retry_initial: Duration::ZERO,
            retry_max: Duration::ZERO,
        }
    }

    fn poll_loop(queue: Arc<FakeQueue>, invoker: Arc<FakeInvoker>) -> PollLoop<FakeQueue, FakeInvoker> {
        let service = Arc::new(ServiceDefinition {
            service: "app".to_string(),
            ..Default::default()
        });
        let binding = binding();
        let source = EventSource::for_binding(&binding, "test-sqs", &service, "queue");
        PollLoop::new(
            binding,
            "test-sqs".to_string(),
            queue_url("test-sqs"),
            source,
            instant(),
            queue,
            Arc::new(Dispatcher::new(invoker, service)),
        )
    }

    #[tokio::test]
    async fn delivers_then_deletes_the_batch() {
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::default());
        let url = queue_url("test-sqs");
        queue.script(&url, vec![Ok(vec![message("1", "hi"), message("2", "there")])]);

        let outcome = poll_loop(queue.clone(), invoker.clone()).cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Delivered(2));

        let requests = invoker.requests();
        assert_eq!(requests.len(), 1);
        let payload: Value = serde_json::from_slice(&requests[0].payload).unwrap();
        let record = &payload["Records"][0];
        assert_eq!(record["eventSource"], "queue");
        assert_eq!(record["body"], "hi");
        assert!(record["eventSourceARN"].as_str().unwrap().ends_with(":test-sqs"));
        assert_eq!(payload["Records"][1]["messageId"], "2");

        assert_eq!(
            queue.deletes(),
            vec![(url.clone(), vec!["1".to_string(), "2".to_string()])]
        );
        assert_eq!(queue.receives(), vec![(url, 10)]);
    }

    #[tokio::test]
    async fn empty_receive_does_nothing() {
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::default());

        let outcome = poll_loop(queue.clone(), invoker.clone()).cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Idle);
        assert!(invoker.requests().is_empty());
        assert!(queue.deletes().is_empty());
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_the_batch() {
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::failing(1));
        queue.script(&queue_url("test-sqs"), vec![Ok(vec![message("1", "hi")])]);

        let err = poll_loop(queue.clone(), invoker).cycle().await.unwrap_err();
        assert!(matches!(err, Error::Invocation { .. }));
        assert!(queue.deletes().is_empty());
    }

    #[tokio::test]
    async fn redelivers_after_a_failed_dispatch() {
        let (logs, _guard) = capture_logs();
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::failing(1));
        let url = queue_url("test-sqs");
        queue.script(
            &url,
            vec![Ok(vec![message("1", "hi")]), Ok(vec![message("1", "hi")])],
        );

        let report = poll_loop(queue.clone(), invoker.clone())
            .run(queue.drained.clone())
            .await;

        assert_eq!(report.cycles, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(report.batches, 1);
        assert_eq!(report.messages, 1);
        assert_eq!(invoker.requests().len(), 2);
        assert_eq!(queue.receives(), vec![(url.clone(), 10), (url.clone(), 10)]);
        assert_eq!(queue.deletes(), vec![(url, vec!["1".to_string()])]);

        let logs = logs.contents();
        assert!(logs.contains("ERROR"));
        assert!(logs.contains(
            "Poll cycle failed: Invocation of app-dev-worker failed: function host unreachable"
        ));
    }

    #[tokio::test]
    async fn keeps_polling_through_empty_receives_and_errors() {
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::default());
        let url = queue_url("test-sqs");
        queue.script(
            &url,
            vec![
                Ok(Vec::new()),
                Err(Error::queue("connection refused")),
                Ok(Vec::new()),
                Ok(vec![message("7", "late")]),
            ],
        );

        let report = poll_loop(queue.clone(), invoker.clone())
            .run(queue.drained.clone())
            .await;

        assert_eq!(report.cycles, 4);
        assert_eq!(report.failures, 1);
        assert_eq!(report.batches, 1);
        assert_eq!(invoker.requests().len(), 1);
        assert_eq!(queue.deletes(), vec![(url, vec!["7".to_string()])]);
    }

    #[tokio::test]
    async fn failed_delete_is_a_failed_cycle() {
        let queue = Arc::new(FakeQueue::default());
        let invoker = Arc::new(FakeInvoker::default());
        queue.script(&queue_url("test-sqs"), vec![Ok(vec![message("1", "hi")])]);
        queue.fail_deletes(1);

        let report = poll_loop(queue.clone(), invoker.clone())
            .run(queue.drained.clone())
            .await;

        assert_eq!(report.failures, 1);
        assert_eq!(report.batches, 0);
        assert!(queue.deletes().is_empty());
    }

    #[tokio::test]
    async fn stops_when_cancelled_up_front() {
        let queue = Arc::new(FakeQueue::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = poll_loop(queue.clone(), Arc::new(FakeInvoker::default()))
            .run(cancel)
            .await;

        assert_eq!(report.cycles, 0);
        assert!(queue.receives().is_empty());
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(200), Duration::from_millis(700));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(700));
        assert_eq!(backoff.next_delay(), Duration::from_millis(700));

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    }
}
