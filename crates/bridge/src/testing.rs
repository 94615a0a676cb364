//! In-memory queue service and function host for tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::ReceivedMessage;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;

use crate::error::{Error, Result};
use crate::invoker::{FunctionInvoker, InvokeRequest};
use crate::queue::QueueService;

pub fn message(id: &str, body: &str) -> ReceivedMessage {
    ReceivedMessage {
        message_id: id.to_string(),
        receipt_handle: format!("handle-{id}"),
        body: Some(body.to_string()),
        ..Default::default()
    }
}

pub fn queue_url(name: &str) -> String {
    format!("http://localhost:4576/queue/{name}")
}

/// Queue service replaying scripted receive results per URL.
///
/// Once every script has run out, receives return empty batches and
/// `drained` is cancelled.
#[derive(Default)]
pub struct FakeQueue {
    scripts: Mutex<HashMap<String, VecDeque<Result<Vec<ReceivedMessage>>>>>,
    receives: Mutex<Vec<(String, i32)>>,
    deletes: Mutex<Vec<(String, Vec<String>)>>,
    created: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    unknown_queues: Mutex<HashSet<String>>,
    failing_deletes: Mutex<usize>,
    pub drained: CancellationToken,
}

impl FakeQueue {
    pub fn script(&self, url: &str, results: Vec<Result<Vec<ReceivedMessage>>>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .extend(results);
    }

    pub fn unknown(&self, name: &str) {
        self.unknown_queues.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_deletes(&self, count: usize) {
        *self.failing_deletes.lock().unwrap() = count;
    }

    pub fn receives(&self) -> Vec<(String, i32)> {
        self.receives.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<(String, Vec<String>)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueService for FakeQueue {
    async fn ensure_queue(&self, name: &str, attributes: &BTreeMap<String, String>) -> Result<()> {
        self.created
            .lock()
            .unwrap()
            .push((name.to_string(), attributes.clone()));
        self.unknown_queues.lock().unwrap().remove(name);
        Ok(())
    }

    async fn resolve_url(&self, name: &str) -> Result<String> {
        if self.unknown_queues.lock().unwrap().contains(name) {
            return Err(Error::queue(format!("queue {name} does not exist")));
        }
        Ok(queue_url(name))
    }

    async fn receive(&self, url: &str, max_messages: i32) -> Result<Vec<ReceivedMessage>> {
        self.receives
            .lock()
            .unwrap()
            .push((url.to_string(), max_messages));

        let mut scripts = self.scripts.lock().unwrap();
        let next = scripts.get_mut(url).and_then(VecDeque::pop_front);
        if scripts.values().all(VecDeque::is_empty) {
            self.drained.cancel();
        }
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn delete_batch(&self, url: &str, messages: &[ReceivedMessage]) -> Result<()> {
        let mut failing = self.failing_deletes.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::queue("delete rejected"));
        }

        let ids = messages.iter().map(|m| m.message_id.clone()).collect();
        self.deletes.lock().unwrap().push((url.to_string(), ids));
        Ok(())
    }
}

/// Function host recording every request
#[derive(Default)]
pub struct FakeInvoker {
    requests: Mutex<Vec<InvokeRequest>>,
    failing: Mutex<usize>,
}

impl FakeInvoker {
    /// Fails the next `count` invocations
    pub fn failing(count: usize) -> Self {
        Self {
            failing: Mutex::new(count),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FunctionInvoker for FakeInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<()> {
        let function = request.function.clone();
        self.requests.lock().unwrap().push(request);

        let mut failing = self.failing.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(Error::invocation(function, "function host unreachable"));
        }
        Ok(())
    }
}

/// Formatted log output of the current thread
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Captures events until the guard drops. Tests run on a current-thread
/// runtime, so spawned loops log into the same buffer.
pub fn capture_logs() -> (LogBuffer, DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(false)
        .finish();

    (buffer, tracing::subscriber::set_default(subscriber))
}
