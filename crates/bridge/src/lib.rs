//! Local bridge from queues to function handlers.
//!
//! One poll loop per queue binding receives a batch, delivers it to the
//! function as a queue event and deletes the batch once delivery succeeded.

/// Runtime settings
pub mod config;

/// Bridge errors
pub mod error;

/// Queue service client
pub mod queue;

/// Function invocation
pub mod invoker;

/// Event dispatch
pub mod dispatcher;

/// Per-binding poll loop
pub mod poller;

/// Startup and shutdown of all loops
pub mod supervisor;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use invoker::{FunctionInvoker, InvokeRequest, LambdaInvoker};
pub use poller::{LoopReport, PollLoop};
pub use queue::{QueueService, SqsQueue};
pub use supervisor::{BindingFailure, Supervisor};
