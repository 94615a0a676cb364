//! Offline SQS Domain Models

/// Declarative service definition
pub mod service;

/// Configuration values classified at parse time
pub mod value;

/// Queue bindings and name resolution
pub mod queues;

/// Queue runtime settings
pub mod settings;

/// Invocation event translation
pub mod events;

/// Invocation-scoped environment
pub mod environment;

/// Domain errors
pub mod errors;

#[cfg(test)]
mod testing;

pub use environment::EnvironmentView;
pub use errors::{Error, Result};
pub use events::{EventSource, InvocationEvent, MessageAttribute, ReceivedMessage};
pub use queues::QueueBinding;
pub use service::ServiceDefinition;
pub use settings::{PollingSettings, QueueRuntimeConfig};
pub use value::PropertyValue;
