/// Queue bindings
pub mod binding;

/// Queue name and creation attribute resolution
pub mod resolver;

pub use binding::{QueueBinding, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use resolver::{queue_name_from_arn, resolve_creation_properties, resolve_queue_name};
