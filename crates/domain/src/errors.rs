use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors. Each one is fatal to the binding it was raised for only.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("No resource defined with name {resource}")]
    MissingResource { resource: String },

    #[error("QueueName not found for function {function}")]
    MissingQueueName { function: String },

    #[error("QueueName not found in resource {resource} for function {function}")]
    MissingQueueNameProperty { resource: String, function: String },

    #[error("Invalid queue ARN: {arn}")]
    InvalidArn { arn: String },

    #[error("Invalid endpoint {endpoint}: {message}")]
    InvalidEndpoint { endpoint: String, message: String },
}
