use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] domain::Error),

    #[error("Queue service error: {0}")]
    Queue(String),

    #[error("No URL returned for queue {queue}")]
    MissingQueueUrl { queue: String },

    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Failed to acknowledge {failed} of {total} messages: {ids}")]
    PartialAcknowledgement {
        failed: usize,
        total: usize,
        ids: String,
    },

    #[error("Invocation of {function} failed: {message}")]
    Invocation { function: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub fn queue(message: impl fmt::Display) -> Self {
        Self::Queue(message.to_string())
    }

    pub fn invocation(function: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Invocation {
            function: function.into(),
            message: message.to_string(),
        }
    }

    /// Raised before any polling started, fatal to the binding only
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
