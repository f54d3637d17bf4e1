//! Error types for the transcoder provider

use thiserror::Error;

/// Result type alias using the provider Error
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("{operation} failed: {message}")]
    Service { operation: String, message: String },

    #[error("Update is not supported for {kind}: every attribute forces replacement")]
    UpdateUnsupported { kind: String },

    #[error("Missing required attribute \"{name}\" for {kind}")]
    MissingAttribute { kind: String, name: String },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Provider is not configured")]
    NotConfigured,
}

impl Error {
    pub fn service(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Service {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// True when the remote service reported that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
