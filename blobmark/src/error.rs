use std::io;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors surfaced by an [`ObjectStore`](crate::store::ObjectStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    // The only recoverable case, and only while restoring a checkpoint.
    #[error("object {container}/{key} not found")]
    NotFound { container: String, key: String },

    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    pub fn not_found(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            container: container.into(),
            key: key.into(),
        }
    }

    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("checkpoint {container}/{key} is not valid UTF-8")]
    InvalidCheckpoint {
        container: String,
        key: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config from {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
