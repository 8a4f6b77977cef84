//! Object store adapters.
//!
//! Submodules:
//! - `s3`: S3-compatible backend built on aws-sdk-s3
//! - `localfs`: directory-per-container backend for local runs
//! - `memory`: in-process backend with fault injection, only built for tests
//!   and the `test-support` feature
//!
//! Every backend exposes the same three primitives: a lazy listing, a get that
//! reports missing keys as [`StoreError::NotFound`], and an unconditional put.

pub mod localfs;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod s3;

use crate::config::{BackendKind, Config};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::sync::Arc;

/// One entry produced by a container listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    pub name: String,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectDescriptor {
    pub fn new(name: impl Into<String>, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            last_modified,
        }
    }
}

/// Lazy, finite listing. Pages are fetched as the stream is polled.
pub type ObjectStream = BoxStream<'static, Result<ObjectDescriptor, StoreError>>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name used in log fields.
    fn kind(&self) -> &'static str;

    fn list_objects(&self, container: &str) -> ObjectStream;

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Creates or overwrites `key`.
    async fn put_object(&self, container: &str, key: &str, data: &[u8])
    -> Result<(), StoreError>;
}

/// Builds the backend selected by `config.backend`.
pub async fn connect(config: &Config) -> Arc<dyn ObjectStore> {
    match config.backend {
        BackendKind::S3 => Arc::new(s3::S3Store::connect(&config.s3).await),
        BackendKind::Local => Arc::new(localfs::LocalFsStore::new(&config.local_root)),
    }
}
