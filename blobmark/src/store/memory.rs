//! In-process backend. Listings are paged and snapshotted when requested;
//! failures can be injected per container or per key.
//!
//! Not a production backend: nothing is persisted and `connect` never selects
//! it. Compiled only for tests and the `test-support` feature.

use crate::error::StoreError;
use crate::store::{ObjectDescriptor, ObjectStore, ObjectStream};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Faults {
    // container -> (items yielded before failing, message)
    list: HashMap<String, (usize, String)>,
    get: HashMap<(String, String), String>,
    put: HashMap<(String, String), String>,
}

#[derive(Debug, Default)]
struct Inner {
    containers: BTreeMap<String, BTreeMap<String, StoredObject>>,
    faults: Faults,
    puts: usize,
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            page_size: page_size.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, container: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.lock()
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    last_modified: Utc::now(),
                },
            );
    }

    /// Raw bytes currently stored under `key`, bypassing fault injection.
    pub fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|o| o.data.clone())
    }

    pub fn object_names(&self, container: &str) -> Vec<String> {
        self.lock()
            .containers
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of successful puts so far.
    pub fn put_count(&self) -> usize {
        self.lock().puts
    }

    /// Makes listings of `container` fail after `after` objects were yielded.
    pub fn fail_list(&self, container: &str, after: usize, message: impl Into<String>) {
        self.lock()
            .faults
            .list
            .insert(container.to_string(), (after, message.into()));
    }

    pub fn fail_get(&self, container: &str, key: &str, message: impl Into<String>) {
        self.lock()
            .faults
            .get
            .insert((container.to_string(), key.to_string()), message.into());
    }

    pub fn fail_put(&self, container: &str, key: &str, message: impl Into<String>) {
        self.lock()
            .faults
            .put
            .insert((container.to_string(), key.to_string()), message.into());
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn list_objects(&self, container: &str) -> ObjectStream {
        let inner = self.lock();
        let mut listed: Vec<Result<ObjectDescriptor, StoreError>> = inner
            .containers
            .get(container)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(name, o)| Ok(ObjectDescriptor::new(name, Some(o.last_modified))))
                    .collect()
            })
            .unwrap_or_default();

        if let Some((after, message)) = inner.faults.list.get(container) {
            listed.truncate(*after);
            listed.push(Err(StoreError::backend("list objects", message.clone())));
        }
        drop(inner);

        let pages: Vec<Vec<Result<ObjectDescriptor, StoreError>>> = {
            let mut pages = Vec::new();
            let mut items = listed.into_iter().peekable();
            while items.peek().is_some() {
                pages.push(items.by_ref().take(self.page_size).collect());
            }
            pages
        };

        stream::iter(pages.into_iter().map(Ok::<_, StoreError>))
            .map_ok(stream::iter)
            .try_flatten()
            .boxed()
    }

    async fn get_object(&self, container: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        let inner = self.lock();
        if let Some(message) = inner
            .faults
            .get
            .get(&(container.to_string(), key.to_string()))
        {
            return Err(StoreError::backend("get object", message.clone()));
        }
        inner
            .containers
            .get(container)
            .and_then(|objects| objects.get(key))
            .map(|o| o.data.clone())
            .ok_or_else(|| StoreError::not_found(container, key))
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(message) = inner
            .faults
            .put
            .get(&(container.to_string(), key.to_string()))
        {
            return Err(StoreError::backend("put object", message.clone()));
        }
        inner
            .containers
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: data.to_vec(),
                    last_modified: Utc::now(),
                },
            );
        inner.puts += 1;
        Ok(())
    }
}
