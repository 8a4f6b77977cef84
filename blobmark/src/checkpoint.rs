//! Checkpoint state shared between the enumeration path and shutdown, and the
//! accessor that persists it as a single object.

use crate::error::{Error, Result};
use crate::store::ObjectStore;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Name of the most recently observed object.
///
/// Cloning yields another handle to the same value. Readers only ever take a
/// snapshot, never a reference into the live value.
#[derive(Debug, Clone, Default)]
pub struct CheckpointState {
    last_object_name: Arc<Mutex<String>>,
}

impl CheckpointState {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            last_object_name: Arc::new(Mutex::new(initial.into())),
        }
    }

    pub fn observe(&self, name: &str) {
        let mut guard = self
            .last_object_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clear();
        guard.push_str(name);
    }

    pub fn snapshot(&self) -> String {
        self.last_object_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Restored(String),
    Missing,
}

pub struct CheckpointStore {
    store: Arc<dyn ObjectStore>,
    container: String,
    key: String,
}

impl CheckpointStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        container: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Fetches the persisted value. A missing object is not an error.
    pub async fn read(&self) -> Result<Option<String>> {
        let bytes = match self.store.get_object(&self.container, &self.key).await {
            Ok(bytes) => bytes,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = String::from_utf8(bytes).map_err(|source| Error::InvalidCheckpoint {
            container: self.container.clone(),
            key: self.key.clone(),
            source,
        })?;
        Ok(Some(value))
    }

    /// Restores `state` from the store, leaving it untouched when no
    /// checkpoint exists yet.
    pub async fn load_into(&self, state: &CheckpointState) -> Result<LoadOutcome> {
        match self.read().await? {
            Some(value) => {
                info!(
                    container = %self.container,
                    key = %self.key,
                    "Checkpoint downloaded successfully"
                );
                state.observe(&value);
                info!(last_object = %value, "Last accessed object from checkpoint");
                Ok(LoadOutcome::Restored(value))
            }
            None => {
                warn!(
                    container = %self.container,
                    key = %self.key,
                    "No checkpoint exists!"
                );
                Ok(LoadOutcome::Missing)
            }
        }
    }

    /// Upserts `value` as the checkpoint object.
    pub async fn save(&self, value: &str) -> Result<()> {
        info!(last_object = %value, "Last accessed object");
        self.store
            .put_object(&self.container, &self.key, value.as_bytes())
            .await?;
        info!(
            container = %self.container,
            key = %self.key,
            "Checkpoint updated successfully"
        );
        Ok(())
    }
}
