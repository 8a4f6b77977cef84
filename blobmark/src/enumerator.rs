use crate::checkpoint::CheckpointState;
use crate::error::Result;
use crate::store::ObjectStore;
use futures::TryStreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

/// Walks one container and records every object it sees in the shared
/// [`CheckpointState`].
pub struct Enumerator {
    store: Arc<dyn ObjectStore>,
    container: String,
    pace: Duration,
    state: CheckpointState,
    seen: AtomicU64,
}

impl Enumerator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        container: impl Into<String>,
        state: CheckpointState,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            pace: Duration::ZERO,
            state,
            seen: AtomicU64::new(0),
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    /// Objects observed so far, including by a run that was dropped midway.
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }

    /// Drains the listing. The first listing error ends the walk; the state
    /// keeps the last object observed before it.
    pub async fn run(&self) -> Result<u64> {
        let mut objects = self.store.list_objects(&self.container);

        while let Some(object) = objects.try_next().await? {
            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            info!(
                name = %object.name,
                last_modified = ?object.last_modified,
                "Object found"
            );
            self.state.observe(&object.name);
            self.seen.fetch_add(1, Ordering::Relaxed);
        }

        Ok(self.seen())
    }
}
