//! Main sequential path: restore checkpoint, enumerate, persist checkpoint.

use crate::checkpoint::{CheckpointState, CheckpointStore, LoadOutcome};
use crate::config::Config;
use crate::enumerator::Enumerator;
use crate::error::Result;
use crate::shutdown::{ShutdownCoordinator, ShutdownReason};
use crate::store::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub reason: ShutdownReason,
    pub restored: LoadOutcome,
    pub objects_seen: u64,
    pub checkpoint: String,
}

pub struct Runner {
    store: Arc<dyn ObjectStore>,
    checkpoints: CheckpointStore,
    source_container: String,
    pace: Duration,
}

impl Runner {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            checkpoints: CheckpointStore::new(
                store.clone(),
                config.checkpoint_container.clone(),
                config.checkpoint_key.clone(),
            ),
            store,
            source_container: config.source_container.clone(),
            pace: config.pace(),
        }
    }

    /// Runs until the listing is exhausted or `coordinator` is triggered,
    /// then writes the checkpoint once. Errors are returned without writing.
    pub async fn run(&self, coordinator: &ShutdownCoordinator) -> Result<RunReport> {
        info!(
            backend = self.store.kind(),
            "Checking for an existing checkpoint prior to managing objects.."
        );
        let state = CheckpointState::default();
        let restored = self.checkpoints.load_into(&state).await?;

        let enumerator = Enumerator::new(
            self.store.clone(),
            self.source_container.clone(),
            state.clone(),
        )
        .with_pace(self.pace);
        let token = coordinator.token();

        // A cancelled token abandons the listing wherever it is.
        let listing = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = enumerator.run() => Some(result),
        };
        if let Some(result) = listing {
            let seen = result?;
            info!(container = %self.source_container, objects = seen, "Enumeration finished");
            coordinator.trigger(ShutdownReason::Completed);
        }

        let reason = coordinator.reason().unwrap_or(ShutdownReason::Completed);
        let checkpoint = state.snapshot();
        self.checkpoints.save(&checkpoint).await?;
        coordinator.terminate();

        let report = RunReport {
            reason,
            restored,
            objects_seen: enumerator.seen(),
            checkpoint,
        };
        info!(
            reason = ?report.reason,
            objects_seen = report.objects_seen,
            checkpoint = %report.checkpoint,
            "Run finished"
        );
        Ok(report)
    }
}
