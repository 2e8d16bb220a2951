//! In-memory checkpoint store
//!
//! Keeps the full checkpoint history per workflow in process memory, newest
//! last. This is the store for tests and single-process deployments; durable
//! deployments implement [`CheckpointStore`] over an external database.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use troupe_core::{Checkpoint, CheckpointError, WorkflowId};

use super::store::CheckpointStore;

/// Checkpoint store backed by process memory
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: RwLock<HashMap<WorkflowId, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints stored for a workflow
    pub fn checkpoint_count(&self, workflow_id: WorkflowId) -> usize {
        self.checkpoints
            .read()
            .get(&workflow_id)
            .map(|history| history.len())
            .unwrap_or(0)
    }

    /// Drop all stored checkpoints
    pub fn clear(&self) {
        self.checkpoints.write().clear();
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError> {
        debug!(
            workflow_id = %checkpoint.workflow_id,
            event_index = checkpoint.event_index,
            "saving checkpoint"
        );
        self.checkpoints
            .write()
            .entry(checkpoint.workflow_id)
            .or_default()
            .push(checkpoint);
        Ok(())
    }

    async fn load_latest(&self, workflow_id: WorkflowId) -> Result<Checkpoint, CheckpointError> {
        self.checkpoints
            .read()
            .get(&workflow_id)
            .and_then(|history| history.last())
            .cloned()
            .ok_or(CheckpointError::NotFound(workflow_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use troupe_core::{ExecutionPattern, Step, Workflow};

    fn make_checkpoint(event_index: usize) -> Checkpoint {
        let workflow = Workflow::new(
            "ingest",
            ExecutionPattern::Sequential,
            vec![Step::new("s1", "fetch", json!({}))],
        );
        Checkpoint::new(workflow, event_index)
    }

    #[tokio::test]
    async fn test_save_and_load_latest() {
        let store = InMemoryCheckpointStore::new();

        let first = make_checkpoint(1);
        let workflow_id = first.workflow_id;
        let mut second = make_checkpoint(4);
        second.workflow_id = workflow_id;
        second.state.id = workflow_id;

        store.save(first).await.unwrap();
        store.save(second.clone()).await.unwrap();

        let latest = store.load_latest(workflow_id).await.unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.event_index, 4);
        assert_eq!(store.checkpoint_count(workflow_id), 2);
    }

    #[tokio::test]
    async fn test_load_latest_missing() {
        let store = InMemoryCheckpointStore::new();
        let err = store.load_latest(WorkflowId::new()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_history_is_per_workflow() {
        let store = InMemoryCheckpointStore::new();

        let a = make_checkpoint(2);
        let b = make_checkpoint(7);
        let (a_id, b_id) = (a.workflow_id, b.workflow_id);

        store.save(a).await.unwrap();
        store.save(b).await.unwrap();

        assert_eq!(store.load_latest(a_id).await.unwrap().event_index, 2);
        assert_eq!(store.load_latest(b_id).await.unwrap().event_index, 7);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryCheckpointStore::new();
        let checkpoint = make_checkpoint(0);
        let workflow_id = checkpoint.workflow_id;

        store.save(checkpoint).await.unwrap();
        store.clear();

        assert_eq!(store.checkpoint_count(workflow_id), 0);
        assert!(store.load_latest(workflow_id).await.is_err());
    }
}
