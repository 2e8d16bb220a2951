//! Checkpoint store trait
//!
//! Persistence boundary for checkpoints. The engine snapshots workflows;
//! a store decides where the snapshots live. Implementations must be
//! thread-safe since the orchestrator shares one store across concurrent
//! executions.

use async_trait::async_trait;

use troupe_core::{Checkpoint, CheckpointError, WorkflowId};

/// Pluggable persistence for workflow checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync + 'static {
    /// Persist a checkpoint, keeping any previously stored ones
    async fn save(&self, checkpoint: Checkpoint) -> Result<(), CheckpointError>;

    /// The most recently saved checkpoint for a workflow
    async fn load_latest(&self, workflow_id: WorkflowId) -> Result<Checkpoint, CheckpointError>;
}
