// Error taxonomy
//
// Four error kinds cover the orchestration surface: workflow-level failures,
// step executor failures, checkpoint persistence/lookup failures, and worker
// pool refusals. All propagate by value; nothing in the library panics.

use thiserror::Error;

use crate::worker::WorkerStatus;
use crate::workflow::{WorkflowId, WorkflowState};

/// A step executor failed, scoped to its workflow and step
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("step {step_id} of workflow {workflow_id} failed: {cause}")]
pub struct WorkflowStepError {
    /// Workflow the step belongs to
    pub workflow_id: WorkflowId,

    /// The failing step
    pub step_id: String,

    /// Error reported by the executor
    pub cause: String,
}

impl WorkflowStepError {
    pub fn new(
        workflow_id: WorkflowId,
        step_id: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id,
            step_id: step_id.into(),
            cause: cause.into(),
        }
    }
}

/// Checkpoint persistence and lookup errors
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No checkpoint exists for the workflow
    #[error("no checkpoint found for workflow {0}")]
    NotFound(WorkflowId),

    /// The backing store rejected the operation
    #[error("checkpoint storage error: {0}")]
    Storage(String),

    /// Snapshot could not be encoded or decoded
    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}

/// Worker pool errors
#[derive(Debug, Error)]
pub enum WorkerPoolError {
    /// Spawn requested beyond the configured capacity
    #[error("worker pool at capacity: {available_workers} available, {required_workers} required")]
    AtCapacity {
        available_workers: usize,
        required_workers: usize,
    },

    /// Unknown agent id
    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    /// Operation requires an idle worker
    #[error("worker {agent_id} is {status}, expected idle")]
    WorkerNotIdle {
        agent_id: String,
        status: WorkerStatus,
    },
}

/// Workflow-level errors
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown workflow id
    #[error("workflow not found: {0}")]
    NotFound(WorkflowId),

    /// Operation attempted against a state that cannot accept it
    #[error("workflow {workflow_id} is {state}, cannot {operation}")]
    InvalidState {
        workflow_id: WorkflowId,
        state: WorkflowState,
        operation: String,
    },

    /// A step executor failed
    #[error("step error: {0}")]
    Step(#[from] WorkflowStepError),

    /// Checkpoint load or save failed
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Unexpected internal failure
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_display() {
        let workflow_id = WorkflowId::new();
        let err = WorkflowStepError::new(workflow_id, "step-1", "timeout");

        let message = err.to_string();
        assert!(message.contains("step-1"));
        assert!(message.contains(&workflow_id.to_string()));
        assert!(message.contains("timeout"));
    }

    #[test]
    fn test_step_error_converts_to_workflow_error() {
        let err = WorkflowStepError::new(WorkflowId::new(), "step-1", "timeout");
        let wrapped: WorkflowError = err.into();
        assert!(matches!(wrapped, WorkflowError::Step(_)));
    }

    #[test]
    fn test_checkpoint_error_converts_to_workflow_error() {
        let workflow_id = WorkflowId::new();
        let wrapped: WorkflowError = CheckpointError::NotFound(workflow_id).into();
        assert!(matches!(
            wrapped,
            WorkflowError::Checkpoint(CheckpointError::NotFound(_))
        ));
    }

    #[test]
    fn test_pool_error_display() {
        let err = WorkerPoolError::AtCapacity {
            available_workers: 0,
            required_workers: 1,
        };
        assert_eq!(
            err.to_string(),
            "worker pool at capacity: 0 available, 1 required"
        );
    }
}
