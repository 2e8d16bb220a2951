// Worker agent entity
//
// A WorkerAgent is one unit of pool-managed execution capacity. Agents are
// ephemeral: spawned on demand, bound to one workflow step at a time, and
// removed when drained. Task metrics accumulate across assignments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowId;

/// Status of a worker agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    /// Ready for work
    #[default]
    Idle,
    /// Bound to a workflow step
    Busy,
    /// Marked unusable by a calling layer
    Failed,
    /// Finishing its current task, then leaves the pool
    Draining,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Failed => write!(f, "failed"),
            Self::Draining => write!(f, "draining"),
        }
    }
}

/// An ephemeral worker agent tracked by the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerAgent {
    /// Unique agent identifier
    pub agent_id: String,

    /// What kind of work this agent handles
    pub specialty: String,

    /// Current status
    pub status: WorkerStatus,

    /// Workflow currently assigned, if busy
    pub current_workflow_id: Option<WorkflowId>,

    /// Step currently assigned, if busy
    pub current_step_id: Option<String>,

    /// Tasks finished successfully
    pub completed_tasks: u64,

    /// Tasks that failed
    pub failed_tasks: u64,

    /// Running average task latency in milliseconds
    pub avg_latency_ms: f64,
}

impl WorkerAgent {
    /// Create a fresh idle agent with zero metrics
    pub fn new(specialty: impl Into<String>) -> Self {
        Self {
            agent_id: format!("worker-{}", Uuid::now_v7()),
            specialty: specialty.into(),
            status: WorkerStatus::Idle,
            current_workflow_id: None,
            current_step_id: None,
            completed_tasks: 0,
            failed_tasks: 0,
            avg_latency_ms: 0.0,
        }
    }

    /// Bind the agent to a workflow step
    pub fn assign(&mut self, workflow_id: WorkflowId, step_id: impl Into<String>) {
        self.status = WorkerStatus::Busy;
        self.current_workflow_id = Some(workflow_id);
        self.current_step_id = Some(step_id.into());
    }

    /// Clear the binding and fold the task outcome into the metrics.
    /// A draining agent keeps its draining status so the pool can remove it.
    pub fn release(&mut self, success: bool, latency_ms: f64) {
        self.current_workflow_id = None;
        self.current_step_id = None;

        if success {
            self.completed_tasks += 1;
        } else {
            self.failed_tasks += 1;
        }

        let total = self.completed_tasks + self.failed_tasks;
        self.avg_latency_ms += (latency_ms - self.avg_latency_ms) / total as f64;

        if self.status != WorkerStatus::Draining {
            self.status = WorkerStatus::Idle;
        }
    }

    /// Check if the agent can accept new work
    pub fn is_available(&self) -> bool {
        self.status == WorkerStatus::Idle
    }
}
