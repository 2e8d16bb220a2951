// Domain events for workflow history and recovery
//
// Events form the append-only log for workflows: every state transition is
// recorded as it happens, and recovery replays them on top of a checkpoint
// after an interruption.
//
// Events are immutable once appended. The log is the system of record;
// workflow and step objects are a derived, mutable projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{ExecutionPattern, WorkflowId};

/// A single entry in the append-only event log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainEvent {
    /// Workflow this event belongs to
    pub workflow_id: WorkflowId,

    /// When the event was recorded
    pub timestamp: DateTime<Utc>,

    /// What happened
    pub payload: EventPayload,
}

impl DomainEvent {
    /// Record a new event stamped with the current time
    pub fn new(workflow_id: WorkflowId, payload: EventPayload) -> Self {
        Self {
            workflow_id,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Get the step_id if this is a step-scoped event
    pub fn step_id(&self) -> Option<&str> {
        self.payload.step_id()
    }

    /// Check if this event ends the workflow
    pub fn is_terminal(&self) -> bool {
        self.payload.is_terminal()
    }

    /// Short name of the payload kind, for logs and assertions
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

/// Payload carried by a domain event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    // =========================================================================
    // Workflow Lifecycle Events
    // =========================================================================
    /// Workflow record was created
    WorkflowCreated {
        /// Workflow name as submitted
        name: String,

        /// Execution pattern the workflow was submitted with
        pattern: ExecutionPattern,

        /// Number of steps at creation
        step_count: usize,
    },

    /// All steps finished successfully
    WorkflowCompleted {
        /// Ordered step outputs
        outputs: Vec<serde_json::Value>,
    },

    /// Workflow reached a terminal failure
    WorkflowFailed {
        /// Error description
        error: String,
    },

    /// Workflow was paused by a caller
    WorkflowPaused {
        /// Reason supplied by the caller
        reason: String,
    },

    /// Workflow state was reconstructed and execution restarted
    WorkflowResumed,

    // =========================================================================
    // Step Lifecycle Events
    // =========================================================================
    /// Step execution began
    StepStarted {
        /// Step identifier
        step_id: String,

        /// Worker agent the step was dispatched to, if any
        agent_id: Option<String>,
    },

    /// Step finished successfully
    StepCompleted {
        /// Step identifier
        step_id: String,

        /// Output returned by the executor
        output: serde_json::Value,
    },

    /// Step executor returned an error
    StepFailed {
        /// Step identifier
        step_id: String,

        /// Error description
        error: String,
    },
}

impl EventPayload {
    /// Get the step_id if this is a step-scoped event
    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::StepStarted { step_id, .. }
            | Self::StepCompleted { step_id, .. }
            | Self::StepFailed { step_id, .. } => Some(step_id),
            _ => None,
        }
    }

    /// Check if this is a terminal workflow event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::WorkflowCompleted { .. } | Self::WorkflowFailed { .. }
        )
    }

    /// Short name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorkflowCreated { .. } => "workflow_created",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::WorkflowFailed { .. } => "workflow_failed",
            Self::WorkflowPaused { .. } => "workflow_paused",
            Self::WorkflowResumed => "workflow_resumed",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
            Self::StepFailed { .. } => "step_failed",
        }
    }
}
