// Workflow entity and lifecycle
//
// A Workflow is a named, ordered collection of steps executed under one
// pattern. The struct here is the mutable projection of the event log:
// the engine mutates it as execution proceeds, and recovery rebuilds it
// by folding events over a checkpoint snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::Step;

/// Unique identifier for a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    /// Generate a fresh time-ordered id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing uuid
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying uuid
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Execution strategy for a workflow's steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPattern {
    /// Steps run one after another in array order
    Sequential,
    /// All steps fan out concurrently
    Parallel,
    /// All but the last step run concurrently; the last reduces their outputs
    MapReduce,
    /// Legacy alias, executes via the sequential path
    Pipeline,
    /// Legacy alias, executes via the sequential path
    OrchestratorWorkers,
}

impl std::fmt::Display for ExecutionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
            Self::MapReduce => write!(f, "map_reduce"),
            Self::Pipeline => write!(f, "pipeline"),
            Self::OrchestratorWorkers => write!(f, "orchestrator_workers"),
        }
    }
}

/// Lifecycle state of a workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Created but not started
    #[default]
    Pending,
    /// The engine is executing steps
    Running,
    /// Paused by a caller; resumable
    Paused,
    /// All steps finished successfully
    Completed,
    /// Terminal failure recorded by a caller or replay
    Failed,
    /// State is being reconstructed from a checkpoint
    Recovering,
}

impl WorkflowState {
    /// Check if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Recovering => write!(f, "recovering"),
        }
    }
}

/// A named, ordered collection of steps executed under one pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique workflow identifier
    pub id: WorkflowId,

    /// Human-readable name
    pub name: String,

    /// Execution strategy for the steps
    pub pattern: ExecutionPattern,

    /// Ordered steps; array order is the authoritative execution order
    /// for sequential mode
    pub steps: Vec<Step>,

    /// Current lifecycle state
    pub state: WorkflowState,

    /// When the workflow was created
    pub created_at: DateTime<Utc>,

    /// When the workflow was last mutated
    pub updated_at: DateTime<Utc>,

    /// When the workflow reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Caller-supplied metadata, passed through untouched
    pub metadata: Option<serde_json::Value>,
}

impl Workflow {
    /// Create a new pending workflow
    pub fn new(name: impl Into<String>, pattern: ExecutionPattern, steps: Vec<Step>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            pattern,
            steps,
            state: WorkflowState::Pending,
            created_at: now,
            updated_at: now,
            completed_at: None,
            metadata: None,
        }
    }

    /// Attach caller metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Transition to running
    pub fn start(&mut self) {
        self.state = WorkflowState::Running;
        self.updated_at = Utc::now();
    }

    /// Transition to completed
    pub fn complete(&mut self) {
        self.state = WorkflowState::Completed;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to failed
    pub fn fail(&mut self) {
        self.state = WorkflowState::Failed;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Transition to paused
    pub fn pause(&mut self) {
        self.state = WorkflowState::Paused;
        self.updated_at = Utc::now();
    }

    /// Transition back to running after a pause or recovery
    pub fn resume(&mut self) {
        self.state = WorkflowState::Running;
        self.updated_at = Utc::now();
    }

    /// Check if the workflow is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Look up a step by id
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Look up a step by id for mutation
    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == step_id)
    }

    /// Ordered step outputs; `null` for steps without one
    pub fn output_values(&self) -> Vec<serde_json::Value> {
        self.steps
            .iter()
            .map(|s| s.output.clone().unwrap_or(serde_json::Value::Null))
            .collect()
    }
}

/// Filter for listing workflows
#[derive(Debug, Clone, Default)]
pub struct WorkflowFilter {
    pub state: Option<WorkflowState>,
    pub pattern: Option<ExecutionPattern>,
}

impl WorkflowFilter {
    pub fn by_state(state: WorkflowState) -> Self {
        Self {
            state: Some(state),
            pattern: None,
        }
    }

    pub fn by_pattern(pattern: ExecutionPattern) -> Self {
        Self {
            state: None,
            pattern: Some(pattern),
        }
    }

    /// Check whether a workflow passes the filter
    pub fn matches(&self, workflow: &Workflow) -> bool {
        if let Some(state) = self.state {
            if workflow.state != state {
                return false;
            }
        }
        if let Some(pattern) = self.pattern {
            if workflow.pattern != pattern {
                return false;
            }
        }
        true
    }
}

/// Options accepted when submitting a workflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowOptions {
    /// Retry ceiling stamped onto every step (defaults to 3)
    pub max_retries: Option<u32>,

    /// Metadata attached to the workflow record
    pub metadata: Option<serde_json::Value>,
}

impl WorkflowOptions {
    /// Set the per-step retry ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Attach workflow metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
