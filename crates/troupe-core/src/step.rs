// Workflow step representation
//
// A Step is a single unit of work inside a workflow. Steps are created
// pending and mutated only by the engine as execution proceeds; they carry
// their own timing and error fields so the workflow record doubles as an
// execution trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Execution status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started
    #[default]
    Pending,
    /// Currently executing
    Running,
    /// Finished successfully
    Completed,
    /// Executor returned an error
    Failed,
    /// Skipped by a calling layer
    Skipped,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A single step in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier, unique within its workflow
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Worker agent this step is pinned to, if any
    pub agent_id: Option<String>,

    /// Input handed to the step executor
    pub input: serde_json::Value,

    /// Output recorded on successful completion
    pub output: Option<serde_json::Value>,

    /// Current status
    pub status: StepStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Error message from a failed execution
    pub error: Option<String>,

    /// Times this step has been retried (bookkeeping only; no engine path
    /// drives a retry loop)
    pub retry_count: u32,

    /// Retry ceiling for calling layers that implement retries
    pub max_retries: u32,
}

impl Step {
    /// Create a new pending step
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            agent_id: None,
            input,
            output: None,
            status: StepStatus::Pending,
            started_at: None,
            completed_at: None,
            error: None,
            retry_count: 0,
            max_retries: 3,
        }
    }

    /// Pin the step to a specific worker agent
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the retry ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Mark the step running. Clears any leftover failure state so a
    /// re-executed step reads like a fresh run.
    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Utc::now());
        self.completed_at = None;
        self.error = None;
    }

    /// Mark the step completed with its output
    pub fn complete(&mut self, output: serde_json::Value) {
        self.status = StepStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
        self.error = None;
    }

    /// Mark the step failed with an error message
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Check if the step finished successfully
    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Get duration in milliseconds if the step has started and finished
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Caller-facing blueprint for a step, used when submitting a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Explicit step id; defaults to `step-<position>` when omitted
    pub id: Option<String>,

    /// Human-readable name
    pub name: String,

    /// Input handed to the step executor
    pub input: serde_json::Value,

    /// Worker agent to pin the step to
    pub agent_id: Option<String>,
}

impl StepSpec {
    /// Create a spec with a generated id
    pub fn new(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            input,
            agent_id: None,
        }
    }

    /// Set an explicit step id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Pin the step to a specific worker agent
    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Materialize the spec into a pending step at the given 1-based position
    pub fn into_step(self, position: usize, max_retries: u32) -> Step {
        let id = self
            .id
            .unwrap_or_else(|| format!("step-{}", position));
        let mut step = Step::new(id, self.name, self.input).with_max_retries(max_retries);
        if let Some(agent_id) = self.agent_id {
            step = step.with_agent(agent_id);
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_step_defaults() {
        let step = Step::new("s1", "fetch", json!({"url": "https://example.com"}));
        assert_eq!(step.status, StepStatus::Pending);
        assert_eq!(step.retry_count, 0);
        assert_eq!(step.max_retries, 3);
        assert!(step.output.is_none());
        assert!(step.started_at.is_none());
        assert!(step.duration_ms().is_none());
    }

    #[test]
    fn test_step_lifecycle() {
        let mut step = Step::new("s1", "fetch", json!({}));

        step.start();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.started_at.is_some());

        step.complete(json!({"rows": 3}));
        assert!(step.is_completed());
        assert_eq!(step.output, Some(json!({"rows": 3})));
        assert!(step.completed_at.is_some());
        assert!(step.duration_ms().is_some());
    }

    #[test]
    fn test_step_failure_then_restart() {
        let mut step = Step::new("s1", "fetch", json!({}));
        step.start();
        step.fail("connection refused");

        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.error.as_deref(), Some("connection refused"));
        assert!(step.completed_at.is_some());

        // Restarting clears failure state
        step.start();
        assert_eq!(step.status, StepStatus::Running);
        assert!(step.error.is_none());
        assert!(step.completed_at.is_none());
    }

    #[test]
    fn test_spec_into_step_default_id() {
        let step = StepSpec::new("fetch", json!({})).into_step(2, 5);
        assert_eq!(step.id, "step-2");
        assert_eq!(step.max_retries, 5);
        assert!(step.agent_id.is_none());
    }

    #[test]
    fn test_spec_into_step_explicit_fields() {
        let step = StepSpec::new("fetch", json!({}))
            .with_id("custom")
            .with_agent("agent-7")
            .into_step(1, 3);

        assert_eq!(step.id, "custom");
        assert_eq!(step.agent_id.as_deref(), Some("agent-7"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(StepStatus::Pending.to_string(), "pending");
        assert_eq!(StepStatus::Failed.to_string(), "failed");
    }
}
