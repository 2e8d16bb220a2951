//! Workflow engine
//!
//! The `WorkflowEngine` is responsible for:
//! - Holding the authoritative in-memory workflow table and event log
//! - Executing steps according to the workflow's pattern (sequential,
//!   parallel, map-reduce)
//! - Appending a domain event for every state transition
//! - Snapshotting workflows into checkpoints
//!
//! Every transition is appended to the event log before the workflow
//! projection is updated. The two writes are independent atomic operations,
//! not one transaction; replay from a checkpoint reconciles the projection
//! with the log after a crash.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use troupe_core::{
    Checkpoint, DomainEvent, EventPayload, Step, StepExecutor, StepStatus, Workflow, WorkflowError,
    WorkflowFilter, WorkflowId, WorkflowState, WorkflowStepError,
};

/// Configuration for the workflow engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum concurrent step executions during parallel and map fan-out
    pub max_step_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_step_concurrency: 8,
        }
    }
}

impl EngineConfig {
    /// Set the fan-out concurrency ceiling (minimum 1)
    pub fn with_max_step_concurrency(mut self, max: usize) -> Self {
        self.max_step_concurrency = max.max(1);
        self
    }
}

/// A step that finished during a fan-out phase, awaiting commit
struct CompletedStep {
    position: usize,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    output: serde_json::Value,
}

/// Workflow engine
///
/// Holds the workflow table (`WorkflowId -> Workflow`) and the append-only
/// event log, both guarded by their own lock and mutated through atomic
/// read-modify-write operations. Step execution is delegated to the
/// caller-supplied [`StepExecutor`]; the engine decides ordering,
/// concurrency, event emission, and state commits.
///
/// # Example
///
/// ```ignore
/// use troupe_engine::engine::WorkflowEngine;
/// use troupe_core::{step_executor, Step, Workflow, ExecutionPattern};
///
/// let engine = WorkflowEngine::new();
/// let workflow = Workflow::new("ingest", ExecutionPattern::Sequential, steps);
/// let workflow_id = workflow.id;
/// engine.insert_workflow(workflow);
///
/// let executor = step_executor(|step| async move { Ok(step.input) });
/// let finished = engine.execute_sequential(workflow_id, executor).await?;
/// ```
pub struct WorkflowEngine {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
    events: RwLock<Vec<DomainEvent>>,
    config: EngineConfig,
}

impl WorkflowEngine {
    /// Create an engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
            config,
        }
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Atomic state operations
    // =========================================================================

    /// Register a freshly built workflow in the table
    pub fn insert_workflow(&self, workflow: Workflow) {
        debug!(workflow_id = %workflow.id, name = %workflow.name, "registering workflow");
        self.workflows.write().insert(workflow.id, workflow);
    }

    /// Replace an existing workflow record
    pub fn update_workflow(&self, workflow: Workflow) -> Result<(), WorkflowError> {
        let mut workflows = self.workflows.write();
        if !workflows.contains_key(&workflow.id) {
            return Err(WorkflowError::NotFound(workflow.id));
        }
        workflows.insert(workflow.id, workflow);
        Ok(())
    }

    /// Append one event to the log
    pub fn append_event(&self, event: DomainEvent) {
        debug!(workflow_id = %event.workflow_id, kind = event.kind(), "appending event");
        self.events.write().push(event);
    }

    /// Atomic read-modify-write on one workflow
    pub(crate) fn with_workflow<T>(
        &self,
        workflow_id: WorkflowId,
        f: impl FnOnce(&mut Workflow) -> T,
    ) -> Result<T, WorkflowError> {
        let mut workflows = self.workflows.write();
        let workflow = workflows
            .get_mut(&workflow_id)
            .ok_or(WorkflowError::NotFound(workflow_id))?;
        Ok(f(workflow))
    }

    fn emit(&self, workflow_id: WorkflowId, payload: EventPayload) {
        self.append_event(DomainEvent::new(workflow_id, payload));
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Look up a workflow by id
    pub fn get_workflow(&self, workflow_id: WorkflowId) -> Option<Workflow> {
        self.workflows.read().get(&workflow_id).cloned()
    }

    /// List workflows passing the filter
    pub fn list_workflows(&self, filter: &WorkflowFilter) -> Vec<Workflow> {
        self.workflows
            .read()
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect()
    }

    /// The full event log in append order
    pub fn all_events(&self) -> Vec<DomainEvent> {
        self.events.read().clone()
    }

    /// Events for one workflow, in append order
    pub fn events_for(&self, workflow_id: WorkflowId) -> Vec<DomainEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect()
    }

    /// Total number of events in the log
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Length of one workflow's event sequence
    pub fn event_count_for(&self, workflow_id: WorkflowId) -> usize {
        self.events
            .read()
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .count()
    }

    /// Number of workflows in the table
    pub fn workflow_count(&self) -> usize {
        self.workflows.read().len()
    }

    fn current_state(&self, workflow_id: WorkflowId) -> Option<WorkflowState> {
        self.workflows.read().get(&workflow_id).map(|w| w.state)
    }

    // =========================================================================
    // Checkpointing
    // =========================================================================

    /// Snapshot a workflow together with its current event position
    pub fn create_checkpoint(&self, workflow_id: WorkflowId) -> Result<Checkpoint, WorkflowError> {
        // Count first: replay tolerates re-applying events already reflected
        // in the snapshot, but must never skip events the snapshot lacks.
        let event_index = self.event_count_for(workflow_id);
        let workflow = self
            .get_workflow(workflow_id)
            .ok_or(WorkflowError::NotFound(workflow_id))?;

        debug!(%workflow_id, event_index, "created checkpoint");
        Ok(Checkpoint::new(workflow, event_index))
    }

    // =========================================================================
    // Pattern execution
    // =========================================================================

    /// Execute steps one after another in array order.
    ///
    /// Emits `StepStarted`/`StepCompleted` per step and commits each result
    /// before the next step begins. Steps already completed or marked
    /// skipped are not re-run, so the same routine drives both fresh runs
    /// and resumed workflows. A pause is observed at the next step boundary:
    /// the routine stops starting steps and returns the paused workflow.
    ///
    /// A step failure aborts the call with the failed step recorded; prior
    /// steps keep their results and the workflow stays `running`.
    #[instrument(skip(self, executor))]
    pub async fn execute_sequential(
        &self,
        workflow_id: WorkflowId,
        executor: StepExecutor,
    ) -> Result<Workflow, WorkflowError> {
        let workflow = self.begin_execution(workflow_id, "execute_sequential")?;
        info!(%workflow_id, steps = workflow.steps.len(), "executing sequential workflow");

        for step in &workflow.steps {
            if matches!(self.current_state(workflow_id), Some(WorkflowState::Paused)) {
                info!(%workflow_id, "pause observed at step boundary");
                return self
                    .get_workflow(workflow_id)
                    .ok_or(WorkflowError::NotFound(workflow_id));
            }

            if matches!(step.status, StepStatus::Completed | StepStatus::Skipped) {
                debug!(%workflow_id, step_id = %step.id, status = %step.status, "step needs no run");
                continue;
            }

            self.run_step(workflow_id, step.clone(), executor.clone())
                .await?;
        }

        self.finish_workflow(workflow_id)
    }

    /// Execute all steps concurrently, bounded by
    /// [`EngineConfig::max_step_concurrency`].
    ///
    /// Step events are appended as each step starts and finishes, but step
    /// results are committed to the workflow record only when every step
    /// succeeded. The first failure aborts the call and drops the remaining
    /// in-flight steps; nothing is committed.
    #[instrument(skip(self, executor))]
    pub async fn execute_parallel(
        &self,
        workflow_id: WorkflowId,
        executor: StepExecutor,
    ) -> Result<Workflow, WorkflowError> {
        let workflow = self.begin_execution(workflow_id, "execute_parallel")?;
        info!(%workflow_id, steps = workflow.steps.len(), "executing parallel workflow");

        if workflow.steps.is_empty() {
            return self.finish_workflow(workflow_id);
        }

        let completed = self
            .fan_out_steps(workflow_id, workflow.steps.clone(), &executor)
            .await?;
        self.commit_completed_steps(workflow_id, completed)?;
        self.finish_workflow(workflow_id)
    }

    /// Execute all but the last step as a concurrent map phase, then invoke
    /// the last step once as the reduce, passing it the ordered array of map
    /// outputs as its input.
    ///
    /// Map results and the reduce result are committed together after the
    /// reduce succeeds; the reduce step's recorded input is overwritten with
    /// the synthetic array. A workflow with a single step is a reduce over
    /// an empty map phase.
    #[instrument(skip(self, executor))]
    pub async fn execute_map_reduce(
        &self,
        workflow_id: WorkflowId,
        executor: StepExecutor,
    ) -> Result<Workflow, WorkflowError> {
        let workflow = self.begin_execution(workflow_id, "execute_map_reduce")?;

        if workflow.steps.is_empty() {
            return self.finish_workflow(workflow_id);
        }

        let reduce_position = workflow.steps.len() - 1;
        let map_steps = workflow.steps[..reduce_position].to_vec();
        info!(%workflow_id, map_steps = map_steps.len(), "executing map-reduce workflow");

        let map_results = self
            .fan_out_steps(workflow_id, map_steps, &executor)
            .await?;

        // Ordered map outputs become the synthetic reduce input
        let mut map_outputs = vec![serde_json::Value::Null; reduce_position];
        for result in &map_results {
            map_outputs[result.position] = result.output.clone();
        }
        let reduce_input = serde_json::Value::Array(map_outputs);

        let mut reduce_step = workflow.steps[reduce_position].clone();
        reduce_step.input = reduce_input.clone();
        let step_id = reduce_step.id.clone();

        let started = DomainEvent::new(
            workflow_id,
            EventPayload::StepStarted {
                step_id: step_id.clone(),
                agent_id: reduce_step.agent_id.clone(),
            },
        );
        let started_at = started.timestamp;
        self.append_event(started);

        match executor(reduce_step).await {
            Ok(output) => {
                let finished = DomainEvent::new(
                    workflow_id,
                    EventPayload::StepCompleted {
                        step_id: step_id.clone(),
                        output: output.clone(),
                    },
                );
                let completed_at = finished.timestamp;
                self.append_event(finished);

                self.commit_completed_steps(workflow_id, map_results)?;
                self.with_workflow(workflow_id, |workflow| {
                    let step = &mut workflow.steps[reduce_position];
                    step.input = reduce_input;
                    step.status = StepStatus::Completed;
                    step.output = Some(output);
                    step.started_at = Some(started_at);
                    step.completed_at = Some(completed_at);
                    step.error = None;
                })?;
                self.finish_workflow(workflow_id)
            }
            Err(cause) => {
                self.emit(
                    workflow_id,
                    EventPayload::StepFailed {
                        step_id: step_id.clone(),
                        error: cause.clone(),
                    },
                );
                warn!(%workflow_id, step_id = %step_id, "reduce step failed");
                Err(WorkflowStepError::new(workflow_id, step_id, cause).into())
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fetch the workflow, refuse terminal states, and transition to running
    fn begin_execution(
        &self,
        workflow_id: WorkflowId,
        operation: &str,
    ) -> Result<Workflow, WorkflowError> {
        let mut workflows = self.workflows.write();
        let workflow = workflows
            .get_mut(&workflow_id)
            .ok_or(WorkflowError::NotFound(workflow_id))?;

        if workflow.state.is_terminal() {
            return Err(WorkflowError::InvalidState {
                workflow_id,
                state: workflow.state,
                operation: operation.to_string(),
            });
        }

        workflow.start();
        Ok(workflow.clone())
    }

    /// Run one step to completion, committing events and step state as it goes
    async fn run_step(
        &self,
        workflow_id: WorkflowId,
        step: Step,
        executor: StepExecutor,
    ) -> Result<(), WorkflowError> {
        let step_id = step.id.clone();
        debug!(%workflow_id, step_id = %step_id, "starting step");

        self.emit(
            workflow_id,
            EventPayload::StepStarted {
                step_id: step_id.clone(),
                agent_id: step.agent_id.clone(),
            },
        );
        self.with_workflow(workflow_id, |workflow| {
            if let Some(s) = workflow.step_mut(&step_id) {
                s.start();
            }
        })?;

        match executor(step).await {
            Ok(output) => {
                self.emit(
                    workflow_id,
                    EventPayload::StepCompleted {
                        step_id: step_id.clone(),
                        output: output.clone(),
                    },
                );
                self.with_workflow(workflow_id, |workflow| {
                    if let Some(s) = workflow.step_mut(&step_id) {
                        s.complete(output);
                    }
                })?;
                Ok(())
            }
            Err(cause) => {
                self.emit(
                    workflow_id,
                    EventPayload::StepFailed {
                        step_id: step_id.clone(),
                        error: cause.clone(),
                    },
                );
                self.with_workflow(workflow_id, |workflow| {
                    if let Some(s) = workflow.step_mut(&step_id) {
                        s.fail(cause.clone());
                    }
                })?;
                warn!(%workflow_id, step_id = %step_id, "step failed");
                Err(WorkflowStepError::new(workflow_id, step_id, cause).into())
            }
        }
    }

    /// Fan the executor out over the given steps with bounded concurrency.
    ///
    /// Events are appended as steps start and finish. Returns the completed
    /// results for the caller to commit, or the first failure (remaining
    /// in-flight steps are dropped).
    async fn fan_out_steps(
        &self,
        workflow_id: WorkflowId,
        steps: Vec<Step>,
        executor: &StepExecutor,
    ) -> Result<Vec<CompletedStep>, WorkflowError> {
        let mut results = stream::iter(steps.into_iter().enumerate().map(|(position, step)| {
            let executor = executor.clone();
            async move {
                let step_id = step.id.clone();
                let started = DomainEvent::new(
                    workflow_id,
                    EventPayload::StepStarted {
                        step_id: step_id.clone(),
                        agent_id: step.agent_id.clone(),
                    },
                );
                let started_at = started.timestamp;
                self.append_event(started);

                let result = executor(step).await;

                let finished = match &result {
                    Ok(output) => DomainEvent::new(
                        workflow_id,
                        EventPayload::StepCompleted {
                            step_id: step_id.clone(),
                            output: output.clone(),
                        },
                    ),
                    Err(error) => DomainEvent::new(
                        workflow_id,
                        EventPayload::StepFailed {
                            step_id: step_id.clone(),
                            error: error.clone(),
                        },
                    ),
                };
                let completed_at = finished.timestamp;
                self.append_event(finished);

                (position, step_id, started_at, completed_at, result)
            }
        }))
        .buffer_unordered(self.config.max_step_concurrency);

        let mut completed = Vec::new();
        while let Some((position, step_id, started_at, completed_at, result)) =
            results.next().await
        {
            match result {
                Ok(output) => completed.push(CompletedStep {
                    position,
                    started_at,
                    completed_at,
                    output,
                }),
                Err(cause) => {
                    warn!(%workflow_id, step_id = %step_id, "step failed, aborting fan-out");
                    return Err(WorkflowStepError::new(workflow_id, step_id, cause).into());
                }
            }
        }

        Ok(completed)
    }

    /// Commit fan-out results to the workflow record in one atomic update
    fn commit_completed_steps(
        &self,
        workflow_id: WorkflowId,
        completed: Vec<CompletedStep>,
    ) -> Result<(), WorkflowError> {
        self.with_workflow(workflow_id, |workflow| {
            for c in completed {
                let step = &mut workflow.steps[c.position];
                step.status = StepStatus::Completed;
                step.output = Some(c.output);
                step.started_at = Some(c.started_at);
                step.completed_at = Some(c.completed_at);
                step.error = None;
            }
        })
    }

    /// Emit the terminal event and mark the workflow completed
    fn finish_workflow(&self, workflow_id: WorkflowId) -> Result<Workflow, WorkflowError> {
        let outputs = self.with_workflow(workflow_id, |workflow| workflow.output_values())?;
        self.emit(workflow_id, EventPayload::WorkflowCompleted { outputs });

        let workflow = self.with_workflow(workflow_id, |workflow| {
            workflow.complete();
            workflow.clone()
        })?;

        info!(%workflow_id, "workflow completed");
        Ok(workflow)
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}
