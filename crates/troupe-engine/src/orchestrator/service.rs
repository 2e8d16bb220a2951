//! Orchestration service
//!
//! The `Orchestrator` is the public facade over the engine, the worker
//! pool, and the checkpoint store. It owns workflow submission, pause and
//! resume, on-demand checkpoints, and worker management; the engine
//! underneath owns step scheduling, event emission, and state commits.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use troupe_core::{
    step_executor, Checkpoint, DomainEvent, EventPayload, ExecutionPattern, StepExecutor, StepSpec,
    WorkerAgent, WorkerPoolError, Workflow, WorkflowError, WorkflowFilter, WorkflowId,
    WorkflowOptions, WorkflowState,
};

use crate::engine::{EngineConfig, WorkflowEngine};
use crate::recovery::{replay_from_checkpoint, CheckpointStore, InMemoryCheckpointStore};
use crate::worker::{WorkerPool, WorkerPoolConfig};

/// Public facade for workflow orchestration
///
/// Generic over the checkpoint store so deployments can swap the in-memory
/// store for a durable one without touching execution logic.
///
/// # Example
///
/// ```ignore
/// use troupe_engine::prelude::*;
/// use serde_json::json;
///
/// let orchestrator = Orchestrator::new();
/// let executor = step_executor(|step| async move { Ok(step.input) });
///
/// let workflow = orchestrator
///     .execute_workflow(
///         "ingest",
///         ExecutionPattern::Sequential,
///         vec![StepSpec::new("fetch", json!({"url": "..."}))],
///         executor,
///         WorkflowOptions::default(),
///     )
///     .await?;
/// ```
pub struct Orchestrator<S: CheckpointStore> {
    engine: Arc<WorkflowEngine>,
    pool: Arc<WorkerPool>,
    store: Arc<S>,
}

impl Orchestrator<InMemoryCheckpointStore> {
    /// Orchestrator with default configuration and an in-memory checkpoint
    /// store
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryCheckpointStore::new()))
    }
}

impl Default for Orchestrator<InMemoryCheckpointStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CheckpointStore> Orchestrator<S> {
    /// Orchestrator with default configuration over a custom checkpoint
    /// store
    pub fn with_store(store: Arc<S>) -> Self {
        Self::with_config(EngineConfig::default(), WorkerPoolConfig::default(), store)
    }

    /// Orchestrator with explicit engine and pool configuration
    pub fn with_config(
        engine_config: EngineConfig,
        pool_config: WorkerPoolConfig,
        store: Arc<S>,
    ) -> Self {
        Self {
            engine: Arc::new(WorkflowEngine::with_config(engine_config)),
            pool: Arc::new(WorkerPool::with_config(pool_config)),
            store,
        }
    }

    /// Build, register, and execute a workflow to completion.
    ///
    /// Steps are built from `step_specs` in order, with generated ids
    /// (`step-1`, `step-2`, ...) where the spec does not name one. Legacy
    /// patterns (`pipeline`, `orchestrator_workers`) execute sequentially.
    ///
    /// After a successful run a final checkpoint save is attempted
    /// best-effort: a persistence failure is logged and swallowed, so a
    /// caller can observe a completed workflow whose checkpoint was never
    /// durably saved.
    #[instrument(skip_all, fields(%pattern, steps = step_specs.len()))]
    pub async fn execute_workflow(
        &self,
        name: impl Into<String>,
        pattern: ExecutionPattern,
        step_specs: Vec<StepSpec>,
        executor: StepExecutor,
        options: WorkflowOptions,
    ) -> Result<Workflow, WorkflowError> {
        let name = name.into();
        let max_retries = options.max_retries.unwrap_or(3);

        let steps = step_specs
            .into_iter()
            .enumerate()
            .map(|(position, spec)| spec.into_step(position + 1, max_retries))
            .collect();

        let mut workflow = Workflow::new(name, pattern, steps);
        if let Some(metadata) = options.metadata {
            workflow = workflow.with_metadata(metadata);
        }
        let workflow_id = workflow.id;

        info!(%workflow_id, name = %workflow.name, "submitting workflow");
        self.engine.append_event(DomainEvent::new(
            workflow_id,
            EventPayload::WorkflowCreated {
                name: workflow.name.clone(),
                pattern,
                step_count: workflow.steps.len(),
            },
        ));
        self.engine.insert_workflow(workflow);

        let executor = self.dispatching_executor(workflow_id, executor);
        let workflow = match pattern {
            ExecutionPattern::Parallel => {
                self.engine.execute_parallel(workflow_id, executor).await?
            }
            ExecutionPattern::MapReduce => {
                self.engine.execute_map_reduce(workflow_id, executor).await?
            }
            ExecutionPattern::Sequential
            | ExecutionPattern::Pipeline
            | ExecutionPattern::OrchestratorWorkers => {
                self.engine
                    .execute_sequential(workflow_id, executor)
                    .await?
            }
        };

        self.save_checkpoint_best_effort(workflow_id).await;
        Ok(workflow)
    }

    /// Reconstruct a workflow from its latest checkpoint and run it to
    /// completion.
    ///
    /// State is rebuilt by replaying logged events over the checkpoint
    /// snapshot, then every step still `pending` or `failed` is executed
    /// strictly sequentially, regardless of the workflow's original
    /// pattern. Steps already completed or marked skipped are never
    /// re-invoked. Fails with a wrapped `CheckpointError` when no
    /// checkpoint exists.
    #[instrument(skip(self, executor))]
    pub async fn resume_workflow(
        &self,
        workflow_id: WorkflowId,
        executor: StepExecutor,
    ) -> Result<Workflow, WorkflowError> {
        let checkpoint = self.store.load_latest(workflow_id).await?;
        info!(
            %workflow_id,
            event_index = checkpoint.event_index,
            "resuming workflow from checkpoint"
        );

        // Surface the recovering state to observers while the log is folded
        let mut recovering = checkpoint.state.clone();
        recovering.state = WorkflowState::Recovering;
        self.engine.insert_workflow(recovering);

        let events = self.engine.events_for(workflow_id);
        let mut workflow = replay_from_checkpoint(&checkpoint, &events);

        if workflow.is_terminal() {
            info!(%workflow_id, state = %workflow.state, "reconstructed workflow is already terminal");
            self.engine.update_workflow(workflow.clone())?;
            return Ok(workflow);
        }

        workflow.resume();
        self.engine.update_workflow(workflow)?;
        self.engine
            .append_event(DomainEvent::new(workflow_id, EventPayload::WorkflowResumed));

        let executor = self.dispatching_executor(workflow_id, executor);
        self.engine.execute_sequential(workflow_id, executor).await
    }

    /// Pause a workflow.
    ///
    /// Does not interrupt a step already in flight; the engine observes the
    /// pause at the next step boundary.
    pub fn pause_workflow(
        &self,
        workflow_id: WorkflowId,
        reason: impl Into<String>,
    ) -> Result<(), WorkflowError> {
        let reason = reason.into();
        self.engine
            .with_workflow(workflow_id, |workflow| workflow.pause())?;

        info!(%workflow_id, reason = %reason, "workflow paused");
        self.engine.append_event(DomainEvent::new(
            workflow_id,
            EventPayload::WorkflowPaused { reason },
        ));
        Ok(())
    }

    /// Snapshot a workflow and durably save the checkpoint
    pub async fn checkpoint(&self, workflow_id: WorkflowId) -> Result<Checkpoint, WorkflowError> {
        let checkpoint = self.engine.create_checkpoint(workflow_id)?;
        self.store.save(checkpoint.clone()).await?;

        info!(
            %workflow_id,
            event_index = checkpoint.event_index,
            "checkpoint saved"
        );
        Ok(checkpoint)
    }

    /// Look up a workflow by id
    pub fn get_workflow(&self, workflow_id: WorkflowId) -> Option<Workflow> {
        self.engine.get_workflow(workflow_id)
    }

    /// List workflows passing the filter
    pub fn list_workflows(&self, filter: &WorkflowFilter) -> Vec<Workflow> {
        self.engine.list_workflows(filter)
    }

    /// Spawn a worker agent in the pool
    pub fn spawn_worker(&self, specialty: impl Into<String>) -> Result<WorkerAgent, WorkerPoolError> {
        self.pool.spawn(specialty)
    }

    /// The event log, either for one workflow or the whole process
    pub fn get_event_log(&self, workflow_id: Option<WorkflowId>) -> Vec<DomainEvent> {
        match workflow_id {
            Some(id) => self.engine.events_for(id),
            None => self.engine.all_events(),
        }
    }

    /// The worker pool, for direct assignment and stats
    pub fn worker_pool(&self) -> Arc<WorkerPool> {
        Arc::clone(&self.pool)
    }

    /// The underlying engine, for read-side introspection
    pub fn engine(&self) -> Arc<WorkflowEngine> {
        Arc::clone(&self.engine)
    }

    /// Wrap the caller's executor with worker dispatch for agent-bound steps.
    ///
    /// An agent-bound step is assigned to its worker before the inner
    /// executor runs and released after, with measured latency. A step whose
    /// worker cannot be assigned fails with the pool error as cause.
    fn dispatching_executor(&self, workflow_id: WorkflowId, inner: StepExecutor) -> StepExecutor {
        let pool = Arc::clone(&self.pool);
        step_executor(move |step| {
            let inner = inner.clone();
            let pool = Arc::clone(&pool);
            async move {
                let agent_id = match step.agent_id.clone() {
                    Some(agent_id) => agent_id,
                    None => return inner(step).await,
                };

                if let Err(err) = pool.assign(&agent_id, workflow_id, &step.id) {
                    return Err(format!("worker dispatch failed: {err}"));
                }

                let dispatched = Instant::now();
                let result = inner(step).await;
                let latency_ms = dispatched.elapsed().as_secs_f64() * 1000.0;

                if let Err(err) = pool.release(&agent_id, result.is_ok(), latency_ms) {
                    warn!(agent_id = %agent_id, error = %err, "failed to release worker");
                }
                result
            }
        })
    }

    async fn save_checkpoint_best_effort(&self, workflow_id: WorkflowId) {
        if let Err(error) = self.checkpoint(workflow_id).await {
            warn!(%workflow_id, %error, "final checkpoint save failed, continuing");
        }
    }
}
