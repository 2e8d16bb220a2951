// Core Workflow Abstractions
//
// This crate provides the data model for the troupe orchestration engine:
// workflows, steps, domain events, checkpoints, and worker agents, plus the
// error taxonomy and the step-executor seam shared by the engine and callers.
//
// Key design decisions:
// - Entities are plain serde structs; the engine owns all mutation paths
// - The event log is the system of record; Workflow/Step are the projection
// - The step executor is a boxed-future type alias so callers can pass
//   plain async closures
// - No engine logic here: this crate is consumed by troupe-engine and by
//   calling runtimes that only need the types

// Domain entity types
pub mod checkpoint;
pub mod event;
pub mod step;
pub mod worker;
pub mod workflow;

pub mod error;
pub mod executor;

// Re-exports for convenience
pub use checkpoint::Checkpoint;
pub use error::{CheckpointError, WorkerPoolError, WorkflowError, WorkflowStepError};
pub use event::{DomainEvent, EventPayload};
pub use executor::{step_executor, StepExecutor, StepResult};
pub use step::{Step, StepSpec, StepStatus};
pub use worker::{WorkerAgent, WorkerStatus};
pub use workflow::{
    ExecutionPattern, Workflow, WorkflowFilter, WorkflowId, WorkflowOptions, WorkflowState,
};
