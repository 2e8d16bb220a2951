//! # Troupe Engine
//!
//! A multi-agent workflow orchestration engine with event-sourced durability.
//!
//! ## Features
//!
//! - **Execution patterns**: sequential, parallel, and map-reduce step
//!   scheduling over one caller-supplied step executor
//! - **Event-sourced state**: every transition is appended to an immutable
//!   event log; workflow objects are a replayable projection
//! - **Checkpoint & resume**: point-in-time snapshots plus event replay
//!   rebuild interrupted workflows without re-running finished steps
//! - **Worker agent pool**: capacity-bounded fleet of ephemeral agents that
//!   steps can be dispatched to, with per-agent task metrics
//! - **Bounded fan-out**: parallel and map phases run under a configurable
//!   concurrency ceiling with fail-fast semantics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                          │
//! │   (public facade: submit, pause, resume, checkpoint)        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │  WorkflowEngine  │ │    WorkerPool    │ │  CheckpointStore │
//! │ (workflow table, │ │ (agent registry, │ │ (snapshots; the  │
//! │  event log, step │ │  assign/release/ │ │  in-memory store │
//! │  scheduling)     │ │  drain)          │ │  or a custom one)│
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use serde_json::json;
//! use troupe_engine::prelude::*;
//!
//! let orchestrator = Orchestrator::new();
//!
//! let executor = step_executor(|step| async move {
//!     // run the step's business logic
//!     Ok(json!({ "handled": step.name }))
//! });
//!
//! let workflow = orchestrator
//!     .execute_workflow(
//!         "ingest",
//!         ExecutionPattern::Sequential,
//!         vec![
//!             StepSpec::new("fetch", json!({ "url": "https://example.com" })),
//!             StepSpec::new("parse", json!({})),
//!         ],
//!         executor,
//!         WorkflowOptions::default(),
//!     )
//!     .await?;
//!
//! assert!(workflow.is_terminal());
//! ```

pub mod engine;
pub mod orchestrator;
pub mod recovery;
pub mod worker;

/// Prelude for common imports
pub mod prelude {
    pub use crate::engine::{EngineConfig, WorkflowEngine};
    pub use crate::orchestrator::Orchestrator;
    pub use crate::recovery::{replay_from_checkpoint, CheckpointStore, InMemoryCheckpointStore};
    pub use crate::worker::{PoolStats, WorkerFilter, WorkerPool, WorkerPoolConfig};
    pub use troupe_core::{
        step_executor, Checkpoint, CheckpointError, DomainEvent, EventPayload, ExecutionPattern,
        Step, StepExecutor, StepResult, StepSpec, StepStatus, WorkerAgent, WorkerPoolError,
        WorkerStatus, Workflow, WorkflowError, WorkflowFilter, WorkflowId, WorkflowOptions,
        WorkflowState, WorkflowStepError,
    };
}

// Re-export key types at crate root
pub use engine::{EngineConfig, WorkflowEngine};
pub use orchestrator::Orchestrator;
pub use recovery::{replay_from_checkpoint, CheckpointStore, InMemoryCheckpointStore};
pub use worker::{PoolStats, WorkerFilter, WorkerPool, WorkerPoolConfig};
