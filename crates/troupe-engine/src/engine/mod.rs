//! Workflow execution engine
//!
//! Provides:
//! - `WorkflowEngine`: in-memory workflow table, append-only event log, and
//!   the sequential / parallel / map-reduce execution routines
//! - `EngineConfig`: fan-out concurrency tuning

mod executor;

pub use executor::{EngineConfig, WorkflowEngine};
