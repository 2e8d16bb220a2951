//! Orchestration service
//!
//! Provides:
//! - `Orchestrator`: the public facade; submits workflows to the engine,
//!   dispatches agent-bound steps through the worker pool, and persists
//!   checkpoints through the configured store

mod service;

pub use service::Orchestrator;
