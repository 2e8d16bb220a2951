//! Worker agent pool
//!
//! Provides:
//! - `WorkerPool`: capacity-bounded registry of ephemeral worker agents
//! - `WorkerPoolConfig`: pool sizing
//! - `WorkerFilter` / `PoolStats`: read-side queries
//!
//! Agents move through a small lifecycle:
//!
//! ```text
//!   spawn ──> idle ──assign──> busy ──release──> idle
//!               │                │
//!             drain            drain
//!               │                │
//!               v                v
//!            removed         draining ──release──> removed
//! ```

mod pool;

pub use pool::{PoolStats, WorkerFilter, WorkerPool, WorkerPoolConfig};
