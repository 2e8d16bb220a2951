//! Checkpoint persistence and replay
//!
//! Provides:
//! - `CheckpointStore`: pluggable persistence boundary for checkpoints
//! - `InMemoryCheckpointStore`: process-memory store keeping full history
//! - `replay_from_checkpoint`: pure event fold used by crash recovery

mod memory;
mod replay;
mod store;

pub use memory::InMemoryCheckpointStore;
pub use replay::replay_from_checkpoint;
pub use store::CheckpointStore;
