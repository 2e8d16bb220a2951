//! Worker agent pool
//!
//! Tracks the fleet of ephemeral worker agents that steps can be dispatched
//! to. The pool enforces a capacity ceiling on spawn, hands agents out for
//! step execution, and retires draining agents once their in-flight work
//! finishes.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use troupe_core::{WorkerAgent, WorkerPoolError, WorkerStatus, WorkflowId};

/// Configuration for the worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Maximum number of live workers
    pub max_workers: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { max_workers: 10 }
    }
}

impl WorkerPoolConfig {
    /// Set the worker ceiling (minimum 1)
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max.max(1);
        self
    }
}

/// Filter for listing workers
#[derive(Debug, Clone, Default)]
pub struct WorkerFilter {
    pub specialty: Option<String>,
    pub status: Option<WorkerStatus>,
}

impl WorkerFilter {
    pub fn by_specialty(specialty: impl Into<String>) -> Self {
        Self {
            specialty: Some(specialty.into()),
            status: None,
        }
    }

    pub fn by_status(status: WorkerStatus) -> Self {
        Self {
            specialty: None,
            status: Some(status),
        }
    }

    fn matches(&self, agent: &WorkerAgent) -> bool {
        if let Some(specialty) = &self.specialty {
            if &agent.specialty != specialty {
                return false;
            }
        }
        if let Some(status) = self.status {
            if agent.status != status {
                return false;
            }
        }
        true
    }
}

/// Aggregate counters across the pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    pub total: usize,
    pub idle: usize,
    pub busy: usize,
    pub draining: usize,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
}

/// Pool of worker agents with a capacity ceiling
pub struct WorkerPool {
    workers: RwLock<HashMap<String, WorkerAgent>>,
    config: WorkerPoolConfig,
}

impl WorkerPool {
    /// Create a pool with the default configuration
    pub fn new() -> Self {
        Self::with_config(WorkerPoolConfig::default())
    }

    /// Create a pool with a custom configuration
    pub fn with_config(config: WorkerPoolConfig) -> Self {
        Self {
            workers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The pool configuration
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Spawn a fresh idle worker, refusing once the pool is at capacity
    pub fn spawn(&self, specialty: impl Into<String>) -> Result<WorkerAgent, WorkerPoolError> {
        let mut workers = self.workers.write();

        if workers.len() >= self.config.max_workers {
            // Remaining spawn capacity, zero whenever this branch is taken
            return Err(WorkerPoolError::AtCapacity {
                available_workers: self.config.max_workers.saturating_sub(workers.len()),
                required_workers: 1,
            });
        }

        let agent = WorkerAgent::new(specialty);
        info!(agent_id = %agent.agent_id, specialty = %agent.specialty, "spawned worker");
        workers.insert(agent.agent_id.clone(), agent.clone());
        Ok(agent)
    }

    /// Bind an idle worker to a workflow step
    pub fn assign(
        &self,
        agent_id: &str,
        workflow_id: WorkflowId,
        step_id: &str,
    ) -> Result<(), WorkerPoolError> {
        let mut workers = self.workers.write();
        let agent = workers
            .get_mut(agent_id)
            .ok_or_else(|| WorkerPoolError::WorkerNotFound(agent_id.to_string()))?;

        if !agent.is_available() {
            return Err(WorkerPoolError::WorkerNotIdle {
                agent_id: agent_id.to_string(),
                status: agent.status,
            });
        }

        agent.assign(workflow_id, step_id);
        debug!(agent_id, %workflow_id, step_id, "assigned worker");
        Ok(())
    }

    /// Unbind a worker, folding the task outcome into its metrics.
    /// A draining worker leaves the pool instead of returning to idle.
    pub fn release(
        &self,
        agent_id: &str,
        success: bool,
        latency_ms: f64,
    ) -> Result<(), WorkerPoolError> {
        let mut workers = self.workers.write();
        let agent = workers
            .get_mut(agent_id)
            .ok_or_else(|| WorkerPoolError::WorkerNotFound(agent_id.to_string()))?;

        agent.release(success, latency_ms);

        if agent.status == WorkerStatus::Draining {
            workers.remove(agent_id);
            info!(agent_id, "removed drained worker");
        } else {
            debug!(agent_id, success, latency_ms, "released worker");
        }
        Ok(())
    }

    /// Remove a worker gracefully. Idle workers leave immediately; busy
    /// workers are marked draining and leave when released.
    pub fn drain(&self, agent_id: &str) -> Result<(), WorkerPoolError> {
        let mut workers = self.workers.write();
        let agent = workers
            .get_mut(agent_id)
            .ok_or_else(|| WorkerPoolError::WorkerNotFound(agent_id.to_string()))?;

        if agent.is_available() {
            workers.remove(agent_id);
            info!(agent_id, "removed idle worker");
        } else {
            agent.status = WorkerStatus::Draining;
            info!(agent_id, "worker draining, will leave at release");
        }
        Ok(())
    }

    /// Look up a worker by id
    pub fn get(&self, agent_id: &str) -> Option<WorkerAgent> {
        self.workers.read().get(agent_id).cloned()
    }

    /// List workers passing the filter
    pub fn list(&self, filter: &WorkerFilter) -> Vec<WorkerAgent> {
        self.workers
            .read()
            .values()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect()
    }

    /// Aggregate counters across all live workers
    pub fn stats(&self) -> PoolStats {
        let workers = self.workers.read();
        let mut stats = PoolStats {
            total: workers.len(),
            ..PoolStats::default()
        };

        for agent in workers.values() {
            match agent.status {
                WorkerStatus::Idle => stats.idle += 1,
                WorkerStatus::Busy => stats.busy += 1,
                WorkerStatus::Draining => stats.draining += 1,
                WorkerStatus::Failed => {}
            }
            stats.completed_tasks += agent.completed_tasks;
            stats.failed_tasks += agent.failed_tasks;
        }
        stats
    }

    /// Number of live workers
    pub fn size(&self) -> usize {
        self.workers.read().len()
    }

    /// Number of workers ready for assignment
    pub fn idle_count(&self) -> usize {
        self.workers
            .read()
            .values()
            .filter(|w| w.is_available())
            .count()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_up_to_capacity() {
        let pool = WorkerPool::with_config(WorkerPoolConfig::default().with_max_workers(2));

        pool.spawn("research").unwrap();
        pool.spawn("analysis").unwrap();
        assert_eq!(pool.size(), 2);

        // No spawn capacity remains even though both workers sit idle
        let err = pool.spawn("writing").unwrap_err();
        match err {
            WorkerPoolError::AtCapacity {
                available_workers,
                required_workers,
            } => {
                assert_eq!(available_workers, 0);
                assert_eq!(required_workers, 1);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[test]
    fn test_assign_and_release() {
        let pool = WorkerPool::new();
        let agent = pool.spawn("research").unwrap();
        let workflow_id = WorkflowId::new();

        pool.assign(&agent.agent_id, workflow_id, "s1").unwrap();
        let busy = pool.get(&agent.agent_id).unwrap();
        assert_eq!(busy.status, WorkerStatus::Busy);
        assert_eq!(busy.current_workflow_id, Some(workflow_id));

        pool.release(&agent.agent_id, true, 40.0).unwrap();
        let idle = pool.get(&agent.agent_id).unwrap();
        assert_eq!(idle.status, WorkerStatus::Idle);
        assert_eq!(idle.completed_tasks, 1);
        assert_eq!(idle.avg_latency_ms, 40.0);
    }

    #[test]
    fn test_assign_requires_idle() {
        let pool = WorkerPool::new();
        let agent = pool.spawn("research").unwrap();
        let workflow_id = WorkflowId::new();

        pool.assign(&agent.agent_id, workflow_id, "s1").unwrap();
        let err = pool.assign(&agent.agent_id, workflow_id, "s2").unwrap_err();
        assert!(matches!(err, WorkerPoolError::WorkerNotIdle { .. }));

        let err = pool.assign("worker-missing", workflow_id, "s1").unwrap_err();
        assert!(matches!(err, WorkerPoolError::WorkerNotFound(_)));
    }

    #[test]
    fn test_release_updates_latency_average() {
        let pool = WorkerPool::new();
        let agent = pool.spawn("research").unwrap();
        let workflow_id = WorkflowId::new();

        pool.assign(&agent.agent_id, workflow_id, "s1").unwrap();
        pool.release(&agent.agent_id, true, 100.0).unwrap();
        pool.assign(&agent.agent_id, workflow_id, "s2").unwrap();
        pool.release(&agent.agent_id, false, 200.0).unwrap();

        let worker = pool.get(&agent.agent_id).unwrap();
        assert_eq!(worker.completed_tasks, 1);
        assert_eq!(worker.failed_tasks, 1);
        assert!((worker.avg_latency_ms - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_drain_idle_removes_immediately() {
        let pool = WorkerPool::new();
        let agent = pool.spawn("research").unwrap();

        pool.drain(&agent.agent_id).unwrap();
        assert!(pool.get(&agent.agent_id).is_none());
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_drain_busy_defers_removal_until_release() {
        let pool = WorkerPool::new();
        let agent = pool.spawn("research").unwrap();
        pool.assign(&agent.agent_id, WorkflowId::new(), "s1").unwrap();

        pool.drain(&agent.agent_id).unwrap();
        let draining = pool.get(&agent.agent_id).unwrap();
        assert_eq!(draining.status, WorkerStatus::Draining);

        pool.release(&agent.agent_id, true, 15.0).unwrap();
        assert!(pool.get(&agent.agent_id).is_none());
    }

    #[test]
    fn test_list_filters() {
        let pool = WorkerPool::new();
        let researcher = pool.spawn("research").unwrap();
        pool.spawn("analysis").unwrap();
        pool.assign(&researcher.agent_id, WorkflowId::new(), "s1")
            .unwrap();

        assert_eq!(pool.list(&WorkerFilter::by_specialty("research")).len(), 1);
        assert_eq!(pool.list(&WorkerFilter::by_status(WorkerStatus::Idle)).len(), 1);
        assert_eq!(pool.list(&WorkerFilter::default()).len(), 2);

        let busy_researchers = WorkerFilter {
            specialty: Some("research".to_string()),
            status: Some(WorkerStatus::Busy),
        };
        assert_eq!(pool.list(&busy_researchers).len(), 1);
    }

    #[test]
    fn test_stats() {
        let pool = WorkerPool::new();
        let a = pool.spawn("research").unwrap();
        let b = pool.spawn("analysis").unwrap();
        pool.spawn("writing").unwrap();

        let workflow_id = WorkflowId::new();
        pool.assign(&a.agent_id, workflow_id, "s1").unwrap();
        pool.release(&a.agent_id, true, 10.0).unwrap();
        pool.assign(&b.agent_id, workflow_id, "s2").unwrap();

        let stats = pool.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.busy, 1);
        assert_eq!(stats.draining, 0);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.failed_tasks, 0);
        assert_eq!(pool.idle_count(), 2);
    }
}
