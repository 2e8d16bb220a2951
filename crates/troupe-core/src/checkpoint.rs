// Checkpoint snapshot
//
// A checkpoint pairs a full workflow snapshot with the position in that
// workflow's event sequence at the moment it was taken. Recovery starts
// from the snapshot and folds only events recorded at or after event_index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::{Workflow, WorkflowId};

/// Durable point-in-time snapshot of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint identifier
    pub id: Uuid,

    /// Workflow the snapshot belongs to
    pub workflow_id: WorkflowId,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,

    /// Full workflow snapshot at the moment of capture
    pub state: Workflow,

    /// Length of the workflow's event sequence when the snapshot was taken.
    /// Replay applies only events at positions >= this index.
    pub event_index: usize,
}

impl Checkpoint {
    /// Snapshot a workflow at the given event position
    pub fn new(state: Workflow, event_index: usize) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id: state.id,
            timestamp: Utc::now(),
            state,
            event_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Step;
    use crate::workflow::ExecutionPattern;
    use serde_json::json;

    #[test]
    fn test_checkpoint_captures_workflow() {
        let wf = Workflow::new(
            "ingest",
            ExecutionPattern::Sequential,
            vec![Step::new("s1", "fetch", json!({}))],
        );
        let workflow_id = wf.id;

        let checkpoint = Checkpoint::new(wf, 4);
        assert_eq!(checkpoint.workflow_id, workflow_id);
        assert_eq!(checkpoint.event_index, 4);
        assert_eq!(checkpoint.state.steps.len(), 1);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let wf = Workflow::new("ingest", ExecutionPattern::Parallel, vec![]);
        let checkpoint = Checkpoint::new(wf, 0);

        let json = serde_json::to_string(&checkpoint).unwrap();
        let parsed: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, checkpoint.id);
        assert_eq!(parsed.event_index, 0);
    }
}
