//! Checkpoint replay
//!
//! Rebuilds a workflow by folding logged events over a checkpoint snapshot.
//! Replay is pure and deterministic: every timestamp comes from the events,
//! never from the clock, so the same checkpoint and log always produce the
//! same workflow.

use tracing::debug;

use troupe_core::{Checkpoint, DomainEvent, EventPayload, StepStatus, Workflow, WorkflowState};

/// Fold events recorded after a checkpoint into its snapshot.
///
/// `events` is the full log. Entries are filtered to the checkpoint's
/// workflow and the first `event_index` of those are skipped, since the
/// snapshot already reflects them. Re-applying an already-reflected event
/// converges on the same state, so a stale `event_index` under-counts
/// harmlessly; an over-count would silently lose transitions, which is why
/// checkpoints record the event position before snapshotting.
pub fn replay_from_checkpoint(checkpoint: &Checkpoint, events: &[DomainEvent]) -> Workflow {
    let mut workflow = checkpoint.state.clone();

    let mut applied = 0usize;
    for event in events
        .iter()
        .filter(|e| e.workflow_id == checkpoint.workflow_id)
        .skip(checkpoint.event_index)
    {
        apply_event(&mut workflow, event);
        applied += 1;
    }

    debug!(workflow_id = %workflow.id, applied, "replayed events over checkpoint");
    workflow
}

/// Apply one event to the projection, timestamps taken from the event
fn apply_event(workflow: &mut Workflow, event: &DomainEvent) {
    match &event.payload {
        // The snapshot already carries the created record
        EventPayload::WorkflowCreated { .. } => {}

        EventPayload::WorkflowCompleted { .. } => {
            workflow.state = WorkflowState::Completed;
            workflow.completed_at = Some(event.timestamp);
            workflow.updated_at = event.timestamp;
        }

        EventPayload::WorkflowFailed { .. } => {
            workflow.state = WorkflowState::Failed;
            workflow.completed_at = Some(event.timestamp);
            workflow.updated_at = event.timestamp;
        }

        EventPayload::WorkflowPaused { .. } => {
            workflow.state = WorkflowState::Paused;
            workflow.updated_at = event.timestamp;
        }

        EventPayload::WorkflowResumed => {
            workflow.state = WorkflowState::Running;
            workflow.updated_at = event.timestamp;
        }

        EventPayload::StepStarted { step_id, agent_id } => {
            if let Some(step) = workflow.step_mut(step_id) {
                step.status = StepStatus::Running;
                step.started_at = Some(event.timestamp);
                step.completed_at = None;
                step.error = None;
                if agent_id.is_some() {
                    step.agent_id = agent_id.clone();
                }
            }
        }

        EventPayload::StepCompleted { step_id, output } => {
            if let Some(step) = workflow.step_mut(step_id) {
                step.status = StepStatus::Completed;
                step.output = Some(output.clone());
                step.completed_at = Some(event.timestamp);
                step.error = None;
            }
        }

        EventPayload::StepFailed { step_id, error } => {
            if let Some(step) = workflow.step_mut(step_id) {
                step.status = StepStatus::Failed;
                step.error = Some(error.clone());
                step.completed_at = Some(event.timestamp);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use troupe_core::{ExecutionPattern, Step, WorkflowId};

    fn two_step_workflow() -> Workflow {
        Workflow::new(
            "ingest",
            ExecutionPattern::Sequential,
            vec![
                Step::new("s1", "fetch", json!({})),
                Step::new("s2", "parse", json!({})),
            ],
        )
    }

    fn step_events(workflow_id: WorkflowId, step_id: &str, output: serde_json::Value) -> Vec<DomainEvent> {
        vec![
            DomainEvent::new(
                workflow_id,
                EventPayload::StepStarted {
                    step_id: step_id.to_string(),
                    agent_id: None,
                },
            ),
            DomainEvent::new(
                workflow_id,
                EventPayload::StepCompleted {
                    step_id: step_id.to_string(),
                    output,
                },
            ),
        ]
    }

    #[test]
    fn test_replay_applies_events_after_checkpoint() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let mut events = step_events(workflow_id, "s1", json!("r1"));
        events.extend(step_events(workflow_id, "s2", json!("r2")));

        let rebuilt = replay_from_checkpoint(&checkpoint, &events);

        assert_eq!(rebuilt.steps[0].status, StepStatus::Completed);
        assert_eq!(rebuilt.steps[0].output, Some(json!("r1")));
        assert_eq!(rebuilt.steps[1].output, Some(json!("r2")));

        // Timestamps come from the events, not the clock
        assert_eq!(rebuilt.steps[0].started_at, Some(events[0].timestamp));
        assert_eq!(rebuilt.steps[0].completed_at, Some(events[1].timestamp));
    }

    #[test]
    fn test_replay_skips_reflected_events() {
        let mut workflow = two_step_workflow();
        let workflow_id = workflow.id;
        workflow.steps[0].complete(json!("snapshot value"));

        // The snapshot reflects s1's two events; only s2's apply
        let checkpoint = Checkpoint::new(workflow, 2);

        let mut events = step_events(workflow_id, "s1", json!("replayed value"));
        events.extend(step_events(workflow_id, "s2", json!("r2")));

        let rebuilt = replay_from_checkpoint(&checkpoint, &events);

        assert_eq!(rebuilt.steps[0].output, Some(json!("snapshot value")));
        assert_eq!(rebuilt.steps[1].output, Some(json!("r2")));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let mut events = step_events(workflow_id, "s1", json!("r1"));
        events.push(DomainEvent::new(
            workflow_id,
            EventPayload::WorkflowCompleted {
                outputs: vec![json!("r1"), json!(null)],
            },
        ));

        let first = replay_from_checkpoint(&checkpoint, &events);
        let second = replay_from_checkpoint(&checkpoint, &events);

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_replay_ignores_other_workflows() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let mut events = step_events(WorkflowId::new(), "s1", json!("other"));
        events.extend(step_events(workflow_id, "s1", json!("mine")));

        let rebuilt = replay_from_checkpoint(&checkpoint, &events);
        assert_eq!(rebuilt.steps[0].output, Some(json!("mine")));
    }

    #[test]
    fn test_replay_terminal_events() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let completed = DomainEvent::new(
            workflow_id,
            EventPayload::WorkflowCompleted { outputs: vec![] },
        );
        let rebuilt = replay_from_checkpoint(&checkpoint, std::slice::from_ref(&completed));
        assert_eq!(rebuilt.state, WorkflowState::Completed);
        assert_eq!(rebuilt.completed_at, Some(completed.timestamp));

        let failed = DomainEvent::new(
            workflow_id,
            EventPayload::WorkflowFailed {
                error: "boom".to_string(),
            },
        );
        let rebuilt = replay_from_checkpoint(&checkpoint, &[failed]);
        assert_eq!(rebuilt.state, WorkflowState::Failed);
    }

    #[test]
    fn test_replay_pause_and_resume() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let events = vec![
            DomainEvent::new(
                workflow_id,
                EventPayload::WorkflowPaused {
                    reason: "operator hold".to_string(),
                },
            ),
            DomainEvent::new(workflow_id, EventPayload::WorkflowResumed),
        ];

        let rebuilt = replay_from_checkpoint(&checkpoint, &events);
        assert_eq!(rebuilt.state, WorkflowState::Running);
    }

    #[test]
    fn test_replay_tolerates_unknown_step() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let events = step_events(workflow_id, "no-such-step", json!(1));
        let rebuilt = replay_from_checkpoint(&checkpoint, &events);

        assert_eq!(rebuilt.steps[0].status, StepStatus::Pending);
        assert_eq!(rebuilt.steps[1].status, StepStatus::Pending);
    }

    #[test]
    fn test_replay_failed_step() {
        let workflow = two_step_workflow();
        let workflow_id = workflow.id;
        let checkpoint = Checkpoint::new(workflow, 0);

        let events = vec![
            DomainEvent::new(
                workflow_id,
                EventPayload::StepStarted {
                    step_id: "s1".to_string(),
                    agent_id: Some("worker-7".to_string()),
                },
            ),
            DomainEvent::new(
                workflow_id,
                EventPayload::StepFailed {
                    step_id: "s1".to_string(),
                    error: "timeout".to_string(),
                },
            ),
        ];

        let rebuilt = replay_from_checkpoint(&checkpoint, &events);
        let step = &rebuilt.steps[0];
        assert_eq!(step.status, StepStatus::Failed);
        assert_eq!(step.error.as_deref(), Some("timeout"));
        assert_eq!(step.agent_id.as_deref(), Some("worker-7"));
    }
}
