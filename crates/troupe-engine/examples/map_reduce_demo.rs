//! Map-Reduce Workflow Demo
//!
//! Runs a word-tally workflow: three map steps count words in their chunk
//! concurrently, then a reduce step sums the ordered map outputs. One map
//! step is dispatched through a pooled worker agent, and the run finishes
//! with an on-demand checkpoint.
//!
//! Run with: cargo run --example map_reduce_demo -p troupe-engine

use serde_json::json;

use troupe_engine::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Map-Reduce Workflow Demo ===\n");

    let orchestrator = Orchestrator::new();

    // Step 1: Spawn a worker agent for the first chunk
    println!("1. Spawning a counting worker");
    let counter = orchestrator.spawn_worker("word-count")?;
    println!("   spawned {}\n", counter.agent_id);

    // Step 2: Submit the workflow
    println!("2. Executing map-reduce workflow");
    let executor = step_executor(|step| async move {
        if step.id == "reduce" {
            let total: u64 = step
                .input
                .as_array()
                .map(|counts| counts.iter().filter_map(|v| v.as_u64()).sum())
                .unwrap_or(0);
            Ok(json!(total))
        } else {
            let words = step
                .input
                .get("chunk")
                .and_then(|v| v.as_str())
                .map(|text| text.split_whitespace().count())
                .unwrap_or(0);
            Ok(json!(words))
        }
    });

    let workflow = orchestrator
        .execute_workflow(
            "word-tally",
            ExecutionPattern::MapReduce,
            vec![
                StepSpec::new("count chunk 1", json!({"chunk": "the quick brown fox"}))
                    .with_agent(counter.agent_id.clone()),
                StepSpec::new("count chunk 2", json!({"chunk": "jumps over"})),
                StepSpec::new("count chunk 3", json!({"chunk": "the lazy dog"})),
                StepSpec::new("sum counts", json!(null)).with_id("reduce"),
            ],
            executor,
            WorkflowOptions::default(),
        )
        .await?;

    println!("   workflow {} is {}\n", workflow.id, workflow.state);

    // Step 3: Inspect the results
    println!("3. Step results");
    for step in &workflow.steps {
        println!(
            "   {:10} {:14} -> {}",
            step.id,
            step.name,
            step.output.as_ref().unwrap_or(&json!(null))
        );
    }
    println!();

    // Step 4: Worker metrics after dispatch
    println!("4. Worker pool after the run");
    let stats = orchestrator.worker_pool().stats();
    println!(
        "   total={} idle={} completed_tasks={} failed_tasks={}\n",
        stats.total, stats.idle, stats.completed_tasks, stats.failed_tasks
    );

    // Step 5: Event log
    println!("5. Event log");
    for event in orchestrator.get_event_log(Some(workflow.id)) {
        match event.step_id() {
            Some(step_id) => println!("   {:20} {}", event.kind(), step_id),
            None => println!("   {:20}", event.kind()),
        }
    }
    println!();

    // Step 6: On-demand checkpoint
    println!("6. Checkpointing");
    let checkpoint = orchestrator.checkpoint(workflow.id).await?;
    println!(
        "   checkpoint {} at event index {}",
        checkpoint.id, checkpoint.event_index
    );

    Ok(())
}
