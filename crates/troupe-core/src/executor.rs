// Step executor seam
//
// The engine never decides what a step does. Callers hand in an executor:
// an async function from a Step to either a success value or an error
// string. The engine wraps executor failures into WorkflowStepError with
// the owning workflow and step attached.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::step::Step;

/// Step execution result
pub type StepResult = Result<serde_json::Value, String>;

/// Step executor function type
pub type StepExecutor =
    Arc<dyn Fn(Step) -> Pin<Box<dyn Future<Output = StepResult> + Send>> + Send + Sync>;

/// Wrap an async closure into a [`StepExecutor`]
///
/// # Example
///
/// ```
/// use troupe_core::executor::step_executor;
/// use serde_json::json;
///
/// let executor = step_executor(|step| async move {
///     Ok(json!({ "echo": step.name }))
/// });
/// ```
pub fn step_executor<F, Fut>(f: F) -> StepExecutor
where
    F: Fn(Step) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StepResult> + Send + 'static,
{
    Arc::new(move |step| Box::pin(f(step)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_step_executor_wraps_closure() {
        let executor = step_executor(|step| async move { Ok(json!({ "ran": step.id })) });

        let step = Step::new("s1", "fetch", json!({}));
        let result = executor(step).await.unwrap();
        assert_eq!(result, json!({ "ran": "s1" }));
    }

    #[tokio::test]
    async fn test_step_executor_propagates_errors() {
        let executor = step_executor(|_| async move { Err("no backend".to_string()) });

        let step = Step::new("s1", "fetch", json!({}));
        let result = executor(step).await;
        assert_eq!(result, Err("no backend".to_string()));
    }
}
