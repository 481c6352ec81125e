//! Plan execution. Every step's tool is resolved before anything runs, the
//! invocations fan out with bounded concurrency, and the report comes back
//! in plan order no matter what finishes first.

use crate::tools::{Tool, ToolRegistry};
use crate::types::{ExecutionReport, Plan, PlanStep, ToolResult};
use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A planned tool name had no registry entry. Registry contents can drift
/// between planning and execution, so the executor checks independently of
/// the planner and aborts before any tool runs.
#[derive(Debug, Clone, Error)]
#[error("unknown tool '{name}'")]
pub struct UnknownToolError {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum tool invocations in flight at once.
    pub concurrency: usize,
    /// Per-invocation deadline. Exceeding it is recorded like any other
    /// tool failure and does not abort the batch.
    pub tool_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfig {
            concurrency: 4,
            tool_timeout: Duration::from_secs(60),
        }
    }
}

pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new() -> Self {
        Executor {
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(config: ExecutorConfig) -> Self {
        Executor { config }
    }

    /// Run every step of the plan and return one result per step, in plan
    /// order. A single tool failure never aborts the batch; a tool name
    /// missing from the registry aborts with zero side effects.
    pub async fn execute(
        &self,
        plan: &Plan,
        registry: &ToolRegistry,
        cancel: &CancellationToken,
    ) -> Result<ExecutionReport, UnknownToolError> {
        let mut resolved: Vec<(PlanStep, Arc<dyn Tool>)> = Vec::with_capacity(plan.len());
        for step in &plan.steps {
            let tool = registry.resolve(&step.tool).ok_or_else(|| UnknownToolError {
                name: step.tool.clone(),
            })?;
            resolved.push((step.clone(), tool));
        }

        let timeout = self.config.tool_timeout;
        let concurrency = self.config.concurrency.max(1);

        // buffered() drives at most `concurrency` futures and yields their
        // outputs in input order, which is exactly the report contract.
        let results: Vec<ToolResult> = stream::iter(resolved.into_iter().enumerate())
            .map(|(index, (step, tool))| {
                let cancel = cancel.clone();
                async move { run_step(index, step, tool, timeout, &cancel).await }
            })
            .buffered(concurrency)
            .collect()
            .await;

        log::info!(
            "[EXECUTOR] Completed {} steps ({} ok)",
            results.len(),
            results.iter().filter(|r| r.succeeded()).count()
        );

        Ok(ExecutionReport::new(results))
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_step(
    index: usize,
    step: PlanStep,
    tool: Arc<dyn Tool>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> ToolResult {
    if cancel.is_cancelled() {
        log::warn!("[EXECUTOR] Step {} ({}) not dispatched: cancelled", index, step.tool);
        return ToolResult {
            step,
            output: String::new(),
            error: Some("cancelled before dispatch".to_string()),
            duration_ms: 0,
        };
    }

    log::info!("[EXECUTOR] Step {}: running {} ({:.60})", index, step.tool, step.input);
    let started = Instant::now();

    let outcome = tokio::select! {
        result = tokio::time::timeout(timeout, tool.run(&step.input)) => match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
        },
        _ = cancel.cancelled() => Err("interrupted by cancellation".to_string()),
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(output) => {
            log::debug!(
                "[EXECUTOR] Step {} ({}) ok in {}ms, {} bytes",
                index,
                step.tool,
                duration_ms,
                output.len()
            );
            ToolResult {
                step,
                output,
                error: None,
                duration_ms,
            }
        }
        Err(message) => {
            log::warn!("[EXECUTOR] Step {} ({}) failed: {}", index, step.tool, message);
            ToolResult {
                step,
                output: String::new(),
                error: Some(message),
                duration_ms,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Echo,
        Fail(&'static str),
        Sleep(Duration),
    }

    struct StubTool {
        name: &'static str,
        behavior: Behavior,
        invocations: AtomicUsize,
    }

    impl StubTool {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Arc::new(StubTool {
                name,
                behavior,
                invocations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }

        async fn run(&self, input: &str) -> Result<String, ToolError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Echo => Ok(format!("{}: {}", self.name, input)),
                Behavior::Fail(message) => Err(ToolError::new(*message)),
                Behavior::Sleep(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(format!("{}: {}", self.name, input))
                }
            }
        }
    }

    fn plan_of(steps: &[(&str, &str)]) -> Plan {
        Plan {
            steps: steps
                .iter()
                .map(|(tool, input)| PlanStep {
                    tool: tool.to_string(),
                    input: input.to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_one_result_per_step_in_plan_order() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("A", Behavior::Echo));
        registry.register(StubTool::new("B", Behavior::Echo));

        let plan = plan_of(&[("A", "one"), ("B", "two"), ("A", "three")]);
        let report = Executor::new()
            .execute(&plan, &registry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.results[0].output, "A: one");
        assert_eq!(report.results[1].output, "B: two");
        assert_eq!(report.results[2].output, "A: three");
    }

    #[tokio::test]
    async fn test_order_stable_under_concurrency() {
        // The slowest step comes first; completion order inverts plan
        // order, the report must not.
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("slow", Behavior::Sleep(Duration::from_millis(80))));
        registry.register(StubTool::new("mid", Behavior::Sleep(Duration::from_millis(30))));
        registry.register(StubTool::new("fast", Behavior::Echo));

        let plan = plan_of(&[("slow", "1"), ("mid", "2"), ("fast", "3")]);
        let executor = Executor::with_config(ExecutorConfig {
            concurrency: 3,
            tool_timeout: Duration::from_secs(5),
        });

        let report = executor
            .execute(&plan, &registry, &CancellationToken::new())
            .await
            .unwrap();

        let tools: Vec<&str> = report.results.iter().map(|r| r.step.tool.as_str()).collect();
        assert_eq!(tools, vec!["slow", "mid", "fast"]);
        assert!(report.results.iter().all(|r| r.succeeded()));
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("ok", Behavior::Echo));
        registry.register(StubTool::new("broken", Behavior::Fail("credential rejected")));

        let plan = plan_of(&[("ok", "a"), ("broken", "b"), ("ok", "c")]);
        let report = Executor::new()
            .execute(&plan, &registry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert!(report.results[0].succeeded());
        assert_eq!(
            report.results[1].error.as_deref(),
            Some("credential rejected")
        );
        assert!(report.results[1].output.is_empty());
        assert!(report.results[2].succeeded());
        assert_eq!(report.success_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_plan_yields_empty_report() {
        let registry = ToolRegistry::new();
        let report = Executor::new()
            .execute(&Plan::empty(), &registry, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_aborts_before_any_run() {
        let mut registry = ToolRegistry::new();
        let counter = StubTool::new("known", Behavior::Echo);
        registry.register(counter.clone());

        let plan = plan_of(&[("known", "a"), ("ghost", "b")]);
        let err = Executor::new()
            .execute(&plan, &registry, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.name, "ghost");
        assert_eq!(counter.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_recorded_as_step_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool::new("stall", Behavior::Sleep(Duration::from_secs(5))));
        registry.register(StubTool::new("quick", Behavior::Echo));

        let executor = Executor::with_config(ExecutorConfig {
            concurrency: 2,
            tool_timeout: Duration::from_millis(20),
        });
        let plan = plan_of(&[("stall", "a"), ("quick", "b")]);
        let report = executor
            .execute(&plan, &registry, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.len(), 2);
        assert!(report.results[0].error.as_deref().unwrap().contains("timed out"));
        assert!(report.results[1].succeeded());
    }

    #[tokio::test]
    async fn test_cancellation_stops_dispatch() {
        let mut registry = ToolRegistry::new();
        let counter = StubTool::new("tool", Behavior::Echo);
        registry.register(counter.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let plan = plan_of(&[("tool", "a"), ("tool", "b")]);
        let report = Executor::new()
            .execute(&plan, &registry, &cancel)
            .await
            .unwrap();

        // Still one result per step, but nothing actually ran.
        assert_eq!(report.len(), 2);
        assert!(report.results.iter().all(|r| !r.succeeded()));
        assert_eq!(counter.invocations.load(Ordering::SeqCst), 0);
    }
}
