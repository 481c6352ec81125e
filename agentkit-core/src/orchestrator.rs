//! One request/response cycle: plan, execute, summarize. Planning and
//! summarization failures are terminal; individual tool failures are not.

use crate::ai::LanguageModel;
use crate::executor::{Executor, ExecutorConfig, UnknownToolError};
use crate::memory::Memory;
use crate::planner::{Planner, PlannerConfig, PlanningError};
use crate::summarizer::{SummarizationError, Summarizer};
use crate::tools::ToolRegistry;
use crate::types::{ExecutionReport, Plan};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Terminal failure of a cycle, naming the stage that failed.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),
    #[error("execution failed: {0}")]
    UnknownTool(#[from] UnknownToolError),
    #[error("summarization failed: {0}")]
    Summarization(#[from] SummarizationError),
}

impl CycleError {
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::Planning(_) => "planning",
            CycleError::UnknownTool(_) => "execution",
            CycleError::Summarization(_) => "summarization",
        }
    }
}

/// Everything a presentation layer needs from one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Cycle {
    pub id: String,
    pub goal: String,
    pub plan: Plan,
    pub report: ExecutionReport,
    pub summary: String,
}

pub struct Orchestrator {
    model: Arc<dyn LanguageModel>,
    planner: Planner,
    executor: Executor,
    summarizer: Summarizer,
    registry: Arc<ToolRegistry>,
    memory: Option<Arc<Memory>>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn LanguageModel>, registry: Arc<ToolRegistry>) -> Self {
        Orchestrator {
            planner: Planner::new(model.clone()),
            executor: Executor::new(),
            summarizer: Summarizer::new(model.clone()),
            model,
            registry,
            memory: None,
        }
    }

    pub fn with_planner_config(mut self, config: PlannerConfig) -> Self {
        self.planner = Planner::with_config(self.model.clone(), config);
        self
    }

    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor = Executor::with_config(config);
        self
    }

    /// Record completed exchanges into the given memory log.
    pub fn with_memory(mut self, memory: Arc<Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Run one full cycle. The token propagates to in-flight tool calls and
    /// model calls; cancellation at planning aborts before any tool runs.
    pub async fn run_cycle(
        &self,
        goal: &str,
        enabled_tools: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Cycle, CycleError> {
        let id = Uuid::new_v4().to_string();
        log::info!("[ORCHESTRATOR] Cycle {} started: {}", id, goal);

        let plan = self.planner.plan(goal, enabled_tools, cancel).await?;
        log::info!("[ORCHESTRATOR] Cycle {}: plan has {} steps", id, plan.len());

        let report = self.executor.execute(&plan, &self.registry, cancel).await?;
        log::info!(
            "[ORCHESTRATOR] Cycle {}: executed {} steps, {} succeeded",
            id,
            report.len(),
            report.success_count()
        );

        let summary = self.summarizer.summarize(goal, &report, cancel).await?;

        if let Some(memory) = &self.memory {
            memory.save(goal, &summary);
        }

        log::info!("[ORCHESTRATOR] Cycle {} complete", id);
        Ok(Cycle {
            id,
            goal: goal.to_string(),
            plan,
            report,
            summary,
        })
    }

    /// Convenience wrapper returning just the summary text.
    pub async fn run(
        &self,
        goal: &str,
        enabled_tools: &BTreeSet<String>,
    ) -> Result<String, CycleError> {
        self.run_cycle(goal, enabled_tools, &CancellationToken::new())
            .await
            .map(|cycle| cycle.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Message, TokenStream};
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies: first call answers the planner, second
    /// answers the summarizer.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
            Arc::new(ScriptedModel {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, _messages: Vec<Message>) -> Result<String, String> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        }

        async fn stream(&self, _messages: Vec<Message>) -> Result<TokenStream, String> {
            Err("not supported".to_string())
        }
    }

    struct SearchStub;

    #[async_trait]
    impl Tool for SearchStub {
        fn name(&self) -> &str {
            "GoogleSearch"
        }

        fn description(&self) -> &str {
            "stub search"
        }

        async fn run(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("results for '{}'", input))
        }
    }

    struct BadCredentialStub;

    #[async_trait]
    impl Tool for BadCredentialStub {
        fn name(&self) -> &str {
            "GoogleSearch"
        }

        fn description(&self) -> &str {
            "stub with broken credentials"
        }

        async fn run(&self, _input: &str) -> Result<String, ToolError> {
            Err(ToolError::new("google: SerpAPI key is not configured"))
        }
    }

    fn enabled(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_full_cycle() {
        let model = ScriptedModel::new(vec![
            Ok(r#"[{"tool": "GoogleSearch", "input": "latest AI news"}]"#.to_string()),
            Ok("Summary: the AI news is plentiful.".to_string()),
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchStub));

        let orchestrator = Orchestrator::new(model, Arc::new(registry));
        let cycle = orchestrator
            .run_cycle(
                "Summarize the latest AI news",
                &enabled(&["GoogleSearch"]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(cycle.plan.len(), 1);
        assert_eq!(cycle.report.len(), 1);
        assert_eq!(cycle.report.results[0].output, "results for 'latest AI news'");
        assert_eq!(cycle.summary, "Summary: the AI news is plentiful.");
    }

    #[tokio::test]
    async fn test_no_tools_enabled_still_summarizes() {
        // Planner never consults the model, so the single scripted reply
        // goes to the summarizer.
        let model = ScriptedModel::new(vec![Ok("Answer from the goal alone.".to_string())]);
        let registry = ToolRegistry::new();

        let orchestrator = Orchestrator::new(model, Arc::new(registry));
        let cycle = orchestrator
            .run_cycle("X", &BTreeSet::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(cycle.plan.is_empty());
        assert!(cycle.report.is_empty());
        assert_eq!(cycle.summary, "Answer from the goal alone.");
    }

    #[tokio::test]
    async fn test_planning_failure_is_terminal() {
        let model = ScriptedModel::new(vec![Ok("this is not json".to_string())]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchStub));

        let orchestrator = Orchestrator::new(model, Arc::new(registry));
        let err = orchestrator
            .run_cycle("goal", &enabled(&["GoogleSearch"]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "planning");
    }

    #[tokio::test]
    async fn test_bad_credentials_do_not_abort_cycle() {
        let model = ScriptedModel::new(vec![
            Ok(r#"[{"tool": "GoogleSearch", "input": "anything"}]"#.to_string()),
            Ok("No search data was available.".to_string()),
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(BadCredentialStub));

        let orchestrator = Orchestrator::new(model, Arc::new(registry));
        let cycle = orchestrator
            .run_cycle("goal", &enabled(&["GoogleSearch"]), &CancellationToken::new())
            .await
            .unwrap();

        assert!(cycle.report.results[0].error.is_some());
        assert_eq!(cycle.summary, "No search data was available.");
    }

    #[tokio::test]
    async fn test_summarization_failure_is_terminal() {
        let model = ScriptedModel::new(vec![
            Ok("[]".to_string()),
            Ok("".to_string()),
        ]);
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(SearchStub));

        let orchestrator = Orchestrator::new(model, Arc::new(registry));
        let err = orchestrator
            .run_cycle("goal", &enabled(&["GoogleSearch"]), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), "summarization");
    }

    #[tokio::test]
    async fn test_memory_records_completed_cycle() {
        let model = ScriptedModel::new(vec![Ok("A summary.".to_string())]);
        let memory = Arc::new(Memory::new());

        let orchestrator = Orchestrator::new(model, Arc::new(ToolRegistry::new()))
            .with_memory(memory.clone());
        orchestrator
            .run_cycle("remember me", &BTreeSet::new(), &CancellationToken::new())
            .await
            .unwrap();

        let history = memory.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].goal, "remember me");
        assert_eq!(history[0].summary, "A summary.");
    }
}
