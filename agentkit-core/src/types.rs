use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One planned tool invocation: a registered tool name and the input text
/// the planner chose for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: String,
    pub input: String,
}

/// Ordered sequence of steps for one cycle. An empty plan is valid and
/// means the goal needs no tool use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn empty() -> Self {
        Plan { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of one executed step. `error` is set when the tool failed or
/// timed out; the output is empty in that case.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub step: PlanStep,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ToolResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered record of outcomes, one per plan step, immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub results: Vec<ToolResult>,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionReport {
    pub fn new(results: Vec<ToolResult>) -> Self {
        ExecutionReport {
            results,
            completed_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Count of steps that produced usable output.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.succeeded()).count()
    }
}
