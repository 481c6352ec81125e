//! Goal to plan. One language-model call per invocation; the reply is an
//! untrusted payload that must validate into a `Plan` before anything runs.
//! Any defect rejects the whole plan, invalid steps are never filtered out.

use crate::ai::{LanguageModel, Message};
use crate::types::{Plan, PlanStep};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PlanningError {
    /// The language-model collaborator could not be reached or errored.
    #[error("language model call failed: {0}")]
    Llm(String),
    /// The reply did not parse as a JSON list of {tool, input} objects.
    #[error("malformed plan: {0}")]
    Malformed(String),
    /// A step referenced a tool outside the enabled set.
    #[error("plan references unknown tool '{0}'")]
    UnknownTool(String),
    #[error("planning cancelled")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Extra attempts after a transport failure. Validation failures are
    /// never retried.
    pub retries: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig { retries: 0 }
    }
}

const PLANNER_BEHAVIOR: &str = "You are a planning agent. You read a user goal \
and select which tools should run to fulfill it, each with its own input.";

pub struct Planner {
    model: Arc<dyn LanguageModel>,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Planner {
            model,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(model: Arc<dyn LanguageModel>, config: PlannerConfig) -> Self {
        Planner { model, config }
    }

    /// Produce a validated plan for the goal. With no enabled tools there
    /// is nothing to choose from, so the model is not consulted at all.
    pub async fn plan(
        &self,
        goal: &str,
        enabled_tools: &BTreeSet<String>,
        cancel: &CancellationToken,
    ) -> Result<Plan, PlanningError> {
        if enabled_tools.is_empty() {
            log::info!("[PLANNER] No tools enabled, returning empty plan");
            return Ok(Plan::empty());
        }

        let messages = vec![
            Message::system(PLANNER_BEHAVIOR),
            Message::user(build_plan_prompt(goal, enabled_tools)),
        ];

        let mut attempt = 0;
        let raw = loop {
            if cancel.is_cancelled() {
                return Err(PlanningError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(PlanningError::Cancelled),
                r = self.model.generate(messages.clone()) => r,
            };

            match result {
                Ok(text) => break text,
                Err(e) if attempt < self.config.retries => {
                    attempt += 1;
                    log::warn!(
                        "[PLANNER] Model call failed, retrying ({}/{}): {}",
                        attempt,
                        self.config.retries,
                        e
                    );
                }
                Err(e) => return Err(PlanningError::Llm(e)),
            }
        };

        let plan = parse_plan(&raw, enabled_tools)?;
        log::info!("[PLANNER] Validated plan with {} steps", plan.len());
        Ok(plan)
    }
}

fn build_plan_prompt(goal: &str, enabled_tools: &BTreeSet<String>) -> String {
    let tool_list = enabled_tools
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You receive a user goal and select tools to execute it.\n\
         Return a JSON list of steps, where each step has two fields:\n\
         \x20 - tool: one of [{}]\n\
         \x20 - input: what to feed into the tool\n\n\
         Goal: {}\n\n\
         EXAMPLE OUTPUT:\n\
         [{{\"tool\": \"RedditSearch\", \"input\": \"open-source AI\"}}]\n\n\
         ONLY return a valid JSON list of steps, no commentary. \
         If no tool applies, return []",
        tool_list, goal
    )
}

#[derive(Debug, Deserialize)]
struct RawStep {
    tool: String,
    input: String,
}

/// Validate an untrusted model reply into a `Plan`.
pub fn parse_plan(raw: &str, enabled_tools: &BTreeSet<String>) -> Result<Plan, PlanningError> {
    let stripped = strip_code_fences(raw);

    let raw_steps: Vec<RawStep> =
        serde_json::from_str(stripped).map_err(|e| PlanningError::Malformed(e.to_string()))?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for raw_step in raw_steps {
        if !enabled_tools.contains(&raw_step.tool) {
            return Err(PlanningError::UnknownTool(raw_step.tool));
        }
        steps.push(PlanStep {
            tool: raw_step.tool,
            input: raw_step.input,
        });
    }

    Ok(Plan { steps })
}

/// Models often wrap JSON in a markdown fence despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
