//! Final synthesis. The execution report is flattened into a deterministic
//! context block and handed to the language model together with the goal.

use crate::ai::{LanguageModel, Message, TokenStream};
use crate::types::ExecutionReport;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The language-model collaborator could not be reached or errored.
    #[error("language model call failed: {0}")]
    Llm(String),
    /// The collaborator answered with empty or whitespace-only content.
    #[error("language model returned an empty summary")]
    EmptyResponse,
    #[error("summarization cancelled")]
    Cancelled,
}

const SUMMARIZER_BEHAVIOR: &str = "You are a research assistant. Answer the \
user's goal directly using the tool findings provided. Attribute claims to \
the tool they came from. Where a tool was unavailable, note the gap instead \
of guessing.";

pub struct Summarizer {
    model: Arc<dyn LanguageModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Summarizer { model }
    }

    pub async fn summarize(
        &self,
        goal: &str,
        report: &ExecutionReport,
        cancel: &CancellationToken,
    ) -> Result<String, SummarizationError> {
        let messages = build_messages(goal, report);

        let content = tokio::select! {
            _ = cancel.cancelled() => return Err(SummarizationError::Cancelled),
            r = self.model.generate(messages) => r.map_err(SummarizationError::Llm)?,
        };

        if content.trim().is_empty() {
            return Err(SummarizationError::EmptyResponse);
        }

        log::info!("[SUMMARIZER] Produced summary ({} bytes)", content.len());
        Ok(content)
    }

    /// Streaming variant for presentation layers that render incrementally.
    /// The stream itself is not retryable; transport errors surface as
    /// items on it.
    pub async fn summarize_stream(
        &self,
        goal: &str,
        report: &ExecutionReport,
        cancel: &CancellationToken,
    ) -> Result<TokenStream, SummarizationError> {
        let messages = build_messages(goal, report);

        tokio::select! {
            _ = cancel.cancelled() => Err(SummarizationError::Cancelled),
            r = self.model.stream(messages) => r.map_err(SummarizationError::Llm),
        }
    }
}

fn build_messages(goal: &str, report: &ExecutionReport) -> Vec<Message> {
    let context = build_context(report);
    let user = if context.is_empty() {
        format!("Goal: {}", goal)
    } else {
        format!("Goal: {}\n\nTool findings:\n\n{}", goal, context)
    };

    vec![Message::system(SUMMARIZER_BEHAVIOR), Message::user(user)]
}

/// Deterministic context block: one section per step in report order.
/// Failed steps stay visible as unavailable rather than vanishing, so the
/// model can acknowledge the gap.
pub fn build_context(report: &ExecutionReport) -> String {
    report
        .results
        .iter()
        .map(|result| match &result.error {
            None => format!("Tool [{}] result:\n{}", result.step.tool, result.output),
            Some(error) => format!("Tool [{}] unavailable: {}", result.step.tool, error),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PlanStep, ToolResult};
    use async_trait::async_trait;
    use futures_util::StreamExt;

    fn result(tool: &str, output: &str, error: Option<&str>) -> ToolResult {
        ToolResult {
            step: PlanStep {
                tool: tool.to_string(),
                input: String::new(),
            },
            output: output.to_string(),
            error: error.map(|e| e.to_string()),
            duration_ms: 1,
        }
    }

    struct FakeModel {
        reply: String,
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn generate(&self, _messages: Vec<Message>) -> Result<String, String> {
            Ok(self.reply.clone())
        }

        async fn stream(&self, _messages: Vec<Message>) -> Result<TokenStream, String> {
            let fragments: Vec<Result<String, String>> = self
                .reply
                .split_inclusive(' ')
                .map(|s| Ok(s.to_string()))
                .collect();
            Ok(futures_util::stream::iter(fragments).boxed())
        }
    }

    #[test]
    fn test_context_keeps_report_order_and_failures() {
        let report = ExecutionReport::new(vec![
            result("GoogleSearch", "AI news items", None),
            result("RedditSearch", "", Some("rate limited")),
            result("HackerNews", "top stories", None),
        ]);

        let context = build_context(&report);
        let google = context.find("Tool [GoogleSearch] result:").unwrap();
        let reddit = context.find("Tool [RedditSearch] unavailable: rate limited").unwrap();
        let hn = context.find("Tool [HackerNews] result:").unwrap();
        assert!(google < reddit && reddit < hn);
    }

    #[test]
    fn test_empty_report_means_goal_only_prompt() {
        let report = ExecutionReport::new(vec![]);
        let messages = build_messages("Write a haiku", &report);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "Goal: Write a haiku");
    }

    #[tokio::test]
    async fn test_summarize_returns_model_reply() {
        let summarizer = Summarizer::new(Arc::new(FakeModel {
            reply: "The news is good.".to_string(),
        }));
        let report = ExecutionReport::new(vec![result("GoogleSearch", "good news", None)]);

        let summary = summarizer
            .summarize("What is the news?", &report, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary, "The news is good.");
    }

    #[tokio::test]
    async fn test_summarize_stream_yields_fragments() {
        let summarizer = Summarizer::new(Arc::new(FakeModel {
            reply: "streamed summary text".to_string(),
        }));
        let report = ExecutionReport::new(vec![]);

        let stream = summarizer
            .summarize_stream("goal", &report, &CancellationToken::new())
            .await
            .unwrap();
        let fragments: Vec<String> = stream.map(|r| r.unwrap()).collect().await;

        assert!(fragments.len() > 1);
        assert_eq!(fragments.concat(), "streamed summary text");
    }

    #[tokio::test]
    async fn test_blank_reply_is_an_error() {
        let summarizer = Summarizer::new(Arc::new(FakeModel {
            reply: "   \n".to_string(),
        }));
        let report = ExecutionReport::new(vec![]);

        let err = summarizer
            .summarize("goal", &report, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizationError::EmptyResponse));
    }
}
