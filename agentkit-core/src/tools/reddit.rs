use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use serde::Deserialize;

const SEARCH_URL: &str = "https://api.pushshift.io/reddit/search/submission/";
const RESULT_LIMIT: usize = 3;

/// Searches Reddit submissions for a query via the Pushshift API.
pub struct RedditSearchTool {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Submission>,
}

#[derive(Debug, Deserialize)]
struct Submission {
    title: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
}

impl RedditSearchTool {
    pub fn new() -> Self {
        RedditSearchTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for RedditSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RedditSearchTool {
    fn name(&self) -> &str {
        "RedditSearch"
    }

    fn description(&self) -> &str {
        "Search Reddit for recent threads matching a query."
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let query = input.trim().to_lowercase();
        let url = format!(
            "{}?q={}&sort=desc&size={}",
            SEARCH_URL,
            urlencoding::encode(&query),
            RESULT_LIMIT
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error("reddit", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("reddit", status));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("reddit: invalid response: {}", e)))?;

        if parsed.data.is_empty() {
            return Ok("No Reddit threads found.".to_string());
        }

        let results: Vec<String> = parsed
            .data
            .into_iter()
            .map(|post| {
                let title = post.title.unwrap_or_else(|| "No title".to_string());
                let link = post.url.unwrap_or_else(|| {
                    format!("https://reddit.com{}", post.permalink.unwrap_or_default())
                });
                format!("- {}\n  {}", title, link)
            })
            .collect();

        Ok(results.join("\n"))
    }
}
