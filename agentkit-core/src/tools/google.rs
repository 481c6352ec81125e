use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use serde::Deserialize;

const SEARCH_URL: &str = "https://serpapi.com/search";
const RESULT_LIMIT: usize = 5;

/// Google web search via SerpAPI. The API key is injected at construction;
/// a missing key fails the invocation, not the cycle.
pub struct GoogleSearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
}

impl GoogleSearchTool {
    pub fn new(api_key: Option<String>) -> Self {
        GoogleSearchTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
            api_key,
        }
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "GoogleSearch"
    }

    fn description(&self) -> &str {
        "Search Google for web results matching a query."
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ToolError::new("google: SerpAPI key is not configured"))?;

        let url = format!(
            "{}?q={}&api_key={}&engine=google&num={}",
            SEARCH_URL,
            urlencoding::encode(input.trim()),
            api_key,
            RESULT_LIMIT
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error("google", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("google", status));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("google: invalid response: {}", e)))?;

        if parsed.organic_results.is_empty() {
            return Ok("No search results found.".to_string());
        }

        let results: Vec<String> = parsed
            .organic_results
            .into_iter()
            .take(RESULT_LIMIT)
            .map(|item| {
                let title = item.title.unwrap_or_else(|| "No title".to_string());
                let link = item.link.unwrap_or_else(|| "#".to_string());
                format!("- {}\n  {}", title, link)
            })
            .collect();

        Ok(results.join("\n"))
    }
}
