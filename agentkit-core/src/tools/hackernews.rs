use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use serde::Deserialize;

const TOP_STORIES_URL: &str = "https://hacker-news.firebaseio.com/v0/topstories.json";
const ITEM_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0/item";
const STORY_LIMIT: usize = 5;

/// Fetches the current top stories from the Hacker News front page.
pub struct HackerNewsTool {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Story {
    title: Option<String>,
    url: Option<String>,
}

impl HackerNewsTool {
    pub fn new() -> Self {
        HackerNewsTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl Default for HackerNewsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for HackerNewsTool {
    fn name(&self) -> &str {
        "HackerNews"
    }

    fn description(&self) -> &str {
        "Fetch the current top stories from Hacker News."
    }

    async fn run(&self, _input: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .get(TOP_STORIES_URL)
            .send()
            .await
            .map_err(|e| http::request_error("hackernews", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("hackernews", status));
        }

        let ids: Vec<u64> = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("hackernews: invalid story list: {}", e)))?;

        let mut stories = Vec::new();
        for id in ids.into_iter().take(STORY_LIMIT) {
            let url = format!("{}/{}.json", ITEM_BASE_URL, id);
            let story: Story = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| http::request_error("hackernews", e))?
                .json()
                .await
                .map_err(|e| ToolError::new(format!("hackernews: invalid story {}: {}", id, e)))?;

            let title = story.title.unwrap_or_else(|| "No title".to_string());
            let link = story
                .url
                .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", id));
            stories.push(format!("- {}\n  {}", title, link));
        }

        log::debug!("[HACKERNEWS] Fetched {} stories", stories.len());
        Ok(stories.join("\n"))
    }
}
