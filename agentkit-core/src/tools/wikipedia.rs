use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use serde_json::Value;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Looks up a Wikipedia intro summary for a topic, falling back to the
/// closest opensearch title when the direct lookup misses.
pub struct WikipediaSearchTool {
    client: reqwest::Client,
}

impl WikipediaSearchTool {
    pub fn new() -> Self {
        WikipediaSearchTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
        }
    }

    async fn get_summary(&self, title: &str) -> Result<Option<String>, ToolError> {
        let url = format!(
            "{}?action=query&format=json&prop=extracts&exintro=1&explaintext=1&redirects=1&titles={}",
            API_URL,
            urlencoding::encode(title)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error("wikipedia", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("wikipedia", status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("wikipedia: invalid response: {}", e)))?;

        Ok(first_extract(&body))
    }

    async fn get_fallback_title(&self, query: &str) -> Result<Option<String>, ToolError> {
        let url = format!(
            "{}?action=opensearch&format=json&search={}&limit=1&namespace=0",
            API_URL,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::request_error("wikipedia", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("wikipedia", status));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("wikipedia: invalid response: {}", e)))?;

        Ok(first_opensearch_title(&body))
    }
}

impl Default for WikipediaSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WikipediaSearchTool {
    fn name(&self) -> &str {
        "WikipediaSearch"
    }

    fn description(&self) -> &str {
        "Look up a topic summary on Wikipedia."
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let topic = input.trim();

        if let Some(summary) = self.get_summary(topic).await? {
            return Ok(summary);
        }

        if let Some(fallback) = self.get_fallback_title(topic).await? {
            if !fallback.eq_ignore_ascii_case(topic) {
                if let Some(summary) = self.get_summary(&fallback).await? {
                    return Ok(format!("(Fallback to '{}')\n\n{}", fallback, summary));
                }
            }
        }

        Ok(format!("No Wikipedia summary found for '{}'.", topic))
    }
}

/// Pull the extract of the first page out of a `query` API response. The
/// pages object is keyed by numeric page id, so the key is unknown upfront.
fn first_extract(body: &Value) -> Option<String> {
    let pages = body.get("query")?.get("pages")?.as_object()?;
    let page = pages.values().next()?;
    let extract = page.get("extract")?.as_str()?;
    if extract.is_empty() {
        None
    } else {
        Some(extract.to_string())
    }
}

/// Pull the first suggested title out of an `opensearch` API response,
/// which is a positional array: [query, [titles], [descriptions], [urls]].
fn first_opensearch_title(body: &Value) -> Option<String> {
    let titles = body.as_array()?.get(1)?.as_array()?;
    let title = titles.first()?.as_str()?;
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_extract() {
        let body = json!({
            "query": {
                "pages": {
                    "12345": { "title": "Rust", "extract": "Rust is a language." }
                }
            }
        });
        assert_eq!(first_extract(&body), Some("Rust is a language.".to_string()));
    }

    #[test]
    fn test_first_extract_missing_page() {
        let body = json!({ "query": { "pages": {} } });
        assert_eq!(first_extract(&body), None);

        let empty = json!({
            "query": { "pages": { "1": { "extract": "" } } }
        });
        assert_eq!(first_extract(&empty), None);
    }

    #[test]
    fn test_first_opensearch_title() {
        let body = json!(["rust lang", ["Rust (programming language)"], [""], ["https://..."]]);
        assert_eq!(
            first_opensearch_title(&body),
            Some("Rust (programming language)".to_string())
        );

        let no_hits = json!(["rust lang", [], [], []]);
        assert_eq!(first_opensearch_title(&no_hits), None);
    }
}
