use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const MATCH_COUNT: u32 = 5;
const MATCH_THRESHOLD: f64 = 0.5;

/// Natural-language code search against an external vector store. The
/// store computes embeddings and similarity itself; this tool only ships
/// the query text to its `match_code_chunks` endpoint and formats the hits.
pub struct CodeQueryTool {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    query: &'a str,
    match_count: u32,
    match_threshold: f64,
}

#[derive(Debug, Deserialize)]
struct CodeMatch {
    content: String,
    metadata: MatchMetadata,
    similarity: f64,
}

#[derive(Debug, Deserialize)]
struct MatchMetadata {
    file_path: String,
    chunk_index: u32,
    total_chunks: u32,
}

impl CodeQueryTool {
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Self {
        CodeQueryTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl Tool for CodeQueryTool {
    fn name(&self) -> &str {
        "CodeQuery"
    }

    fn description(&self) -> &str {
        "Search indexed code for chunks relevant to a natural-language query."
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ToolError::new("code_query: vector store endpoint is not configured"))?;
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ToolError::new("code_query: vector store key is not configured"))?;

        let request = MatchRequest {
            query: input.trim(),
            match_count: MATCH_COUNT,
            match_threshold: MATCH_THRESHOLD,
        };

        let response = self
            .client
            .post(endpoint)
            .header("apikey", api_key)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| http::request_error("code_query", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("code_query", status));
        }

        let matches: Vec<CodeMatch> = response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("code_query: invalid response: {}", e)))?;

        Ok(format_matches(&matches))
    }
}

fn format_matches(matches: &[CodeMatch]) -> String {
    if matches.is_empty() {
        return "No relevant code found for your query.".to_string();
    }

    matches
        .iter()
        .map(|m| {
            format!(
                "File: {} (Chunk {}/{}, Relevance: {:.2})\n```\n{}\n```",
                m.metadata.file_path,
                m.metadata.chunk_index + 1,
                m.metadata.total_chunks,
                m.similarity,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
