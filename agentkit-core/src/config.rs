use crate::tools::ToolSettings;
use std::env;

/// Runtime configuration, read from the environment once at the binary
/// edge. Components receive the values explicitly.
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_endpoint: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub tools: ToolSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY must be set"),
            openai_endpoint: env::var("OPENAI_ENDPOINT").ok(),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            max_tokens: env::var("MAX_TOKENS")
                .unwrap_or_else(|_| "4096".to_string())
                .parse()
                .expect("MAX_TOKENS must be a valid number"),
            tools: ToolSettings {
                serpapi_key: env::var("SERPAPI_API_KEY").ok(),
                github_token: env::var("GITHUB_TOKEN").ok(),
                code_query_endpoint: env::var("CODE_QUERY_ENDPOINT").ok(),
                code_query_key: env::var("CODE_QUERY_KEY").ok(),
            },
        }
    }
}
