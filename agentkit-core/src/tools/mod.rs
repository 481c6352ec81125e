pub mod code_query;
pub mod github_fetcher;
pub mod google;
pub mod hackernews;
pub mod http;
pub mod reddit;
pub mod registry;
pub mod wikipedia;

pub use code_query::CodeQueryTool;
pub use github_fetcher::GitHubFetcherTool;
pub use google::GoogleSearchTool;
pub use hackernews::HackerNewsTool;
pub use reddit::RedditSearchTool;
pub use registry::{Tool, ToolError, ToolRegistry};
pub use wikipedia::WikipediaSearchTool;

use std::sync::Arc;

/// Credentials and endpoints for the built-in tools. Binaries read these
/// from the environment once; the tools themselves never touch env vars.
#[derive(Debug, Clone, Default)]
pub struct ToolSettings {
    pub serpapi_key: Option<String>,
    pub github_token: Option<String>,
    pub code_query_endpoint: Option<String>,
    pub code_query_key: Option<String>,
}

/// Register all built-in tools to a registry. Tools with missing
/// credentials stay registered and report the gap when invoked.
fn register_builtin_tools(registry: &mut ToolRegistry, settings: &ToolSettings) {
    registry.register(Arc::new(HackerNewsTool::new()));
    registry.register(Arc::new(RedditSearchTool::new()));
    registry.register(Arc::new(WikipediaSearchTool::new()));
    registry.register(Arc::new(GoogleSearchTool::new(settings.serpapi_key.clone())));
    registry.register(Arc::new(GitHubFetcherTool::new(settings.github_token.clone())));
    registry.register(Arc::new(CodeQueryTool::new(
        settings.code_query_endpoint.clone(),
        settings.code_query_key.clone(),
    )));
}

/// Create a new ToolRegistry with all built-in tools registered.
pub fn create_default_registry(settings: &ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, settings);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contents() {
        let registry = create_default_registry(&ToolSettings::default());
        assert_eq!(registry.len(), 6);
        assert_eq!(
            registry.names(),
            vec![
                "HackerNews",
                "RedditSearch",
                "WikipediaSearch",
                "GoogleSearch",
                "GitHubFetcher",
                "CodeQuery",
            ]
        );
    }
}
