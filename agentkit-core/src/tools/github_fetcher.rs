use crate::tools::http;
use crate::tools::registry::{Tool, ToolError};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use std::collections::VecDeque;

const API_BASE: &str = "https://api.github.com";
const MAX_FILES: usize = 50;
const MAX_TOTAL_BYTES: usize = 200_000;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "h", "hpp", "cs", "go", "rs", "rb",
    "php", "swift", "kt", "scala", "md", "rst", "yaml", "yml", "json", "xml", "html", "css",
    "scss", "sass", "less", "toml",
];

const SKIP_DIRS: &[&str] = &["node_modules", "venv", "dist", "build", "target", "__pycache__"];

/// Fetches source files from a GitHub repository via the contents API.
/// Input is a repository URL such as `https://github.com/owner/repo`.
pub struct GitHubFetcherTool {
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct FileContent {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

impl GitHubFetcherTool {
    pub fn new(token: Option<String>) -> Self {
        GitHubFetcherTool {
            client: http::build_client(http::DEFAULT_TIMEOUT_SECS),
            token,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, ToolError> {
        let mut request = self.client.get(url);
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| http::request_error("github", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http::status_error("github", status));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::new(format!("github: invalid response: {}", e)))
    }

    async fn fetch_file(&self, entry: &ContentEntry) -> Result<Option<String>, ToolError> {
        let file: FileContent = self.get_json(&entry.url).await?;
        if file.encoding != "base64" {
            return Ok(None);
        }
        let cleaned: String = file.content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = BASE64
            .decode(cleaned)
            .map_err(|e| ToolError::new(format!("github: bad file payload for {}: {}", entry.path, e)))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.is_empty() { Ok(None) } else { Ok(Some(text)) }
    }
}

#[async_trait]
impl Tool for GitHubFetcherTool {
    fn name(&self) -> &str {
        "GitHubFetcher"
    }

    fn description(&self) -> &str {
        "Fetch source files from a public GitHub repository URL."
    }

    async fn run(&self, input: &str) -> Result<String, ToolError> {
        let (owner, repo) = parse_repo_url(input.trim())?;
        log::info!("[GITHUB] Fetching contents of {}/{}", owner, repo);

        let root_url = format!("{}/repos/{}/{}/contents/", API_BASE, owner, repo);
        let mut pending: VecDeque<String> = VecDeque::from([root_url]);
        let mut sections: Vec<String> = Vec::new();
        let mut total_bytes = 0usize;
        let mut truncated = false;

        'walk: while let Some(dir_url) = pending.pop_front() {
            let entries: Vec<ContentEntry> = self.get_json(&dir_url).await?;
            for entry in entries {
                match entry.entry_type.as_str() {
                    "dir" => {
                        if !is_skipped_dir(&entry.name) {
                            pending.push_back(entry.url.clone());
                        }
                    }
                    "file" if is_allowed_file(&entry.path) => {
                        if sections.len() >= MAX_FILES || total_bytes >= MAX_TOTAL_BYTES {
                            truncated = true;
                            break 'walk;
                        }
                        match self.fetch_file(&entry).await {
                            Ok(Some(text)) => {
                                total_bytes += text.len();
                                sections.push(format!("=== {} ===\n{}", entry.path, text));
                            }
                            Ok(None) => {}
                            Err(e) => {
                                log::warn!("[GITHUB] Skipping {}: {}", entry.path, e);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        if sections.is_empty() {
            return Ok(format!("No source files found in {}/{}.", owner, repo));
        }

        log::info!(
            "[GITHUB] Fetched {} files ({} bytes) from {}/{}",
            sections.len(),
            total_bytes,
            owner,
            repo
        );

        let mut output = sections.join("\n\n");
        if truncated {
            output.push_str("\n\n[Repository truncated: file or size limit reached]");
        }
        Ok(output)
    }
}

/// Extract owner and repository name from a GitHub URL.
fn parse_repo_url(input: &str) -> Result<(String, String), ToolError> {
    let parsed = url::Url::parse(input)
        .map_err(|e| ToolError::new(format!("github: invalid repository URL '{}': {}", input, e)))?;

    if parsed.host_str() != Some("github.com") && parsed.host_str() != Some("www.github.com") {
        return Err(ToolError::new(format!(
            "github: '{}' is not a github.com URL",
            input
        )));
    }

    let mut segments = parsed
        .path_segments()
        .ok_or_else(|| ToolError::new("github: URL has no path"))?
        .filter(|s| !s.is_empty());

    let owner = segments
        .next()
        .ok_or_else(|| ToolError::new("github: URL is missing the repository owner"))?;
    let repo = segments
        .next()
        .ok_or_else(|| ToolError::new("github: URL is missing the repository name"))?;

    Ok((owner.to_string(), repo.trim_end_matches(".git").to_string()))
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIP_DIRS.contains(&name)
}

/// Keep source and documentation files; drop hidden paths, vendored
/// directories, and binary formats.
fn is_allowed_file(path: &str) -> bool {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.starts_with('.')) {
        return false;
    }
    if parts.iter().any(|p| SKIP_DIRS.contains(p)) {
        return false;
    }
    match path.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}
