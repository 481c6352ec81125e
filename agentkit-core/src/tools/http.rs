//! Shared HTTP plumbing for the built-in tools: one client construction
//! path and a common classification of transient failures.

use crate::tools::registry::ToolError;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = "agentkit-core/0.1 (tool client)";

/// Build the reqwest client used by the HTTP tools.
pub fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// HTTP status codes worth retrying on a later cycle.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(
        status,
        408 | // Request Timeout
        429 | // Too Many Requests
        500 | // Internal Server Error (sometimes transient)
        502 | // Bad Gateway
        503 | // Service Unavailable
        504   // Gateway Timeout
    )
}

pub fn is_retryable_reqwest_error(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err
            .status()
            .map(|s| is_retryable_status(s.as_u16()))
            .unwrap_or(false)
}

/// Map a transport failure into a `ToolError` with retryability classified.
pub fn request_error(context: &str, err: reqwest::Error) -> ToolError {
    let message = format!("{}: request failed: {}", context, err);
    if is_retryable_reqwest_error(&err) {
        log::warn!("[HTTP] Retryable error for {}: {}", context, err);
        ToolError::retryable(message)
    } else {
        ToolError::new(message)
    }
}

/// Map a non-success response status into a `ToolError`.
pub fn status_error(context: &str, status: reqwest::StatusCode) -> ToolError {
    let message = format!("{}: unexpected status {}", context, status);
    if is_retryable_status(status.as_u16()) {
        ToolError::retryable(message)
    } else {
        ToolError::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(502));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(504));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_status_error_classification() {
        let retryable = status_error("test", reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert!(retryable.retryable);

        let fatal = status_error("test", reqwest::StatusCode::UNAUTHORIZED);
        assert!(!fatal.retryable);
        assert!(fatal.message.contains("401"));
    }
}
