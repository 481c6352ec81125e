use crate::ai::{LanguageModel, Message, TokenStream};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Client for any OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl OpenAIClient {
    pub fn new(
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, String> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        if !api_key.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        let model_name = match model {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_MODEL.to_string(),
        };

        Ok(OpenAIClient {
            client,
            endpoint: endpoint.unwrap_or(DEFAULT_ENDPOINT).to_string(),
            model: model_name,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request(&self, messages: Vec<Message>, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            stream: if stream { Some(true) } else { None },
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, String> {
        log::info!(
            "[OPENAI] Sending request to {} with model {} ({} messages, stream: {})",
            self.endpoint,
            self.model,
            request.messages.len(),
            request.stream.unwrap_or(false)
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                return Err(format!("API error: {}", parsed.error.message));
            }
            return Err(format!(
                "API returned error status: {}, body: {}",
                status, error_text
            ));
        }

        Ok(response)
    }

    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, String> {
        let request = self.build_request(messages, false);
        let response = self.send(&request).await?;

        let response_text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response: {}", e))?;

        let data: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| format!("Failed to parse response: {} - body: {}", e, response_text))?;

        let choice = data
            .choices
            .first()
            .ok_or_else(|| "API returned no choices".to_string())?;

        let content = choice.message.content.clone().unwrap_or_default();
        log::debug!("[OPENAI] Response content_len: {}", content.len());
        Ok(content)
    }

    /// Stream a completion as incremental text fragments using the
    /// chat-completions SSE protocol.
    pub async fn stream_text(&self, messages: Vec<Message>) -> Result<TokenStream, String> {
        let request = self.build_request(messages, true);
        let response = self.send(&request).await?;

        let state = SseState {
            inner: response.bytes_stream().map(|r| r.map(|b| b.to_vec())).boxed(),
            buffer: String::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures_util::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(token) = state.pending.pop_front() {
                    return Some((Ok(token), state));
                }
                if state.done {
                    return None;
                }
                match state.inner.next().await {
                    Some(Ok(chunk)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                        while let Some(pos) = state.buffer.find('\n') {
                            let line: String = state.buffer.drain(..=pos).collect();
                            match parse_sse_line(line.trim()) {
                                SsePayload::Token(token) => state.pending.push_back(token),
                                SsePayload::Done => {
                                    state.done = true;
                                    break;
                                }
                                SsePayload::Skip => {}
                            }
                        }
                    }
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(format!("Stream read failed: {}", e)), state));
                    }
                    None => return None,
                }
            }
        });

        Ok(stream.boxed())
    }
}

struct SseState {
    inner: BoxByteStream,
    buffer: String,
    pending: VecDeque<String>,
    done: bool,
}

type BoxByteStream =
    futures_util::stream::BoxStream<'static, Result<Vec<u8>, reqwest::Error>>;

enum SsePayload {
    Token(String),
    Done,
    Skip,
}

/// Decode one SSE line from a chat-completions stream. Lines that are not
/// `data:` events, keep-alives, or empty deltas carry no token.
fn parse_sse_line(line: &str) -> SsePayload {
    let Some(data) = line.strip_prefix("data:") else {
        return SsePayload::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SsePayload::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => match chunk.choices.first().and_then(|c| c.delta.content.clone()) {
            Some(token) if !token.is_empty() => SsePayload::Token(token),
            _ => SsePayload::Skip,
        },
        Err(_) => SsePayload::Skip,
    }
}

#[async_trait]
impl LanguageModel for OpenAIClient {
    async fn generate(&self, messages: Vec<Message>) -> Result<String, String> {
        self.generate_text(messages).await
    }

    async fn stream(&self, messages: Vec<Message>) -> Result<TokenStream, String> {
        self.stream_text(messages).await
    }
}
