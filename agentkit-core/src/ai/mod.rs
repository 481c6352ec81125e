pub mod openai;

pub use openai::OpenAIClient;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A lazy, finite sequence of text fragments from a streaming completion.
/// Not restartable; consume it once.
pub type TokenStream = BoxStream<'static, Result<String, String>>;

/// The language-model collaborator seam. Production code talks to an
/// OpenAI-compatible endpoint; tests substitute fakes.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a complete response for the given conversation.
    async fn generate(&self, messages: Vec<Message>) -> Result<String, String>;

    /// Generate a response as an incremental token stream.
    async fn stream(&self, messages: Vec<Message>) -> Result<TokenStream, String>;
}
