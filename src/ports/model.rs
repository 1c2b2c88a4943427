//! Model provider port - interface to the external language-model service.
//!
//! The service is opaque: this crate only manages what is sent to it and
//! what comes back. Implementations translate between the provider API and
//! these types, and classify failures as retryable or not so the retry
//! layer can do its job.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::domain::project::MessageRole;

/// A model response stream: a single-pass, forward-only sequence of chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ModelError>> + Send>>;

/// Port for language-model completions.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generates a complete response in one call.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError>;

    /// Generates a response as a stream of text fragments.
    ///
    /// Fragments concatenate to the same final text `complete` would return.
    /// Token usage arrives on the final chunk when the transport surfaces
    /// it, and is zero otherwise.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError>;
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for std::sync::Arc<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        (**self).complete(request).await
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError> {
        (**self).stream(request).await
    }
}

/// A single prior turn handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who produced the turn.
    pub role: MessageRole,
    /// Turn text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a message.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Request for a model completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instruction block guiding model behavior for this stage.
    pub instructions: String,
    /// Prior turns plus the new user message, oldest-first.
    pub messages: Vec<ChatMessage>,
    /// Output token cap.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Creates a request with the given instruction block.
    pub fn new(instructions: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            instructions: instructions.into(),
            messages: Vec::new(),
            max_tokens,
        }
    }

    /// Appends a prior turn.
    pub fn with_message(mut self, role: MessageRole, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::new(role, content));
        self
    }

    /// Appends a batch of prior turns.
    pub fn with_history(mut self, history: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(history);
        self
    }
}

/// Token accounting for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub input_tokens: u32,
    /// Tokens in the completion.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Creates token usage.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Zero usage, for transports that do not surface counts.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Total tokens for the exchange.
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A complete model response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text.
    pub text: String,
    /// Token accounting for the exchange.
    pub usage: TokenUsage,
}

/// One fragment of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    /// New text in this fragment.
    pub delta: String,
    /// Set on the final chunk; carries usage when the transport reports it.
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    /// Creates a content fragment.
    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            usage: None,
        }
    }

    /// Creates the final chunk with whatever usage is known.
    pub fn done(usage: TokenUsage) -> Self {
        Self {
            delta: String::new(),
            usage: Some(usage),
        }
    }

    /// Returns true if this is the final chunk.
    pub fn is_final(&self) -> bool {
        self.usage.is_some()
    }
}

/// Model provider failures, classified for the retry layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider is down or returned a server error.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Network failure during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Request was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Content was rejected by the provider's policy.
    #[error("content rejected: {reason}")]
    ContentFiltered {
        /// Rejection reason.
        reason: String,
    },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ModelError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a content rejection error.
    pub fn content_filtered(reason: impl Into<String>) -> Self {
        Self::ContentFiltered {
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true if the failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited { .. }
                | ModelError::Unavailable { .. }
                | ModelError::Network(_)
                | ModelError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_accumulates_messages() {
        let request = CompletionRequest::new("be useful", 4096)
            .with_message(MessageRole::User, "hello")
            .with_history([ChatMessage::assistant("hi"), ChatMessage::user("ok")]);

        assert_eq!(request.instructions, "be useful");
        assert_eq!(request.max_tokens, 4096);
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].content, "hello");
    }

    #[test]
    fn token_usage_totals() {
        let usage = TokenUsage::new(100, 40);
        assert_eq!(usage.total(), 140);
        assert_eq!(TokenUsage::zero().total(), 0);
    }

    #[test]
    fn content_chunks_are_not_final() {
        assert!(!StreamChunk::content("hi").is_final());
        assert!(StreamChunk::done(TokenUsage::zero()).is_final());
    }

    #[test]
    fn transient_failures_are_retryable() {
        assert!(ModelError::rate_limited(30).is_retryable());
        assert!(ModelError::network("reset").is_retryable());
        assert!(ModelError::unavailable("503").is_retryable());
        assert!(ModelError::Timeout { timeout_secs: 60 }.is_retryable());
    }

    #[test]
    fn permanent_failures_are_not_retryable() {
        assert!(!ModelError::AuthenticationFailed.is_retryable());
        assert!(!ModelError::InvalidRequest("bad".into()).is_retryable());
        assert!(!ModelError::content_filtered("policy").is_retryable());
        assert!(!ModelError::parse("garbage").is_retryable());
    }
}
