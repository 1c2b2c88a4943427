//! In-memory model provider for tests.
//!
//! Responses and errors are queued ahead of time and consumed in order.
//! Every request is recorded so tests can assert on the instructions and
//! history the engine actually sent.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::ports::{
    ChunkStream, CompletionRequest, CompletionResponse, ModelError, ModelProvider, StreamChunk,
    TokenUsage,
};

enum Scripted {
    Text {
        text: String,
        usage: TokenUsage,
    },
    Error(ModelError),
}

/// Scriptable provider for tests.
///
/// With an empty queue every call answers with a fixed placeholder, so
/// tests that don't care about the reply don't have to script one.
#[derive(Default)]
pub struct MockModelProvider {
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockModelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful completion.
    pub fn push_text(&self, text: impl Into<String>, usage: TokenUsage) {
        self.queue.lock().unwrap().push_back(Scripted::Text {
            text: text.into(),
            usage,
        });
    }

    /// Queues an error for the next call.
    pub fn push_error(&self, error: ModelError) {
        self.queue.lock().unwrap().push_back(Scripted::Error(error));
    }

    /// Number of calls made so far (completions and stream starts).
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request, if any call was made.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next(&self, request: &CompletionRequest) -> Result<(String, TokenUsage), ModelError> {
        self.requests.lock().unwrap().push(request.clone());

        match self.queue.lock().unwrap().pop_front() {
            Some(Scripted::Text { text, usage }) => Ok((text, usage)),
            Some(Scripted::Error(error)) => Err(error),
            None => Ok(("mock response".to_string(), TokenUsage::new(10, 5))),
        }
    }
}

#[async_trait]
impl ModelProvider for MockModelProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let (text, usage) = self.next(&request)?;
        Ok(CompletionResponse { text, usage })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError> {
        let (text, usage) = self.next(&request)?;

        // Split the scripted text into word-sized deltas so consumers see
        // more than one chunk.
        let mut chunks: Vec<Result<StreamChunk, ModelError>> = text
            .split_inclusive(' ')
            .map(|piece| Ok(StreamChunk::content(piece)))
            .collect();
        chunks.push(Ok(StreamChunk::done(usage)));

        Ok(Box::pin(stream::iter(chunks)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn scripted_responses_are_consumed_in_order() {
        let mock = MockModelProvider::new();
        mock.push_text("first", TokenUsage::new(1, 1));
        mock.push_error(ModelError::rate_limited(5));
        mock.push_text("second", TokenUsage::new(2, 2));

        let request = CompletionRequest::new("sys", 100);
        assert_eq!(mock.complete(request.clone()).await.unwrap().text, "first");
        assert!(mock.complete(request.clone()).await.is_err());
        assert_eq!(mock.complete(request.clone()).await.unwrap().text, "second");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_queue_yields_the_placeholder() {
        let mock = MockModelProvider::new();
        let response = mock
            .complete(CompletionRequest::new("sys", 100))
            .await
            .unwrap();
        assert_eq!(response.text, "mock response");
    }

    #[tokio::test]
    async fn stream_splits_text_and_ends_with_usage() {
        let mock = MockModelProvider::new();
        mock.push_text("hello brave world", TokenUsage::new(7, 3));

        let mut stream = mock.stream(CompletionRequest::new("sys", 100)).await.unwrap();
        let mut text = String::new();
        let mut final_usage = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            text.push_str(&chunk.delta);
            if let Some(usage) = chunk.usage {
                final_usage = Some(usage);
            }
        }

        assert_eq!(text, "hello brave world");
        assert_eq!(final_usage, Some(TokenUsage::new(7, 3)));
    }
}
