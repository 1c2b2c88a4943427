//! Retrying decorator for model providers.
//!
//! Wraps any [`ModelProvider`] and replays transient failures with
//! exponential backoff. Non-transient errors (authentication, invalid
//! request, content filtering) pass through on the first occurrence.

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::ports::{ChunkStream, CompletionRequest, CompletionResponse, ModelError, ModelProvider};

/// Backoff policy for transient model failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base: Duration,
    /// Ceiling on any single delay.
    pub cap: Duration,
}

impl RetryPolicy {
    /// Policy with explicit attempt count and backoff bounds.
    pub fn new(max_attempts: u32, base: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            base,
            cap,
        }
    }

    /// Delay before retry number `retry` (zero-based): `min(base * 2^retry, cap)`.
    pub fn delay(&self, retry: u32) -> Duration {
        let multiplier = 1u32 << retry.min(16);
        (self.base * multiplier).min(self.cap)
    }
}

impl Default for RetryPolicy {
    /// Four attempts with delays of 2s, 4s and 8s between them.
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base: Duration::from_secs(2),
            cap: Duration::from_secs(30),
        }
    }
}

/// Provider decorator that retries transient failures.
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> Retrying<P> {
    /// Wraps a provider with the default policy.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
        }
    }

    /// Wraps a provider with an explicit policy.
    pub fn with_policy(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P: ModelProvider> ModelProvider for Retrying<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let mut retry = 0u32;
        loop {
            match self.inner.complete(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && retry + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay(retry);
                    warn!(
                        attempt = retry + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError> {
        // Retry covers stream establishment only. Once chunks are flowing
        // they may already have been delivered downstream, so a mid-stream
        // failure is surfaced rather than replayed.
        let mut retry = 0u32;
        loop {
            match self.inner.stream(request.clone()).await {
                Ok(stream) => return Ok(stream),
                Err(err) if err.is_retryable() && retry + 1 < self.policy.max_attempts => {
                    let delay = self.policy.delay(retry);
                    warn!(
                        attempt = retry + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "stream start failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
