//! Anthropic implementation of the model provider port.
//!
//! Talks to the `/v1/messages` endpoint, non-streaming and SSE streaming.
//! Each call is a single attempt; retry policy lives in
//! [`Retrying`](crate::adapters::Retrying), which wraps any provider.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::project::MessageRole;
use crate::ports::{
    ChunkStream, CompletionRequest, CompletionResponse, ModelError, ModelProvider, StreamChunk,
    TokenUsage,
};

/// Anthropic API version header value.
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic provider.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    api_key: Secret<String>,
    /// Model identifier.
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Creates a configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "claude-sonnet-4-5-20250929".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// Anthropic API provider.
pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    /// Creates a provider with the given configuration.
    pub fn new(config: AnthropicConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");

        Self { config, client }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    fn to_wire_request(&self, request: &CompletionRequest, stream: bool) -> WireRequest {
        let messages = request
            .messages
            .iter()
            .map(|msg| WireMessage {
                role: match msg.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: msg.content.clone(),
            })
            .collect();

        WireRequest {
            model: self.config.model.clone(),
            max_tokens: request.max_tokens,
            system: request.instructions.clone(),
            messages,
            stream,
        }
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> Result<Response, ModelError> {
        let wire = self.to_wire_request(request, stream);

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.config.api_key())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .json(&wire)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_secs: self.config.timeout.as_secs() as u32,
                    }
                } else if e.is_connect() {
                    ModelError::network(format!("connection failed: {e}"))
                } else {
                    ModelError::network(e.to_string())
                }
            })?;

        self.check_status(response).await
    }

    /// Maps HTTP status codes onto the error taxonomy.
    async fn check_status(&self, response: Response) -> Result<Response, ModelError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(ModelError::AuthenticationFailed),
            429 => Err(ModelError::rate_limited(parse_retry_after(&body))),
            400 => {
                if body.contains("content") && body.contains("policy") {
                    Err(ModelError::content_filtered(body))
                } else {
                    Err(ModelError::InvalidRequest(body))
                }
            }
            500..=599 => Err(ModelError::unavailable(format!(
                "server error {status}: {body}"
            ))),
            _ => Err(ModelError::network(format!(
                "unexpected status {status}: {body}"
            ))),
        }
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ModelError> {
        let response = self.send(&request, false).await?;

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| ModelError::parse(format!("failed to parse response: {e}")))?;

        let text = wire
            .content
            .into_iter()
            .filter_map(|block| {
                if block.block_type == "text" {
                    block.text
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            text,
            usage: TokenUsage::new(wire.usage.input_tokens, wire.usage.output_tokens),
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkStream, ModelError> {
        let response = self.send(&request, true).await?;
        let bytes_stream = response.bytes_stream();

        // SSE events arrive as byte chunks; the scan state carries the input
        // token count reported by message_start until message_delta closes
        // the stream with the output count.
        let sse = bytes_stream
            .map(|chunk| chunk.map_err(|e| ModelError::network(format!("stream error: {e}"))))
            .scan(0u32, |input_tokens, chunk| {
                let parsed = match chunk {
                    Ok(bytes) => {
                        let text = String::from_utf8_lossy(&bytes);
                        parse_sse_events(&text, input_tokens)
                    }
                    Err(e) => vec![Err(e)],
                };
                futures::future::ready(Some(parsed))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(sse))
    }
}

/// Parses the SSE `data:` lines of one transport chunk.
fn parse_sse_events(text: &str, input_tokens: &mut u32) -> Vec<Result<StreamChunk, ModelError>> {
    let mut out = Vec::new();

    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data:") else {
            continue;
        };
        let payload = payload.trim();
        if payload.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<WireStreamEvent>(payload) else {
            continue;
        };

        match event.event_type.as_str() {
            "message_start" => {
                if let Some(message) = event.message {
                    *input_tokens = message.usage.input_tokens;
                }
            }
            "content_block_delta" => {
                if let Some(delta) = event.delta.and_then(|d| d.text) {
                    out.push(Ok(StreamChunk::content(delta)));
                }
            }
            "message_delta" => {
                let output_tokens = event.usage.map(|u| u.output_tokens).unwrap_or(0);
                out.push(Ok(StreamChunk::done(TokenUsage::new(
                    *input_tokens,
                    output_tokens,
                ))));
            }
            "error" => {
                out.push(Err(ModelError::unavailable(payload.to_string())));
            }
            _ => {}
        }
    }

    out
}

fn parse_retry_after(body: &str) -> u32 {
    // The retry hint, when present, is embedded in the error message.
    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = parsed
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            if let Some(idx) = msg.find("try again in ") {
                let rest = &msg[idx + 13..];
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if let Ok(secs) = digits.parse::<u32>() {
                    return secs;
                }
            }
        }
    }
    60
}

// Wire types for the messages endpoint.

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    content: Vec<WireContentBlock>,
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    message: Option<WireStreamMessage>,
    delta: Option<WireStreamDelta>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireStreamMessage {
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
struct WireStreamDelta {
    text: Option<String>,
}
