//! Model provider configuration.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Configuration for the language-model service and its retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Provider API key.
    pub api_key: Option<String>,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the provider API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per invocation, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in seconds.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Backoff ceiling in seconds.
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_secs: u64,

    /// Output token cap per completion.
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl ModelConfig {
    /// Request timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validates the provider settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.api_key.as_ref().is_some_and(|k| !k.is_empty()) {
            return Err(ValidationError::MissingRequired("MODEL__API_KEY"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::invalid("model.max_attempts", "must be > 0"));
        }
        if self.backoff_base_secs > self.backoff_cap_secs {
            return Err(ValidationError::invalid(
                "model.backoff_base_secs",
                "must not exceed backoff_cap_secs",
            ));
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
            backoff_cap_secs: default_backoff_cap(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    4
}

fn default_backoff_base() -> u64 {
    2
}

fn default_backoff_cap() -> u64 {
    30
}

fn default_max_output_tokens() -> u32 {
    4096
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_retry_contract() {
        let config = ModelConfig::default();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff_base_secs, 2);
        assert_eq!(config.backoff_cap_secs, 30);
        assert_eq!(config.max_output_tokens, 4096);
    }

    #[test]
    fn validation_requires_api_key() {
        let config = ModelConfig::default();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("MODEL__API_KEY"))
        );

        let config = ModelConfig {
            api_key: Some("sk-test".into()),
            ..ModelConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn backoff_base_must_not_exceed_cap() {
        let config = ModelConfig {
            api_key: Some("sk-test".into()),
            backoff_base_secs: 60,
            backoff_cap_secs: 30,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
