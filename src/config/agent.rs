//! Agent tuning configuration.
//!
//! Process-wide knobs for the conversation flow: context window size,
//! retention, extraction limits, delivery chunking. Resolved once at
//! startup; nothing here mutates at runtime.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning for the conversation flow engine.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Most recent messages included in the model context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Days projects survive after subscription expiry or cancellation.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Site extraction timeout in seconds.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,

    /// Cap on extracted site text, in characters.
    #[serde(default = "default_scrape_max_chars")]
    pub scrape_max_chars: usize,

    /// Hard chunk size for transport delivery, in characters.
    #[serde(default = "default_delivery_chunk_chars")]
    pub delivery_chunk_chars: usize,

    /// Paid period granted on a confirmed payment, in days.
    #[serde(default = "default_subscription_period_days")]
    pub subscription_period_days: i64,
}

impl AgentConfig {
    /// Extraction timeout as a Duration.
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }

    /// Validates the tuning values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.context_window == 0 {
            return Err(ValidationError::invalid("agent.context_window", "must be > 0"));
        }
        if self.retention_days <= 0 {
            return Err(ValidationError::invalid("agent.retention_days", "must be > 0"));
        }
        if self.delivery_chunk_chars == 0 {
            return Err(ValidationError::invalid(
                "agent.delivery_chunk_chars",
                "must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            retention_days: default_retention_days(),
            scrape_timeout_secs: default_scrape_timeout(),
            scrape_max_chars: default_scrape_max_chars(),
            delivery_chunk_chars: default_delivery_chunk_chars(),
            subscription_period_days: default_subscription_period_days(),
        }
    }
}

fn default_context_window() -> usize {
    40
}

fn default_retention_days() -> i64 {
    180
}

fn default_scrape_timeout() -> u64 {
    15
}

fn default_scrape_max_chars() -> usize {
    8000
}

fn default_delivery_chunk_chars() -> usize {
    4000
}

fn default_subscription_period_days() -> i64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_flow_contract() {
        let config = AgentConfig::default();
        assert_eq!(config.context_window, 40);
        assert_eq!(config.retention_days, 180);
        assert_eq!(config.delivery_chunk_chars, 4000);
        assert_eq!(config.scrape_max_chars, 8000);
    }

    #[test]
    fn rejects_zero_window() {
        let config = AgentConfig {
            context_window: 0,
            ..AgentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
