//! Application configuration.
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read once at startup with the
//! `MARKETING_AGENT` prefix and `__` as the nesting separator:
//!
//! - `MARKETING_AGENT__DATABASE__URL=...` -> `database.url`
//! - `MARKETING_AGENT__MODEL__API_KEY=...` -> `model.api_key`
//! - `MARKETING_AGENT__AGENT__RETENTION_DAYS=180` -> `agent.retention_days`

mod agent;
mod database;
mod error;
mod model;

pub use agent::AgentConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use model::ModelConfig;

use serde::Deserialize;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration (PostgreSQL connection).
    pub database: DatabaseConfig,

    /// Model provider configuration.
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation flow tuning.
    #[serde(default)]
    pub agent: AgentConfig,
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// Reads a `.env` file first when present (development convenience),
    /// then environment variables with the `MARKETING_AGENT` prefix.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MARKETING_AGENT")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validates all configuration sections.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.database.validate()?;
        self.model.validate()?;
        self.agent.validate()?;
        Ok(())
    }
}
