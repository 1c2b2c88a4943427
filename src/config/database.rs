//! Database configuration.

use serde::Deserialize;

use super::error::ValidationError;

/// PostgreSQL connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL.
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl DatabaseConfig {
    /// Validates the connection settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("DATABASE__URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ValidationError::invalid(
                "database.url",
                "must be a postgres:// URL",
            ));
        }
        if self.pool_size == 0 {
            return Err(ValidationError::invalid("database.pool_size", "must be > 0"));
        }
        Ok(())
    }
}

fn default_pool_size() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_postgres_urls() {
        let config = DatabaseConfig {
            url: "postgres://localhost/agent".into(),
            pool_size: 10,
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_postgres_urls() {
        let config = DatabaseConfig {
            url: "mysql://localhost/agent".into(),
            pool_size: 10,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_pool() {
        let config = DatabaseConfig {
            url: "postgres://localhost/agent".into(),
            pool_size: 0,
        };
        assert!(config.validate().is_err());
    }
}
