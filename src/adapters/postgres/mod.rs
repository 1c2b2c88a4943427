//! PostgreSQL store implementations.

mod project_store;
mod subscription_store;
mod user_store;

pub use project_store::PostgresProjectStore;
pub use subscription_store::PostgresSubscriptionStore;
pub use user_store::PostgresUserStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::ports::StoreError;

/// Connects a pool using the database configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .connect(&config.url)
        .await
        .map_err(|e| StoreError::backend(format!("failed to connect: {e}")))
}

/// Applies pending migrations from the `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::backend(format!("migration failed: {e}")))
}

/// Typed column read with a column-naming error.
pub(crate) fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    use sqlx::Row;
    row.try_get(column)
        .map_err(|e| StoreError::backend(format!("failed to get {column}: {e}")))
}
