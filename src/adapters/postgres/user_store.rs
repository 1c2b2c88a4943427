//! PostgreSQL implementation of UserStore.

use async_trait::async_trait;
use sqlx::PgPool;

use super::get;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::user::{ReminderPreference, User};
use crate::ports::{StoreError, UserStore};

/// PostgreSQL user store.
#[derive(Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    /// Creates a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, username, locale,
                   reminders_enabled, reminder_weekday, reminder_hour,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to fetch user: {e}")))?;

        row.map(row_to_user).transpose()
    }

    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, first_name, username, locale,
                reminders_enabled, reminder_weekday, reminder_hour,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                username = EXCLUDED.username,
                locale = EXCLUDED.locale,
                reminders_enabled = EXCLUDED.reminders_enabled,
                reminder_weekday = EXCLUDED.reminder_weekday,
                reminder_hour = EXCLUDED.reminder_hour,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id.as_i64())
        .bind(&user.first_name)
        .bind(&user.username)
        .bind(&user.locale)
        .bind(user.reminders.enabled)
        .bind(user.reminders.weekday as i16)
        .bind(user.reminders.hour as i16)
        .bind(user.created_at.as_datetime())
        .bind(user.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to upsert user: {e}")))?;

        Ok(())
    }

    async fn erase(&self, id: UserId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(format!("failed to begin erasure: {e}")))?;

        // Messages cascade from projects via the schema; the explicit order
        // here keeps the erasure correct even without the FK cascade.
        sqlx::query(
            "DELETE FROM messages WHERE project_id IN (SELECT id FROM projects WHERE user_id = $1)",
        )
        .bind(id.as_i64())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::backend(format!("failed to erase messages: {e}")))?;

        sqlx::query("DELETE FROM projects WHERE user_id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::backend(format!("failed to erase projects: {e}")))?;

        sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::backend(format!("failed to erase subscriptions: {e}")))?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::backend(format!("failed to erase user: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend(format!("failed to commit erasure: {e}")))
    }
}

fn row_to_user(row: sqlx::postgres::PgRow) -> Result<User, StoreError> {
    let id: i64 = get(&row, "id")?;
    let weekday: i16 = get(&row, "reminder_weekday")?;
    let hour: i16 = get(&row, "reminder_hour")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(&row, "created_at")?;
    let updated_at: chrono::DateTime<chrono::Utc> = get(&row, "updated_at")?;

    Ok(User {
        id: UserId::from_i64(id),
        first_name: get(&row, "first_name")?,
        username: get(&row, "username")?,
        locale: get(&row, "locale")?,
        reminders: ReminderPreference {
            enabled: get(&row, "reminders_enabled")?,
            weekday: weekday as u8,
            hour: hour as u8,
        },
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
    })
}
