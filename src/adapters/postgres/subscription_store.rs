//! PostgreSQL implementation of SubscriptionStore.

use async_trait::async_trait;
use sqlx::PgPool;

use super::get;
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{PlanTier, Subscription, SubscriptionStatus};
use crate::ports::{StoreError, SubscriptionStore};

/// PostgreSQL subscription store.
#[derive(Clone)]
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, tier, status, amount, payment_ref,
           created_at, started_at, expires_at, cancelled_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn find(&self, id: SubscriptionId) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::backend(format!("failed to fetch subscription: {e}")))?;

        row.map(row_to_subscription).transpose()
    }

    async fn find_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE payment_ref = $1"))
            .bind(payment_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                StoreError::backend(format!("failed to fetch subscription by payment ref: {e}"))
            })?;

        row.map(row_to_subscription).transpose()
    }

    async fn active_for_user(&self, user_id: UserId) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND status = 'active' ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to fetch active subscription: {e}")))?;

        row.map(row_to_subscription).transpose()
    }

    async fn lapsed_active(&self, now: Timestamp) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = 'active' AND expires_at <= $1"
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to fetch lapsed subscriptions: {e}")))?;

        rows.into_iter().map(row_to_subscription).collect()
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, tier, status, amount, payment_ref,
                created_at, started_at, expires_at, cancelled_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                payment_ref = EXCLUDED.payment_ref,
                started_at = EXCLUDED.started_at,
                expires_at = EXCLUDED.expires_at,
                cancelled_at = EXCLUDED.cancelled_at
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_i64())
        .bind(subscription.tier.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.amount as i64)
        .bind(&subscription.payment_ref)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.started_at.map(|t| *t.as_datetime()))
        .bind(subscription.expires_at.map(|t| *t.as_datetime()))
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to save subscription: {e}")))?;

        Ok(())
    }
}

fn row_to_subscription(row: sqlx::postgres::PgRow) -> Result<Subscription, StoreError> {
    let id: uuid::Uuid = get(&row, "id")?;
    let user_id: i64 = get(&row, "user_id")?;
    let tier_str: String = get(&row, "tier")?;
    let status_str: String = get(&row, "status")?;
    let amount: i64 = get(&row, "amount")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(&row, "created_at")?;
    let started_at: Option<chrono::DateTime<chrono::Utc>> = get(&row, "started_at")?;
    let expires_at: Option<chrono::DateTime<chrono::Utc>> = get(&row, "expires_at")?;
    let cancelled_at: Option<chrono::DateTime<chrono::Utc>> = get(&row, "cancelled_at")?;

    let tier = PlanTier::parse(&tier_str)
        .ok_or_else(|| StoreError::backend(format!("invalid tier: {tier_str}")))?;
    let status = SubscriptionStatus::parse(&status_str)
        .ok_or_else(|| StoreError::backend(format!("invalid status: {status_str}")))?;

    Ok(Subscription {
        id: SubscriptionId::from_uuid(id),
        user_id: UserId::from_i64(user_id),
        tier,
        status,
        amount: amount as u32,
        payment_ref: get(&row, "payment_ref")?,
        created_at: Timestamp::from_datetime(created_at),
        started_at: started_at.map(Timestamp::from_datetime),
        expires_at: expires_at.map(Timestamp::from_datetime),
        cancelled_at: cancelled_at.map(Timestamp::from_datetime),
    })
}
