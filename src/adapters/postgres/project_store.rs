//! PostgreSQL implementation of ProjectStore.
//!
//! Turn persistence follows the two-commit contract: the user message lands
//! in its own transaction, the assistant message and the mutated project row
//! land together in another.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};

use super::get;
use crate::domain::foundation::{MessageId, ProjectId, Timestamp, UserId};
use crate::domain::project::{
    BusinessLevel, Document, MessageRole, Project, StoredMessage, WorkflowStage,
};
use crate::ports::{ProjectStore, StoreError};

/// PostgreSQL project store.
#[derive(Clone)]
pub struct PostgresProjectStore {
    pool: PgPool,
}

impl PostgresProjectStore {
    /// Creates a store over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_project(
        tx: &mut Transaction<'_, Postgres>,
        project: &Project,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO projects (
                id, user_id, name, level, stage,
                profile, audit_result, strategy, content_plan,
                website_url, website_content,
                is_active, created_at, updated_at, delete_after
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                level = EXCLUDED.level,
                stage = EXCLUDED.stage,
                profile = EXCLUDED.profile,
                audit_result = EXCLUDED.audit_result,
                strategy = EXCLUDED.strategy,
                content_plan = EXCLUDED.content_plan,
                website_url = EXCLUDED.website_url,
                website_content = EXCLUDED.website_content,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at,
                delete_after = EXCLUDED.delete_after
            "#,
        )
        .bind(project.id.as_uuid())
        .bind(project.user_id.as_i64())
        .bind(&project.name)
        .bind(project.level.map(|l| l.as_str()))
        .bind(project.stage.as_str())
        .bind(project.profile.clone().map(Value::Object))
        .bind(project.audit_result.clone().map(Value::Object))
        .bind(project.strategy.clone().map(Value::Object))
        .bind(project.content_plan.clone().map(Value::Object))
        .bind(&project.website_url)
        .bind(&project.website_content)
        .bind(project.is_active)
        .bind(project.created_at.as_datetime())
        .bind(project.updated_at.as_datetime())
        .bind(project.delete_after.map(|t| *t.as_datetime()))
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::backend(format!("failed to upsert project: {e}")))?;

        Ok(())
    }

    async fn insert_message(
        tx: &mut Transaction<'_, Postgres>,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, project_id, role, content, stage,
                input_tokens, output_tokens, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.project_id.as_uuid())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.stage.as_str())
        .bind(message.input_tokens as i32)
        .bind(message.output_tokens as i32)
        .bind(message.created_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::backend(format!("failed to insert message: {e}")))?;

        Ok(())
    }

    async fn write_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(format!("failed to begin turn: {e}")))?;

        Self::upsert_project(&mut tx, project).await?;
        Self::insert_message(&mut tx, message).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend(format!("failed to commit turn: {e}")))
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, name, level, stage,
           profile, audit_result, strategy, content_plan,
           website_url, website_content,
           is_active, created_at, updated_at, delete_after
    FROM projects
"#;

#[async_trait]
impl ProjectStore for PostgresProjectStore {
    async fn find_active(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Project>, StoreError> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2 AND is_active"
        ))
        .bind(project_id.as_uuid())
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to fetch project: {e}")))?;

        row.map(row_to_project).transpose()
    }

    async fn list_active(&self, user_id: UserId) -> Result<Vec<Project>, StoreError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND is_active ORDER BY updated_at DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to list projects: {e}")))?;

        rows.into_iter().map(row_to_project).collect()
    }

    async fn count_active(&self, user_id: UserId) -> Result<u32, StoreError> {
        let result: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE user_id = $1 AND is_active")
                .bind(user_id.as_i64())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::backend(format!("failed to count projects: {e}")))?;

        Ok(result.0 as u32)
    }

    async fn create(&self, project: &Project) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(format!("failed to begin create: {e}")))?;
        Self::upsert_project(&mut tx, project).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::backend(format!("failed to commit create: {e}")))
    }

    async fn update(&self, project: &Project) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(format!("failed to begin update: {e}")))?;
        Self::upsert_project(&mut tx, project).await?;
        tx.commit()
            .await
            .map_err(|e| StoreError::backend(format!("failed to commit update: {e}")))
    }

    async fn recent_messages(
        &self,
        project_id: ProjectId,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        // Newest `limit` rows, then flipped back to chronological order.
        let rows = sqlx::query(
            r#"
            SELECT id, project_id, role, content, stage,
                   input_tokens, output_tokens, created_at
            FROM (
                SELECT * FROM messages
                WHERE project_id = $1
                ORDER BY created_at DESC, id DESC
                LIMIT $2
            ) tail
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(project_id.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to fetch messages: {e}")))?;

        rows.into_iter().map(row_to_message).collect()
    }

    async fn record_user_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        self.write_turn(project, message).await
    }

    async fn commit_assistant_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        self.write_turn(project, message).await
    }

    async fn schedule_deletion(
        &self,
        user_id: UserId,
        delete_after: Timestamp,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE projects SET delete_after = $2, updated_at = NOW() WHERE user_id = $1 AND is_active",
        )
        .bind(user_id.as_i64())
        .bind(delete_after.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::backend(format!("failed to schedule deletion: {e}")))?;

        Ok(())
    }

    async fn purge_scheduled(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::backend(format!("failed to begin purge: {e}")))?;

        sqlx::query(
            r#"
            DELETE FROM messages WHERE project_id IN (
                SELECT id FROM projects WHERE delete_after IS NOT NULL AND delete_after <= $1
            )
            "#,
        )
        .bind(now.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::backend(format!("failed to purge messages: {e}")))?;

        let result =
            sqlx::query("DELETE FROM projects WHERE delete_after IS NOT NULL AND delete_after <= $1")
                .bind(now.as_datetime())
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::backend(format!("failed to purge projects: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::backend(format!("failed to commit purge: {e}")))?;

        Ok(result.rows_affected())
    }
}

fn row_to_project(row: sqlx::postgres::PgRow) -> Result<Project, StoreError> {
    let id: uuid::Uuid = get(&row, "id")?;
    let user_id: i64 = get(&row, "user_id")?;
    let level: Option<String> = get(&row, "level")?;
    let stage_str: String = get(&row, "stage")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(&row, "created_at")?;
    let updated_at: chrono::DateTime<chrono::Utc> = get(&row, "updated_at")?;
    let delete_after: Option<chrono::DateTime<chrono::Utc>> = get(&row, "delete_after")?;

    let level = level
        .map(|s| {
            BusinessLevel::parse(&s)
                .ok_or_else(|| StoreError::backend(format!("invalid level: {s}")))
        })
        .transpose()?;
    let stage = WorkflowStage::parse(&stage_str)
        .ok_or_else(|| StoreError::backend(format!("invalid stage: {stage_str}")))?;

    Ok(Project {
        id: ProjectId::from_uuid(id),
        user_id: UserId::from_i64(user_id),
        name: get(&row, "name")?,
        level,
        stage,
        profile: document_column(&row, "profile")?,
        audit_result: document_column(&row, "audit_result")?,
        strategy: document_column(&row, "strategy")?,
        content_plan: document_column(&row, "content_plan")?,
        website_url: get(&row, "website_url")?,
        website_content: get(&row, "website_content")?,
        is_active: get(&row, "is_active")?,
        created_at: Timestamp::from_datetime(created_at),
        updated_at: Timestamp::from_datetime(updated_at),
        delete_after: delete_after.map(Timestamp::from_datetime),
    })
}

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<StoredMessage, StoreError> {
    let id: uuid::Uuid = get(&row, "id")?;
    let project_id: uuid::Uuid = get(&row, "project_id")?;
    let role_str: String = get(&row, "role")?;
    let stage_str: String = get(&row, "stage")?;
    let input_tokens: i32 = get(&row, "input_tokens")?;
    let output_tokens: i32 = get(&row, "output_tokens")?;
    let created_at: chrono::DateTime<chrono::Utc> = get(&row, "created_at")?;

    let role = MessageRole::parse(&role_str)
        .ok_or_else(|| StoreError::backend(format!("invalid role: {role_str}")))?;
    let stage = WorkflowStage::parse(&stage_str)
        .ok_or_else(|| StoreError::backend(format!("invalid stage: {stage_str}")))?;

    Ok(StoredMessage {
        id: MessageId::from_uuid(id),
        project_id: ProjectId::from_uuid(project_id),
        role,
        content: get(&row, "content")?,
        stage,
        input_tokens: input_tokens as u32,
        output_tokens: output_tokens as u32,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn document_column(row: &sqlx::postgres::PgRow, column: &str) -> Result<Option<Document>, StoreError> {
    let value: Option<Value> = get(row, column)?;
    match value {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(StoreError::backend(format!(
            "column {column} holds non-object JSON: {other}"
        ))),
    }
}
