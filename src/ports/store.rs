//! Storage ports.
//!
//! The storage engine is an external collaborator; these traits define what
//! the flow controller and lifecycle policy need from it. The contract for
//! turn persistence is split in two on purpose: `record_user_turn` commits
//! the user's message immediately so it survives a later model failure,
//! while `commit_assistant_turn` persists the reply and the mutated project
//! as one atomic unit.

use async_trait::async_trait;

use crate::domain::foundation::{ProjectId, SubscriptionId, Timestamp, UserId};
use crate::domain::project::{Project, StoredMessage};
use crate::domain::subscription::Subscription;
use crate::domain::user::User;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or lost the operation.
    #[error("storage failure: {0}")]
    Backend(String),

    /// A row the operation depends on is gone.
    #[error("missing record: {0}")]
    Missing(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Creates a missing-record error.
    pub fn missing(message: impl Into<String>) -> Self {
        Self::Missing(message.into())
    }
}

/// Persistence for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up a user by id.
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Inserts or updates a user record.
    async fn upsert(&self, user: &User) -> Result<(), StoreError>;

    /// Deletes the user and everything they own: projects, messages,
    /// subscriptions. One atomic unit.
    async fn erase(&self, id: UserId) -> Result<(), StoreError>;
}

/// Persistence for subscriptions.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Finds a subscription by id.
    async fn find(&self, id: SubscriptionId) -> Result<Option<Subscription>, StoreError>;

    /// Finds a subscription by its external payment reference.
    async fn find_by_payment_ref(&self, payment_ref: &str)
        -> Result<Option<Subscription>, StoreError>;

    /// Returns the user's active subscription, if any.
    async fn active_for_user(&self, user_id: UserId) -> Result<Option<Subscription>, StoreError>;

    /// Returns active subscriptions whose paid period ended at or before
    /// `now`.
    async fn lapsed_active(&self, now: Timestamp) -> Result<Vec<Subscription>, StoreError>;

    /// Inserts or updates a subscription record.
    async fn save(&self, subscription: &Subscription) -> Result<(), StoreError>;
}

/// Persistence for projects and their messages.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Loads an active project owned by the user.
    ///
    /// Returns `None` for unknown ids, foreign owners, and deactivated
    /// projects alike: callers see one "not found" condition.
    async fn find_active(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Project>, StoreError>;

    /// Lists the user's active projects, most recently updated first.
    async fn list_active(&self, user_id: UserId) -> Result<Vec<Project>, StoreError>;

    /// Counts the user's active projects.
    async fn count_active(&self, user_id: UserId) -> Result<u32, StoreError>;

    /// Inserts a new project.
    async fn create(&self, project: &Project) -> Result<(), StoreError>;

    /// Updates a project row outside the turn path.
    async fn update(&self, project: &Project) -> Result<(), StoreError>;

    /// Returns the most recent `limit` messages of a project, oldest-first.
    async fn recent_messages(
        &self,
        project_id: ProjectId,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Persists an inbound user message plus any project changes made while
    /// receiving it (site-content attachment). Committed immediately so the
    /// user's input is never lost to a later failure.
    async fn record_user_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError>;

    /// Persists the assistant reply and the mutated project atomically.
    /// Either both land or neither does.
    async fn commit_assistant_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError>;

    /// Marks all of a user's active projects for deletion at `delete_after`.
    async fn schedule_deletion(
        &self,
        user_id: UserId,
        delete_after: Timestamp,
    ) -> Result<(), StoreError>;

    /// Purges projects (and cascaded messages) whose scheduled deletion time
    /// has passed. Returns how many projects were purged.
    async fn purge_scheduled(&self, now: Timestamp) -> Result<u64, StoreError>;
}
