//! In-memory store implementations for tests.
//!
//! Hash maps behind a mutex, honoring the same contracts as the Postgres
//! stores: `record_user_turn` and `commit_assistant_turn` write project and
//! message together, `erase` cascades through everything the user owns.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{ProjectId, SubscriptionId, Timestamp, UserId};
use crate::domain::project::{Project, StoredMessage};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::domain::user::User;
use crate::ports::{ProjectStore, StoreError, SubscriptionStore, UserStore};

/// Shared in-memory state behind all three stores.
///
/// Tests usually need stores that agree on erasure, so one `MemoryStore`
/// implements all three traits over a single dataset.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, User>,
    projects: HashMap<ProjectId, Project>,
    messages: HashMap<ProjectId, Vec<StoredMessage>>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages of a project, in insertion order.
    pub fn messages_for(&self, project_id: ProjectId) -> Vec<StoredMessage> {
        self.inner
            .lock()
            .unwrap()
            .messages
            .get(&project_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Raw project lookup, ignoring ownership and activity filters.
    pub fn project(&self, project_id: ProjectId) -> Option<Project> {
        self.inner.lock().unwrap().projects.get(&project_id).cloned()
    }

    /// Seeds a project and its messages directly.
    pub fn seed_project(&self, project: Project, messages: Vec<StoredMessage>) {
        let mut inner = self.inner.lock().unwrap();
        inner.messages.insert(project.id, messages);
        inner.projects.insert(project.id, project);
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        self.inner.lock().unwrap().users.insert(user.id, user.clone());
        Ok(())
    }

    async fn erase(&self, id: UserId) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.remove(&id);
        let owned: Vec<ProjectId> = inner
            .projects
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for project_id in owned {
            inner.projects.remove(&project_id);
            inner.messages.remove(&project_id);
        }
        inner.subscriptions.retain(|_, s| s.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find(&self, id: SubscriptionId) -> Result<Option<Subscription>, StoreError> {
        Ok(self.inner.lock().unwrap().subscriptions.get(&id).cloned())
    }

    async fn find_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.payment_ref.as_deref() == Some(payment_ref))
            .cloned())
    }

    async fn active_for_user(&self, user_id: UserId) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .find(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn lapsed_active(&self, now: Timestamp) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Active
                    && s.expires_at.is_some_and(|at| !now.is_before(&at))
            })
            .cloned()
            .collect())
    }

    async fn save(&self, subscription: &Subscription) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_active(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Option<Project>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .projects
            .get(&project_id)
            .filter(|p| p.user_id == user_id && p.is_active)
            .cloned())
    }

    async fn list_active(&self, user_id: UserId) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .inner
            .lock()
            .unwrap()
            .projects
            .values()
            .filter(|p| p.user_id == user_id && p.is_active)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    async fn count_active(&self, user_id: UserId) -> Result<u32, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .projects
            .values()
            .filter(|p| p.user_id == user_id && p.is_active)
            .count() as u32)
    }

    async fn create(&self, project: &Project) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.projects.contains_key(&project.id) {
            return Err(StoreError::backend(format!(
                "project {} already exists",
                project.id
            )));
        }
        inner.projects.insert(project.id, project.clone());
        inner.messages.entry(project.id).or_default();
        Ok(())
    }

    async fn update(&self, project: &Project) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.projects.contains_key(&project.id) {
            return Err(StoreError::missing(format!("project {}", project.id)));
        }
        inner.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        project_id: ProjectId,
        limit: u32,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let all = inner.messages.get(&project_id).cloned().unwrap_or_default();
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn record_user_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.projects.contains_key(&project.id) {
            return Err(StoreError::missing(format!("project {}", project.id)));
        }
        inner.projects.insert(project.id, project.clone());
        inner
            .messages
            .entry(project.id)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn commit_assistant_turn(
        &self,
        project: &Project,
        message: &StoredMessage,
    ) -> Result<(), StoreError> {
        // Same shape as record_user_turn here; the mutex makes the pair of
        // writes indivisible, which is what the transaction gives Postgres.
        self.record_user_turn(project, message).await
    }

    async fn schedule_deletion(
        &self,
        user_id: UserId,
        delete_after: Timestamp,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        for project in inner.projects.values_mut() {
            if project.user_id == user_id && project.is_active {
                project.delete_after = Some(delete_after);
            }
        }
        Ok(())
    }

    async fn purge_scheduled(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let expired: Vec<ProjectId> = inner
            .projects
            .values()
            .filter(|p| p.delete_after.is_some_and(|after| !now.is_before(&after)))
            .map(|p| p.id)
            .collect();
        let count = expired.len() as u64;
        for project_id in expired {
            inner.projects.remove(&project_id);
            inner.messages.remove(&project_id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::MessageRole;

    fn user(id: i64) -> User {
        User::new(UserId::from_i64(id), "Test")
    }

    #[tokio::test]
    async fn find_active_filters_owner_and_activity() {
        let store = MemoryStore::new();
        let owner = UserId::from_i64(1);
        let stranger = UserId::from_i64(2);

        let mut project = Project::new(owner, "P");
        store.create(&project).await.unwrap();

        assert!(store.find_active(owner, project.id).await.unwrap().is_some());
        assert!(store.find_active(stranger, project.id).await.unwrap().is_none());

        project.deactivate();
        store.update(&project).await.unwrap();
        assert!(store.find_active(owner, project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recent_messages_returns_tail_oldest_first() {
        let store = MemoryStore::new();
        let project = Project::new(UserId::from_i64(1), "P");
        let messages: Vec<StoredMessage> = (0..10)
            .map(|i| {
                StoredMessage::user(project.id, project.stage, format!("m{i}"))
            })
            .collect();
        store.seed_project(project.clone(), messages);

        let window = store.recent_messages(project.id, 3).await.unwrap();
        let texts: Vec<&str> = window.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, ["m7", "m8", "m9"]);
    }

    #[tokio::test]
    async fn erase_cascades_through_everything() {
        let store = MemoryStore::new();
        let id = UserId::from_i64(1);
        UserStore::upsert(&store, &user(1)).await.unwrap();

        let project = Project::new(id, "P");
        store.create(&project).await.unwrap();
        store
            .record_user_turn(
                &project,
                &StoredMessage::user(project.id, project.stage, "hi"),
            )
            .await
            .unwrap();
        SubscriptionStore::save(
            &store,
            &Subscription::pending(id, crate::domain::subscription::PlanTier::Pro, 9990),
        )
        .await
        .unwrap();

        UserStore::erase(&store, id).await.unwrap();

        assert!(UserStore::find(&store, id).await.unwrap().is_none());
        assert!(store.project(project.id).is_none());
        assert!(store.messages_for(project.id).is_empty());
        assert!(SubscriptionStore::active_for_user(&store, id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lapsed_active_skips_current_and_terminal_subscriptions() {
        use crate::domain::subscription::PlanTier;

        let store = MemoryStore::new();
        let id = UserId::from_i64(1);
        let now = Timestamp::now();

        let mut lapsed = Subscription::pending(id, PlanTier::Micro, 990);
        lapsed.activate(now.add_days(-40), 30).unwrap();
        let mut current = Subscription::pending(id, PlanTier::Pro, 9990);
        current.activate(now, 30).unwrap();
        let mut retired = Subscription::pending(id, PlanTier::Small, 1990);
        retired.activate(now.add_days(-90), 30).unwrap();
        retired.expire(now.add_days(-60)).unwrap();

        for sub in [&lapsed, &current, &retired] {
            SubscriptionStore::save(&store, sub).await.unwrap();
        }

        let found = store.lapsed_active(now).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, lapsed.id);
    }

    #[tokio::test]
    async fn purge_removes_only_past_due_projects() {
        let store = MemoryStore::new();
        let id = UserId::from_i64(1);

        let mut due = Project::new(id, "Due");
        due.schedule_deletion(Timestamp::now().add_days(-1));
        let mut not_due = Project::new(id, "NotDue");
        not_due.schedule_deletion(Timestamp::now().add_days(30));
        let untouched = Project::new(id, "Untouched");

        store.create(&due).await.unwrap();
        store.create(&not_due).await.unwrap();
        store.create(&untouched).await.unwrap();

        let purged = store.purge_scheduled(Timestamp::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store.project(due.id).is_none());
        assert!(store.project(not_due.id).is_some());
        assert!(store.project(untouched.id).is_some());
    }

    #[tokio::test]
    async fn messages_survive_when_only_user_turn_landed() {
        let store = MemoryStore::new();
        let project = Project::new(UserId::from_i64(1), "P");
        store.create(&project).await.unwrap();

        store
            .record_user_turn(
                &project,
                &StoredMessage::user(project.id, project.stage, "hello"),
            )
            .await
            .unwrap();

        // No assistant commit happened; the user message is still there.
        let messages = store.messages_for(project.id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }
}
