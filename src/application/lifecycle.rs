//! Project lifecycle policy.
//!
//! Registration, project quotas, subscription payment events, retention
//! scheduling, and erasure. Everything outside the turn path that changes
//! what a user is allowed to do or what data survives.

use std::sync::Arc;
use tracing::info;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::project::Project;
use crate::domain::subscription::{PlanTier, Subscription, SubscriptionStatus};
use crate::domain::user::User;
use crate::ports::{ProjectStore, StoreError, SubscriptionStore, UserStore};

/// Notification from the payment collaborator.
#[derive(Debug, Clone)]
pub enum PaymentEvent {
    /// Payment went through for the referenced pending subscription.
    Confirmed {
        /// External payment reference.
        payment_ref: String,
    },
    /// The referenced subscription was cancelled by the user or provider.
    Cancelled {
        /// External payment reference.
        payment_ref: String,
    },
}

/// Lifecycle policy tuning.
#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    /// Days projects survive after subscription expiry or cancellation.
    pub retention_days: i64,
    /// Paid period granted on a confirmed payment.
    pub subscription_period_days: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            retention_days: 180,
            subscription_period_days: 30,
        }
    }
}

/// Lifecycle service over the three stores.
pub struct LifecycleService<U, S, P> {
    users: Arc<U>,
    subscriptions: Arc<S>,
    projects: Arc<P>,
    policy: LifecyclePolicy,
}

impl<U, S, P> LifecycleService<U, S, P>
where
    U: UserStore,
    S: SubscriptionStore,
    P: ProjectStore,
{
    /// Creates a service over the given stores.
    pub fn new(users: Arc<U>, subscriptions: Arc<S>, projects: Arc<P>, policy: LifecyclePolicy) -> Self {
        Self {
            users,
            subscriptions,
            projects,
            policy,
        }
    }

    /// Registers a user on first contact, or returns the existing record.
    ///
    /// First contact also grants an active free-trial subscription so the
    /// user can create one project before paying.
    pub async fn get_or_create_user(
        &self,
        id: UserId,
        first_name: &str,
        username: Option<&str>,
    ) -> Result<User, DomainError> {
        if let Some(existing) = self.users.find(id).await.map_err(map_store_error)? {
            return Ok(existing);
        }

        let mut user = User::new(id, first_name);
        if let Some(username) = username {
            user = user.with_username(username);
        }
        self.users.upsert(&user).await.map_err(map_store_error)?;

        let mut trial = Subscription::pending(id, PlanTier::FreeTrial, 0);
        trial
            .activate(Timestamp::now(), self.policy.subscription_period_days)
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        self.subscriptions
            .save(&trial)
            .await
            .map_err(map_store_error)?;

        info!(user_id = %id, "registered new user with free trial");
        Ok(user)
    }

    /// Creates a project, enforcing the subscription quota.
    pub async fn create_project(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Project, DomainError> {
        let quota = self.project_quota(user_id).await?;
        let active = self
            .projects
            .count_active(user_id)
            .await
            .map_err(map_store_error)?;

        if active >= quota {
            return Err(DomainError::new(
                ErrorCode::QuotaExceeded,
                format!("plan allows {quota} active project(s), {active} in use"),
            ));
        }

        let project = Project::new(user_id, name);
        self.projects
            .create(&project)
            .await
            .map_err(map_store_error)?;
        info!(user_id = %user_id, project_id = %project.id, "project created");
        Ok(project)
    }

    /// Starts a payment: records a pending subscription carrying the
    /// external reference and the charged amount.
    pub async fn begin_subscription(
        &self,
        user_id: UserId,
        tier: PlanTier,
        amount: u32,
        payment_ref: &str,
    ) -> Result<Subscription, DomainError> {
        let subscription =
            Subscription::pending(user_id, tier, amount).with_payment_ref(payment_ref);
        self.subscriptions
            .save(&subscription)
            .await
            .map_err(map_store_error)?;
        Ok(subscription)
    }

    /// Applies a payment collaborator notification.
    pub async fn on_payment_event(&self, event: PaymentEvent) -> Result<(), DomainError> {
        match event {
            PaymentEvent::Confirmed { payment_ref } => self.confirm_payment(&payment_ref).await,
            PaymentEvent::Cancelled { payment_ref } => self.cancel_payment(&payment_ref).await,
        }
    }

    async fn confirm_payment(&self, payment_ref: &str) -> Result<(), DomainError> {
        let mut subscription = self.find_by_ref(payment_ref).await?;
        let now = Timestamp::now();

        // At most one active subscription per user: the old one retires
        // before the new one starts.
        if let Some(mut previous) = self
            .subscriptions
            .active_for_user(subscription.user_id)
            .await
            .map_err(map_store_error)?
        {
            if previous.id != subscription.id {
                previous.expire(now)?;
                self.subscriptions
                    .save(&previous)
                    .await
                    .map_err(map_store_error)?;
            }
        }

        subscription.activate(now, self.policy.subscription_period_days)?;
        self.subscriptions
            .save(&subscription)
            .await
            .map_err(map_store_error)?;

        info!(
            user_id = %subscription.user_id,
            tier = subscription.tier.as_str(),
            "subscription activated"
        );
        Ok(())
    }

    async fn cancel_payment(&self, payment_ref: &str) -> Result<(), DomainError> {
        let mut subscription = self.find_by_ref(payment_ref).await?;

        if subscription.status == SubscriptionStatus::Active {
            subscription.cancel(Timestamp::now())?;
            self.subscriptions
                .save(&subscription)
                .await
                .map_err(map_store_error)?;
            self.schedule_retention(subscription.user_id).await?;
            info!(user_id = %subscription.user_id, "subscription cancelled, retention scheduled");
        }
        Ok(())
    }

    /// Marks all of a user's active projects for deletion after the
    /// retention window.
    pub async fn schedule_retention(&self, user_id: UserId) -> Result<(), DomainError> {
        let delete_after = Timestamp::now().add_days(self.policy.retention_days);
        self.projects
            .schedule_deletion(user_id, delete_after)
            .await
            .map_err(map_store_error)
    }

    /// Expires active subscriptions whose paid period ended at or before
    /// `now` and starts the retention clock on their owners' projects.
    /// Returns the number of subscriptions expired.
    ///
    /// Run periodically alongside [`purge_expired`](Self::purge_expired);
    /// without the sweep a lapsed plan would keep granting quota forever.
    pub async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError> {
        let lapsed = self
            .subscriptions
            .lapsed_active(now)
            .await
            .map_err(map_store_error)?;
        let count = lapsed.len() as u64;

        for mut subscription in lapsed {
            subscription.expire(now)?;
            self.subscriptions
                .save(&subscription)
                .await
                .map_err(map_store_error)?;
            self.projects
                .schedule_deletion(
                    subscription.user_id,
                    now.add_days(self.policy.retention_days),
                )
                .await
                .map_err(map_store_error)?;
            info!(user_id = %subscription.user_id, "subscription lapsed, retention scheduled");
        }
        Ok(count)
    }

    /// Purges projects whose retention window has elapsed. Returns the
    /// number of projects removed.
    pub async fn purge_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let purged = self
            .projects
            .purge_scheduled(now)
            .await
            .map_err(map_store_error)?;
        if purged > 0 {
            info!(purged, "retention purge completed");
        }
        Ok(purged)
    }

    /// Deletes everything the user owns, immediately and unconditionally.
    pub async fn erase_user(&self, user_id: UserId) -> Result<(), DomainError> {
        self.users.erase(user_id).await.map_err(map_store_error)?;
        info!(user_id = %user_id, "user erased on request");
        Ok(())
    }

    async fn project_quota(&self, user_id: UserId) -> Result<u32, DomainError> {
        Ok(self
            .subscriptions
            .active_for_user(user_id)
            .await
            .map_err(map_store_error)?
            .map(|s| s.tier.max_projects())
            .unwrap_or(0))
    }

    async fn find_by_ref(&self, payment_ref: &str) -> Result<Subscription, DomainError> {
        self.subscriptions
            .find_by_payment_ref(payment_ref)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("no subscription for payment ref {payment_ref}"),
                )
            })
    }
}

fn map_store_error(err: StoreError) -> DomainError {
    DomainError::new(ErrorCode::StorageError, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;

    fn service(store: &Arc<MemoryStore>) -> LifecycleService<MemoryStore, MemoryStore, MemoryStore> {
        LifecycleService::new(
            Arc::clone(store),
            Arc::clone(store),
            Arc::clone(store),
            LifecyclePolicy::default(),
        )
    }

    async fn paid_user(
        service: &LifecycleService<MemoryStore, MemoryStore, MemoryStore>,
        id: i64,
        tier: PlanTier,
    ) -> UserId {
        let user_id = UserId::from_i64(id);
        service.get_or_create_user(user_id, "Test", None).await.unwrap();
        service
            .begin_subscription(user_id, tier, 9990, &format!("pay-{id}"))
            .await
            .unwrap();
        service
            .on_payment_event(PaymentEvent::Confirmed {
                payment_ref: format!("pay-{id}"),
            })
            .await
            .unwrap();
        user_id
    }

    #[tokio::test]
    async fn first_contact_registers_and_grants_a_trial() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = UserId::from_i64(1);

        let user = service
            .get_or_create_user(user_id, "Anna", Some("anna_b"))
            .await
            .unwrap();
        assert_eq!(user.username.as_deref(), Some("anna_b"));

        let trial = SubscriptionStore::active_for_user(store.as_ref(), user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trial.tier, PlanTier::FreeTrial);
        assert_eq!(trial.status, SubscriptionStatus::Active);

        // Second contact returns the same record without a second trial.
        let again = service.get_or_create_user(user_id, "Anna", None).await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn trial_quota_allows_exactly_one_project() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = UserId::from_i64(1);
        service.get_or_create_user(user_id, "Test", None).await.unwrap();

        service.create_project(user_id, "First").await.unwrap();
        let err = service.create_project(user_id, "Second").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
    }

    #[tokio::test]
    async fn upgrade_raises_the_quota() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = paid_user(&service, 1, PlanTier::Pro).await;

        for name in ["A", "B", "C"] {
            service.create_project(user_id, name).await.unwrap();
        }
        let err = service.create_project(user_id, "D").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
    }

    #[tokio::test]
    async fn no_subscription_means_no_projects() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        // User exists but was seeded without the trial grant.
        UserStore::upsert(store.as_ref(), &User::new(UserId::from_i64(9), "Cold"))
            .await
            .unwrap();

        let err = service
            .create_project(UserId::from_i64(9), "P")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
    }

    #[tokio::test]
    async fn confirmed_payment_retires_the_previous_subscription() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = paid_user(&service, 1, PlanTier::Micro).await;

        service
            .begin_subscription(user_id, PlanTier::Agency, 29990, "pay-upgrade")
            .await
            .unwrap();
        service
            .on_payment_event(PaymentEvent::Confirmed {
                payment_ref: "pay-upgrade".into(),
            })
            .await
            .unwrap();

        let active = SubscriptionStore::active_for_user(store.as_ref(), user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.tier, PlanTier::Agency);
    }

    #[tokio::test]
    async fn cancellation_schedules_retention() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = paid_user(&service, 1, PlanTier::Micro).await;
        let project = service.create_project(user_id, "P").await.unwrap();

        service
            .on_payment_event(PaymentEvent::Cancelled {
                payment_ref: "pay-1".into(),
            })
            .await
            .unwrap();

        let stored = store.project(project.id).unwrap();
        let delete_after = stored.delete_after.unwrap();
        assert!(delete_after.is_after(&Timestamp::now().add_days(179)));

        // Data still present until the purge runs.
        assert!(store.project(project.id).is_some());
        let purged = service
            .purge_expired(Timestamp::now().add_days(181))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.project(project.id).is_none());
    }

    #[tokio::test]
    async fn lapsed_subscriptions_expire_and_start_the_retention_clock() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = paid_user(&service, 1, PlanTier::Micro).await;
        let project = service.create_project(user_id, "P").await.unwrap();

        // Inside the paid period the sweep finds nothing.
        assert_eq!(service.expire_lapsed(Timestamp::now()).await.unwrap(), 0);

        let after_period = Timestamp::now().add_days(31);
        assert_eq!(service.expire_lapsed(after_period).await.unwrap(), 1);

        // Quota is gone and the project is on the retention clock.
        assert!(SubscriptionStore::active_for_user(store.as_ref(), user_id)
            .await
            .unwrap()
            .is_none());
        let err = service.create_project(user_id, "Q").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
        let delete_after = store.project(project.id).unwrap().delete_after.unwrap();
        assert_eq!(delete_after, after_period.add_days(180));

        // A second sweep has nothing left to expire.
        assert_eq!(service.expire_lapsed(after_period).await.unwrap(), 0);

        let purged = service
            .purge_expired(after_period.add_days(181))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.project(project.id).is_none());
    }

    #[tokio::test]
    async fn unknown_payment_ref_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let err = service
            .on_payment_event(PaymentEvent::Confirmed {
                payment_ref: "ghost".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn erasure_removes_every_trace() {
        let store = Arc::new(MemoryStore::new());
        let service = service(&store);
        let user_id = paid_user(&service, 1, PlanTier::Pro).await;
        let a = service.create_project(user_id, "A").await.unwrap();
        let b = service.create_project(user_id, "B").await.unwrap();
        for project in [&a, &b] {
            for i in 0..5 {
                store
                    .record_user_turn(
                        project,
                        &crate::domain::project::StoredMessage::user(
                            project.id,
                            project.stage,
                            format!("m{i}"),
                        ),
                    )
                    .await
                    .unwrap();
            }
        }

        service.erase_user(user_id).await.unwrap();

        assert!(UserStore::find(store.as_ref(), user_id).await.unwrap().is_none());
        assert!(store.project(a.id).is_none());
        assert!(store.project(b.id).is_none());
        assert!(store.messages_for(a.id).is_empty());
        assert!(store.messages_for(b.id).is_empty());
        assert!(SubscriptionStore::active_for_user(store.as_ref(), user_id)
            .await
            .unwrap()
            .is_none());
    }
}
