//! The Subscription entity.
//!
//! One record per purchase. State moves `Pending → Active → Expired |
//! Cancelled`; terminal records are never mutated again. The "at most one
//! active subscription per user" invariant lives in the lifecycle service,
//! not here.

use serde::{Deserialize, Serialize};

use super::{PlanTier, SubscriptionStatus};
use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};

/// A plan purchase for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique id.
    pub id: SubscriptionId,
    /// Owning user.
    pub user_id: UserId,
    /// Plan tier.
    pub tier: PlanTier,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// Price in minor currency units, as reported by the payment provider.
    pub amount: u32,
    /// External payment reference from the provider.
    pub payment_ref: Option<String>,
    /// When the purchase record was created.
    pub created_at: Timestamp,
    /// When the subscription became active.
    pub started_at: Option<Timestamp>,
    /// When the paid period ends.
    pub expires_at: Option<Timestamp>,
    /// When the subscription was cancelled.
    pub cancelled_at: Option<Timestamp>,
}

impl Subscription {
    /// Creates a pending subscription at payment initiation.
    pub fn pending(user_id: UserId, tier: PlanTier, amount: u32) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            tier,
            status: SubscriptionStatus::Pending,
            amount,
            payment_ref: None,
            created_at: Timestamp::now(),
            started_at: None,
            expires_at: None,
            cancelled_at: None,
        }
    }

    /// Attaches the payment provider's reference.
    pub fn with_payment_ref(mut self, payment_ref: impl Into<String>) -> Self {
        self.payment_ref = Some(payment_ref.into());
        self
    }

    /// Promotes a pending subscription on confirmed payment.
    pub fn activate(&mut self, now: Timestamp, period_days: i64) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "cannot activate subscription in status {:?}",
                self.status
            )));
        }
        self.status = SubscriptionStatus::Active;
        self.started_at = Some(now);
        self.expires_at = Some(now.add_days(period_days));
        Ok(())
    }

    /// Cancels an active subscription.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::invalid_transition(format!(
                "cannot cancel subscription in status {:?}",
                self.status
            )));
        }
        self.status = SubscriptionStatus::Cancelled;
        self.cancelled_at = Some(now);
        Ok(())
    }

    /// Expires an active subscription at the end of its period.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Active {
            return Err(DomainError::invalid_transition(format!(
                "cannot expire subscription in status {:?}",
                self.status
            )));
        }
        self.status = SubscriptionStatus::Expired;
        if self.expires_at.is_none() {
            self.expires_at = Some(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Subscription {
        Subscription::pending(UserId::from_i64(1), PlanTier::Pro, 9990).with_payment_ref("pay-1")
    }

    #[test]
    fn pending_subscription_has_no_period() {
        let sub = pending();
        assert_eq!(sub.status, SubscriptionStatus::Pending);
        assert!(sub.started_at.is_none());
        assert!(sub.expires_at.is_none());
    }

    #[test]
    fn activation_sets_the_paid_period() {
        let mut sub = pending();
        let now = Timestamp::now();
        sub.activate(now, 30).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.started_at, Some(now));
        assert_eq!(sub.expires_at, Some(now.add_days(30)));
    }

    #[test]
    fn only_pending_subscriptions_activate() {
        let mut sub = pending();
        sub.activate(Timestamp::now(), 30).unwrap();
        assert!(sub.activate(Timestamp::now(), 30).is_err());
    }

    #[test]
    fn cancel_requires_active() {
        let mut sub = pending();
        assert!(sub.cancel(Timestamp::now()).is_err());

        sub.activate(Timestamp::now(), 30).unwrap();
        sub.cancel(Timestamp::now()).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(sub.cancelled_at.is_some());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut sub = pending();
        sub.activate(Timestamp::now(), 30).unwrap();
        sub.expire(Timestamp::now()).unwrap();
        assert!(sub.cancel(Timestamp::now()).is_err());
        assert!(sub.expire(Timestamp::now()).is_err());
        assert!(sub.activate(Timestamp::now(), 30).is_err());
    }
}
