//! Subscriptions: plan tiers, status, and the purchase entity.

mod status;
mod subscription;
mod tier;

pub use status::SubscriptionStatus;
pub use subscription::Subscription;
pub use tier::PlanTier;
