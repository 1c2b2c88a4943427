//! Subscription lifecycle status.

use serde::{Deserialize, Serialize};

/// Status of a subscription.
///
/// `Expired` and `Cancelled` are terminal: a subscription never leaves them,
/// a new purchase creates a new subscription instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Payment initiated, not yet confirmed.
    Pending,
    /// Paid and current.
    Active,
    /// Ran out at the end of the paid period.
    Expired,
    /// Cancelled by the user or the payment provider.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns true for statuses a subscription never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Expired | SubscriptionStatus::Cancelled)
    }

    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "pending" => Some(SubscriptionStatus::Pending),
            "active" => Some(SubscriptionStatus::Active),
            "expired" => Some(SubscriptionStatus::Expired),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_classified() {
        assert!(SubscriptionStatus::Expired.is_terminal());
        assert!(SubscriptionStatus::Cancelled.is_terminal());
        assert!(!SubscriptionStatus::Pending.is_terminal());
        assert!(!SubscriptionStatus::Active.is_terminal());
    }

    #[test]
    fn storage_strings_round_trip() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::Expired,
            SubscriptionStatus::Cancelled,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
    }
}
