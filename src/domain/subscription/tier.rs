//! Subscription plan tiers.
//!
//! The active subscription's tier determines how many projects a user may
//! run concurrently.

use serde::{Deserialize, Serialize};

/// Subscription plan tier, ranked from trial to agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// Evaluation period before the first payment.
    FreeTrial,
    /// Single-project plan for micro businesses.
    Micro,
    /// Single-project plan for small businesses.
    Small,
    /// Single-project plan for medium businesses.
    Medium,
    /// Up to 3 projects.
    Pro,
    /// Up to 10 projects.
    Agency,
}

impl PlanTier {
    /// Maximum concurrent active projects allowed on this tier.
    pub fn max_projects(&self) -> u32 {
        match self {
            PlanTier::FreeTrial => 1,
            PlanTier::Micro => 1,
            PlanTier::Small => 1,
            PlanTier::Medium => 1,
            PlanTier::Pro => 3,
            PlanTier::Agency => 10,
        }
    }

    /// Numeric rank for upgrade comparison. Higher rank = more capacity.
    pub fn rank(&self) -> u8 {
        match self {
            PlanTier::FreeTrial => 0,
            PlanTier::Micro => 1,
            PlanTier::Small => 2,
            PlanTier::Medium => 3,
            PlanTier::Pro => 4,
            PlanTier::Agency => 5,
        }
    }

    /// Returns true if this tier is paid.
    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanTier::FreeTrial)
    }

    /// Display name for user-facing summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::FreeTrial => "Free trial",
            PlanTier::Micro => "Micro",
            PlanTier::Small => "Small",
            PlanTier::Medium => "Medium",
            PlanTier::Pro => "Pro",
            PlanTier::Agency => "Agency",
        }
    }

    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::FreeTrial => "free_trial",
            PlanTier::Micro => "micro",
            PlanTier::Small => "small",
            PlanTier::Medium => "medium",
            PlanTier::Pro => "pro",
            PlanTier::Agency => "agency",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Option<PlanTier> {
        match s {
            "free_trial" => Some(PlanTier::FreeTrial),
            "micro" => Some(PlanTier::Micro),
            "small" => Some(PlanTier::Small),
            "medium" => Some(PlanTier::Medium),
            "pro" => Some(PlanTier::Pro),
            "agency" => Some(PlanTier::Agency),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_project_tiers_allow_one() {
        for tier in [PlanTier::Micro, PlanTier::Small, PlanTier::Medium] {
            assert_eq!(tier.max_projects(), 1);
        }
    }

    #[test]
    fn pro_allows_three_projects() {
        assert_eq!(PlanTier::Pro.max_projects(), 3);
    }

    #[test]
    fn agency_allows_ten_projects() {
        assert_eq!(PlanTier::Agency.max_projects(), 10);
    }

    #[test]
    fn ranks_order_tiers_for_upgrades() {
        assert!(PlanTier::Pro.rank() > PlanTier::Medium.rank());
        assert!(PlanTier::Agency.rank() > PlanTier::Pro.rank());
        assert_eq!(PlanTier::FreeTrial.rank(), 0);
    }

    #[test]
    fn only_trial_is_unpaid() {
        assert!(!PlanTier::FreeTrial.is_paid());
        assert!(PlanTier::Micro.is_paid());
        assert!(PlanTier::Agency.is_paid());
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PlanTier::FreeTrial).unwrap(), "\"free_trial\"");
    }

    #[test]
    fn storage_strings_round_trip() {
        for tier in [
            PlanTier::FreeTrial,
            PlanTier::Micro,
            PlanTier::Small,
            PlanTier::Medium,
            PlanTier::Pro,
            PlanTier::Agency,
        ] {
            assert_eq!(PlanTier::parse(tier.as_str()), Some(tier));
        }
    }
}
