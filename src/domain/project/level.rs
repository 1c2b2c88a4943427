//! Business level classification.
//!
//! The level is confirmed once during onboarding and shapes the agent's
//! instructions for every later stage.

use serde::{Deserialize, Serialize};

/// Size class of the business a project represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessLevel {
    /// 1-3 people, up to 500k RUB/month.
    Micro,
    /// 5-20 people, 500k-5M RUB/month.
    Small,
    /// 20-100 people, 5-50M RUB/month.
    Medium,
}

/// Keyword groups for level confirmation, checked in order.
///
/// The micro group includes plain agreement words because the agent proposes
/// micro first for the smallest answers; a bare "да" confirms the proposal.
const MICRO_TERMS: &[&str] = &["микро", "micro", "да", "верно", "правильно"];
const SMALL_TERMS: &[&str] = &["малый", "малого", "small"];
const MEDIUM_TERMS: &[&str] = &["средний", "среднего", "medium"];

impl BusinessLevel {
    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessLevel::Micro => "micro",
            BusinessLevel::Small => "small",
            BusinessLevel::Medium => "medium",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Option<BusinessLevel> {
        match s {
            "micro" => Some(BusinessLevel::Micro),
            "small" => Some(BusinessLevel::Small),
            "medium" => Some(BusinessLevel::Medium),
            _ => None,
        }
    }

    /// Display name for transport-facing summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            BusinessLevel::Micro => "Micro",
            BusinessLevel::Small => "Small",
            BusinessLevel::Medium => "Medium",
        }
    }

    /// Classifies a level-confirmation reply.
    ///
    /// Matches normalized lowercase text against fixed keyword groups; the
    /// first group with a hit wins. This is a best-effort heuristic: no
    /// match returns `None` and the raw text goes to the model for
    /// open-ended handling.
    pub fn detect(text: &str) -> Option<BusinessLevel> {
        let normalized = text.to_lowercase();
        let groups = [
            (MICRO_TERMS, BusinessLevel::Micro),
            (SMALL_TERMS, BusinessLevel::Small),
            (MEDIUM_TERMS, BusinessLevel::Medium),
        ];
        groups
            .iter()
            .find(|(terms, _)| terms.iter().any(|t| normalized.contains(t)))
            .map(|(_, level)| *level)
    }
}

impl std::fmt::Display for BusinessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&BusinessLevel::Micro).unwrap();
        assert_eq!(json, "\"micro\"");
    }

    #[test]
    fn storage_strings_round_trip() {
        for level in [
            BusinessLevel::Micro,
            BusinessLevel::Small,
            BusinessLevel::Medium,
        ] {
            assert_eq!(BusinessLevel::parse(level.as_str()), Some(level));
        }
    }

    mod detection {
        use super::*;

        #[test]
        fn plain_agreement_confirms_micro() {
            assert_eq!(BusinessLevel::detect("Да, верно"), Some(BusinessLevel::Micro));
        }

        #[test]
        fn detects_micro_in_russian_and_english() {
            assert_eq!(BusinessLevel::detect("у нас микробизнес"), Some(BusinessLevel::Micro));
            assert_eq!(BusinessLevel::detect("Micro business"), Some(BusinessLevel::Micro));
        }

        #[test]
        fn detects_small_in_inflected_forms() {
            assert_eq!(BusinessLevel::detect("скорее малый"), Some(BusinessLevel::Small));
            assert_eq!(
                BusinessLevel::detect("думаю, мы малого уровня"),
                Some(BusinessLevel::Small)
            );
        }

        #[test]
        fn detects_medium() {
            assert_eq!(BusinessLevel::detect("средний бизнес"), Some(BusinessLevel::Medium));
            assert_eq!(BusinessLevel::detect("MEDIUM"), Some(BusinessLevel::Medium));
        }

        #[test]
        fn earlier_group_wins_on_ambiguous_input() {
            // "да" hits the micro group before "малый" is considered
            assert_eq!(
                BusinessLevel::detect("да, малый бизнес"),
                Some(BusinessLevel::Micro)
            );
        }

        #[test]
        fn unrelated_text_is_unclassified() {
            assert_eq!(BusinessLevel::detect("расскажи подробнее"), None);
            assert_eq!(BusinessLevel::detect(""), None);
        }
    }
}
