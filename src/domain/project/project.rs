//! The Project aggregate.
//!
//! A project is the unit of work: one business moving through the marketing
//! workflow, accumulating structured documents along the way. All document
//! and stage mutations go through the methods here so the invariants (stage
//! monotonicity, additive profile merge) hold everywhere.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{BusinessLevel, WorkflowStage};
use crate::domain::foundation::{DomainError, ProjectId, Timestamp, UserId};

/// Free-form structured document: string keys, heterogeneous values.
///
/// Application code reads only the keys it expects and preserves the rest.
pub type Document = Map<String, Value>;

/// The structured documents a project accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Business profile, built up additively during briefing.
    Profile,
    /// Approved audit result.
    Audit,
    /// Approved marketing strategy.
    Strategy,
    /// Approved content plan.
    ContentPlan,
}

/// A business project owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique id.
    pub id: ProjectId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Confirmed business level, unset until onboarding completes.
    pub level: Option<BusinessLevel>,
    /// Current workflow stage.
    pub stage: WorkflowStage,
    /// Business profile document, merged additively.
    pub profile: Option<Document>,
    /// Approved audit result.
    pub audit_result: Option<Document>,
    /// Approved strategy.
    pub strategy: Option<Document>,
    /// Approved content plan.
    pub content_plan: Option<Document>,
    /// Source URL the user shared, if any.
    pub website_url: Option<String>,
    /// Cached extracted site text.
    pub website_content: Option<String>,
    /// False once the project is soft-deactivated.
    pub is_active: bool,
    /// When the project was created.
    pub created_at: Timestamp,
    /// When the project was last changed.
    pub updated_at: Timestamp,
    /// Scheduled purge time after retention expiry, if any.
    pub delete_after: Option<Timestamp>,
}

impl Project {
    /// Creates a new project in the onboarding stage.
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: ProjectId::new(),
            user_id,
            name: name.into(),
            level: None,
            stage: WorkflowStage::Onboarding,
            profile: None,
            audit_result: None,
            strategy: None,
            content_plan: None,
            website_url: None,
            website_content: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            delete_after: None,
        }
    }

    /// Advances the stage by exactly one step.
    ///
    /// This is the only way a stage changes, so regression is impossible by
    /// construction. In `Cycle` the stage stays put.
    pub fn advance_stage(&mut self) -> WorkflowStage {
        self.stage = self.stage.next();
        self.touch();
        self.stage
    }

    /// Records the confirmed business level and moves onboarding forward.
    ///
    /// Only valid while the project is still in `Onboarding`.
    pub fn confirm_level(&mut self, level: BusinessLevel) -> Result<(), DomainError> {
        if self.stage != WorkflowStage::Onboarding {
            return Err(DomainError::invalid_transition(format!(
                "level already confirmed, project is in stage {}",
                self.stage
            )));
        }
        self.level = Some(level);
        self.advance_stage();
        Ok(())
    }

    /// Merges fields into the profile document, additively.
    ///
    /// Existing keys are overwritten by incoming ones; keys absent from the
    /// incoming map are preserved.
    pub fn merge_profile(&mut self, fields: Document) {
        let profile = self.profile.get_or_insert_with(Document::new);
        for (key, value) in fields {
            profile.insert(key, value);
        }
        self.touch();
    }

    /// Replaces an approved document wholesale.
    ///
    /// The profile is excluded here: it only grows through
    /// [`merge_profile`](Self::merge_profile).
    pub fn set_document(&mut self, kind: DocumentKind, doc: Document) -> Result<(), DomainError> {
        match kind {
            DocumentKind::Profile => {
                return Err(DomainError::validation(
                    "profile is merged additively, not replaced",
                ))
            }
            DocumentKind::Audit => self.audit_result = Some(doc),
            DocumentKind::Strategy => self.strategy = Some(doc),
            DocumentKind::ContentPlan => self.content_plan = Some(doc),
        }
        self.touch();
        Ok(())
    }

    /// Returns a document if the project has accumulated it.
    pub fn document(&self, kind: DocumentKind) -> Option<&Document> {
        match kind {
            DocumentKind::Profile => self.profile.as_ref(),
            DocumentKind::Audit => self.audit_result.as_ref(),
            DocumentKind::Strategy => self.strategy.as_ref(),
            DocumentKind::ContentPlan => self.content_plan.as_ref(),
        }
    }

    /// Caches extracted site text, once.
    ///
    /// Later URLs are ignored: the first extraction wins, matching the
    /// single-site assumption of the workflow.
    pub fn attach_site_content(&mut self, url: impl Into<String>, text: impl Into<String>) -> bool {
        if self.website_content.is_some() {
            return false;
        }
        self.website_url = Some(url.into());
        self.website_content = Some(text.into());
        self.touch();
        true
    }

    /// Schedules the project for purging after the retention window.
    pub fn schedule_deletion(&mut self, after: Timestamp) {
        self.delete_after = Some(after);
        self.touch();
    }

    /// Soft-deactivates the project; data stays until purged.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn new_project_starts_in_onboarding_without_level() {
        let project = Project::new(UserId::from_i64(1), "Bakery");
        assert_eq!(project.stage, WorkflowStage::Onboarding);
        assert_eq!(project.level, None);
        assert!(project.is_active);
        assert!(project.delete_after.is_none());
    }

    #[test]
    fn confirm_level_advances_to_profile() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        project.confirm_level(BusinessLevel::Small).unwrap();
        assert_eq!(project.level, Some(BusinessLevel::Small));
        assert_eq!(project.stage, WorkflowStage::Profile);
    }

    #[test]
    fn confirm_level_rejected_after_onboarding() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        project.confirm_level(BusinessLevel::Micro).unwrap();
        let err = project.confirm_level(BusinessLevel::Medium).unwrap_err();
        assert_eq!(
            err.code,
            crate::domain::foundation::ErrorCode::InvalidStateTransition
        );
        // Level unchanged
        assert_eq!(project.level, Some(BusinessLevel::Micro));
    }

    #[test]
    fn profile_merge_is_additive() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        project.merge_profile(doc(&[("a", json!(1))]));
        project.merge_profile(doc(&[("b", json!(2))]));
        let profile = project.profile.as_ref().unwrap();
        assert_eq!(profile.get("a"), Some(&json!(1)));
        assert_eq!(profile.get("b"), Some(&json!(2)));
    }

    #[test]
    fn profile_merge_overwrites_colliding_keys_and_keeps_unknown_ones() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        project.merge_profile(doc(&[("niche", json!("coffee")), ("x-custom", json!([1, 2]))]));
        project.merge_profile(doc(&[("niche", json!("specialty coffee"))]));
        let profile = project.profile.as_ref().unwrap();
        assert_eq!(profile.get("niche"), Some(&json!("specialty coffee")));
        assert_eq!(profile.get("x-custom"), Some(&json!([1, 2])));
    }

    #[test]
    fn approved_documents_are_replaced_wholesale() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        project
            .set_document(DocumentKind::Strategy, doc(&[("v", json!(1))]))
            .unwrap();
        project
            .set_document(DocumentKind::Strategy, doc(&[("w", json!(2))]))
            .unwrap();
        let strategy = project.document(DocumentKind::Strategy).unwrap();
        assert_eq!(strategy.get("v"), None);
        assert_eq!(strategy.get("w"), Some(&json!(2)));
    }

    #[test]
    fn profile_cannot_be_set_wholesale() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        assert!(project
            .set_document(DocumentKind::Profile, Document::new())
            .is_err());
    }

    #[test]
    fn site_content_attaches_only_once() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        assert!(project.attach_site_content("https://a.example", "first"));
        assert!(!project.attach_site_content("https://b.example", "second"));
        assert_eq!(project.website_url.as_deref(), Some("https://a.example"));
        assert_eq!(project.website_content.as_deref(), Some("first"));
    }

    #[test]
    fn scheduled_deletion_is_recorded() {
        let mut project = Project::new(UserId::from_i64(1), "Bakery");
        let after = Timestamp::now().add_days(180);
        project.schedule_deletion(after);
        assert_eq!(project.delete_after, Some(after));
        assert!(project.is_active);
    }

    proptest! {
        /// No sequence of stage events ever moves a project backward.
        #[test]
        fn stage_is_monotonically_non_decreasing(events in prop::collection::vec(0u8..3, 0..32)) {
            let mut project = Project::new(UserId::from_i64(1), "Bakery");
            let mut last = project.stage.ordinal();
            for event in events {
                match event {
                    0 => { project.advance_stage(); }
                    1 => { let _ = project.confirm_level(BusinessLevel::Micro); }
                    _ => { project.merge_profile(Document::new()); }
                }
                let current = project.stage.ordinal();
                prop_assert!(current >= last);
                prop_assert!(current <= last + 1);
                last = current;
            }
        }
    }
}
