//! Workflow stages a project passes through.
//!
//! Stages form a strict forward sequence. A project never skips a stage and
//! never moves backward; `Cycle` is the recurring final stage representing
//! the ongoing weekly operating loop.

use serde::{Deserialize, Serialize};

/// The stage of the marketing workflow a project is currently in.
///
/// Fixed order:
/// `Onboarding → Profile → Audit → Strategy → ContentPlan → Generation → Cycle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Step 0: determine the business level.
    Onboarding,
    /// Step 1: briefing, building the business profile.
    Profile,
    /// Step 2: marketing audit of the current situation.
    Audit,
    /// Step 3: marketing strategy.
    Strategy,
    /// Step 4: content plan.
    ContentPlan,
    /// Step 5: content generation.
    Generation,
    /// Step 6: the recurring weekly operating loop.
    Cycle,
}

impl WorkflowStage {
    /// All stages in workflow order.
    pub const ALL: [WorkflowStage; 7] = [
        WorkflowStage::Onboarding,
        WorkflowStage::Profile,
        WorkflowStage::Audit,
        WorkflowStage::Strategy,
        WorkflowStage::ContentPlan,
        WorkflowStage::Generation,
        WorkflowStage::Cycle,
    ];

    /// Returns the position of this stage in the fixed sequence.
    pub fn ordinal(&self) -> u8 {
        match self {
            WorkflowStage::Onboarding => 0,
            WorkflowStage::Profile => 1,
            WorkflowStage::Audit => 2,
            WorkflowStage::Strategy => 3,
            WorkflowStage::ContentPlan => 4,
            WorkflowStage::Generation => 5,
            WorkflowStage::Cycle => 6,
        }
    }

    /// Returns the stage that follows this one.
    ///
    /// `Cycle` repeats indefinitely: its successor is itself.
    pub fn next(&self) -> WorkflowStage {
        match self {
            WorkflowStage::Onboarding => WorkflowStage::Profile,
            WorkflowStage::Profile => WorkflowStage::Audit,
            WorkflowStage::Audit => WorkflowStage::Strategy,
            WorkflowStage::Strategy => WorkflowStage::ContentPlan,
            WorkflowStage::ContentPlan => WorkflowStage::Generation,
            WorkflowStage::Generation => WorkflowStage::Cycle,
            WorkflowStage::Cycle => WorkflowStage::Cycle,
        }
    }

    /// Returns true once the project is in the recurring weekly loop.
    pub fn is_recurring(&self) -> bool {
        matches!(self, WorkflowStage::Cycle)
    }

    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Onboarding => "onboarding",
            WorkflowStage::Profile => "profile",
            WorkflowStage::Audit => "audit",
            WorkflowStage::Strategy => "strategy",
            WorkflowStage::ContentPlan => "content_plan",
            WorkflowStage::Generation => "generation",
            WorkflowStage::Cycle => "cycle",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Option<WorkflowStage> {
        match s {
            "onboarding" => Some(WorkflowStage::Onboarding),
            "profile" => Some(WorkflowStage::Profile),
            "audit" => Some(WorkflowStage::Audit),
            "strategy" => Some(WorkflowStage::Strategy),
            "content_plan" => Some(WorkflowStage::ContentPlan),
            "generation" => Some(WorkflowStage::Generation),
            "cycle" => Some(WorkflowStage::Cycle),
            _ => None,
        }
    }

    /// Short label for operator-facing output.
    pub fn label(&self) -> &'static str {
        match self {
            WorkflowStage::Onboarding => "Onboarding",
            WorkflowStage::Profile => "Profile",
            WorkflowStage::Audit => "Audit",
            WorkflowStage::Strategy => "Strategy",
            WorkflowStage::ContentPlan => "Content plan",
            WorkflowStage::Generation => "Generation",
            WorkflowStage::Cycle => "Weekly cycle",
        }
    }
}

impl Default for WorkflowStage {
    fn default() -> Self {
        Self::Onboarding
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stage_is_onboarding() {
        assert_eq!(WorkflowStage::default(), WorkflowStage::Onboarding);
    }

    #[test]
    fn next_walks_the_full_sequence() {
        let mut stage = WorkflowStage::Onboarding;
        let mut visited = vec![stage];
        while !stage.is_recurring() {
            stage = stage.next();
            visited.push(stage);
        }
        assert_eq!(visited, WorkflowStage::ALL.to_vec());
    }

    #[test]
    fn cycle_repeats_indefinitely() {
        assert_eq!(WorkflowStage::Cycle.next(), WorkflowStage::Cycle);
    }

    #[test]
    fn ordinals_are_strictly_increasing_along_next() {
        for stage in WorkflowStage::ALL {
            if !stage.is_recurring() {
                assert_eq!(stage.next().ordinal(), stage.ordinal() + 1);
            }
        }
    }

    #[test]
    fn serializes_to_snake_case() {
        let json = serde_json::to_string(&WorkflowStage::ContentPlan).unwrap();
        assert_eq!(json, "\"content_plan\"");
    }

    #[test]
    fn storage_strings_round_trip() {
        for stage in WorkflowStage::ALL {
            assert_eq!(WorkflowStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(WorkflowStage::parse("unknown"), None);
    }
}
