//! Stage and level instruction templates.
//!
//! Each workflow stage has a directive describing what the agent should do
//! in that stage; the confirmed business level adds a scaling note. The
//! context builder composes these with the project's accumulated documents.

use crate::domain::project::{BusinessLevel, WorkflowStage};

/// Shared persona header for every stage.
const PERSONA: &str = "You are a hands-on marketing director working with one \
business owner over chat. You speak plainly, in the user's language, ask one \
question at a time, and always move the work toward the next concrete \
deliverable.";

/// Returns the agent's primary directive for a stage.
pub fn stage_directive(stage: WorkflowStage) -> &'static str {
    match stage {
        WorkflowStage::Onboarding => {
            "Determine the size of the business. Ask about headcount, whether \
             there is a dedicated marketer, and approximate monthly revenue. \
             Propose a level (micro, small, or medium) and ask the user to \
             confirm it."
        }
        WorkflowStage::Profile => {
            "Run the briefing. Gather the business profile step by step: \
             niche, product, audience, geography, current channels, budget. \
             Summarize what you learn into the profile as you go."
        }
        WorkflowStage::Audit => {
            "Audit the current marketing. Walk through channels, positioning, \
             funnel, and numbers the user can provide. Finish with a short \
             written audit the user approves."
        }
        WorkflowStage::Strategy => {
            "Draft the marketing strategy from the approved audit: goals, \
             positioning, channel mix, budget split. Iterate until the user \
             approves the strategy document."
        }
        WorkflowStage::ContentPlan => {
            "Build a content plan from the approved strategy: formats, \
             topics, cadence per channel for the next month. Iterate until \
             the user approves it."
        }
        WorkflowStage::Generation => {
            "Generate the actual content from the approved plan: posts, ad \
             copy, creatives briefs. Deliver items one at a time for review."
        }
        WorkflowStage::Cycle => {
            "Run the weekly operating loop: review last week's results, \
             adjust the plan, generate this week's content, and set the \
             priorities for the coming week."
        }
    }
}

/// Returns the scaling note for a confirmed level, if any.
pub fn level_note(level: Option<BusinessLevel>) -> Option<&'static str> {
    match level? {
        BusinessLevel::Micro => Some(
            "The business is micro (1-3 people, up to 500k RUB/month). Keep \
             recommendations cheap, owner-executable, and limited to one or \
             two channels.",
        ),
        BusinessLevel::Small => Some(
            "The business is small (5-20 people, 500k-5M RUB/month). Assume \
             a modest budget and at most one person who can spend part-time \
             on marketing.",
        ),
        BusinessLevel::Medium => Some(
            "The business is medium (20-100 people, 5-50M RUB/month). Assume \
             a real budget, several channels in parallel, and a team that \
             can execute delegated tasks.",
        ),
    }
}

/// Composes the base instruction block for a stage and level.
pub fn instruction_template(stage: WorkflowStage, level: Option<BusinessLevel>) -> String {
    let mut out = String::from(PERSONA);
    out.push_str("\n\n## Current step\n");
    out.push_str(stage_directive(stage));
    if let Some(note) = level_note(level) {
        out.push_str("\n\n## Business level\n");
        out.push_str(note);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_a_directive() {
        for stage in WorkflowStage::ALL {
            assert!(!stage_directive(stage).is_empty());
        }
    }

    #[test]
    fn template_without_level_omits_the_level_section() {
        let text = instruction_template(WorkflowStage::Onboarding, None);
        assert!(text.contains("## Current step"));
        assert!(!text.contains("## Business level"));
    }

    #[test]
    fn template_with_level_appends_the_note() {
        let text = instruction_template(WorkflowStage::Strategy, Some(BusinessLevel::Micro));
        assert!(text.contains("## Business level"));
        assert!(text.contains("micro"));
    }
}
