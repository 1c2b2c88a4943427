//! Context assembly for model invocations.
//!
//! Rebuilds the model's working memory on every turn from stored state: the
//! stage/level instruction block with the project's documents injected, plus
//! a bounded window of recent messages. Pure data in, pure data out; the
//! caller appends the new user turn before invoking the model.

use serde_json::Value;

use super::prompts::instruction_template;
use crate::domain::project::{Document, DocumentKind, Project, StoredMessage};

/// How many characters of extracted site text are injected into the prompt.
pub const SITE_PREVIEW_CHARS: usize = 2000;

/// Assembles the model-facing context for a project.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    /// Most recent messages included in the prompt. Older turns are silently
    /// dropped from the prompt, never from storage: a deliberate lossy
    /// window that bounds cost and latency.
    max_messages: usize,
}

impl ContextBuilder {
    /// Creates a builder with the given turn-history window.
    pub fn new(max_messages: usize) -> Self {
        Self { max_messages }
    }

    /// Renders the instruction block for the project's current stage.
    ///
    /// The stage/level template is followed, in fixed order, by the profile,
    /// the approved audit, the approved strategy, and a truncated preview of
    /// the extracted site text. Missing documents are omitted entirely, so
    /// identical stored state always renders byte-identical output.
    pub fn instructions(&self, project: &Project) -> String {
        let mut out = instruction_template(project.stage, project.level);

        let mut sections: Vec<String> = Vec::new();
        if let Some(profile) = project.document(DocumentKind::Profile) {
            sections.push(labeled_json_block("Current business profile", profile));
        }
        if let Some(audit) = project.document(DocumentKind::Audit) {
            sections.push(labeled_json_block("Approved audit", audit));
        }
        if let Some(strategy) = project.document(DocumentKind::Strategy) {
            sections.push(labeled_json_block("Approved strategy", strategy));
        }
        if let Some(site) = project.website_content.as_deref() {
            sections.push(format!(
                "## Website content (extracted automatically)\n{}",
                truncate_chars(site, SITE_PREVIEW_CHARS)
            ));
        }

        if !sections.is_empty() {
            out.push_str("\n\n---\n\n");
            out.push_str(&sections.join("\n\n"));
        }
        out
    }

    /// Returns the turn-history window: the most recent `max_messages`
    /// entries, oldest-first.
    pub fn window<'a>(&self, messages: &'a [StoredMessage]) -> &'a [StoredMessage] {
        let start = messages.len().saturating_sub(self.max_messages);
        &messages[start..]
    }
}

fn labeled_json_block(label: &str, doc: &Document) -> String {
    // Document maps preserve insertion order, so rendering is deterministic.
    let json = serde_json::to_string_pretty(&Value::Object(doc.clone()))
        .unwrap_or_else(|_| "{}".to_string());
    format!("## {label}\n```json\n{json}\n```")
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
