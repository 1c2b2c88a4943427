//! Conversation messages.
//!
//! A message records one side of a turn. Messages are immutable once
//! created, ordered by creation time, and deleted only with their project.

use serde::{Deserialize, Serialize};

use super::WorkflowStage;
use crate::domain::foundation::{MessageId, ProjectId, Timestamp};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// End-user input.
    User,
    /// Model reply.
    Assistant,
}

impl MessageRole {
    /// Stable string form used for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Parses the storage string form.
    pub fn parse(s: &str) -> Option<MessageRole> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// A persisted conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique id of this message.
    pub id: MessageId,
    /// The owning project. Non-owning back-reference: the message never
    /// keeps the project alive.
    pub project_id: ProjectId,
    /// Who produced the message.
    pub role: MessageRole,
    /// Text content.
    pub content: String,
    /// Workflow stage active when the message was produced.
    pub stage: WorkflowStage,
    /// Prompt tokens consumed producing this message (0 for user turns).
    pub input_tokens: u32,
    /// Completion tokens consumed producing this message (0 for user turns).
    pub output_tokens: u32,
    /// When the message was created.
    pub created_at: Timestamp,
}

impl StoredMessage {
    /// Creates a user message for the given project and stage.
    pub fn user(project_id: ProjectId, stage: WorkflowStage, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            project_id,
            role: MessageRole::User,
            content: content.into(),
            stage,
            input_tokens: 0,
            output_tokens: 0,
            created_at: Timestamp::now(),
        }
    }

    /// Creates an assistant message with token accounting.
    pub fn assistant(
        project_id: ProjectId,
        stage: WorkflowStage,
        content: impl Into<String>,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Self {
        Self {
            id: MessageId::new(),
            project_id,
            role: MessageRole::Assistant,
            content: content.into(),
            stage,
            input_tokens,
            output_tokens,
            created_at: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_carry_no_token_counts() {
        let msg = StoredMessage::user(ProjectId::new(), WorkflowStage::Profile, "hi");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.input_tokens, 0);
        assert_eq!(msg.output_tokens, 0);
    }

    #[test]
    fn assistant_messages_record_usage() {
        let msg = StoredMessage::assistant(ProjectId::new(), WorkflowStage::Audit, "ok", 120, 45);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.input_tokens, 120);
        assert_eq!(msg.output_tokens, 45);
        assert_eq!(msg.stage, WorkflowStage::Audit);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
    }

    #[test]
    fn role_storage_strings_round_trip() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("assistant"), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("system"), None);
    }
}
