//! The Project aggregate and its value objects.

mod level;
mod message;
mod project;
mod stage;

pub use level::BusinessLevel;
pub use message::{MessageRole, StoredMessage};
pub use project::{Document, DocumentKind, Project};
pub use stage::WorkflowStage;
