//! Context assembly and instruction templates.

mod context;
mod prompts;

pub use context::{ContextBuilder, SITE_PREVIEW_CHARS};
pub use prompts::{instruction_template, level_note, stage_directive};
