//! Ports: interfaces to external collaborators.

mod extractor;
mod model;
mod store;

pub use extractor::{ExtractOutcome, SiteExtractor};
pub use model::{
    ChatMessage, ChunkStream, CompletionRequest, CompletionResponse, ModelError, ModelProvider,
    StreamChunk, TokenUsage,
};
pub use store::{ProjectStore, StoreError, SubscriptionStore, UserStore};
