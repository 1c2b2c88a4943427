//! Adapter implementations of the ports.
//!
//! Concrete integrations: Anthropic API for completions, PostgreSQL for
//! storage, plain HTTP for site extraction, plus in-memory and mock
//! implementations for tests.

pub mod anthropic;
pub mod extractor;
pub mod memory;
pub mod mock;
pub mod postgres;
pub mod retry;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use extractor::HttpSiteExtractor;
pub use memory::MemoryStore;
pub use mock::MockModelProvider;
pub use postgres::{PostgresProjectStore, PostgresSubscriptionStore, PostgresUserStore};
pub use retry::{Retrying, RetryPolicy};
