//! Application services.
//!
//! The turn handler drives the conversation flow; the lifecycle service
//! governs registration, quotas, payment events, retention, and erasure.

mod delivery;
mod lifecycle;
mod turn;

pub use delivery::split_for_delivery;
pub use lifecycle::{LifecyclePolicy, LifecycleService, PaymentEvent};
pub use turn::{ProjectLocks, TurnCommand, TurnEvent, TurnHandler, TurnOutcome};
