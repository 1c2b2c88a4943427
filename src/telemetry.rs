//! Tracing setup for embedding binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs the global tracing subscriber.
///
/// Honors `RUST_LOG` when set and defaults to info-level output for this
/// crate otherwise. Call once from the embedding binary at startup; the
/// library itself only emits events.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketing_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_a_global_subscriber() {
        init_tracing();
        tracing::info!("subscriber installed");
    }
}
