//! Site extractor port.
//!
//! Best-effort text extraction from a URL the user shared. Extraction never
//! fails a turn: anything that goes wrong degrades to `Unavailable` and the
//! conversation continues without the site text.

use async_trait::async_trait;

/// Result of a site extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Cleaned page text, capped by the adapter.
    Extracted(String),
    /// The page could not be fetched or yielded nothing usable.
    Unavailable,
}

impl ExtractOutcome {
    /// Returns the extracted text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ExtractOutcome::Extracted(text) => Some(text),
            ExtractOutcome::Unavailable => None,
        }
    }
}

/// Port for website text extraction.
#[async_trait]
pub trait SiteExtractor: Send + Sync {
    /// Extracts readable text from a URL, within a bounded timeout.
    async fn extract(&self, url: &str) -> ExtractOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_exposes_text_only_when_extracted() {
        assert_eq!(ExtractOutcome::Extracted("hi".into()).text(), Some("hi"));
        assert_eq!(ExtractOutcome::Unavailable.text(), None);
    }
}
