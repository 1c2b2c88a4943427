//! HTTP site extractor.
//!
//! Fetches a page and reduces it to plain text for the business profile:
//! markup stripped, script and style bodies discarded, whitespace
//! collapsed, output capped. Extraction is best-effort by contract, so
//! every failure degrades to [`ExtractOutcome::Unavailable`] instead of
//! erroring.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::ports::{ExtractOutcome, SiteExtractor};

/// Site extractor over plain HTTP.
pub struct HttpSiteExtractor {
    client: Client,
    max_chars: usize,
}

impl HttpSiteExtractor {
    /// Creates an extractor with the given timeout and output cap.
    pub fn new(timeout: Duration, max_chars: usize) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; marketing-agent/1.0)")
            .build()
            .unwrap_or_default();

        Self { client, max_chars }
    }

    /// Prefixes a scheme when the user typed a bare domain.
    fn normalize_url(url: &str) -> String {
        let trimmed = url.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }
}

#[async_trait]
impl SiteExtractor for HttpSiteExtractor {
    async fn extract(&self, url: &str) -> ExtractOutcome {
        let target = Self::normalize_url(url);

        let response = match self.client.get(&target).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(url = %target, error = %err, "site fetch failed");
                return ExtractOutcome::Unavailable;
            }
        };

        if !response.status().is_success() {
            debug!(url = %target, status = %response.status(), "site returned non-success");
            return ExtractOutcome::Unavailable;
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(err) => {
                debug!(url = %target, error = %err, "site body read failed");
                return ExtractOutcome::Unavailable;
            }
        };

        let text = html_to_text(&html, self.max_chars);
        if text.is_empty() {
            ExtractOutcome::Unavailable
        } else {
            ExtractOutcome::Extracted(text)
        }
    }
}

/// Strips markup down to visible text, capped at `max_chars` characters.
fn html_to_text(html: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut chars = html.char_indices();
    let mut skip_until: Option<&str> = None;
    let mut last_was_space = true;

    while let Some((idx, ch)) = chars.next() {
        if let Some(close_tag) = skip_until {
            // Inside script/style: scan for the closing tag.
            if ch == '<' && starts_with_ignore_case(&html[idx..], close_tag) {
                skip_until = None;
                for _ in 0..close_tag.len() - 1 {
                    chars.next();
                }
            }
            continue;
        }

        if ch == '<' {
            if starts_with_ignore_case(&html[idx..], "<script") {
                skip_until = Some("</script>");
            } else if starts_with_ignore_case(&html[idx..], "<style") {
                skip_until = Some("</style>");
            }
            // Skip to the end of the tag.
            for (_, tag_ch) in chars.by_ref() {
                if tag_ch == '>' {
                    break;
                }
            }
            // Tags act as word boundaries.
            if !last_was_space && !out.is_empty() {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }

        if ch.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }

        if out.chars().count() >= max_chars {
            break;
        }
    }

    let decoded = decode_entities(out.trim());
    decoded.chars().take(max_chars).collect::<String>().trim().to_string()
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .get(..needle.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(needle.as_bytes()))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stripped_and_text_survives() {
        let html = "<html><body><h1>Bakery</h1><p>Fresh bread daily</p></body></html>";
        assert_eq!(html_to_text(html, 8000), "Bakery Fresh bread daily");
    }

    #[test]
    fn script_and_style_bodies_are_discarded() {
        let html = "<p>Visible</p><script>var hidden = 1;</script><style>p { color: red }</style><p>Also visible</p>";
        assert_eq!(html_to_text(html, 8000), "Visible Also visible");
    }

    #[test]
    fn whitespace_collapses() {
        let html = "<div>  Lots \n\n  of\t\tspace  </div>";
        assert_eq!(html_to_text(html, 8000), "Lots of space");
    }

    #[test]
    fn output_is_capped() {
        let html = format!("<p>{}</p>", "x".repeat(20_000));
        let text = html_to_text(&html, 8000);
        assert_eq!(text.chars().count(), 8000);
    }

    #[test]
    fn entities_are_decoded() {
        let html = "<p>Tom &amp; Jerry &mdash; friends&nbsp;forever</p>";
        let text = html_to_text(html, 8000);
        assert!(text.starts_with("Tom & Jerry"));
    }

    #[test]
    fn bare_domains_get_a_scheme() {
        assert_eq!(
            HttpSiteExtractor::normalize_url("example.com"),
            "https://example.com"
        );
        assert_eq!(
            HttpSiteExtractor::normalize_url("http://example.com"),
            "http://example.com"
        );
        assert_eq!(
            HttpSiteExtractor::normalize_url("  https://example.com  "),
            "https://example.com"
        );
    }
}
