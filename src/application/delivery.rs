//! Reply chunking for length-limited transports.

/// Splits text into chunks of at most `max_chars` characters.
///
/// The split is a hard boundary count in characters, never inside a code
/// point. Empty text yields no chunks.
pub fn split_for_delivery(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() || max_chars == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_stays_whole() {
        assert_eq!(split_for_delivery("привет", 4000), vec!["привет"]);
    }

    #[test]
    fn long_text_splits_at_the_boundary() {
        let text = "a".repeat(9000);
        let chunks = split_for_delivery(&text, 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[1].chars().count(), 4000);
        assert_eq!(chunks[2].chars().count(), 1000);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn boundaries_count_characters_not_bytes() {
        let text = "ф".repeat(4001);
        let chunks = split_for_delivery(&text, 4000);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[1], "ф");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_for_delivery("", 4000).is_empty());
    }
}
