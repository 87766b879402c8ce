//! Conversation title generation.

/// Title used when the first message has no visible text.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Derive a conversation title from its first user message.
///
/// Counts characters rather than bytes, so multi-byte text is never split.
pub fn conversation_title(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return DEFAULT_TITLE.to_string();
    }

    match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(conversation_title("Quarterly review", 30), "Quarterly review");
    }

    #[test]
    fn test_exactly_max_not_truncated() {
        let text = "a".repeat(30);
        assert_eq!(conversation_title(&text, 30), text);
    }

    #[test]
    fn test_long_text_truncated_with_ellipsis() {
        let text = "Summarise the architecture slides from last week please";
        let title = conversation_title(text, 30);
        assert_eq!(title, "Summarise the architecture sli...");
        assert_eq!(title.chars().count(), 33);
    }

    #[test]
    fn test_whitespace_trimmed_first() {
        assert_eq!(conversation_title("   hello   ", 30), "hello");
    }

    #[test]
    fn test_empty_text_defaults() {
        assert_eq!(conversation_title("", 30), DEFAULT_TITLE);
        assert_eq!(conversation_title(" \n\t ", 30), DEFAULT_TITLE);
    }

    #[test]
    fn test_multibyte_characters_counted_once() {
        let text = "é".repeat(31);
        let title = conversation_title(&text, 30);
        assert_eq!(title, format!("{}...", "é".repeat(30)));
    }
}
