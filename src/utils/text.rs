pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Cuts `text` to `max_chars` characters and appends the truncation marker when it was longer.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let head = take_chars(text, max_chars);
    if head.len() == text.len() {
        text.to_string()
    } else {
        format!("{}{}", head, TRUNCATION_MARKER)
    }
}

pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}
