//! HTML handling for outbound text.
//!
//! Telegram renders messages sent with `parse_mode: HTML`. Replies that
//! are not meant as HTML must have `&`, `<`, `>` escaped so user text
//! cannot break rendering.

/// Escape HTML-significant characters unless the text is meant to be
/// sent as HTML.
pub fn escape_unless_html(text: &str, use_html: bool) -> String {
    if use_html {
        return text.to_string();
    }
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Whether the text carries inline b/i/u tags.
pub fn looks_like_html(text: &str) -> bool {
    ["<b>", "<i>", "<u>", "</b>", "</i>", "</u>"]
        .iter()
        .any(|tag| text.contains(tag))
}

/// Strip a leading `/html ` marker (case-insensitive). Returns the rest
/// of the text when the marker is present.
pub fn strip_html_prefix(text: &str) -> Option<&str> {
    let mut chars = text.char_indices();
    let prefix: String = chars.by_ref().take(5).map(|(_, c)| c).collect();
    if !prefix.eq_ignore_ascii_case("/html") {
        return None;
    }
    let rest = &text[5..];
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        // The marker must be followed by whitespace.
        return None;
    }
    Some(trimmed)
}

/// Detect whether inbound text should be treated as HTML, returning the
/// effective text (with the `/html ` marker stripped) and the flag.
pub fn detect_html(text: &str) -> (String, bool) {
    if let Some(rest) = strip_html_prefix(text) {
        return (rest.to_string(), true);
    }
    (text.to_string(), looks_like_html(text))
}
