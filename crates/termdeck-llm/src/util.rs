//! Small string helpers for provider output

/// Longest server message passed through to the user
pub(crate) const MAX_ERROR_LEN: usize = 300;

/// Show only the ends of an API key
///
/// ```
/// use termdeck_llm::util::mask_api_key;
/// assert_eq!(mask_api_key("sk-1234567890abcdef"), "sk-1...cdef");
/// assert_eq!(mask_api_key("short"), "****");
/// ```
#[must_use]
pub fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

/// Longest prefix of `text` within `max_len` bytes that ends on a char boundary
#[must_use]
pub fn truncate_safe(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub(crate) fn truncate_message(message: &str) -> String {
    if message.len() > MAX_ERROR_LEN {
        format!("{}...(truncated)", truncate_safe(message, MAX_ERROR_LEN))
    } else {
        message.to_string()
    }
}
