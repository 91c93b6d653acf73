//! Tolerant JSON extraction from model output
//!
//! Models wrap JSON in Markdown fences or prose more often than not.
//! `extract_json` locates the outermost object and parses it; schema
//! validation happens at the trait layer.

/// Extract the outermost JSON object from free-form model output.
///
/// Returns `None` when no parseable object is present.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let text = strip_fences(text);

    // Fast path: the whole payload is JSON.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text.trim()) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }

    // Otherwise slice from the first opening brace to the last closing one.
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}
