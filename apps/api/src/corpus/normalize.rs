//! Skill-text normalization shared by corpus building and query vectorization.
//!
//! Both sides must go through the same functions, otherwise build-time and
//! query-time vectors for identical text diverge.

/// Lowercases, replaces commas with spaces and trims.
pub fn normalize_skills(text: &str) -> String {
    text.to_lowercase().replace(',', " ").trim().to_string()
}

/// Whitespace tokens of already-normalized text.
pub fn tokenize(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

/// Returns the trimmed value, or `None` when it is missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
