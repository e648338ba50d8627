//! Small text helpers shared by the generation services.

/// Turn a `SCREAMING_SNAKE` placeholder token into readable lowercase text:
/// `CTA_BUTTON` becomes `cta button`.
pub fn humanize_token(token: &str) -> String {
    token.replace('_', " ").trim().to_lowercase()
}

/// Truncate to at most `max` characters, for log previews of model output.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
