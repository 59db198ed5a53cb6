//! Language tag canonicalization for the `Accept-Language` header.

use crate::config::DEFAULT_LANGUAGE;

/// Map a language preference to the locale the API understands.
///
/// Persian and English variants collapse to `fa-IR` / `en-US`; an empty tag
/// means the default (`fa-IR`); anything else passes through unchanged.
///
/// ```
/// use apatie_client::locale::resolve_locale;
///
/// assert_eq!(resolve_locale("en-GB"), "en-US");
/// assert_eq!(resolve_locale("FA"), "fa-IR");
/// assert_eq!(resolve_locale("de-DE"), "de-DE");
/// ```
pub fn resolve_locale(language: &str) -> String {
    let trimmed = language.trim();
    if trimmed.is_empty() {
        return DEFAULT_LANGUAGE.to_string();
    }
    let normalized = trimmed.to_ascii_lowercase();
    if normalized.starts_with("fa") {
        return "fa-IR".to_string();
    }
    if normalized.starts_with("en") {
        return "en-US".to_string();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tag_uses_default() {
        assert_eq!(resolve_locale(""), "fa-IR");
        assert_eq!(resolve_locale("   "), "fa-IR");
    }

    #[test]
    fn persian_and_english_variants_collapse() {
        assert_eq!(resolve_locale("fa"), "fa-IR");
        assert_eq!(resolve_locale("fa-AF"), "fa-IR");
        assert_eq!(resolve_locale("en"), "en-US");
        assert_eq!(resolve_locale("EN-gb"), "en-US");
    }

    #[test]
    fn other_tags_pass_through() {
        assert_eq!(resolve_locale("ar-SA"), "ar-SA");
    }
}
