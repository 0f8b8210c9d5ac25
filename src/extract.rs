//! Imgur identifier extraction from free-form input.

use std::sync::LazyLock;

use regex::Regex;

/// Leading bare identifier, with or without a trailing extension.
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9]{5,7})").expect("invalid bare id regex"));

/// Hosted URL with an optional album, gallery, or single tag path prefix.
static HOSTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:i\.)?imgur\.(?:com|io)/(?:a/|gallery/|t/[^/]+/)?([A-Za-z0-9]{5,7})")
        .expect("invalid hosted url regex")
});

/// Extract a 5-7 character Imgur identifier from a bare ID, an `ID.ext`
/// shorthand, or an imgur.com / imgur.io URL.
///
/// A leading ID-shaped run only counts when the input carries no imgur domain
/// marker; a full URL whose scheme or path happens to start with something
/// ID-shaped must go through the hosted pattern instead.
#[must_use]
pub fn extract_id(input: &str) -> Option<String> {
    let trimmed = input.trim();

    if let Some(captures) = BARE_ID.captures(trimmed) {
        if !trimmed.contains("imgur.com") && !trimmed.contains("imgur.io") {
            return Some(captures[1].to_string());
        }
    }

    HOSTED_URL
        .captures(trimmed)
        .map(|captures| captures[1].to_string())
}
