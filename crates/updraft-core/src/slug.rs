//! File-name slugs and default object keys.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

/// Slug used when nothing of the name survives.
const EMPTY_SLUG: &str = "file";

/// Turn a file name into a URL-safe slug.
///
/// The name is NFD-normalized with combining marks stripped, lower-cased and
/// trimmed. Every run of characters outside `[a-z0-9.]` becomes a single
/// `-`, and hyphens at either end are dropped.
///
/// # Examples
///
/// ```
/// use updraft_core::slug::create_slug;
///
/// assert_eq!(create_slug("Résumé Final.PDF"), "resume-final.pdf");
/// assert_eq!(create_slug("  my--photo  .jpg"), "my-photo-.jpg");
/// ```
#[must_use]
pub fn create_slug(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let mut slug = String::with_capacity(folded.len());
    let mut pending_separator = false;
    for c in folded.trim().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    if slug.is_empty() {
        EMPTY_SLUG.to_owned()
    } else {
        slug
    }
}

/// Default object key for a file: `{uuid-v4}-{slug}`.
#[must_use]
pub fn default_object_key(name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), create_slug(name))
}
