//! Content-type allow lists.

/// Whether `content_type` is permitted by `allowed`.
///
/// An empty list allows everything. Entries match the exact string,
/// `type/*` matches any subtype of `type`, and `*` or `*/*` match anything.
///
/// # Examples
///
/// ```
/// use updraft_core::file_type::is_file_type_allowed;
///
/// let allowed = vec!["image/*".to_owned(), "application/pdf".to_owned()];
/// assert!(is_file_type_allowed("image/png", &allowed));
/// assert!(is_file_type_allowed("application/pdf", &allowed));
/// assert!(!is_file_type_allowed("video/mp4", &allowed));
/// ```
#[must_use]
pub fn is_file_type_allowed(content_type: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    allowed.iter().any(|pattern| {
        if pattern == "*" || pattern == "*/*" {
            return true;
        }
        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') => content_type.starts_with(prefix),
            _ => content_type == pattern,
        }
    })
}
