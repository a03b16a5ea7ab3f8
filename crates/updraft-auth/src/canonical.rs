//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request format is:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Unlike a verifier, which must reproduce whatever encoding the client used,
//! the signing side owns the encoding. Object keys and query values are taken
//! as raw text and encoded exactly once.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unencoded: `A-Z`, `a-z`, `0-9`, `-`, `_`, `.`, `~`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the full canonical request string from already-canonical components.
///
/// # Examples
///
/// ```
/// use updraft_auth::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "GET",
///     "/test.txt",
///     "",
///     &[("host", "examplebucket.s3.amazonaws.com")],
///     &["host"],
///     "UNSIGNED-PAYLOAD",
/// );
/// assert!(canonical.starts_with("GET\n/test.txt\n"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &[(&str, &str)],
    signed_headers: &[&str],
    payload_hash: &str,
) -> String {
    let canonical_headers = build_canonical_headers(headers, signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);

    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Build the canonical URI by URI-encoding each raw path segment.
///
/// Forward slashes are preserved and empty segments are kept, so an object key
/// such as `a//b` stays distinct from `a/b`. Empty paths are normalized to `/`.
///
/// # Examples
///
/// ```
/// use updraft_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/photos/my cat.png"), "/photos/my%20cat.png");
/// assert_eq!(build_canonical_uri("/100%.txt"), "/100%25.txt");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Build the canonical query string from raw (unencoded) parameters.
///
/// Keys and values are encoded first, then sorted by encoded key and value.
/// A parameter with an empty value renders as `key=`.
///
/// # Examples
///
/// ```
/// use updraft_auth::canonical::build_canonical_query_string;
///
/// let params = vec![
///     ("uploadId".to_owned(), "a/b".to_owned()),
///     ("partNumber".to_owned(), "2".to_owned()),
/// ];
/// assert_eq!(build_canonical_query_string(&params), "partNumber=2&uploadId=a%2Fb");
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();

    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string from the request headers.
///
/// Only headers listed in `signed_headers` are included. Header names are lowercased,
/// values are trimmed and inner whitespace is collapsed to a single space. Headers
/// are sorted by name. The result has no trailing newline.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)], signed_headers: &[&str]) -> String {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_lowercase();
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let mut sorted_signed: Vec<&str> = signed_headers.to_vec();
    sorted_signed.sort_unstable();

    sorted_signed
        .iter()
        .filter_map(|name| header_map.get(*name).map(|value| format!("{name}:{value}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string as a sorted, semicolon-separated list.
///
/// # Examples
///
/// ```
/// use updraft_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(&["content-type", "host", "content-length"]),
///     "content-length;content-type;host"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string(signed_headers: &[&str]) -> String {
    let mut sorted: Vec<&str> = signed_headers.to_vec();
    sorted.sort_unstable();
    sorted.join(";")
}

/// URI-encode a string using the SigV4 unreserved set.
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
