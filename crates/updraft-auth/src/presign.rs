//! Query-string presigning (SigV4 with `UNSIGNED-PAYLOAD`).
//!
//! A presigned URL carries the whole authorization in its query string:
//! `X-Amz-Algorithm`, `X-Amz-Credential`, `X-Amz-Date`, `X-Amz-Expires`,
//! `X-Amz-SignedHeaders`, and finally `X-Amz-Signature`. The bearer must send
//! every signed header with exactly the signed value.

use chrono::{DateTime, Utc};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::addressing::ObjectAddress;
use crate::canonical::{
    build_canonical_query_string, build_canonical_request, build_canonical_uri,
};
use crate::credentials::StoreCredentials;
use crate::error::SignError;
use crate::sigv4::{ALGORITHM, build_string_to_sign, compute_signature, derive_signing_key, hash_hex};

/// Payload hash used for every presigned URL; the body is not known at signing time.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Service name in the credential scope.
pub const SERVICE: &str = "s3";

/// Longest expiry SigV4 allows, in seconds (7 days).
pub const MAX_EXPIRES_IN: u64 = 604_800;

/// A request to presign.
#[derive(Debug, Clone, TypedBuilder)]
pub struct PresignRequest {
    /// HTTP method the bearer will use.
    pub method: http::Method,
    /// Where the object lives.
    pub address: ObjectAddress,
    /// Extra raw query parameters, e.g. `partNumber` or `x-amz-meta-*`.
    #[builder(default)]
    pub query: Vec<(String, String)>,
    /// Headers to sign in addition to `host`. Names are lowercased when signing.
    #[builder(default)]
    pub headers: Vec<(String, String)>,
    /// Validity window in seconds.
    pub expires_in: u64,
}

/// A signed URL plus the intermediate values that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The URL to hand to the bearer.
    pub url: String,
    /// The canonical request that was signed.
    pub canonical_request: String,
    /// Hex-encoded signature.
    pub signature: String,
}

/// Presign `request` with `credentials` as of `now`.
///
/// # Errors
///
/// Returns [`SignError::MissingValue`] if a credential component is empty and
/// [`SignError::InvalidExpiry`] if `expires_in` is zero or above [`MAX_EXPIRES_IN`].
pub fn presign(
    credentials: &StoreCredentials,
    request: &PresignRequest,
    now: DateTime<Utc>,
) -> Result<PresignedUrl, SignError> {
    credentials.validate()?;
    if request.expires_in == 0 || request.expires_in > MAX_EXPIRES_IN {
        return Err(SignError::InvalidExpiry(request.expires_in));
    }

    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let credential_scope = format!("{date}/{}/{SERVICE}/aws4_request", credentials.region);

    let mut header_pairs: Vec<(String, String)> =
        Vec::with_capacity(request.headers.len() + 1);
    header_pairs.push(("host".to_owned(), request.address.host.clone()));
    header_pairs.extend(
        request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("host"))
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone())),
    );

    let mut signed_names: Vec<&str> = header_pairs.iter().map(|(n, _)| n.as_str()).collect();
    signed_names.sort_unstable();
    signed_names.dedup();
    let signed_headers = signed_names.join(";");

    let mut query = request.query.clone();
    query.extend([
        ("X-Amz-Algorithm".to_owned(), ALGORITHM.to_owned()),
        (
            "X-Amz-Credential".to_owned(),
            format!("{}/{credential_scope}", credentials.access_key_id),
        ),
        ("X-Amz-Date".to_owned(), timestamp.clone()),
        ("X-Amz-Expires".to_owned(), request.expires_in.to_string()),
        ("X-Amz-SignedHeaders".to_owned(), signed_headers),
    ]);

    let canonical_uri = build_canonical_uri(&request.address.path);
    let canonical_query = build_canonical_query_string(&query);
    let header_refs: Vec<(&str, &str)> = header_pairs
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();

    let canonical_request = build_canonical_request(
        request.method.as_str(),
        &canonical_uri,
        &canonical_query,
        &header_refs,
        &signed_names,
        UNSIGNED_PAYLOAD,
    );

    let string_to_sign = build_string_to_sign(
        &timestamp,
        &credential_scope,
        &hash_hex(canonical_request.as_bytes()),
    );
    let signing_key = derive_signing_key(
        &credentials.secret_access_key,
        &date,
        &credentials.region,
        SERVICE,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    debug!(
        method = %request.method,
        host = %request.address.host,
        path = %request.address.path,
        expires_in = request.expires_in,
        "Presigned object URL"
    );

    let url = format!(
        "{}{canonical_uri}?{canonical_query}&X-Amz-Signature={signature}",
        request.address.origin()
    );

    Ok(PresignedUrl {
        url,
        canonical_request,
        signature,
    })
}
