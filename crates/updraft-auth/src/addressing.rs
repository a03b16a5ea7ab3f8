//! Object addressing: path-style versus virtual-hosted URLs.
//!
//! Path-style (`{endpoint}/{bucket}/{key}`) is used for local endpoints,
//! vendors that require it, and buckets whose names contain dots (which would
//! break TLS wildcard certificates). Everything else is virtual-hosted
//! (`{bucket}.{endpoint-host}/{key}`).

use crate::credentials::StoreCredentials;
use crate::error::SignError;

/// Endpoint host fragments that force path-style addressing.
const PATH_STYLE_HOSTS: &[&str] = &["localhost", "127.0.0.1", "minio", "r2.cloudflarestorage.com"];

/// URL scheme, taken from the configured endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain HTTP, used by local development stores.
    Http,
    /// HTTPS.
    Https,
}

impl Scheme {
    /// The scheme as it appears in a URL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

/// The scheme, host, and raw (unencoded) path of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAddress {
    /// URL scheme.
    pub scheme: Scheme,
    /// Host, including a port when the endpoint carries one.
    pub host: String,
    /// Raw path beginning with `/`.
    pub path: String,
}

impl ObjectAddress {
    /// Resolve where `key` in `bucket` lives for the given store.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidAddress`] for an empty bucket or key and
    /// [`SignError::InvalidEndpoint`] if the endpoint has no host.
    ///
    /// # Examples
    ///
    /// ```
    /// use updraft_auth::addressing::ObjectAddress;
    /// use updraft_auth::credentials::StoreCredentials;
    ///
    /// let creds = StoreCredentials::builder()
    ///     .access_key_id("AKID")
    ///     .secret_access_key("secret")
    ///     .region("us-east-1")
    ///     .endpoint("https://s3.us-east-1.amazonaws.com")
    ///     .build();
    /// let address = ObjectAddress::for_object(&creds, "photos", "cat.png").unwrap();
    /// assert_eq!(address.host, "photos.s3.us-east-1.amazonaws.com");
    /// assert_eq!(address.path, "/cat.png");
    /// ```
    pub fn for_object(
        credentials: &StoreCredentials,
        bucket: &str,
        key: &str,
    ) -> Result<Self, SignError> {
        if bucket.is_empty() {
            return Err(SignError::InvalidAddress("bucket name is empty"));
        }
        if key.is_empty() {
            return Err(SignError::InvalidAddress("object key is empty"));
        }

        let (scheme, endpoint_host) = split_endpoint(&credentials.endpoint)?;

        if credentials.force_path_style || uses_path_style(endpoint_host, bucket) {
            Ok(Self {
                scheme,
                host: endpoint_host.to_owned(),
                path: format!("/{bucket}/{key}"),
            })
        } else {
            Ok(Self {
                scheme,
                host: format!("{bucket}.{endpoint_host}"),
                path: format!("/{key}"),
            })
        }
    }

    /// The URL origin, e.g. `https://bucket.s3.amazonaws.com`.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.host)
    }
}

/// Whether requests for `bucket` at `endpoint_host` must use path-style addressing.
#[must_use]
pub fn uses_path_style(endpoint_host: &str, bucket: &str) -> bool {
    let host = endpoint_host.to_ascii_lowercase();
    bucket.contains('.') || PATH_STYLE_HOSTS.iter().any(|fragment| host.contains(fragment))
}

/// Split an endpoint into its scheme and host. An endpoint without a scheme is
/// treated as HTTPS. Any path after the host is ignored.
fn split_endpoint(endpoint: &str) -> Result<(Scheme, &str), SignError> {
    let trimmed = endpoint.trim();
    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("https://") {
        (Scheme::Https, rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        (Scheme::Http, rest)
    } else {
        (Scheme::Https, trimmed)
    };

    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(SignError::InvalidEndpoint(endpoint.to_owned()));
    }
    Ok((scheme, host))
}
