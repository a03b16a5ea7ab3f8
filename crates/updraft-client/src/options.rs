//! Upload options.

use std::time::Duration;

use http::HeaderMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::retry::RetryPolicy;

/// Options for one upload call.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use updraft_client::UploadOptions;
///
/// let options = UploadOptions::builder()
///     .api("http://localhost:3000/api/upload")
///     .route("images")
///     .retry(2)
///     .retry_delay(Duration::from_millis(500))
///     .build();
/// assert_eq!(options.retry_policy().retries, 2);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct UploadOptions {
    /// Absolute URL of the signed-URL endpoint.
    #[builder(setter(into))]
    pub api: String,
    /// Route name.
    #[builder(setter(into))]
    pub route: String,
    /// Client metadata sent with the request.
    #[builder(default, setter(strip_option))]
    pub metadata: Option<Value>,
    /// Files uploaded concurrently; all at once when unset.
    #[builder(default, setter(strip_option))]
    pub upload_batch_size: Option<usize>,
    /// Parts per multipart file uploaded concurrently; all at once when unset.
    #[builder(default, setter(strip_option))]
    pub multipart_batch_size: Option<usize>,
    /// Extra attempts for each network operation.
    #[builder(default)]
    pub retry: u32,
    /// Pause between attempts.
    #[builder(default)]
    pub retry_delay: Duration,
    /// Extra headers for the signed-URL request, e.g. `Authorization`.
    #[builder(default)]
    pub headers: HeaderMap,
    /// Cancels every in-flight and pending operation.
    #[builder(default)]
    pub signal: CancellationToken,
}

impl UploadOptions {
    /// Retry policy derived from `retry` and `retry_delay`.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry, self.retry_delay)
    }
}
