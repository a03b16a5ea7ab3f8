//! Multipart session initiation and part planning.
//!
//! Opening a session, and aborting it when the request fails afterwards, are
//! the only store calls the server makes itself. The default
//! [`StoreMultipartInitiator`] presigns `POST /{key}?uploads` (and
//! `DELETE /{key}?uploadId=`) and sends it; tests and alternative transports
//! plug in their own [`MultipartInitiator`].

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};
use updraft_auth::{ObjectAddress, PresignRequest, StoreCredentials, presign};
use updraft_xml::{InitiateMultipartUploadResult, S3ErrorDocument, from_xml};

use crate::config::INITIATE_SIGNED_URL_EXPIRES_IN;
use crate::error::IssueError;
use crate::object::ResolvedObject;

/// Opens multipart sessions.
#[async_trait]
pub trait MultipartInitiator: Send + Sync {
    /// Open a session for `object` in `bucket` and return its upload id.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError`] if the store refuses or cannot be reached.
    async fn initiate(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object: &ResolvedObject,
    ) -> Result<String, IssueError>;

    /// Abort the session `upload_id` previously opened for `object`.
    ///
    /// # Errors
    ///
    /// Returns [`IssueError`] if the store refuses or cannot be reached.
    async fn abort(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object: &ResolvedObject,
        upload_id: &str,
    ) -> Result<(), IssueError>;
}

/// Initiates sessions over HTTP with a presigned `POST ?uploads`.
#[derive(Debug, Clone, Default)]
pub struct StoreMultipartInitiator {
    client: reqwest::Client,
}

impl StoreMultipartInitiator {
    /// Create an initiator using `client`.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MultipartInitiator for StoreMultipartInitiator {
    async fn initiate(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object: &ResolvedObject,
    ) -> Result<String, IssueError> {
        let address = ObjectAddress::for_object(credentials, bucket, &object.key)?;

        let mut query = vec![("uploads".to_owned(), String::new())];
        query.extend(object.amz_query_params());

        let request = PresignRequest::builder()
            .method(http::Method::POST)
            .address(address)
            .query(query)
            .expires_in(INITIATE_SIGNED_URL_EXPIRES_IN)
            .build();
        let signed = presign(credentials, &request, Utc::now())?;

        let failure = |message: String| IssueError::MultipartInitiation {
            key: object.key.clone(),
            message,
        };

        let mut http_request = self
            .client
            .post(&signed.url)
            .header(http::header::CONTENT_TYPE, &object.content_type);
        if let Some(cache_control) = &object.cache_control {
            http_request = http_request.header(http::header::CACHE_CONTROL, cache_control);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| failure(e.to_string()))?;

        if !status.is_success() {
            let detail = from_xml::<S3ErrorDocument>(&body)
                .map(|doc| format!("{} ({})", doc.code, doc.message.unwrap_or_default()))
                .unwrap_or_else(|_| format!("status {status}"));
            warn!(key = %object.key, %status, detail = %detail, "Store refused multipart initiation");
            return Err(failure(detail));
        }

        let result: InitiateMultipartUploadResult =
            from_xml(&body).map_err(|e| failure(e.to_string()))?;
        debug!(key = %object.key, upload_id = %result.upload_id, "Opened multipart session");
        Ok(result.upload_id)
    }

    async fn abort(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object: &ResolvedObject,
        upload_id: &str,
    ) -> Result<(), IssueError> {
        let address = ObjectAddress::for_object(credentials, bucket, &object.key)?;
        let request = PresignRequest::builder()
            .method(http::Method::DELETE)
            .address(address)
            .query(vec![("uploadId".to_owned(), upload_id.to_owned())])
            .expires_in(INITIATE_SIGNED_URL_EXPIRES_IN)
            .build();
        let signed = presign(credentials, &request, Utc::now())?;

        let failure = |message: String| IssueError::MultipartAbort {
            key: object.key.clone(),
            upload_id: upload_id.to_owned(),
            message,
        };

        let response = self
            .client
            .delete(&signed.url)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("status {status}")));
        }
        debug!(key = %object.key, upload_id, "Aborted multipart session");
        Ok(())
    }
}

/// A planned part: its 1-based number and exact size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// Exact byte count.
    pub size: u64,
}

/// Split `size` bytes into parts of `part_size`, the last taking the remainder.
///
/// An empty file still gets one (empty) part so the session can be completed.
///
/// # Examples
///
/// ```
/// use updraft_core::multipart::plan_parts;
///
/// let parts = plan_parts(12, 5);
/// let sizes: Vec<u64> = parts.iter().map(|p| p.size).collect();
/// assert_eq!(sizes, vec![5, 5, 2]);
/// assert_eq!(parts[2].part_number, 3);
/// ```
#[must_use]
pub fn plan_parts(size: u64, part_size: u64) -> Vec<PlannedPart> {
    let part_size = part_size.max(1);
    let count = size.div_ceil(part_size).max(1);
    (0..count)
        .map(|index| PlannedPart {
            part_number: u32::try_from(index + 1).unwrap_or(u32::MAX),
            size: part_size.min(size - index.saturating_mul(part_size).min(size)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_plan_exact_multiple() {
        let parts = plan_parts(10, 5);
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.size == 5));
    }

    #[test]
    fn test_should_plan_single_part_for_small_file() {
        assert_eq!(plan_parts(3, 5), vec![PlannedPart { part_number: 1, size: 3 }]);
    }

    #[test]
    fn test_should_plan_one_empty_part_for_empty_file() {
        assert_eq!(plan_parts(0, 5), vec![PlannedPart { part_number: 1, size: 0 }]);
    }

    #[test]
    fn test_should_sum_to_file_size() {
        let size = 50 * 1024 * 1024 * 3 + 17;
        let parts = plan_parts(size, 50 * 1024 * 1024);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.iter().map(|p| p.size).sum::<u64>(), size);
        assert_eq!(parts[3].size, 17);
    }
}
