//! Object-store transfers over presigned URLs.
//!
//! - [`Transfer::put_file`] sends a whole file with one `PUT`.
//! - [`Transfer::put_multipart`] sends parts in batches, then posts the
//!   completion document with parts sorted by number.
//! - [`Transfer::abort_multipart`] is best effort and never fails.
//!
//! Progress is reported as bytes are handed to the connection and is capped
//! at 0.99; the caller decides when a file is complete.

use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use futures::future::try_join_all;
use http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use updraft_model::{MultipartFile, PartUrl, SignedFileUrl};
use updraft_xml::{
    CompleteMultipartUpload, CompleteMultipartUploadResult, CompletedPart, S3ErrorDocument, from_xml,
};

use crate::error::TransferError;
use crate::retry::{RetryPolicy, with_retries};
use crate::source::{ByteStream, LocalFile};

/// Progress sink receiving a fraction in `[0, 0.99]`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

const PROGRESS_CAP: f64 = 0.99;

/// Transfers bound to one client, retry policy, and cancellation token.
#[derive(Debug, Clone)]
pub struct Transfer {
    client: reqwest::Client,
    retry: RetryPolicy,
    token: CancellationToken,
}

impl Transfer {
    /// Create a transfer context.
    #[must_use]
    pub fn new(client: reqwest::Client, retry: RetryPolicy, token: CancellationToken) -> Self {
        Self {
            client,
            retry,
            token,
        }
    }

    /// Upload `file` with a single `PUT` to `entry.signed_url`.
    ///
    /// Sends `Content-Type`, `Cache-Control` when signed, and one
    /// `x-amz-meta-*` header per metadata entry.
    ///
    /// # Errors
    ///
    /// Returns the last attempt's [`TransferError`].
    pub async fn put_file(
        &self,
        file: &LocalFile,
        entry: &SignedFileUrl,
        on_progress: ProgressFn,
    ) -> Result<(), TransferError> {
        let on_progress = &on_progress;
        with_retries(self.retry, &self.token, move || async move {
            on_progress(0.0);
            let progress = Arc::clone(on_progress);
            let total = file.size;
            let stream = file.stream_range(0, total).await?;
            let body = counted_body(stream, move |sent| {
                if total > 0 {
                    progress(fraction(sent, total));
                }
            });

            let mut request = self
                .client
                .put(&entry.signed_url)
                .header(CONTENT_TYPE, &file.content_type)
                .header(CONTENT_LENGTH, total);
            if let Some(cache_control) = &entry.file.object_cache_control {
                request = request.header(CACHE_CONTROL, cache_control);
            }
            for (key, value) in &entry.file.object_metadata {
                request = request.header(format!("x-amz-meta-{key}"), value);
            }

            let response = request.body(body).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::Status { status });
            }
            Ok(())
        })
        .await?;

        debug!(key = %entry.file.object_key, "uploaded object");
        Ok(())
    }

    /// Upload `file` in parts and complete the session.
    ///
    /// Parts run `batch_size` at a time (all at once when `None` or 0). A
    /// failed part stops the upload before completion is attempted.
    ///
    /// # Errors
    ///
    /// Returns the first part failure or the completion failure.
    pub async fn put_multipart(
        &self,
        file: &LocalFile,
        entry: &MultipartFile,
        part_size: u64,
        batch_size: Option<usize>,
        on_progress: ProgressFn,
    ) -> Result<(), TransferError> {
        let progresses = Arc::new(Mutex::new(vec![0.0_f64; entry.parts.len()]));
        let batch_size = batch_size
            .filter(|n| *n > 0)
            .unwrap_or(entry.parts.len())
            .max(1);

        let mut completed = Vec::with_capacity(entry.parts.len());
        for (batch_index, batch) in entry.parts.chunks(batch_size).enumerate() {
            let uploads = batch.iter().enumerate().map(|(offset, part)| {
                let slot = batch_index * batch_size + offset;
                let report = part_progress(&progresses, slot, Arc::clone(&on_progress));
                self.put_part(file, part, part_size, report)
            });
            completed.extend(try_join_all(uploads).await?);
        }

        self.complete(entry, completed).await?;
        debug!(
            key = %entry.file.object_key,
            parts = entry.parts.len(),
            "completed multipart upload"
        );
        Ok(())
    }

    async fn put_part(
        &self,
        file: &LocalFile,
        part: &PartUrl,
        part_size: u64,
        on_progress: Arc<dyn Fn(u64, u64) + Send + Sync>,
    ) -> Result<CompletedPart, TransferError> {
        let start = u64::from(part.part_number.saturating_sub(1)).saturating_mul(part_size);

        let on_progress = &on_progress;
        with_retries(self.retry, &self.token, move || async move {
            on_progress(0, part.size);
            let progress = Arc::clone(on_progress);
            let total = part.size;
            let stream = file.stream_range(start, total).await?;
            let body = counted_body(stream, move |sent| progress(sent, total));

            let response = self
                .client
                .put(&part.signed_url)
                .header(CONTENT_LENGTH, total)
                .body(body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(TransferError::Status { status });
            }

            let etag = response
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.replace('"', ""))
                .filter(|v| !v.is_empty())
                .ok_or(TransferError::MissingEtag {
                    part_number: part.part_number,
                })?;

            on_progress(total, total);
            Ok(CompletedPart {
                part_number: part.part_number,
                etag,
            })
        })
        .await
    }

    async fn complete(
        &self,
        entry: &MultipartFile,
        parts: Vec<CompletedPart>,
    ) -> Result<(), TransferError> {
        let xml = Bytes::from(CompleteMultipartUpload::new(parts).to_xml()?);

        let xml = &xml;
        let response = with_retries(self.retry, &self.token, move || async move {
            Ok(self
                .client
                .post(&entry.complete_signed_url)
                .header(CONTENT_TYPE, "application/xml")
                .body(xml.clone())
                .send()
                .await?)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status { status });
        }

        let body = response.bytes().await?;
        let result = read_completion(&body)?;
        debug!(
            key = %entry.file.object_key,
            location = result.location.as_deref().unwrap_or_default(),
            etag = result.etag.as_deref().unwrap_or_default(),
            "store assembled multipart object"
        );
        Ok(())
    }

    /// Send `DELETE` to the abort URL. Errors are logged and ignored.
    ///
    /// Not bound to the cancellation token, so an aborted upload still
    /// releases its session.
    pub async fn abort_multipart(&self, entry: &MultipartFile) {
        match self.client.delete(&entry.abort_signed_url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(key = %entry.file.object_key, "aborted multipart upload");
            }
            Ok(response) => {
                warn!(
                    key = %entry.file.object_key,
                    status = %response.status(),
                    "store refused multipart abort"
                );
            }
            Err(err) => {
                warn!(key = %entry.file.object_key, error = %err, "failed to abort multipart upload");
            }
        }
    }
}

/// Read a completion response body.
///
/// S3 may answer 200 and still fail the completion with an `<Error>`
/// document. Bodies that are neither document yield an empty result.
fn read_completion(body: &[u8]) -> Result<CompleteMultipartUploadResult, TransferError> {
    if let Ok(error) = from_xml::<S3ErrorDocument>(body) {
        return Err(TransferError::Store {
            code: error.code,
            message: error.message.unwrap_or_default(),
        });
    }
    Ok(from_xml::<CompleteMultipartUploadResult>(body).unwrap_or_default())
}

/// Wrap `stream` so `on_sent` sees the running byte count.
fn counted_body(
    stream: ByteStream,
    on_sent: impl Fn(u64) + Send + Sync + 'static,
) -> reqwest::Body {
    let mut sent = 0_u64;
    reqwest::Body::wrap_stream(stream.map_ok(move |chunk| {
        sent += chunk.len() as u64;
        on_sent(sent);
        chunk
    }))
}

/// Per-part progress reporter feeding the file-level average.
fn part_progress(
    progresses: &Arc<Mutex<Vec<f64>>>,
    slot: usize,
    on_progress: ProgressFn,
) -> Arc<dyn Fn(u64, u64) + Send + Sync> {
    let progresses = Arc::clone(progresses);
    Arc::new(move |sent, total| {
        let average = {
            let mut parts = progresses.lock();
            if let Some(value) = parts.get_mut(slot) {
                *value = if total == 0 { 1.0 } else { fraction(sent, total) };
            }
            #[allow(clippy::cast_precision_loss)]
            let count = parts.len().max(1) as f64;
            parts.iter().sum::<f64>() / count
        };
        on_progress(average.min(PROGRESS_CAP));
    })
}

#[allow(clippy::cast_precision_loss)]
fn fraction(sent: u64, total: u64) -> f64 {
    (sent as f64 / total as f64).min(PROGRESS_CAP)
}
