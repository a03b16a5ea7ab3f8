//! The upload execution engine.
//!
//! [`upload_files`] requests signed URLs for a list of local files, then
//! transfers each file straight to the object store. Response entries are
//! matched to local files by position and every entry must describe the
//! file at the same index. Files run in batches of `upload_batch_size`; a
//! failure in one file never stops its siblings.
//!
//! Only setup failures are returned as errors. Per-file failures end up in
//! [`UploadResult::failed_files`].

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use http::header::CONTENT_TYPE;
use tracing::{debug, info, warn};
use updraft_model::{
    ErrorBody, MultipartFile, ServerMetadata, SignedFile, SignedFileUrl, SignedUrlResponse,
    SignedUrls, UploadError, UploadRequest,
};

use crate::error::TransferError;
use crate::format::format_bytes;
use crate::options::UploadOptions;
use crate::retry::with_retries;
use crate::source::LocalFile;
use crate::state::{FileUploadInfo, UploadStore};
use crate::transfer::{ProgressFn, Transfer};

/// Outcome of an upload call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadResult {
    /// Files confirmed by the store.
    pub files: Vec<FileUploadInfo>,
    /// Files that failed, each with its error.
    pub failed_files: Vec<FileUploadInfo>,
    /// Metadata returned by the server.
    pub metadata: ServerMetadata,
}

impl UploadResult {
    /// The neutral result: no files, no metadata.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Outcome of a single-file upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleUploadResult {
    /// The uploaded file.
    pub file: FileUploadInfo,
    /// Metadata returned by the server.
    pub metadata: ServerMetadata,
}

/// Called once URLs are signed, with every file pending.
pub type BeginFn<'a> = &'a (dyn Fn(&[FileUploadInfo], &ServerMetadata) + Send + Sync);

enum Plan<'a> {
    Single(&'a SignedFileUrl),
    Multipart { entry: &'a MultipartFile, part_size: u64 },
}

impl Plan<'_> {
    fn signed_file(&self) -> &SignedFile {
        match self {
            Self::Single(entry) => &entry.file,
            Self::Multipart { entry, .. } => &entry.file,
        }
    }
}

/// Upload `files` and track them in `store`.
///
/// # Errors
///
/// Returns a critical [`UploadError`] when nothing could be attempted: no
/// files, the signing request failed or was refused, the response was
/// malformed or did not match the request, or the call was cancelled before
/// transfers began.
pub async fn upload_files(
    client: &reqwest::Client,
    options: &UploadOptions,
    files: &[LocalFile],
    store: &UploadStore,
    on_begin: BeginFn<'_>,
) -> Result<UploadResult, UploadError> {
    if files.is_empty() {
        return Err(UploadError::no_files());
    }

    let response = request_signed_urls(client, options, files)
        .await
        .map_err(|err| abort_aware(options, err))?;
    let plans = correlate(&response, files)?;

    for (plan, file) in plans.iter().zip(files) {
        store.insert(FileUploadInfo::pending(plan.signed_file().clone(), file.clone()));
    }
    on_begin(&store.snapshot(), &response.metadata);

    let transfer = Transfer::new(client.clone(), options.retry_policy(), options.signal.clone());
    let batch_size = options
        .upload_batch_size
        .filter(|n| *n > 0)
        .unwrap_or(files.len());

    let jobs: Vec<(&Plan<'_>, &LocalFile)> = plans.iter().zip(files).collect();
    for batch in jobs.chunks(batch_size) {
        join_all(batch.iter().map(|(plan, file)| {
            upload_one(&transfer, options, store, plan, file)
        }))
        .await;
    }

    let result = UploadResult {
        files: store.uploaded_files(),
        failed_files: store.failed_files(),
        metadata: response.metadata,
    };
    info!(
        route = %options.route,
        uploaded = result.files.len(),
        failed = result.failed_files.len(),
        "upload settled"
    );
    Ok(result)
}

async fn request_signed_urls(
    client: &reqwest::Client,
    options: &UploadOptions,
    files: &[LocalFile],
) -> Result<SignedUrlResponse, UploadError> {
    let request = UploadRequest {
        route: options.route.clone(),
        files: files.iter().map(LocalFile::descriptor).collect(),
        metadata: options.metadata.clone(),
    };
    let body = serde_json::to_vec(&request).map_err(|e| UploadError::unknown(e.to_string()))?;
    let body = &body;

    // Only transport failures are retried; an error answer is final.
    let response = with_retries(options.retry_policy(), &options.signal, move || async move {
        Ok(client
            .post(&options.api)
            .headers(options.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.clone())
            .send()
            .await?)
    })
    .await
    .map_err(|err| match err {
        TransferError::Aborted => UploadError::aborted(),
        other => UploadError::unknown(other.to_string()),
    })?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| UploadError::unknown(e.to_string()))?;

    if !status.is_success() {
        debug!(%status, "signed URL request refused");
        return Err(serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| UploadError::unknown("Failed to obtain pre-signed URLs.")));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        warn!(error = %e, "malformed signed URL response");
        UploadError::unknown("Invalid response from upload server.")
    })
}

fn correlate<'a>(
    response: &'a SignedUrlResponse,
    files: &[LocalFile],
) -> Result<Vec<Plan<'a>>, UploadError> {
    let plans: Vec<Plan<'a>> = match &response.urls {
        SignedUrls::Single(entries) => entries.iter().map(Plan::Single).collect(),
        SignedUrls::Multipart(multipart) => multipart
            .files
            .iter()
            .map(|entry| Plan::Multipart {
                entry,
                part_size: multipart.part_size,
            })
            .collect(),
    };

    if plans.is_empty() {
        return Err(UploadError::unknown(
            "No pre-signed URLs returned from server. Check your upload router config.",
        ));
    }

    let mismatch = || UploadError::unknown("Signed URL response does not match the requested files.");
    if plans.len() != files.len() {
        return Err(mismatch());
    }
    let mut keys = HashSet::with_capacity(plans.len());
    for (plan, file) in plans.iter().zip(files) {
        let signed = plan.signed_file();
        if !signed.describes(&file.descriptor()) || !keys.insert(signed.object_key.as_str()) {
            return Err(mismatch());
        }
    }
    Ok(plans)
}

async fn upload_one(
    transfer: &Transfer,
    options: &UploadOptions,
    store: &UploadStore,
    plan: &Plan<'_>,
    file: &LocalFile,
) {
    let key = plan.signed_file().object_key.clone();
    store.mark_uploading(&key);

    let progress: ProgressFn = {
        let store = store.clone();
        let key = key.clone();
        Arc::new(move |fraction| {
            store.set_progress(&key, fraction);
        })
    };

    let result = match plan {
        Plan::Single(entry) => transfer.put_file(file, entry, progress).await,
        Plan::Multipart { entry, part_size } => {
            let result = transfer
                .put_multipart(file, entry, *part_size, options.multipart_batch_size, progress)
                .await;
            if result.is_err() {
                transfer.abort_multipart(entry).await;
            }
            result
        }
    };

    match result {
        Ok(()) => {
            info!(key = %key, size = %format_bytes(file.size, true, 1), "file uploaded");
            store.mark_complete(&key);
        }
        Err(err) => {
            let error = if err.is_aborted() || options.signal.is_cancelled() {
                UploadError::aborted()
            } else {
                UploadError::s3_upload()
            };
            warn!(key = %key, error = %err, "file upload failed");
            store.mark_failed(&key, error);
        }
    }
}

fn abort_aware(options: &UploadOptions, err: UploadError) -> UploadError {
    if options.signal.is_cancelled() {
        UploadError::aborted()
    } else {
        err
    }
}
