//! Lifecycle callbacks for [`Uploader`](crate::Uploader).
//!
//! Slots run at fixed points:
//!
//! 1. `before_upload` may replace the file list; an empty list is `no_files`.
//! 2. `on_upload_begin` once URLs are signed.
//! 3. `on_upload_progress` on every per-file state change.
//! 4. `on_upload_complete` if at least one file succeeded.
//! 5. `on_upload_fail` if at least one file failed.
//! 6. `on_upload_settle` always; with an empty result after a critical error.
//!
//! `on_error` receives critical errors only.

use async_trait::async_trait;
use updraft_model::{ServerMetadata, UploadError};

use crate::engine::UploadResult;
use crate::source::LocalFile;
use crate::state::FileUploadInfo;

/// Upload lifecycle callbacks. Every method defaults to a no-op.
#[async_trait]
pub trait UploadCallbacks: Send + Sync {
    /// Inspect or replace the files before anything is sent.
    ///
    /// # Errors
    ///
    /// Returning an error stops the upload with that critical error.
    async fn before_upload(&self, files: Vec<LocalFile>) -> Result<Vec<LocalFile>, UploadError> {
        Ok(files)
    }

    /// URLs are signed and every file is pending.
    fn on_upload_begin(&self, _files: &[FileUploadInfo], _metadata: &ServerMetadata) {}

    /// A file changed state or progress.
    fn on_upload_progress(&self, _file: &FileUploadInfo) {}

    /// At least one file was uploaded.
    async fn on_upload_complete(&self, _result: &UploadResult) {}

    /// At least one file failed.
    async fn on_upload_fail(&self, _result: &UploadResult) {}

    /// The upload call finished, whatever the outcome.
    async fn on_upload_settle(&self, _result: &UploadResult) {}

    /// A critical error stopped the upload.
    fn on_error(&self, _error: &UploadError) {}
}

/// Callbacks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCallbacks;

impl UploadCallbacks for NoCallbacks {}
