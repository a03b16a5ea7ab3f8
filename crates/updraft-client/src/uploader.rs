//! The upload controller.
//!
//! An [`Uploader`] owns an [`UploadStore`] and runs uploads through the
//! engine with [`UploadCallbacks`] wired in. Each call resets the previous
//! state first.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use updraft_model::{ServerMetadata, UploadError};

use crate::callbacks::{NoCallbacks, UploadCallbacks};
use crate::engine::{self, SingleUploadResult, UploadResult};
use crate::options::UploadOptions;
use crate::source::LocalFile;
use crate::state::{FileUploadInfo, UploadStore};

#[derive(Debug, Default)]
struct ControllerState {
    pending: bool,
    error: Option<UploadError>,
    metadata: ServerMetadata,
}

/// Runs uploads and exposes their state.
///
/// # Examples
///
/// ```no_run
/// use updraft_client::{LocalFile, UploadOptions, Uploader};
///
/// # async fn run() {
/// let uploader = Uploader::new(
///     UploadOptions::builder()
///         .api("http://localhost:3000/api/upload")
///         .route("images")
///         .build(),
/// );
/// let result = uploader
///     .upload(vec![LocalFile::from_bytes("a.txt", "text/plain", "hello")], None)
///     .await;
/// println!("{} uploaded", result.files.len());
/// # }
/// ```
pub struct Uploader {
    client: reqwest::Client,
    options: UploadOptions,
    callbacks: Arc<dyn UploadCallbacks>,
    store: UploadStore,
    state: Arc<Mutex<ControllerState>>,
}

impl fmt::Debug for Uploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uploader")
            .field("options", &self.options)
            .field("store", &self.store)
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl Uploader {
    /// An uploader with a default HTTP client and no callbacks.
    #[must_use]
    pub fn new(options: UploadOptions) -> Self {
        Self::with_callbacks(options, Arc::new(NoCallbacks))
    }

    /// An uploader with `callbacks`.
    #[must_use]
    pub fn with_callbacks(options: UploadOptions, callbacks: Arc<dyn UploadCallbacks>) -> Self {
        let store = UploadStore::new();
        let listener = Arc::clone(&callbacks);
        store.subscribe(move |file| listener.on_upload_progress(file));

        Self {
            client: reqwest::Client::new(),
            options,
            callbacks,
            store,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    /// Use `client` for every request.
    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Upload `files`, returning critical errors.
    ///
    /// `metadata` overrides the options' client metadata for this call.
    ///
    /// # Errors
    ///
    /// Returns the critical [`UploadError`] that stopped the upload.
    pub async fn upload_async(
        &self,
        files: Vec<LocalFile>,
        metadata: Option<Value>,
    ) -> Result<UploadResult, UploadError> {
        self.reset();
        self.state.lock().pending = true;

        match self.run(files, metadata).await {
            Ok(result) => {
                if !result.files.is_empty() {
                    self.callbacks.on_upload_complete(&result).await;
                }
                if !result.failed_files.is_empty() {
                    self.callbacks.on_upload_fail(&result).await;
                }
                {
                    let mut state = self.state.lock();
                    state.pending = false;
                    state.metadata = result.metadata.clone();
                }
                self.callbacks.on_upload_settle(&result).await;
                Ok(result)
            }
            Err(error) => {
                debug!(kind = %error.kind, message = %error.message, "upload stopped");
                {
                    let mut state = self.state.lock();
                    state.pending = false;
                    state.error = Some(error.clone());
                }
                self.callbacks.on_error(&error);
                self.callbacks.on_upload_settle(&UploadResult::empty()).await;
                Err(error)
            }
        }
    }

    /// Upload `files`, swallowing critical errors into an empty result.
    pub async fn upload(&self, files: Vec<LocalFile>, metadata: Option<Value>) -> UploadResult {
        self.upload_async(files, metadata)
            .await
            .unwrap_or_else(|_| UploadResult::empty())
    }

    /// Upload one file; fails unless it completed.
    ///
    /// # Errors
    ///
    /// Returns the critical error, or `unknown` "Failed to upload file." if
    /// the transfer failed.
    pub async fn upload_file(
        &self,
        file: LocalFile,
        metadata: Option<Value>,
    ) -> Result<SingleUploadResult, UploadError> {
        let result = self.upload_async(vec![file], metadata).await?;
        let metadata = result.metadata;
        result
            .files
            .into_iter()
            .next()
            .map(|file| SingleUploadResult { file, metadata })
            .ok_or_else(|| UploadError::unknown("Failed to upload file."))
    }

    async fn run(
        &self,
        files: Vec<LocalFile>,
        metadata: Option<Value>,
    ) -> Result<UploadResult, UploadError> {
        if files.is_empty() {
            return Err(UploadError::no_files());
        }
        let files = self.callbacks.before_upload(files).await?;
        if files.is_empty() {
            return Err(UploadError::no_files());
        }

        let options = match metadata {
            Some(metadata) => UploadOptions {
                metadata: Some(metadata),
                ..self.options.clone()
            },
            None => self.options.clone(),
        };
        let callbacks = Arc::clone(&self.callbacks);
        let on_begin = move |files: &[FileUploadInfo], metadata: &ServerMetadata| {
            callbacks.on_upload_begin(files, metadata);
        };

        engine::upload_files(&self.client, &options, &files, &self.store, &on_begin).await
    }

    /// Clear tracked files, metadata, and errors.
    pub fn reset(&self) {
        self.store.reset();
        *self.state.lock() = ControllerState::default();
    }

    /// The state store.
    #[must_use]
    pub fn store(&self) -> &UploadStore {
        &self.store
    }

    /// The options.
    #[must_use]
    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Whether an upload is running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending
    }

    /// The critical error of the last call, if any.
    #[must_use]
    pub fn error(&self) -> Option<UploadError> {
        self.state.lock().error.clone()
    }

    /// Whether the last call ended with a critical error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.state.lock().error.is_some()
    }

    /// Whether the cancellation token has fired.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.options.signal.is_cancelled()
    }

    /// Metadata returned by the server on the last successful call.
    #[must_use]
    pub fn metadata(&self) -> ServerMetadata {
        self.state.lock().metadata.clone()
    }

    /// Every tracked file in request order.
    #[must_use]
    pub fn progresses(&self) -> Vec<FileUploadInfo> {
        self.store.snapshot()
    }

    /// Completed files.
    #[must_use]
    pub fn uploaded_files(&self) -> Vec<FileUploadInfo> {
        self.store.uploaded_files()
    }

    /// Failed files.
    #[must_use]
    pub fn failed_files(&self) -> Vec<FileUploadInfo> {
        self.store.failed_files()
    }

    /// At least one file, all complete.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.store.all_succeeded()
    }

    /// Any file failed.
    #[must_use]
    pub fn has_failed_files(&self) -> bool {
        self.store.has_failed_files()
    }

    /// At least one file, all terminal.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.store.is_settled()
    }

    /// Mean progress over tracked files.
    #[must_use]
    pub fn average_progress(&self) -> f64 {
        self.store.average_progress()
    }
}
