//! The upload state store.
//!
//! [`UploadStore`] maps object keys to [`FileUploadInfo`] in insertion
//! order. Statuses only move forward (`pending -> uploading -> complete |
//! failed`) and terminal entries ignore further updates. Every aggregate is
//! computed from a snapshot on read.
//!
//! Listeners run synchronously after each committed change, outside the lock
//! and before the mutating call returns.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use updraft_model::{ObjectMetadata, SignedFile, UploadError};

use crate::source::LocalFile;

/// Upload status of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadStatus {
    /// Signed, not started.
    Pending,
    /// Bytes in flight.
    Uploading,
    /// Confirmed by the store.
    Complete,
    /// Terminally failed.
    Failed,
}

impl UploadStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether `next` is a legal transition from `self`.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Uploading => next != Self::Pending,
            Self::Complete | Self::Failed => false,
        }
    }

    /// Lower-case name, as used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-side state of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUploadInfo {
    /// Current status.
    pub status: UploadStatus,
    /// Progress in `[0, 1]`; below 1 until the store confirms.
    pub progress: f64,
    /// What the server signed for this file.
    pub file: SignedFile,
    /// The local file being uploaded.
    pub raw: LocalFile,
    /// Present only when `status` is [`UploadStatus::Failed`].
    pub error: Option<UploadError>,
}

impl FileUploadInfo {
    /// A pending entry.
    #[must_use]
    pub fn pending(file: SignedFile, raw: LocalFile) -> Self {
        Self {
            status: UploadStatus::Pending,
            progress: 0.0,
            file,
            raw,
            error: None,
        }
    }

    /// Object key, the entry's identity.
    #[must_use]
    pub fn object_key(&self) -> &str {
        &self.file.object_key
    }

    /// Object metadata the server signed.
    #[must_use]
    pub fn object_metadata(&self) -> &ObjectMetadata {
        &self.file.object_metadata
    }
}

type Listener = Arc<dyn Fn(&FileUploadInfo) + Send + Sync>;

#[derive(Default)]
struct Entries {
    order: Vec<String>,
    by_key: HashMap<String, FileUploadInfo>,
}

/// Insertion-ordered map from object key to [`FileUploadInfo`].
///
/// Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct UploadStore {
    entries: Arc<Mutex<Entries>>,
    listeners: Arc<Mutex<Vec<Listener>>>,
}

impl fmt::Debug for UploadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStore")
            .field("files", &self.len())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl UploadStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `listener` after every change.
    pub fn subscribe(&self, listener: impl Fn(&FileUploadInfo) + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Insert or replace an entry.
    pub fn insert(&self, info: FileUploadInfo) {
        {
            let mut entries = self.entries.lock();
            let key = info.object_key().to_owned();
            if !entries.by_key.contains_key(&key) {
                entries.order.push(key.clone());
            }
            entries.by_key.insert(key, info.clone());
        }
        self.notify(&info);
    }

    /// Move a pending file to uploading with zero progress.
    pub fn mark_uploading(&self, key: &str) -> Option<FileUploadInfo> {
        self.transition(key, UploadStatus::Uploading, |info| info.progress = 0.0)
    }

    /// Record progress. Values are clamped to `[0, 0.99]`.
    pub fn set_progress(&self, key: &str, progress: f64) -> Option<FileUploadInfo> {
        let progress = progress.clamp(0.0, 0.99);
        self.transition(key, UploadStatus::Uploading, |info| info.progress = progress)
    }

    /// Mark a file complete with progress 1.
    pub fn mark_complete(&self, key: &str) -> Option<FileUploadInfo> {
        self.transition(key, UploadStatus::Complete, |info| info.progress = 1.0)
    }

    /// Mark a file failed.
    pub fn mark_failed(&self, key: &str, error: UploadError) -> Option<FileUploadInfo> {
        self.transition(key, UploadStatus::Failed, |info| info.error = Some(error))
    }

    fn transition(
        &self,
        key: &str,
        next: UploadStatus,
        apply: impl FnOnce(&mut FileUploadInfo),
    ) -> Option<FileUploadInfo> {
        let updated = {
            let mut entries = self.entries.lock();
            let info = entries.by_key.get_mut(key)?;
            if !info.status.can_advance_to(next) {
                return None;
            }
            info.status = next;
            apply(info);
            info.clone()
        };
        self.notify(&updated);
        Some(updated)
    }

    fn notify(&self, info: &FileUploadInfo) {
        let listeners: Vec<Listener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(info);
        }
    }

    /// One entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<FileUploadInfo> {
        self.entries.lock().by_key.get(key).cloned()
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FileUploadInfo> {
        let entries = self.entries.lock();
        entries
            .order
            .iter()
            .filter_map(|key| entries.by_key.get(key).cloned())
            .collect()
    }

    /// Number of tracked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().order.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries with `status`.
    #[must_use]
    pub fn with_status(&self, status: UploadStatus) -> Vec<FileUploadInfo> {
        self.snapshot()
            .into_iter()
            .filter(|info| info.status == status)
            .collect()
    }

    /// Completed entries.
    #[must_use]
    pub fn uploaded_files(&self) -> Vec<FileUploadInfo> {
        self.with_status(UploadStatus::Complete)
    }

    /// Failed entries.
    #[must_use]
    pub fn failed_files(&self) -> Vec<FileUploadInfo> {
        self.with_status(UploadStatus::Failed)
    }

    /// At least one file, all complete.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        let snapshot = self.snapshot();
        !snapshot.is_empty() && snapshot.iter().all(|i| i.status == UploadStatus::Complete)
    }

    /// Any file failed.
    #[must_use]
    pub fn has_failed_files(&self) -> bool {
        self.snapshot().iter().any(|i| i.status == UploadStatus::Failed)
    }

    /// At least one file, all terminal.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        let snapshot = self.snapshot();
        !snapshot.is_empty() && snapshot.iter().all(|i| i.status.is_terminal())
    }

    /// Mean progress over all entries; 0 when empty.
    #[must_use]
    pub fn average_progress(&self) -> f64 {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = snapshot.len() as f64;
        snapshot.iter().map(|i| i.progress).sum::<f64>() / count
    }

    /// Forget every entry. Listeners stay subscribed.
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        entries.order.clear();
        entries.by_key.clear();
    }
}
