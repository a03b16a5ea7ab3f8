//! Upload execution engine and upload state store for Updraft.
//!
//! The client asks an Updraft server for presigned URLs, then sends bytes
//! straight to the object store: one `PUT` per file, or parts plus a
//! completion `POST` for multipart routes.
//!
//! # Overview
//!
//! - [`engine`] - [`upload_files`]: signing request,
//!   correlation, batched transfers
//! - [`transfer`] - Single `PUT`, multipart parts, completion, and abort
//! - [`state`] - [`UploadStore`] and per-file [`FileUploadInfo`]
//! - [`uploader`] - The [`Uploader`] controller with lifecycle callbacks
//! - [`retry`] - Fixed-delay retries bounded by a cancellation token
//! - [`source`] - [`LocalFile`] in memory or on disk
//! - [`format`] - [`format_bytes`]

pub mod callbacks;
pub mod engine;
pub mod error;
pub mod format;
pub mod options;
pub mod retry;
pub mod source;
pub mod state;
pub mod transfer;
pub mod uploader;

pub use callbacks::{NoCallbacks, UploadCallbacks};
pub use engine::{SingleUploadResult, UploadResult, upload_files};
pub use error::TransferError;
pub use format::format_bytes;
pub use options::UploadOptions;
pub use retry::RetryPolicy;
pub use source::{FileData, LocalFile};
pub use state::{FileUploadInfo, UploadStatus, UploadStore};
pub use uploader::Uploader;
