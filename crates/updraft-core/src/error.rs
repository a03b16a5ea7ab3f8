//! Issuer outcomes and errors.
//!
//! A request either succeeds, is *rejected* with a typed [`IssueRejection`]
//! (a normal 4xx response), or fails with a fatal [`IssueError`] that the
//! hosting layer turns into a 500.

use http::StatusCode;
use updraft_auth::SignError;
use updraft_model::{ErrorBody, ErrorKind, UploadError};

/// A typed, client-visible refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRejection {
    /// HTTP status to answer with.
    pub status: StatusCode,
    /// The error carried in the body.
    pub error: UploadError,
}

impl IssueRejection {
    /// Create a rejection.
    pub fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            error: UploadError::new(kind, message),
        }
    }

    /// 400 with the given kind.
    pub fn bad_request(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, kind, message)
    }

    /// 405 for anything but `POST`.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::InvalidRequest,
            "Method not allowed.",
        )
    }

    /// 404 for an unknown route name.
    #[must_use]
    pub fn route_not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorKind::InvalidRequest,
            "Upload route not found.",
        )
    }

    /// The JSON body `{ "error": { "type", "message" } }`.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        ErrorBody::from(self.error.clone())
    }
}

/// Fatal errors. These are never shown to the client in detail.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    /// Credentials, endpoint, or signing inputs were invalid.
    #[error("Store configuration error: {0}")]
    Sign(#[from] SignError),

    /// A hook failed with something other than a rejection.
    #[error("Upload hook failed: {0}")]
    Hook(#[source] anyhow::Error),

    /// The store refused to open a multipart session.
    #[error("Failed to initiate multipart upload for {key}: {message}")]
    MultipartInitiation {
        /// Object key.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// The store refused to abort a multipart session.
    #[error("Failed to abort multipart upload {upload_id} for {key}: {message}")]
    MultipartAbort {
        /// Object key.
        key: String,
        /// Session id.
        upload_id: String,
        /// What went wrong.
        message: String,
    },

    /// The response could not be encoded.
    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}
