//! The error vocabulary shared by the upload server and client.
//!
//! Every failure visible to a caller is an [`UploadError`]: a closed
//! [`ErrorKind`] plus a human-readable message. On the wire it is the
//! `{ "error": { "type": ..., "message": ... } }` envelope ([`ErrorBody`]).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of upload error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or semantically invalid request.
    InvalidRequest,
    /// Nothing to upload.
    NoFiles,
    /// The object store rejected or failed a transfer.
    S3Upload,
    /// A file is over the route limit or the single-request ceiling.
    FileTooLarge,
    /// A file's content type is not allowed by the route.
    InvalidFileType,
    /// A server hook rejected the upload.
    Rejected,
    /// More files than the route allows.
    TooManyFiles,
    /// The upload was cancelled.
    Aborted,
    /// Anything not covered above. Unrecognized wire values decode to this.
    #[default]
    #[serde(other)]
    Unknown,
}

impl ErrorKind {
    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::InvalidRequest => "invalid_request",
            Self::NoFiles => "no_files",
            Self::S3Upload => "s3_upload",
            Self::FileTooLarge => "file_too_large",
            Self::InvalidFileType => "invalid_file_type",
            Self::Rejected => "rejected",
            Self::TooManyFiles => "too_many_files",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed upload error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct UploadError {
    /// The error kind.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl UploadError {
    /// Create an error of `kind` with `message`.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `no_files`: nothing was selected for upload.
    #[must_use]
    pub fn no_files() -> Self {
        Self::new(ErrorKind::NoFiles, "No files to upload.")
    }

    /// `aborted`: the caller cancelled the upload.
    #[must_use]
    pub fn aborted() -> Self {
        Self::new(ErrorKind::Aborted, "Upload aborted.")
    }

    /// `s3_upload`: the object store transfer failed.
    #[must_use]
    pub fn s3_upload() -> Self {
        Self::new(ErrorKind::S3Upload, "Failed to upload file to S3.")
    }

    /// `unknown` with a custom message.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }
}

/// Wire envelope for an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error.
    pub error: UploadError,
}

impl From<UploadError> for ErrorBody {
    fn from(error: UploadError) -> Self {
        Self { error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_error_envelope() {
        let body = ErrorBody::from(UploadError::new(ErrorKind::TooManyFiles, "Too many files."));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "error": { "type": "too_many_files", "message": "Too many files." } })
        );
    }

    #[test]
    fn test_should_decode_unrecognized_kind_as_unknown() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":{"type":"quota_exceeded","message":"x"}}"#).unwrap();
        assert_eq!(body.error.kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_should_render_kind_and_message() {
        assert_eq!(UploadError::aborted().to_string(), "aborted: Upload aborted.");
    }
}
