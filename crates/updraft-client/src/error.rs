//! Transfer errors.
//!
//! A [`TransferError`] describes why one object-store operation failed. It
//! never reaches the caller directly: the engine records the file as failed
//! with an `s3_upload` or `aborted` [`UploadError`](updraft_model::UploadError).

use http::StatusCode;
use updraft_xml::XmlError;

/// Failure of a single store operation.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store answered {status}")]
    Status {
        /// Response status.
        status: StatusCode,
    },

    /// The store answered 200 with an `<Error>` document.
    #[error("store reported {code}: {message}")]
    Store {
        /// S3 error code.
        code: String,
        /// S3 error message.
        message: String,
    },

    /// A part upload succeeded without an `ETag`.
    #[error("part {part_number} response carried no ETag")]
    MissingEtag {
        /// Part number.
        part_number: u32,
    },

    /// The local file could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The completion body could not be written.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// The cancellation token fired.
    #[error("upload aborted")]
    Aborted,
}

impl TransferError {
    /// Whether this error came from cancellation.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
