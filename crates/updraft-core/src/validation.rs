//! Request validation.
//!
//! Checks run in a fixed order and the first failing stage answers. Within
//! the per-file policy stage every file is examined and the highest-priority
//! violation wins: count, then the single-PUT ceiling, then the route size
//! limit, then content type.

use serde_json::Value;
use tracing::debug;
use updraft_model::{ErrorKind, FileDescriptor, UploadRequest};

use crate::config::{MAX_PARTS, SINGLE_PUT_SIZE_CEILING};
use crate::error::IssueRejection;
use crate::file_type::is_file_type_allowed;
use crate::route::Route;

/// Parse and shape-check a request body.
///
/// Malformed JSON is `Invalid JSON body.`; well-formed JSON that does not
/// match the request shape (including a negative or fractional size, an
/// empty route, an empty file list, or an empty name or type) is
/// `Invalid file upload schema.`.
///
/// # Errors
///
/// Returns a 400 `invalid_request` [`IssueRejection`].
pub fn parse_request(body: &[u8]) -> Result<UploadRequest, IssueRejection> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejecting malformed JSON body");
        IssueRejection::bad_request(ErrorKind::InvalidRequest, "Invalid JSON body.")
    })?;

    let invalid_schema =
        || IssueRejection::bad_request(ErrorKind::InvalidRequest, "Invalid file upload schema.");

    let request: UploadRequest = serde_json::from_value(value).map_err(|e| {
        debug!(error = %e, "Rejecting body that does not match the upload schema");
        invalid_schema()
    })?;

    if !request.is_well_formed() {
        return Err(invalid_schema());
    }
    Ok(request)
}

/// Refuse more than one file on a single-file route.
///
/// # Errors
///
/// Returns a 400 `too_many_files` [`IssueRejection`].
pub fn check_arity(route: &Route, files: &[FileDescriptor]) -> Result<(), IssueRejection> {
    if route.max_files == 1 && files.len() > 1 {
        return Err(IssueRejection::bad_request(
            ErrorKind::TooManyFiles,
            "Multiple files are not allowed.",
        ));
    }
    Ok(())
}

/// Validate client metadata against the route schema.
///
/// Absent metadata is presented to the schema as `null`. Without a schema
/// the value passes through unchanged.
///
/// # Errors
///
/// Returns a 400 `invalid_request` [`IssueRejection`] if the schema reports issues.
pub fn check_client_metadata(
    route: &Route,
    metadata: Option<Value>,
) -> Result<Value, IssueRejection> {
    let metadata = metadata.unwrap_or(Value::Null);
    match &route.client_metadata_schema {
        None => Ok(metadata),
        Some(schema) => schema.validate(&metadata).map_err(|issues| {
            debug!(issues = issues.len(), "Client metadata failed schema validation");
            IssueRejection::bad_request(ErrorKind::InvalidRequest, "Invalid metadata.")
        }),
    }
}

/// Enforce count, size, and type limits.
///
/// # Errors
///
/// Returns a 400 [`IssueRejection`] describing the highest-priority violation.
pub fn check_files(route: &Route, files: &[FileDescriptor]) -> Result<(), IssueRejection> {
    if files.len() > route.max_files {
        return Err(IssueRejection::bad_request(
            ErrorKind::TooManyFiles,
            "Too many files.",
        ));
    }

    if route.multipart.is_none() && files.iter().any(|f| f.size > SINGLE_PUT_SIZE_CEILING) {
        return Err(IssueRejection::bad_request(
            ErrorKind::FileTooLarge,
            "One or more files exceed the S3 limit of 5GB. Use multipart upload for larger files.",
        ));
    }

    if files.iter().any(|f| f.size > route.max_file_size) {
        return Err(IssueRejection::bad_request(
            ErrorKind::FileTooLarge,
            "One or more files are too large.",
        ));
    }

    if let Some(multipart) = route.multipart {
        if files
            .iter()
            .any(|f| f.size.div_ceil(multipart.part_size) > MAX_PARTS)
        {
            return Err(IssueRejection::bad_request(
                ErrorKind::FileTooLarge,
                "One or more files need more than 10000 parts. Increase the part size.",
            ));
        }
    }

    if files
        .iter()
        .any(|f| !is_file_type_allowed(&f.content_type, &route.file_types))
    {
        return Err(IssueRejection::bad_request(
            ErrorKind::InvalidFileType,
            "One or more files have an invalid file type.",
        ));
    }

    Ok(())
}
