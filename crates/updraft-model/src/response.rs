//! The signed-URL response returned by the upload server.
//!
//! A route answers with either one presigned PUT per file or, for multipart
//! routes, a set of per-part URLs plus completion and abort URLs per file.
//! Entries appear in the same order as the request's files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::request::FileDescriptor;

/// Object metadata stored alongside an object (`x-amz-meta-*`). Keys are lowercase.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Free-form server metadata returned to the client.
pub type ServerMetadata = Map<String, Value>;

/// A file after key derivation: the descriptor plus where it will be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFile {
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Object key in the bucket.
    pub object_key: String,
    /// Metadata the client must send as `x-amz-meta-*` headers.
    #[serde(default)]
    pub object_metadata: ObjectMetadata,
    /// `Cache-Control` value the client must send, when one was signed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_cache_control: Option<String>,
}

impl SignedFile {
    /// Whether this entry describes `descriptor`.
    #[must_use]
    pub fn describes(&self, descriptor: &FileDescriptor) -> bool {
        self.name == descriptor.name
            && self.size == descriptor.size
            && self.content_type == descriptor.content_type
    }
}

/// A single-request upload URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFileUrl {
    /// Presigned PUT URL.
    pub signed_url: String,
    /// The file it uploads.
    pub file: SignedFile,
}

/// One part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartUrl {
    /// Presigned `PUT ?partNumber=N&uploadId=X` URL.
    pub signed_url: String,
    /// 1-based part number.
    pub part_number: u32,
    /// Exact byte count of this part.
    pub size: u64,
}

/// Everything needed to upload one file in parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartFile {
    /// The file.
    pub file: SignedFile,
    /// Parts in ascending part number order.
    pub parts: Vec<PartUrl>,
    /// Store-assigned multipart session id.
    pub upload_id: String,
    /// Presigned `POST ?uploadId=X` completion URL.
    pub complete_signed_url: String,
    /// Presigned `DELETE ?uploadId=X` abort URL.
    pub abort_signed_url: String,
}

/// Multipart variant of the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUrls {
    /// Per-file multipart entries.
    pub files: Vec<MultipartFile>,
    /// Part size in bytes. Every part except the last has exactly this size.
    pub part_size: u64,
}

/// The URL payload of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignedUrls {
    /// One PUT per file.
    #[serde(rename = "files")]
    Single(Vec<SignedFileUrl>),
    /// Multipart sessions.
    #[serde(rename = "multipart")]
    Multipart(MultipartUrls),
}

impl SignedUrls {
    /// Number of file entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(files) => files.len(),
            Self::Multipart(multipart) => multipart.files.len(),
        }
    }

    /// Whether there are no file entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The signed files, in response order.
    #[must_use]
    pub fn signed_files(&self) -> Vec<&SignedFile> {
        match self {
            Self::Single(files) => files.iter().map(|f| &f.file).collect(),
            Self::Multipart(multipart) => multipart.files.iter().map(|f| &f.file).collect(),
        }
    }
}

/// Success body of `POST {api}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedUrlResponse {
    /// Either `files` or `multipart`.
    #[serde(flatten)]
    pub urls: SignedUrls,
    /// Metadata from the after-signing hook.
    #[serde(default)]
    pub metadata: ServerMetadata,
}
