//! The signed-URL request sent by the client to the upload server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A file the client intends to upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type as reported by the client.
    #[serde(rename = "type")]
    pub content_type: String,
}

impl FileDescriptor {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, size: u64, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
        }
    }

    /// Whether the descriptor carries a non-empty name and type.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.name.is_empty() && !self.content_type.is_empty()
    }
}

/// Body of `POST {api}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Route name.
    pub route: String,
    /// Files in client order. The response preserves this order.
    pub files: Vec<FileDescriptor>,
    /// Arbitrary client metadata, validated by the route's schema if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl UploadRequest {
    /// Whether the route is named and there is at least one well-formed file.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.route.is_empty()
            && !self.files.is_empty()
            && self.files.iter().all(FileDescriptor::is_well_formed)
    }
}
