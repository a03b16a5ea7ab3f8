//! Per-file object resolution: key, metadata, ACL, storage class, cache control.

use updraft_model::{FileDescriptor, ObjectMetadata, SignedFile};

use crate::hooks::ObjectInfoPlan;
use crate::slug::default_object_key;

/// Everything the store needs to know about one object before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObject {
    /// Object key.
    pub key: String,
    /// Content type of the upload.
    pub content_type: String,
    /// Object metadata with lowercase keys.
    pub metadata: ObjectMetadata,
    /// Canned ACL.
    pub acl: Option<String>,
    /// Storage class.
    pub storage_class: Option<String>,
    /// `Cache-Control` value.
    pub cache_control: Option<String>,
}

impl ResolvedObject {
    /// Resolve `file` under `plan`. Missing overrides fall back to a random key
    /// and empty metadata; an empty override key counts as missing.
    #[must_use]
    pub fn resolve(file: &FileDescriptor, plan: &ObjectInfoPlan) -> Self {
        let info = plan.for_file(file).unwrap_or_default();

        let key = info
            .key
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| default_object_key(&file.name));
        let metadata = info
            .metadata
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        Self {
            key,
            content_type: file.content_type.clone(),
            metadata,
            acl: info.acl,
            storage_class: info.storage_class,
            cache_control: info.cache_control,
        }
    }

    /// Signed query parameters carrying metadata, ACL, and storage class.
    #[must_use]
    pub fn amz_query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .metadata
            .iter()
            .map(|(k, v)| (format!("x-amz-meta-{k}"), v.clone()))
            .collect();
        if let Some(acl) = &self.acl {
            params.push(("x-amz-acl".to_owned(), acl.clone()));
        }
        if let Some(storage_class) = &self.storage_class {
            params.push(("x-amz-storage-class".to_owned(), storage_class.clone()));
        }
        params
    }

    /// The public view of this object for `file`.
    #[must_use]
    pub fn signed_file(&self, file: &FileDescriptor) -> SignedFile {
        SignedFile {
            name: file.name.clone(),
            size: file.size,
            content_type: file.content_type.clone(),
            object_key: self.key.clone(),
            object_metadata: self.metadata.clone(),
            object_cache_control: self.cache_control.clone(),
        }
    }
}
