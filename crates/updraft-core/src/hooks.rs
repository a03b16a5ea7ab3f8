//! Route hooks and client metadata schemas.
//!
//! [`UploadHooks`] runs application code around signing: `before_upload`
//! may reject the request, attach intermediate metadata, redirect to another
//! bucket, and override per-file object info; `after_signed_url` sees the
//! final keys and decides the metadata returned to the client. Both default
//! to doing nothing.
//!
//! Authentication belongs here too: both hooks receive the request headers.

use std::fmt;

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::Value;
use typed_builder::TypedBuilder;
use updraft_model::{FileDescriptor, ObjectMetadata, ServerMetadata, SignedFile};

/// Error returned from a hook.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Refuse the upload. Answered with 400 `rejected` and this message.
    #[error("{0}")]
    Reject(String),

    /// Anything else. Answered with a 500.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Shorthand for [`HookError::Reject`].
    pub fn reject(message: impl Into<String>) -> Self {
        Self::Reject(message.into())
    }
}

/// Per-object overrides produced by `before_upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, TypedBuilder)]
pub struct ObjectInfo {
    /// Object key. Defaults to `{uuid}-{slug(name)}`.
    #[builder(default, setter(strip_option, into))]
    pub key: Option<String>,
    /// Object metadata. Keys are lower-cased before signing.
    #[builder(default, setter(strip_option))]
    pub metadata: Option<ObjectMetadata>,
    /// Canned ACL, e.g. `public-read`.
    #[builder(default, setter(strip_option, into))]
    pub acl: Option<String>,
    /// Storage class, e.g. `STANDARD_IA`.
    #[builder(default, setter(strip_option, into))]
    pub storage_class: Option<String>,
    /// `Cache-Control` value the object will be stored with.
    #[builder(default, setter(strip_option, into))]
    pub cache_control: Option<String>,
}

/// Per-file object info generator.
pub type ObjectInfoFn = Box<dyn Fn(&FileDescriptor) -> ObjectInfo + Send + Sync>;

/// How object info is derived for each file.
#[derive(Default)]
pub enum ObjectInfoPlan {
    /// Random key, no metadata.
    #[default]
    Default,
    /// The same overrides for every file. Meant for single-file routes; on a
    /// multiple-file route a fixed `key` would make every file collide.
    Single(ObjectInfo),
    /// Generated per file.
    PerFile(ObjectInfoFn),
}

impl ObjectInfoPlan {
    /// Overrides for `file`, if any.
    #[must_use]
    pub fn for_file(&self, file: &FileDescriptor) -> Option<ObjectInfo> {
        match self {
            Self::Default => None,
            Self::Single(info) => Some(info.clone()),
            Self::PerFile(generate) => Some(generate(file)),
        }
    }
}

impl fmt::Debug for ObjectInfoPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Single(info) => f.debug_tuple("Single").field(info).finish(),
            Self::PerFile(_) => f.write_str("PerFile(..)"),
        }
    }
}

/// Input to [`UploadHooks::before_upload`].
#[derive(Debug, Clone, Copy)]
pub struct BeforeUploadContext<'a> {
    /// Incoming request headers.
    pub headers: &'a HeaderMap,
    /// Files in request order.
    pub files: &'a [FileDescriptor],
    /// Client metadata after schema validation, `null` when absent.
    pub client_metadata: &'a Value,
}

/// Output of [`UploadHooks::before_upload`].
#[derive(Debug, Default)]
pub struct BeforeUpload {
    /// Intermediate metadata handed to `after_signed_url`.
    pub metadata: ServerMetadata,
    /// Upload to this bucket instead of the router default.
    pub bucket_name: Option<String>,
    /// Object info derivation.
    pub object_info: ObjectInfoPlan,
}

/// Input to [`UploadHooks::after_signed_url`].
#[derive(Debug, Clone, Copy)]
pub struct AfterSignedUrlContext<'a> {
    /// Incoming request headers.
    pub headers: &'a HeaderMap,
    /// Signed files with their final keys, in request order.
    pub files: &'a [SignedFile],
    /// Intermediate metadata from `before_upload`.
    pub metadata: &'a ServerMetadata,
    /// Client metadata after schema validation.
    pub client_metadata: &'a Value,
}

/// Output of [`UploadHooks::after_signed_url`].
#[derive(Debug, Default)]
pub struct AfterSignedUrl {
    /// Metadata returned to the client.
    pub metadata: ServerMetadata,
}

/// Application hooks for a route.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use updraft_core::hooks::{BeforeUpload, BeforeUploadContext, HookError, UploadHooks};
///
/// #[derive(Debug)]
/// struct RequireAuth;
///
/// #[async_trait]
/// impl UploadHooks for RequireAuth {
///     async fn before_upload(
///         &self,
///         ctx: BeforeUploadContext<'_>,
///     ) -> Result<BeforeUpload, HookError> {
///         if ctx.headers.get("authorization").is_none() {
///             return Err(HookError::reject("Not logged in."));
///         }
///         Ok(BeforeUpload::default())
///     }
/// }
/// ```
#[async_trait]
pub trait UploadHooks: Send + Sync {
    /// Runs after all policy checks and before any key is derived.
    async fn before_upload(&self, _ctx: BeforeUploadContext<'_>) -> Result<BeforeUpload, HookError> {
        Ok(BeforeUpload::default())
    }

    /// Runs after every URL has been signed.
    async fn after_signed_url(
        &self,
        _ctx: AfterSignedUrlContext<'_>,
    ) -> Result<AfterSignedUrl, HookError> {
        Ok(AfterSignedUrl::default())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl UploadHooks for NoHooks {}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// What is wrong.
    pub message: String,
    /// Path to the offending value, outermost first.
    pub path: Vec<String>,
}

impl SchemaIssue {
    /// Create an issue at the root.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }
}

/// Validator for client metadata.
///
/// Returns the (possibly transformed) value on success; that value replaces
/// the raw metadata for the rest of the request.
pub trait MetadataSchema: Send + Sync {
    /// Validate `value`, which is `null` when the client sent no metadata.
    ///
    /// # Errors
    ///
    /// Returns every issue found.
    fn validate(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>>;
}

impl<F> MetadataSchema for F
where
    F: Fn(&Value) -> Result<Value, Vec<SchemaIssue>> + Send + Sync,
{
    fn validate(&self, value: &Value) -> Result<Value, Vec<SchemaIssue>> {
        self(value)
    }
}
