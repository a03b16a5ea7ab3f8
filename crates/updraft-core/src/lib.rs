//! Upload routes and signed-URL issuance for Updraft.
//!
//! An [`UploadRouter`] holds named routes. Each route declares size, type,
//! and count limits plus optional hooks. A client posts the files it intends
//! to upload; the router validates them and answers with presigned URLs the
//! client uses to send bytes straight to the object store.
//!
//! # Architecture
//!
//! ```text
//! HTTP layer (updraft-http)
//!        |
//!        v
//!   UploadRouter::handle
//!        |
//!        +--> validation (shape, arity, metadata schema, policy)
//!        +--> UploadHooks::before_upload
//!        +--> ResolvedObject (keys, metadata, ACL)
//!        +--> updraft-auth presign / MultipartInitiator
//!        +--> UploadHooks::after_signed_url
//! ```

pub mod config;
pub mod error;
pub mod file_type;
pub mod hooks;
pub mod issuer;
pub mod multipart;
pub mod object;
pub mod route;
pub mod slug;
pub mod validation;

pub use config::ServerConfig;
pub use error::{IssueError, IssueRejection};
pub use hooks::{
    AfterSignedUrl, AfterSignedUrlContext, BeforeUpload, BeforeUploadContext, HookError,
    MetadataSchema, NoHooks, ObjectInfo, ObjectInfoPlan, SchemaIssue, UploadHooks,
};
pub use issuer::{IssueResponse, UploadRouter, UploadRouterBuilder};
pub use multipart::{MultipartInitiator, StoreMultipartInitiator};
pub use route::{MultipartConfig, Route, RouteConfig};
