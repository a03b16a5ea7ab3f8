//! HTTP layer for the Updraft signed-URL endpoint.
//!
//! - **Service** ([`service`]): [`UploadHttpService`](service::UploadHttpService)
//!   implements hyper's `Service` trait and forwards requests on the upload
//!   path to an [`UploadRouter`](updraft_core::UploadRouter).
//! - **Body** ([`body`]): The [`UploadResponseBody`](body::UploadResponseBody)
//!   type.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> UploadHttpService (hyper Service)
//!     -> Health check / CORS interception
//!     -> Upload path match
//!     -> Body collection
//!     -> UploadRouter::handle
//!     -> Common response headers (x-request-id, Server, CORS)
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use updraft_auth::{EnvCredentialResolver, StoreVendor};
//! use updraft_core::{RouteConfig, UploadRouter};
//! use updraft_http::{UploadHttpConfig, UploadHttpService};
//!
//! let router = UploadRouter::builder("uploads", Arc::new(EnvCredentialResolver::new(StoreVendor::Aws)))
//!     .route("avatar", RouteConfig::builder().file_types(&["image/*"]).build())
//!     .build();
//! let service = UploadHttpService::new(router, UploadHttpConfig::default());
//! // Use `service` with hyper server.
//! ```

pub mod body;
pub mod service;

pub use body::UploadResponseBody;
pub use service::{DEFAULT_MAX_BODY_SIZE, UploadHttpConfig, UploadHttpService};
