//! Wire types shared by the Updraft upload server and client.
//!
//! - [`request`] - The signed-URL request (`route`, `files`, `metadata`)
//! - [`response`] - Single and multipart signed-URL responses
//! - [`error`] - The closed error vocabulary and its JSON envelope

pub mod error;
pub mod request;
pub mod response;

pub use error::{ErrorBody, ErrorKind, UploadError};
pub use request::{FileDescriptor, UploadRequest};
pub use response::{
    MultipartFile, MultipartUrls, ObjectMetadata, PartUrl, ServerMetadata, SignedFile,
    SignedFileUrl, SignedUrlResponse, SignedUrls,
};
