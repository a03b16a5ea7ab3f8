//! S3 multipart XML documents for Updraft.
//!
//! Only the handful of documents an upload orchestrator exchanges with a store
//! are modelled:
//!
//! - [`CompleteMultipartUpload`] (request body of the completion POST)
//! - [`InitiateMultipartUploadResult`] (response of `POST ?uploads`)
//! - [`CompleteMultipartUploadResult`] (response of the completion POST)
//! - [`S3ErrorDocument`] (the flat `<Error>` body S3 returns on failure, sometimes with a 200)

pub mod deserialize;
pub mod error;
pub mod serialize;

pub use deserialize::{
    CompleteMultipartUploadResult, InitiateMultipartUploadResult, S3ErrorDocument, XmlDeserialize,
    from_xml,
};
pub use error::XmlError;
pub use serialize::{CompleteMultipartUpload, CompletedPart, XmlSerialize, to_xml};
