//! Error types for URL presigning and credential resolution.

/// Errors that can occur while resolving store credentials or presigning a URL.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// A required credential or endpoint component is missing or empty.
    #[error("Missing store configuration value: {0}")]
    MissingValue(&'static str),

    /// The configured endpoint could not be interpreted as a URL origin.
    #[error("Invalid store endpoint: {0}")]
    InvalidEndpoint(String),

    /// The requested expiry is outside what SigV4 allows (1 second to 7 days).
    #[error("Invalid presign expiry: {0} seconds")]
    InvalidExpiry(u64),

    /// The bucket name or object key is empty.
    #[error("Invalid object address: {0}")]
    InvalidAddress(&'static str),

    /// The vendor name does not match any known store vendor.
    #[error("Unknown store vendor: {0}")]
    UnknownVendor(String),
}
