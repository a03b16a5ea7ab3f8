//! Upload defaults and server configuration.
//!
//! The `DEFAULT_*` constants fill any route option left unset (or set to
//! zero). [`ServerConfig`] describes the hosting process and loads from
//! environment variables the same way the rest of the workspace does.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default validity of a single-PUT URL, in seconds.
pub const DEFAULT_SIGNED_URL_EXPIRES_IN: u64 = 120;

/// Default per-file size limit: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default file count limit for multiple-file routes.
pub const DEFAULT_MAX_FILES: usize = 3;

/// Default multipart part size: 50 MiB.
pub const DEFAULT_PART_SIZE: u64 = 50 * 1024 * 1024;

/// Default validity of a part URL, in seconds.
pub const DEFAULT_PART_SIGNED_URL_EXPIRES_IN: u64 = 1500;

/// Default validity of the completion and abort URLs, in seconds.
pub const DEFAULT_COMPLETE_SIGNED_URL_EXPIRES_IN: u64 = 1800;

/// Largest object a single PUT may carry: 5 GiB.
pub const SINGLE_PUT_SIZE_CEILING: u64 = 5 * 1024 * 1024 * 1024;

/// Most parts a multipart upload may have.
pub const MAX_PARTS: u64 = 10_000;

/// Validity of the presigned URL used to open a multipart session, in seconds.
pub const INITIATE_SIGNED_URL_EXPIRES_IN: u64 = 60;

/// Upload server configuration.
///
/// # Examples
///
/// ```
/// use updraft_core::config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.gateway_listen, "0.0.0.0:3000");
/// assert_eq!(config.upload_path, "/api/upload");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address (e.g. `"0.0.0.0:3000"`).
    #[builder(default = String::from("0.0.0.0:3000"))]
    pub gateway_listen: String,

    /// Path the signed-URL endpoint is mounted on.
    #[builder(default = String::from("/api/upload"))]
    pub upload_path: String,

    /// Default bucket for every route.
    #[builder(default = String::from("uploads"))]
    pub bucket_name: String,

    /// Store vendor name, resolved from the environment at request time.
    #[builder(default = String::from("aws"))]
    pub store_vendor: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Whether to answer CORS preflight requests and add CORS headers.
    #[builder(default = true)]
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            gateway_listen: String::from("0.0.0.0:3000"),
            upload_path: String::from("/api/upload"),
            bucket_name: String::from("uploads"),
            store_vendor: String::from("aws"),
            log_level: String::from("info"),
            cors_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:3000` |
    /// | `UPLOAD_PATH` | `/api/upload` |
    /// | `UPLOAD_BUCKET` | `uploads` |
    /// | `STORE_VENDOR` | `aws` |
    /// | `LOG_LEVEL` | `info` |
    /// | `CORS_ENABLED` | `true` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("UPLOAD_PATH") {
            config.upload_path = v;
        }
        if let Some(v) = lookup("UPLOAD_BUCKET") {
            config.bucket_name = v;
        }
        if let Some(v) = lookup("STORE_VENDOR") {
            config.store_vendor = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(v) = lookup("CORS_ENABLED") {
            config.cors_enabled = parse_bool(&v);
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
