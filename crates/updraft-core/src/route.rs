//! Upload route configuration.
//!
//! A [`RouteConfig`] is what the application declares; a [`Route`] is the
//! compiled form with every default resolved. Zero values count as unset.
//! A route that does not allow multiple files always has `max_files == 1`.
//! URL validities above the store's seven-day limit are clamped to it.

use std::fmt;
use std::sync::Arc;

use tracing::warn;
use typed_builder::TypedBuilder;
use updraft_auth::MAX_EXPIRES_IN;

use crate::config::{
    DEFAULT_COMPLETE_SIGNED_URL_EXPIRES_IN, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_FILES,
    DEFAULT_PART_SIGNED_URL_EXPIRES_IN, DEFAULT_PART_SIZE, DEFAULT_SIGNED_URL_EXPIRES_IN,
};
use crate::hooks::{MetadataSchema, NoHooks, UploadHooks};

/// Multipart options. Any unset field takes its default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TypedBuilder)]
pub struct MultipartConfig {
    /// Part size in bytes (default 50 MiB).
    #[builder(default, setter(strip_option))]
    pub part_size: Option<u64>,
    /// Validity of each part URL in seconds (default 1500).
    #[builder(default, setter(strip_option))]
    pub part_signed_url_expires_in: Option<u64>,
    /// Validity of the completion and abort URLs in seconds (default 1800).
    #[builder(default, setter(strip_option))]
    pub complete_signed_url_expires_in: Option<u64>,
}

/// Declared route options.
///
/// # Examples
///
/// ```
/// use updraft_core::route::{MultipartConfig, Route, RouteConfig};
///
/// let route = Route::from(
///     RouteConfig::builder()
///         .file_types(&["video/*"])
///         .multiple_files(true)
///         .max_files(5)
///         .max_file_size(80 * 1024 * 1024)
///         .multipart(MultipartConfig::builder().part_size(5 * 1024 * 1024).build())
///         .build(),
/// );
/// assert_eq!(route.max_files, 5);
/// assert_eq!(route.multipart.unwrap().part_size, 5 * 1024 * 1024);
/// ```
#[derive(Clone, TypedBuilder)]
pub struct RouteConfig {
    /// Per-file size limit in bytes.
    #[builder(default, setter(strip_option))]
    pub max_file_size: Option<u64>,
    /// Allowed content types; empty allows all.
    #[builder(default, setter(transform = |types: &[&str]| types.iter().map(|t| (*t).to_owned()).collect()))]
    pub file_types: Vec<String>,
    /// Whether more than one file may be uploaded per request.
    #[builder(default)]
    pub multiple_files: bool,
    /// File count limit. Ignored unless `multiple_files` is set.
    #[builder(default, setter(strip_option))]
    pub max_files: Option<usize>,
    /// Validity of single-PUT URLs in seconds.
    #[builder(default, setter(strip_option))]
    pub signed_url_expires_in: Option<u64>,
    /// Upload in parts.
    #[builder(default, setter(strip_option))]
    pub multipart: Option<MultipartConfig>,
    /// Validator for client metadata.
    #[builder(default, setter(strip_option))]
    pub client_metadata_schema: Option<Arc<dyn MetadataSchema>>,
    /// Application hooks.
    #[builder(default, setter(strip_option))]
    pub hooks: Option<Arc<dyn UploadHooks>>,
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("max_file_size", &self.max_file_size)
            .field("file_types", &self.file_types)
            .field("multiple_files", &self.multiple_files)
            .field("max_files", &self.max_files)
            .field("signed_url_expires_in", &self.signed_url_expires_in)
            .field("multipart", &self.multipart)
            .field("has_schema", &self.client_metadata_schema.is_some())
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Resolved multipart settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartSettings {
    /// Part size in bytes.
    pub part_size: u64,
    /// Validity of each part URL in seconds.
    pub part_signed_url_expires_in: u64,
    /// Validity of the completion and abort URLs in seconds.
    pub complete_signed_url_expires_in: u64,
}

/// A compiled route with all defaults applied.
#[derive(Clone)]
pub struct Route {
    /// Per-file size limit in bytes.
    pub max_file_size: u64,
    /// Allowed content types; empty allows all.
    pub file_types: Vec<String>,
    /// Whether more than one file may be uploaded per request.
    pub multiple_files: bool,
    /// File count limit; always 1 when `multiple_files` is false.
    pub max_files: usize,
    /// Validity of single-PUT URLs in seconds.
    pub signed_url_expires_in: u64,
    /// Multipart settings; `None` for single-PUT routes.
    pub multipart: Option<MultipartSettings>,
    /// Validator for client metadata.
    pub client_metadata_schema: Option<Arc<dyn MetadataSchema>>,
    /// Application hooks.
    pub hooks: Arc<dyn UploadHooks>,
}

impl Route {
    /// Whether this route uploads in parts.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.multipart.is_some()
    }
}

impl From<RouteConfig> for Route {
    fn from(config: RouteConfig) -> Self {
        let max_files = if config.multiple_files {
            non_zero(config.max_files).unwrap_or(DEFAULT_MAX_FILES)
        } else {
            1
        };

        let multipart = config.multipart.map(|m| MultipartSettings {
            part_size: non_zero(m.part_size).unwrap_or(DEFAULT_PART_SIZE),
            part_signed_url_expires_in: expiry(
                m.part_signed_url_expires_in,
                DEFAULT_PART_SIGNED_URL_EXPIRES_IN,
            ),
            complete_signed_url_expires_in: expiry(
                m.complete_signed_url_expires_in,
                DEFAULT_COMPLETE_SIGNED_URL_EXPIRES_IN,
            ),
        });

        Self {
            max_file_size: non_zero(config.max_file_size).unwrap_or(DEFAULT_MAX_FILE_SIZE),
            file_types: config.file_types,
            multiple_files: config.multiple_files,
            max_files,
            signed_url_expires_in: expiry(
                config.signed_url_expires_in,
                DEFAULT_SIGNED_URL_EXPIRES_IN,
            ),
            multipart,
            client_metadata_schema: config.client_metadata_schema,
            hooks: config.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("max_file_size", &self.max_file_size)
            .field("file_types", &self.file_types)
            .field("multiple_files", &self.multiple_files)
            .field("max_files", &self.max_files)
            .field("signed_url_expires_in", &self.signed_url_expires_in)
            .field("multipart", &self.multipart)
            .finish_non_exhaustive()
    }
}

fn non_zero<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

fn expiry(value: Option<u64>, default: u64) -> u64 {
    let seconds = non_zero(value).unwrap_or(default);
    if seconds > MAX_EXPIRES_IN {
        warn!(seconds, max = MAX_EXPIRES_IN, "Clamping signed URL validity to the store limit");
        return MAX_EXPIRES_IN;
    }
    seconds
}
