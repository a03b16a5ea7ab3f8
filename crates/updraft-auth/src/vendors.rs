//! Store vendor adapters.
//!
//! Each S3-compatible vendor differs only in how its endpoint and signing
//! region are derived. [`StoreVendor::credentials`] builds a
//! [`StoreCredentials`] record from explicit [`VendorParams`];
//! [`VendorParams::from_env`] fills those parameters from environment
//! variables, checking the generic `AWS_*` names first and vendor-specific
//! names after.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::credentials::{CredentialResolver, StoreCredentials};
use crate::error::SignError;

/// Default Tigris endpoint.
const TIGRIS_DEFAULT_ENDPOINT: &str = "https://t3.storage.dev";

/// A supported S3-compatible store vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreVendor {
    /// Amazon S3.
    Aws,
    /// Backblaze B2.
    Backblaze,
    /// Cloudflare R2.
    Cloudflare,
    /// DigitalOcean Spaces.
    DigitalOcean,
    /// MinIO, or any self-hosted store with an explicit endpoint.
    Minio,
    /// Tigris.
    Tigris,
    /// Wasabi.
    Wasabi,
}

impl StoreVendor {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Backblaze => "backblaze",
            Self::Cloudflare => "cloudflare",
            Self::DigitalOcean => "digitalocean",
            Self::Minio => "minio",
            Self::Tigris => "tigris",
            Self::Wasabi => "wasabi",
        }
    }

    /// Build credentials for this vendor from explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingValue`] if a parameter this vendor needs is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use updraft_auth::vendors::{StoreVendor, VendorParams};
    ///
    /// let params = VendorParams {
    ///     account_id: Some("acct".to_owned()),
    ///     access_key_id: Some("AKID".to_owned()),
    ///     secret_access_key: Some("secret".to_owned()),
    ///     jurisdiction: Some("eu".to_owned()),
    ///     ..VendorParams::default()
    /// };
    /// let creds = StoreVendor::Cloudflare.credentials(&params).unwrap();
    /// assert_eq!(creds.endpoint, "https://acct.eu.r2.cloudflarestorage.com");
    /// assert_eq!(creds.region, "auto");
    /// ```
    pub fn credentials(self, params: &VendorParams) -> Result<StoreCredentials, SignError> {
        let access_key_id = required(params.access_key_id.as_deref(), "access key id")?;
        let secret_access_key =
            required(params.secret_access_key.as_deref(), "secret access key")?;

        let (region, endpoint, force_path_style) = match self {
            Self::Aws => {
                let region = required(params.region.as_deref(), "region")?;
                let endpoint = format!("https://s3.{region}.amazonaws.com");
                (region.to_owned(), endpoint, false)
            }
            Self::Backblaze => {
                let region = required(params.region.as_deref(), "region")?;
                let endpoint = format!("https://s3.{region}.backblazeb2.com");
                (region.to_owned(), endpoint, false)
            }
            Self::Cloudflare => {
                let account_id = required(params.account_id.as_deref(), "account id")?;
                let jurisdiction = params
                    .jurisdiction
                    .as_deref()
                    .filter(|j| !j.is_empty())
                    .map(|j| format!("{j}."))
                    .unwrap_or_default();
                let endpoint = format!("https://{account_id}.{jurisdiction}r2.cloudflarestorage.com");
                ("auto".to_owned(), endpoint, false)
            }
            Self::DigitalOcean => {
                let region = required(params.region.as_deref(), "region")?;
                let endpoint = format!("https://{region}.digitaloceanspaces.com");
                ("us-east-1".to_owned(), endpoint, false)
            }
            Self::Minio => {
                let region = required(params.region.as_deref(), "region")?;
                let endpoint = required(params.endpoint.as_deref(), "endpoint")?;
                (region.to_owned(), endpoint.to_owned(), true)
            }
            Self::Tigris => {
                let endpoint = params
                    .endpoint
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .unwrap_or(TIGRIS_DEFAULT_ENDPOINT);
                ("auto".to_owned(), endpoint.to_owned(), false)
            }
            Self::Wasabi => {
                let region = required(params.region.as_deref(), "region")?;
                let endpoint = format!("https://s3.{region}.wasabisys.com");
                (region.to_owned(), endpoint, false)
            }
        };

        Ok(StoreCredentials {
            access_key_id: access_key_id.to_owned(),
            secret_access_key: secret_access_key.to_owned(),
            region,
            endpoint,
            force_path_style,
        })
    }

    /// Environment variable names consulted for each parameter, in priority order.
    fn env_names(self) -> EnvNames {
        match self {
            Self::Aws => EnvNames {
                region: &["AWS_REGION"],
                access_key_id: &["AWS_ACCESS_KEY_ID"],
                secret_access_key: &["AWS_SECRET_ACCESS_KEY"],
                endpoint: &[],
                account_id: &[],
                jurisdiction: &[],
            },
            Self::Backblaze => EnvNames {
                region: &["AWS_REGION", "B2_REGION", "BACKBLAZE_REGION"],
                access_key_id: &["AWS_ACCESS_KEY_ID", "B2_APP_KEY_ID", "BACKBLAZE_APP_KEY_ID"],
                secret_access_key: &["AWS_SECRET_ACCESS_KEY", "B2_APP_KEY", "BACKBLAZE_APP_KEY"],
                endpoint: &[],
                account_id: &[],
                jurisdiction: &[],
            },
            Self::Cloudflare => EnvNames {
                region: &[],
                access_key_id: &[
                    "AWS_ACCESS_KEY_ID",
                    "CLOUDFLARE_ACCESS_KEY_ID",
                    "CLOUDFLARE_ACCESS_KEY",
                ],
                secret_access_key: &[
                    "AWS_SECRET_ACCESS_KEY",
                    "CLOUDFLARE_SECRET_ACCESS_KEY",
                    "CLOUDFLARE_SECRET_KEY",
                ],
                endpoint: &[],
                account_id: &["CLOUDFLARE_ACCOUNT_ID"],
                jurisdiction: &["CLOUDFLARE_JURISDICTION", "CLOUDFLARE_R2_JURISDICTION"],
            },
            Self::DigitalOcean => EnvNames {
                region: &["AWS_REGION", "SPACES_REGION"],
                access_key_id: &["AWS_ACCESS_KEY_ID", "SPACES_KEY"],
                secret_access_key: &["AWS_SECRET_ACCESS_KEY", "SPACES_SECRET"],
                endpoint: &[],
                account_id: &[],
                jurisdiction: &[],
            },
            Self::Minio => EnvNames {
                region: &["AWS_REGION", "MINIO_REGION"],
                access_key_id: &["AWS_ACCESS_KEY_ID", "MINIO_ACCESS_KEY_ID", "MINIO_ACCESS_KEY"],
                secret_access_key: &[
                    "AWS_SECRET_ACCESS_KEY",
                    "MINIO_SECRET_ACCESS_KEY",
                    "MINIO_SECRET_KEY",
                ],
                endpoint: &["AWS_ENDPOINT", "MINIO_ENDPOINT"],
                account_id: &[],
                jurisdiction: &[],
            },
            Self::Tigris => EnvNames {
                region: &[],
                access_key_id: &["AWS_ACCESS_KEY_ID", "TIGRIS_ACCESS_KEY_ID", "TIGRIS_ACCESS_KEY"],
                secret_access_key: &[
                    "AWS_SECRET_ACCESS_KEY",
                    "TIGRIS_SECRET_ACCESS_KEY",
                    "TIGRIS_SECRET_KEY",
                ],
                endpoint: &["TIGRIS_ENDPOINT"],
                account_id: &[],
                jurisdiction: &[],
            },
            Self::Wasabi => EnvNames {
                region: &["AWS_REGION", "WASABI_REGION"],
                access_key_id: &["AWS_ACCESS_KEY_ID", "WASABI_ACCESS_KEY_ID", "WASABI_ACCESS_KEY"],
                secret_access_key: &[
                    "AWS_SECRET_ACCESS_KEY",
                    "WASABI_SECRET_ACCESS_KEY",
                    "WASABI_SECRET_KEY",
                ],
                endpoint: &[],
                account_id: &[],
                jurisdiction: &[],
            },
        }
    }
}

impl fmt::Display for StoreVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreVendor {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" | "s3" => Ok(Self::Aws),
            "backblaze" | "b2" => Ok(Self::Backblaze),
            "cloudflare" | "r2" => Ok(Self::Cloudflare),
            "digitalocean" | "spaces" => Ok(Self::DigitalOcean),
            "minio" => Ok(Self::Minio),
            "tigris" => Ok(Self::Tigris),
            "wasabi" => Ok(Self::Wasabi),
            other => Err(SignError::UnknownVendor(other.to_owned())),
        }
    }
}

/// Raw parameters for a vendor adapter. Which fields are required depends on the vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorParams {
    /// Region (AWS, Backblaze, DigitalOcean, MinIO, Wasabi).
    pub region: Option<String>,
    /// Access key ID.
    pub access_key_id: Option<String>,
    /// Secret access key.
    pub secret_access_key: Option<String>,
    /// Explicit endpoint (MinIO, Tigris).
    pub endpoint: Option<String>,
    /// Account ID (Cloudflare).
    pub account_id: Option<String>,
    /// Data jurisdiction such as `eu` (Cloudflare).
    pub jurisdiction: Option<String>,
}

impl VendorParams {
    /// Read parameters for `vendor` from the process environment.
    #[must_use]
    pub fn from_env(vendor: StoreVendor) -> Self {
        Self::from_lookup(vendor, |name| std::env::var(name).ok())
    }

    /// Read parameters for `vendor` through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset, so a blank `AWS_REGION` falls
    /// through to the vendor-specific variable.
    pub fn from_lookup(vendor: StoreVendor, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let names = vendor.env_names();
        let first = |candidates: &[&str]| {
            candidates
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        Self {
            region: first(names.region),
            access_key_id: first(names.access_key_id),
            secret_access_key: first(names.secret_access_key),
            endpoint: first(names.endpoint),
            account_id: first(names.account_id),
            jurisdiction: first(names.jurisdiction),
        }
    }
}

/// Resolves credentials for a vendor from the environment on every call.
///
/// Re-reading lets rotated secrets take effect without a restart.
#[derive(Debug, Clone, Copy)]
pub struct EnvCredentialResolver {
    vendor: StoreVendor,
}

impl EnvCredentialResolver {
    /// Create a resolver for `vendor`.
    #[must_use]
    pub fn new(vendor: StoreVendor) -> Self {
        Self { vendor }
    }
}

impl CredentialResolver for EnvCredentialResolver {
    fn resolve(&self) -> Result<StoreCredentials, SignError> {
        let credentials = self.vendor.credentials(&VendorParams::from_env(self.vendor))?;
        debug!(vendor = %self.vendor, endpoint = %credentials.endpoint, "Resolved store credentials");
        Ok(credentials)
    }
}

struct EnvNames {
    region: &'static [&'static str],
    access_key_id: &'static [&'static str],
    secret_access_key: &'static [&'static str],
    endpoint: &'static [&'static str],
    account_id: &'static [&'static str],
    jurisdiction: &'static [&'static str],
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, SignError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(SignError::MissingValue(name))
}
