//! Store credentials and the resolver trait that produces them.
//!
//! A [`CredentialResolver`] yields a complete [`StoreCredentials`] record for a
//! configured store. [`StoreCredentials`] itself is the static resolver; the
//! vendor adapters in [`crate::vendors`] build one from explicit parameters or
//! from the environment.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::SignError;

/// Everything needed to sign URLs against one S3-compatible store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentials {
    /// Access key ID.
    #[builder(setter(into))]
    pub access_key_id: String,
    /// Secret access key. Never logged.
    #[builder(setter(into))]
    pub secret_access_key: String,
    /// Signing region, e.g. `us-east-1` or `auto`.
    #[builder(setter(into))]
    pub region: String,
    /// Endpoint origin including scheme, e.g. `https://s3.us-east-1.amazonaws.com`.
    #[builder(setter(into))]
    pub endpoint: String,
    /// Always use path-style addressing regardless of the endpoint host.
    #[builder(default)]
    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl StoreCredentials {
    /// Check that every component needed for signing is present.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::MissingValue`] naming the first empty component.
    pub fn validate(&self) -> Result<(), SignError> {
        let fields = [
            ("access key id", &self.access_key_id),
            ("secret access key", &self.secret_access_key),
            ("region", &self.region),
            ("endpoint", &self.endpoint),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(SignError::MissingValue(name));
            }
        }
        Ok(())
    }
}

/// Source of store credentials.
///
/// Implementations may read a secrets manager, environment variables, or a
/// fixed configuration. Resolution happens before any URL is signed.
pub trait CredentialResolver: Send + Sync {
    /// Resolve a complete, validated credential record.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] if any component is missing.
    fn resolve(&self) -> Result<StoreCredentials, SignError>;
}

impl CredentialResolver for StoreCredentials {
    fn resolve(&self) -> Result<StoreCredentials, SignError> {
        self.validate()?;
        Ok(self.clone())
    }
}
