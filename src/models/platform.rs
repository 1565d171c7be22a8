//! Platform-defining resources: named external monitoring endpoints plus
//! credential references.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resource::ObjectMeta;

/// The specification of a platform: where the external monitoring system
/// lives and which secret holds its credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformSpec {
    /// Platform metadata; the name doubles as the registry key.
    pub meta: ObjectMeta,
    /// Base URL of the external monitoring API.
    pub url: String,
    /// Name of the secret holding `username` and `password`.
    pub secret_name: String,
    /// Whether this platform also serves as the `"default"` alias.
    #[serde(default)]
    pub is_default: bool,
    /// Client timeout in seconds, if overridden.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Hash of the referenced secret's contents, written back purely to
    /// force a re-reconcile of this platform when credentials rotate.
    #[serde(default)]
    pub secret_hash: String,
}

/// Errors raised while extracting credentials from a secret.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The secret is missing a required field.
    #[error("credential secret is missing the '{0}' field")]
    MissingField(&'static str),
    /// A credential field is not valid UTF-8.
    #[error("credential field '{0}' is not valid UTF-8")]
    InvalidEncoding(&'static str),
}

/// Resolved credential material for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API username.
    pub username: String,
    /// API password.
    pub password: String,
}

impl Credentials {
    /// Extracts credentials from secret data. Absence of either field is a
    /// fatal configuration error for the platform.
    pub fn from_secret(data: &BTreeMap<String, Vec<u8>>) -> Result<Self, CredentialsError> {
        let field = |name: &'static str| -> Result<String, CredentialsError> {
            let bytes = data.get(name).ok_or(CredentialsError::MissingField(name))?;
            String::from_utf8(bytes.clone()).map_err(|_| CredentialsError::InvalidEncoding(name))
        };
        Ok(Self { username: field("username")?, password: field("password")? })
    }
}
