//! The platform registry: named external-system client handles, rebuilt
//! whenever credentials or connection settings change.
//!
//! The registry state is an atomic snapshot: lookups load the current map
//! without locking while a single writer replaces the whole map on change.
//! Handles are replaced, never mutated in place; a reconcile keeps using the
//! snapshot it resolved in its configure phase even if the registry swaps
//! mid-pass.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    models::{platform::CredentialsError, Credentials, PlatformSpec},
    monitoring::{ClientFactory, MonitoringClient, MonitoringError},
    store::{SecretStore, StoreError},
};

/// The registry alias a platform marked as default is also stored under.
pub const DEFAULT_PLATFORM: &str = "default";

/// Errors raised while observing platform resources.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced credential secret is malformed. Fatal for the
    /// platform until corrected externally.
    #[error("platform '{platform}': {source}")]
    Credentials {
        /// Name of the offending platform.
        platform: String,
        /// The underlying credential error.
        #[source]
        source: CredentialsError,
    },

    /// The secret store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Building the client handle failed.
    #[error(transparent)]
    Monitoring(#[from] MonitoringError),
}

/// A computed platform: the client handle, the specification snapshot it was
/// built from, and the content hash that decides when to rebuild.
pub struct ComputedPlatform {
    /// Registry name of the platform.
    pub name: String,
    /// The external monitoring client handle.
    pub client: Arc<dyn MonitoringClient>,
    /// The specification the handle was built from.
    pub spec: PlatformSpec,
    /// Hash over normalized connection settings plus credential material.
    pub content_hash: String,
    /// Hash over the raw credential secret contents, for write-back onto the
    /// platform resource's `secret_hash` field after rotation.
    pub secret_hash: String,
}

/// The outcome of observing a platform resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserveOutcome {
    /// A new handle was built and swapped in.
    Rebuilt,
    /// The content hash matched the stored entry; nothing changed.
    Unchanged,
    /// The referenced secret does not exist yet. Benign; the platform is
    /// re-observed once the secret appears.
    SecretMissing,
}

/// Maintains the name-keyed map of computed platforms.
pub struct PlatformRegistry {
    factory: Arc<dyn ClientFactory>,
    secrets: Arc<dyn SecretStore>,
    platforms: ArcSwap<HashMap<String, Arc<ComputedPlatform>>>,
}

impl PlatformRegistry {
    /// Creates an empty registry.
    pub fn new(factory: Arc<dyn ClientFactory>, secrets: Arc<dyn SecretStore>) -> Self {
        Self { factory, secrets, platforms: ArcSwap::new(Arc::new(HashMap::new())) }
    }

    /// Looks up a platform handle by name.
    pub fn lookup(&self, name: &str) -> Option<Arc<ComputedPlatform>> {
        self.platforms.load().get(name).cloned()
    }

    /// Looks up a platform handle, falling back to the default alias when
    /// `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Option<Arc<ComputedPlatform>> {
        self.lookup(name.unwrap_or(DEFAULT_PLATFORM))
    }

    /// Processes one observation of a platform-defining resource: resolves
    /// its credential secret, hashes settings plus credentials, and rebuilds
    /// the handle when the hash differs from the stored entry.
    ///
    /// Observations are expected to arrive from a single writer; concurrent
    /// lookups are safe throughout.
    pub async fn observe(&self, platform: &PlatformSpec) -> Result<ObserveOutcome, RegistryError> {
        let name = platform.meta.name.clone();

        let Some(secret) =
            self.secrets.get_secret(&platform.meta.namespace, &platform.secret_name).await?
        else {
            tracing::debug!(platform = %name, secret = %platform.secret_name, "Credential secret does not exist yet.");
            return Ok(ObserveOutcome::SecretMissing);
        };

        let credentials = Credentials::from_secret(&secret)
            .map_err(|source| RegistryError::Credentials { platform: name.clone(), source })?;
        let hash = platform_hash(platform, &credentials);

        if let Some(existing) = self.lookup(&name) {
            if existing.content_hash == hash {
                return Ok(ObserveOutcome::Unchanged);
            }
        }

        let client = self.factory.connect(platform, &credentials)?;
        let computed = Arc::new(ComputedPlatform {
            name: name.clone(),
            client,
            spec: platform.clone(),
            content_hash: hash,
            secret_hash: secret_content_hash(&secret),
        });

        let mut map = HashMap::clone(&self.platforms.load());
        map.insert(name.clone(), Arc::clone(&computed));
        if platform.is_default {
            map.insert(DEFAULT_PLATFORM.to_string(), computed);
        }
        self.platforms.store(Arc::new(map));

        tracing::info!(platform = %name, default = platform.is_default, "Platform handle rebuilt.");
        Ok(ObserveOutcome::Rebuilt)
    }

    /// Removes a platform on deletion of its defining resource, including
    /// the default alias when it pointed at the same platform.
    pub fn remove(&self, name: &str) {
        let mut map = HashMap::clone(&self.platforms.load());
        map.remove(name);
        if map.get(DEFAULT_PLATFORM).is_some_and(|p| p.name == name) {
            map.remove(DEFAULT_PLATFORM);
        }
        self.platforms.store(Arc::new(map));
        tracing::info!(platform = %name, "Platform removed from registry.");
    }
}

/// Hashes the normalized connection settings plus resolved credential
/// material of a platform.
fn platform_hash(spec: &PlatformSpec, credentials: &Credentials) -> String {
    let mut hasher = Sha256::new();
    for part in [
        spec.url.as_str(),
        &spec.timeout_secs.map(|t| t.to_string()).unwrap_or_default(),
        &credentials.username,
        &credentials.password,
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

/// Hashes raw secret contents. [`PlatformRegistry::observe`] records the
/// result on [`ComputedPlatform`] so the observing caller can write it back
/// onto the platform resource and force a re-reconcile when credentials
/// rotate; the registry itself never watches secrets.
pub fn secret_content_hash(data: &std::collections::BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    for (key, value) in data {
        hasher.update(key.as_bytes());
        hasher.update([0]);
        hasher.update(value);
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}
