//! Trait definitions for the declarative resource store collaborators.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::models::{MonitoringObject, ObjectStatus, ResourceId, Template};

/// Errors surfaced by the resource store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// An optimistic-concurrency conflict; the caller holds a stale
    /// resource version.
    #[error("resource version conflict for {0}")]
    Conflict(String),

    /// A resource document failed to serialize or deserialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other store-side failure.
    #[error("store error: {0}")]
    Internal(String),
}

/// The declarative resource store contract. Watch/event delivery and
/// optimistic-concurrency enforcement live with the implementation; the
/// engine only reads, writes and lists.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetches a template by namespace and name.
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Template>, StoreError>;

    /// Fetches a desired monitoring object by namespace and name.
    async fn get_monitoring_object(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<MonitoringObject>, StoreError>;

    /// Lists desired monitoring objects matching every label in the
    /// selector.
    async fn list_monitoring_objects(
        &self,
        label_selector: &BTreeMap<String, String>,
    ) -> Result<Vec<MonitoringObject>, StoreError>;

    /// Creates a desired monitoring object.
    async fn create_monitoring_object(&self, object: MonitoringObject) -> Result<(), StoreError>;

    /// Updates a desired monitoring object in place.
    async fn update_monitoring_object(&self, object: MonitoringObject) -> Result<(), StoreError>;

    /// Deletes a desired monitoring object.
    async fn delete_monitoring_object(&self, namespace: &str, name: &str)
        -> Result<(), StoreError>;

    /// Writes the status block of a managed resource.
    async fn update_status(&self, id: &ResourceId, status: ObjectStatus)
        -> Result<(), StoreError>;

    /// Removes a finalizer, releasing the resource for physical deletion.
    async fn remove_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), StoreError>;

    /// Whether the resource still exists. Used at phase boundaries for
    /// cooperative cancellation of a reconcile whose resource vanished.
    async fn resource_exists(&self, id: &ResourceId) -> Result<bool, StoreError>;
}

/// Lookup of named credential secrets.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches secret data by namespace and name, or `None` if the secret
    /// has not been created yet.
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, StoreError>;
}

/// The severity of an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Informational event.
    Normal,
    /// Warning event, emitted for every failed reconcile pass.
    Warning,
}

/// Emits per-resource events for observability.
#[cfg_attr(test, automock)]
pub trait EventRecorder: Send + Sync {
    /// Records an event against the given resource.
    fn event(&self, id: &ResourceId, kind: EventKind, reason: &str, message: &str);
}
