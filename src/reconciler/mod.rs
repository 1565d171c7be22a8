//! The convergence reconciler: a fixed five-phase pipeline executed once per
//! reconcile request. Configure resolves the platform handle and initializes
//! status; read fetches actual external state; diff compares it against the
//! desired state; apply creates, updates or deletes under the resource's
//! policy gates; finalize records the outcome as a status condition and
//! events.
//!
//! The pipeline is safe to run concurrently for different resource
//! identities; serializing requests for the same identity is the caller's
//! responsibility. The platform handle resolved in the configure phase is
//! used for the entire pass, even if the registry swaps mid-flight.

mod error;

use std::sync::Arc;

pub use error::{ReconcileCause, ReconcileError, ReconcilePhase};

use crate::{
    diff::{self, Diff},
    models::{
        Condition, DesiredObject, ExternalIdentity, MonitoringObject, ObjectStatus, Phase,
        ResourceId,
    },
    registry::{ComputedPlatform, PlatformRegistry, DEFAULT_PLATFORM},
    store::{EventKind, EventRecorder, ResourceStore},
};

/// The finalizer this engine places on generated objects and waits on before
/// the store physically deletes a resource.
pub const FINALIZER: &str = "monitoring.vigil.io/cleanup";

/// A request to reconcile one resource identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    /// The resource to reconcile.
    pub id: ResourceId,
}

impl ReconcileRequest {
    /// Creates a request for the given identity.
    pub fn new(id: ResourceId) -> Self {
        Self { id }
    }
}

/// What the apply phase did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// The external object was created.
    Created,
    /// The external object was updated.
    Updated,
    /// Nothing needed to change, or the change was policy-suppressed.
    Unchanged,
}

impl Action {
    fn message(self) -> &'static str {
        match self {
            Action::Created => "external object created",
            Action::Updated => "external object updated",
            Action::Unchanged => "external object is up to date",
        }
    }
}

/// The overall outcome of a reconcile pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The pass completed; the external system matches the desired state
    /// (or the difference was policy-suppressed).
    Converged(Action),
    /// The resource was deleted and its external object cleaned up.
    Removed,
    /// The resource vanished before or during the pass; nothing to do.
    Vanished,
}

enum Converge {
    Done(Action, ExternalIdentity),
    Aborted,
}

/// The generic per-resource convergence reconciler.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    registry: Arc<PlatformRegistry>,
    events: Arc<dyn EventRecorder>,
}

impl Reconciler {
    /// Creates a reconciler over the given collaborators.
    pub fn new(
        store: Arc<dyn ResourceStore>,
        registry: Arc<PlatformRegistry>,
        events: Arc<dyn EventRecorder>,
    ) -> Self {
        Self { store, registry, events }
    }

    /// Runs one reconcile pass for the requested resource.
    ///
    /// On error the status condition is set to failed and a warning event is
    /// emitted before the error is returned; the caller is responsible for
    /// requeueing after the fixed backoff.
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<Outcome, ReconcileError> {
        let id = &request.id;

        // Phase 1: configure.
        let object = self
            .store
            .get_monitoring_object(&id.namespace, &id.name)
            .await
            .map_err(|e| ReconcileError::new(ReconcilePhase::Configure, id, e))?;
        let Some(object) = object else {
            tracing::debug!(resource = %id, "Resource vanished before reconcile started.");
            return Ok(Outcome::Vanished);
        };

        let mut status = object.status.clone();
        if status.phase == Phase::Unknown {
            status.advance(Phase::Pending);
            status.condition = Some(Condition::pending());
            self.store
                .update_status(id, status.clone())
                .await
                .map_err(|e| ReconcileError::new(ReconcilePhase::Configure, id, e))?;
        } else if status.phase == Phase::Failed {
            status.advance(Phase::Pending);
        }

        let platform_name = object.platform.as_deref().unwrap_or(DEFAULT_PLATFORM);
        let Some(platform) = self.registry.resolve(object.platform.as_deref()) else {
            let err = ReconcileError::new(
                ReconcilePhase::Configure,
                id,
                ReconcileCause::Configuration(format!(
                    "platform '{platform_name}' is not registered"
                )),
            );
            return Err(self.fail(id, status, err).await);
        };

        if object.meta.deletion_requested && object.meta.finalizers.iter().any(|f| f == FINALIZER)
        {
            return self.finalize_deletion(&object, &platform, status).await;
        }

        // Phases 2-4: read, diff, apply.
        match self.converge(&object, &platform).await {
            Ok(Converge::Aborted) => {
                tracing::debug!(resource = %id, "Resource vanished mid-reconcile, aborting pass.");
                Ok(Outcome::Vanished)
            }
            Ok(Converge::Done(action, identity)) => {
                // Phase 5: finalize.
                status.advance(Phase::Converged);
                status.condition = Some(Condition::converged(action.message()));
                status.external_identity = Some(identity);
                self.store
                    .update_status(id, status)
                    .await
                    .map_err(|e| ReconcileError::new(ReconcilePhase::Finalize, id, e))?;
                if action != Action::Unchanged {
                    self.events.event(id, EventKind::Normal, "Converged", action.message());
                }
                tracing::info!(resource = %id, action = ?action, "Reconcile pass completed.");
                Ok(Outcome::Converged(action))
            }
            Err(err) => Err(self.fail(id, status, err).await),
        }
    }

    /// Records a failed pass: failed condition, warning event, warn log.
    /// A status write failure is logged but never masks the original error.
    async fn fail(
        &self,
        id: &ResourceId,
        mut status: ObjectStatus,
        err: ReconcileError,
    ) -> ReconcileError {
        status.advance(Phase::Failed);
        status.condition = Some(Condition::failed(err.to_string()));
        if let Err(status_err) = self.store.update_status(id, status).await {
            tracing::warn!(resource = %id, error = %status_err, "Failed to record failed condition.");
        }
        self.events.event(id, EventKind::Warning, "ConvergeFailed", &err.to_string());
        tracing::warn!(resource = %id, error = %err, "Reconcile pass failed.");
        err
    }

    /// Phases 2-4 for a live resource: read actual state, diff, apply under
    /// policy gates. Phase boundaries re-check that the resource still
    /// exists; a vanished resource aborts the pass without compensation.
    async fn converge(
        &self,
        object: &MonitoringObject,
        platform: &ComputedPlatform,
    ) -> Result<Converge, ReconcileError> {
        let id = object.id();
        let policy = &object.policy;
        let exclude = &policy.exclude_fields_on_diff;

        match &object.spec {
            DesiredObject::Service(desired) => {
                // Renames reconcile against the last-known external identity
                // until convergence completes.
                let identity = object.status.external_identity.clone().unwrap_or_else(|| {
                    ExternalIdentity { host: desired.host.clone(), name: desired.name.clone() }
                });

                let actual = platform
                    .client
                    .get_service(&identity.host, &identity.name)
                    .await
                    .map_err(|e| ReconcileError::new(ReconcilePhase::Read, &id, e))?;
                if self.vanished(&id, ReconcilePhase::Read).await? {
                    return Ok(Converge::Aborted);
                }

                let diff = diff::diff_service(actual.as_ref(), desired, exclude);
                self.trace_diff(&id, &diff);
                if self.vanished(&id, ReconcilePhase::Diff).await? {
                    return Ok(Converge::Aborted);
                }

                if diff.need_create {
                    if policy.no_create {
                        tracing::debug!(resource = %id, "Create suppressed by policy.");
                        return Ok(Converge::Done(Action::Unchanged, identity));
                    }
                    platform
                        .client
                        .create_service(desired)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                    let identity = ExternalIdentity {
                        host: desired.host.clone(),
                        name: desired.name.clone(),
                    };
                    return Ok(Converge::Done(Action::Created, identity));
                }
                if diff.need_update {
                    if policy.no_update {
                        tracing::debug!(resource = %id, "Update suppressed by policy.");
                        return Ok(Converge::Done(Action::Unchanged, identity));
                    }
                    platform
                        .client
                        .update_service(&identity.host, &identity.name, &diff)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                    return Ok(Converge::Done(Action::Updated, identity));
                }
                Ok(Converge::Done(Action::Unchanged, identity))
            }
            DesiredObject::ServiceGroup(desired) => {
                let identity = object
                    .status
                    .external_identity
                    .clone()
                    .unwrap_or_else(|| ExternalIdentity { host: String::new(), name: desired.name.clone() });

                let actual = platform
                    .client
                    .get_service_group(&identity.name)
                    .await
                    .map_err(|e| ReconcileError::new(ReconcilePhase::Read, &id, e))?;
                if self.vanished(&id, ReconcilePhase::Read).await? {
                    return Ok(Converge::Aborted);
                }

                let diff = diff::diff_service_group(actual.as_ref(), desired, exclude);
                self.trace_diff(&id, &diff);

                if diff.need_create {
                    if policy.no_create {
                        return Ok(Converge::Done(Action::Unchanged, identity));
                    }
                    platform
                        .client
                        .create_service_group(desired)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                    let identity =
                        ExternalIdentity { host: String::new(), name: desired.name.clone() };
                    return Ok(Converge::Done(Action::Created, identity));
                }
                if diff.need_update {
                    if policy.no_update {
                        return Ok(Converge::Done(Action::Unchanged, identity));
                    }
                    platform
                        .client
                        .update_service_group(&identity.name, &diff)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                    return Ok(Converge::Done(Action::Updated, identity));
                }
                Ok(Converge::Done(Action::Unchanged, identity))
            }
        }
    }

    /// Handles a resource whose deletion marker is set: re-reads the
    /// external object, deletes it unless already absent or suppressed by
    /// policy, and releases the finalizer.
    async fn finalize_deletion(
        &self,
        object: &MonitoringObject,
        platform: &ComputedPlatform,
        mut status: ObjectStatus,
    ) -> Result<Outcome, ReconcileError> {
        let id = object.id();
        status.advance(Phase::Deleting);

        let identity = object.status.external_identity.clone().unwrap_or_else(|| match &object.spec
        {
            DesiredObject::Service(s) => {
                ExternalIdentity { host: s.host.clone(), name: s.name.clone() }
            }
            DesiredObject::ServiceGroup(g) => {
                ExternalIdentity { host: String::new(), name: g.name.clone() }
            }
        });

        if object.policy.no_delete {
            tracing::info!(resource = %id, "Delete suppressed by policy, releasing finalizer only.");
        } else {
            match &object.spec {
                DesiredObject::Service(_) => {
                    let actual = platform
                        .client
                        .get_service(&identity.host, &identity.name)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Read, &id, e))?;
                    if actual.is_some() {
                        platform
                            .client
                            .delete_service(&identity.host, &identity.name)
                            .await
                            .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                        self.events.event(&id, EventKind::Normal, "Deleted", "external object deleted");
                    }
                }
                DesiredObject::ServiceGroup(_) => {
                    let actual = platform
                        .client
                        .get_service_group(&identity.name)
                        .await
                        .map_err(|e| ReconcileError::new(ReconcilePhase::Read, &id, e))?;
                    if actual.is_some() {
                        platform
                            .client
                            .delete_service_group(&identity.name)
                            .await
                            .map_err(|e| ReconcileError::new(ReconcilePhase::Apply, &id, e))?;
                        self.events.event(&id, EventKind::Normal, "Deleted", "external object deleted");
                    }
                }
            }
        }

        self.store
            .remove_finalizer(&id, FINALIZER)
            .await
            .map_err(|e| ReconcileError::new(ReconcilePhase::Finalize, &id, e))?;
        status.advance(Phase::Removed);
        tracing::info!(resource = %id, "Resource removed.");
        Ok(Outcome::Removed)
    }

    /// Phase-boundary check: whether the resource has vanished since the
    /// pass started.
    async fn vanished(&self, id: &ResourceId, phase: ReconcilePhase) -> Result<bool, ReconcileError> {
        let exists = self
            .store
            .resource_exists(id)
            .await
            .map_err(|e| ReconcileError::new(phase, id, e))?;
        Ok(!exists)
    }

    fn trace_diff(&self, id: &ResourceId, diff: &Diff) {
        if diff.is_noop() {
            tracing::debug!(resource = %id, "No differences detected.");
        } else {
            tracing::debug!(
                resource = %id,
                need_create = diff.need_create,
                need_update = diff.need_update,
                summary = %diff.summary,
                "Differences detected."
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        models::{DesiredService, ObjectMeta, PlatformSpec, Policy, TriggerKind},
        registry::PlatformRegistry,
        store::{MockEventRecorder, MockResourceStore},
        test_helpers::{
            mirror_external, InMemorySecrets, InMemoryStore, ObjectBuilder, RecordingEvents,
            ServiceBuilder, StaticClientFactory,
        },
    };

    async fn registry_with_default(
        factory: StaticClientFactory,
    ) -> Arc<PlatformRegistry> {
        let secrets = InMemorySecrets::default();
        let mut data = BTreeMap::new();
        data.insert("username".to_string(), b"admin".to_vec());
        data.insert("password".to_string(), b"pw".to_vec());
        secrets.put("monitoring", "central-credentials", data);

        let registry = PlatformRegistry::new(Arc::new(factory), Arc::new(secrets));
        let spec = PlatformSpec {
            meta: ObjectMeta::named("monitoring", "central"),
            url: "https://central.example.com/api".to_string(),
            secret_name: "central-credentials".to_string(),
            is_default: true,
            ..Default::default()
        };
        registry.observe(&spec).await.unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_vanished_resource_is_a_noop() {
        let store = Arc::new(InMemoryStore::default());
        let registry = registry_with_default(StaticClientFactory::default()).await;
        let events = Arc::new(RecordingEvents::default());
        let reconciler = Reconciler::new(store, registry, events);

        let id = ResourceId::new(TriggerKind::MonitoringService, "web", "nope");
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id)).await.unwrap();
        assert_eq!(outcome, Outcome::Vanished);
    }

    #[tokio::test]
    async fn test_unregistered_platform_is_a_configuration_error() {
        let store = Arc::new(InMemoryStore::default());
        let registry = registry_with_default(StaticClientFactory::default()).await;
        let mut events = MockEventRecorder::new();
        events.expect_event().times(1).return_const(());

        let object = ObjectBuilder::service(ServiceBuilder::new().name("ping").build())
            .namespace("web")
            .object_name("ping")
            .platform("missing")
            .build();
        let id = object.id();
        store.put_object(object);

        let reconciler = Reconciler::new(store, registry, Arc::new(events));
        let err = reconciler.reconcile(&ReconcileRequest::new(id)).await.unwrap_err();
        assert_eq!(err.phase, ReconcilePhase::Configure);
        assert!(matches!(err.source, ReconcileCause::Configuration(_)));
    }

    #[tokio::test]
    async fn test_suppressed_create_still_reports_success() {
        let store = Arc::new(InMemoryStore::default());
        let registry = registry_with_default(StaticClientFactory::default()).await;
        let events = Arc::new(RecordingEvents::default());

        let object = ObjectBuilder::service(ServiceBuilder::new().name("ping").build())
            .namespace("web")
            .object_name("ping")
            .policy(Policy { no_create: true, ..Default::default() })
            .build();
        let id = object.id();
        store.put_object(object);

        let reconciler = Reconciler::new(store.clone(), registry, events.clone());
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id.clone())).await.unwrap();
        assert_eq!(outcome, Outcome::Converged(Action::Unchanged));

        let stored = store.get_object("web", "ping").unwrap();
        assert_eq!(stored.status.phase, Phase::Converged);
        assert!(stored.status.condition.as_ref().unwrap().status);
        assert!(events.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_create_records_external_identity() {
        let store = Arc::new(InMemoryStore::default());
        let factory = StaticClientFactory::default();
        let client = factory.client();
        let registry = registry_with_default(factory).await;
        let events = Arc::new(RecordingEvents::default());

        let desired: DesiredService =
            ServiceBuilder::new().host("central").name("ping").activated(true).build();
        let object = ObjectBuilder::service(desired.clone())
            .namespace("web")
            .object_name("ping")
            .build();
        let id = object.id();
        store.put_object(object);

        let reconciler = Reconciler::new(store.clone(), registry, events);
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id)).await.unwrap();
        assert_eq!(outcome, Outcome::Converged(Action::Created));

        let stored = store.get_object("web", "ping").unwrap();
        let identity = stored.status.external_identity.unwrap();
        assert_eq!(identity.host, "central");
        assert_eq!(identity.name, "ping");
        assert!(client.created_services().iter().any(|s| s.name == "ping"));
    }

    #[tokio::test]
    async fn test_converged_object_is_unchanged_on_second_pass() {
        let store = Arc::new(InMemoryStore::default());
        let factory = StaticClientFactory::default();
        let client = factory.client();
        let registry = registry_with_default(factory).await;
        let events = Arc::new(RecordingEvents::default());

        let desired = ServiceBuilder::new().host("central").name("ping").activated(true).build();
        client.put_service(mirror_external(&desired));

        let object = ObjectBuilder::service(desired)
            .namespace("web")
            .object_name("ping")
            .build();
        let id = object.id();
        store.put_object(object);

        let reconciler = Reconciler::new(store, registry, events);
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id)).await.unwrap();
        assert_eq!(outcome, Outcome::Converged(Action::Unchanged));
    }

    #[tokio::test]
    async fn test_resource_vanishing_mid_pass_aborts() {
        let registry = registry_with_default(StaticClientFactory::default()).await;
        let object = ObjectBuilder::service(
            ServiceBuilder::new().host("central").name("ping").build(),
        )
        .namespace("web")
        .object_name("ping")
        .build();
        let id = object.id();

        let mut store = MockResourceStore::new();
        store
            .expect_get_monitoring_object()
            .returning(move |_, _| Ok(Some(object.clone())));
        store.expect_update_status().returning(|_, _| Ok(()));
        // The resource disappears between the read and diff phases.
        store.expect_resource_exists().returning(|_| Ok(false));

        let reconciler = Reconciler::new(
            Arc::new(store),
            registry,
            Arc::new(RecordingEvents::default()),
        );
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id)).await.unwrap();
        assert_eq!(outcome, Outcome::Vanished);
    }

    #[tokio::test]
    async fn test_deletion_is_idempotent_when_already_absent() {
        let store = Arc::new(InMemoryStore::default());
        let factory = StaticClientFactory::default();
        let client = factory.client();
        let registry = registry_with_default(factory).await;
        let events = Arc::new(RecordingEvents::default());

        let object = ObjectBuilder::service(ServiceBuilder::new().name("ping").build())
            .namespace("web")
            .object_name("ping")
            .deletion_requested()
            .build();
        let id = object.id();
        store.put_object(object);

        let reconciler = Reconciler::new(store.clone(), registry, events);
        let outcome = reconciler.reconcile(&ReconcileRequest::new(id.clone())).await.unwrap();
        assert_eq!(outcome, Outcome::Removed);
        assert!(client.deleted_services().is_empty());

        let stored = store.get_object("web", "ping").unwrap();
        assert!(!stored.meta.finalizers.iter().any(|f| f == FINALIZER));
    }
}
