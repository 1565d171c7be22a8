//! In-memory fakes for the store contracts.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    models::{MonitoringObject, ObjectStatus, ResourceId, Template},
    store::{EventKind, EventRecorder, ResourceStore, SecretStore, StoreError},
};

type Key = (String, String);

/// An in-memory resource store keyed by namespace plus name.
#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<BTreeMap<Key, MonitoringObject>>,
    templates: Mutex<BTreeMap<Key, Template>>,
}

impl InMemoryStore {
    /// Inserts or replaces a monitoring object.
    pub fn put_object(&self, object: MonitoringObject) {
        let key = (object.meta.namespace.clone(), object.meta.name.clone());
        self.objects.lock().unwrap().insert(key, object);
    }

    /// Fetches a monitoring object synchronously, for assertions.
    pub fn get_object(&self, namespace: &str, name: &str) -> Option<MonitoringObject> {
        self.objects.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned()
    }

    /// Inserts or replaces a template.
    pub fn put_template(&self, template: Template) {
        let key = (template.meta.namespace.clone(), template.meta.name.clone());
        self.templates.lock().unwrap().insert(key, template);
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Template>, StoreError> {
        Ok(self.templates.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned())
    }

    async fn get_monitoring_object(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<MonitoringObject>, StoreError> {
        Ok(self.get_object(namespace, name))
    }

    async fn list_monitoring_objects(
        &self,
        label_selector: &BTreeMap<String, String>,
    ) -> Result<Vec<MonitoringObject>, StoreError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|o| {
                label_selector
                    .iter()
                    .all(|(k, v)| o.meta.labels.get(k).is_some_and(|label| label == v))
            })
            .cloned()
            .collect())
    }

    async fn create_monitoring_object(&self, object: MonitoringObject) -> Result<(), StoreError> {
        let key = (object.meta.namespace.clone(), object.meta.name.clone());
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}/{}", key.0, key.1)));
        }
        objects.insert(key, object);
        Ok(())
    }

    async fn update_monitoring_object(&self, object: MonitoringObject) -> Result<(), StoreError> {
        let key = (object.meta.namespace.clone(), object.meta.name.clone());
        let mut objects = self.objects.lock().unwrap();
        if !objects.contains_key(&key) {
            return Err(StoreError::NotFound(format!("{}/{}", key.0, key.1)));
        }
        objects.insert(key, object);
        Ok(())
    }

    async fn delete_monitoring_object(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.objects.lock().unwrap().remove(&(namespace.to_string(), name.to_string()));
        Ok(())
    }

    async fn update_status(
        &self,
        id: &ResourceId,
        status: ObjectStatus,
    ) -> Result<(), StoreError> {
        let key = (id.namespace.clone(), id.name.clone());
        let mut objects = self.objects.lock().unwrap();
        let object =
            objects.get_mut(&key).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        object.status = status;
        Ok(())
    }

    async fn remove_finalizer(&self, id: &ResourceId, finalizer: &str) -> Result<(), StoreError> {
        let key = (id.namespace.clone(), id.name.clone());
        let mut objects = self.objects.lock().unwrap();
        let object =
            objects.get_mut(&key).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        object.meta.finalizers.retain(|f| f != finalizer);
        Ok(())
    }

    async fn resource_exists(&self, id: &ResourceId) -> Result<bool, StoreError> {
        let key = (id.namespace.clone(), id.name.clone());
        Ok(self.objects.lock().unwrap().contains_key(&key))
    }
}

/// An in-memory secret store. Clones share the same underlying data, so a
/// test can rotate a secret after handing the store to a registry.
#[derive(Clone, Default)]
pub struct InMemorySecrets {
    secrets: Arc<Mutex<BTreeMap<Key, BTreeMap<String, Vec<u8>>>>>,
}

impl InMemorySecrets {
    /// Inserts or replaces a secret.
    pub fn put(&self, namespace: &str, name: &str, data: BTreeMap<String, Vec<u8>>) {
        self.secrets.lock().unwrap().insert((namespace.to_string(), name.to_string()), data);
    }
}

#[async_trait]
impl SecretStore for InMemorySecrets {
    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, Vec<u8>>>, StoreError> {
        Ok(self.secrets.lock().unwrap().get(&(namespace.to_string(), name.to_string())).cloned())
    }
}

/// One recorded event.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// The resource the event was recorded against.
    pub id: ResourceId,
    /// Event severity.
    pub kind: EventKind,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

/// An event recorder that keeps every emitted event for assertions.
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    /// All recorded events, in emission order.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// The recorded warning events only.
    pub fn warnings(&self) -> Vec<RecordedEvent> {
        self.events().into_iter().filter(|e| e.kind == EventKind::Warning).collect()
    }
}

impl EventRecorder for RecordingEvents {
    fn event(&self, id: &ResourceId, kind: EventKind, reason: &str, message: &str) {
        self.events.lock().unwrap().push(RecordedEvent {
            id: id.clone(),
            kind,
            reason: reason.to_string(),
            message: message.to_string(),
        });
    }
}
