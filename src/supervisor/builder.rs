//! This module provides the `SupervisorBuilder` for constructing a `Supervisor`.

use std::sync::Arc;

use crate::{
    config::AppConfig,
    reconciler::Reconciler,
    registry::PlatformRegistry,
    store::{EventRecorder, ResourceStore},
};

use super::{Supervisor, SupervisorError};

/// A builder for creating a `Supervisor` instance.
#[derive(Default)]
pub struct SupervisorBuilder {
    config: Option<AppConfig>,
    store: Option<Arc<dyn ResourceStore>>,
    registry: Option<Arc<PlatformRegistry>>,
    events: Option<Arc<dyn EventRecorder>>,
}

impl SupervisorBuilder {
    /// Creates a new, empty `SupervisorBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application configuration for the `Supervisor`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the resource store for the `Supervisor`.
    pub fn store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the platform registry for the `Supervisor`.
    pub fn registry(mut self, registry: Arc<PlatformRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the event recorder for the `Supervisor`.
    pub fn events(mut self, events: Arc<dyn EventRecorder>) -> Self {
        self.events = Some(events);
        self
    }

    /// Assembles and validates the components to build a `Supervisor`.
    ///
    /// Ensures all required collaborators have been provided, then wires the
    /// reconciler and the worker queue.
    pub fn build(self) -> Result<Supervisor, SupervisorError> {
        let config = self.config.ok_or(SupervisorError::MissingConfig)?;
        let store = self.store.ok_or(SupervisorError::MissingStore)?;
        let registry = self.registry.ok_or(SupervisorError::MissingRegistry)?;
        let events = self.events.ok_or(SupervisorError::MissingEventRecorder)?;

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Wiring supervisor components."
        );
        let reconciler = Arc::new(Reconciler::new(store, registry, events));
        Ok(Supervisor::new(config, reconciler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        monitoring::MockClientFactory,
        store::{MockEventRecorder, MockResourceStore, MockSecretStore},
    };

    fn registry() -> Arc<PlatformRegistry> {
        Arc::new(PlatformRegistry::new(
            Arc::new(MockClientFactory::new()),
            Arc::new(MockSecretStore::new()),
        ))
    }

    #[test]
    fn build_succeeds_with_all_components() {
        let result = SupervisorBuilder::new()
            .config(AppConfig::default())
            .store(Arc::new(MockResourceStore::new()))
            .registry(registry())
            .events(Arc::new(MockEventRecorder::new()))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn build_fails_if_config_is_missing() {
        let result = SupervisorBuilder::new()
            .store(Arc::new(MockResourceStore::new()))
            .registry(registry())
            .events(Arc::new(MockEventRecorder::new()))
            .build();
        assert!(matches!(result, Err(SupervisorError::MissingConfig)));
    }

    #[test]
    fn build_fails_if_store_is_missing() {
        let result = SupervisorBuilder::new()
            .config(AppConfig::default())
            .registry(registry())
            .events(Arc::new(MockEventRecorder::new()))
            .build();
        assert!(matches!(result, Err(SupervisorError::MissingStore)));
    }

    #[test]
    fn build_fails_if_registry_is_missing() {
        let result = SupervisorBuilder::new()
            .config(AppConfig::default())
            .store(Arc::new(MockResourceStore::new()))
            .events(Arc::new(MockEventRecorder::new()))
            .build();
        assert!(matches!(result, Err(SupervisorError::MissingRegistry)));
    }

    #[test]
    fn build_fails_if_event_recorder_is_missing() {
        let result = SupervisorBuilder::new()
            .config(AppConfig::default())
            .store(Arc::new(MockResourceStore::new()))
            .registry(registry())
            .build();
        assert!(matches!(result, Err(SupervisorError::MissingEventRecorder)));
    }
}
