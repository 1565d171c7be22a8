//! A stateful fake of the external monitoring system for tests.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    diff::Diff,
    models::{
        Credentials, DesiredService, DesiredServiceGroup, ExternalIdentity, ExternalMacro,
        ExternalService, ExternalServiceGroup, PlatformSpec,
    },
    monitoring::{ClientFactory, MonitoringClient, MonitoringError},
    test_helpers::mirror_external,
};

#[derive(Default)]
struct ClientState {
    services: BTreeMap<(String, String), ExternalService>,
    groups: BTreeMap<String, ExternalServiceGroup>,
    created_services: Vec<ExternalService>,
    deleted_services: Vec<ExternalIdentity>,
    created_groups: Vec<ExternalServiceGroup>,
    deleted_groups: Vec<String>,
}

/// A fake monitoring client backed by in-memory maps. Creates mirror the
/// desired state into external encodings; updates apply the diff's parameter
/// set the way the real system would.
#[derive(Default)]
pub struct FakeMonitoringClient {
    state: Mutex<ClientState>,
}

impl FakeMonitoringClient {
    /// Seeds an existing external service.
    pub fn put_service(&self, service: ExternalService) {
        let key = (service.host.clone(), service.name.clone());
        self.state.lock().unwrap().services.insert(key, service);
    }

    /// Seeds an existing external service group.
    pub fn put_service_group(&self, group: ExternalServiceGroup) {
        self.state.lock().unwrap().groups.insert(group.name.clone(), group);
    }

    /// Every service created through this client.
    pub fn created_services(&self) -> Vec<ExternalService> {
        self.state.lock().unwrap().created_services.clone()
    }

    /// The identities of every service deleted through this client.
    pub fn deleted_services(&self) -> Vec<ExternalIdentity> {
        self.state.lock().unwrap().deleted_services.clone()
    }

    /// Every service group created through this client.
    pub fn created_groups(&self) -> Vec<ExternalServiceGroup> {
        self.state.lock().unwrap().created_groups.clone()
    }

    /// The names of every service group deleted through this client.
    pub fn deleted_groups(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_groups.clone()
    }
}

fn apply_diff(service: &mut ExternalService, diff: &Diff) {
    for (field, value) in &diff.params_to_set {
        match field.as_str() {
            "check_command" => service.check_command = value.clone(),
            "normal_check_interval" => service.normal_check_interval = value.clone(),
            "retry_check_interval" => service.retry_check_interval = value.clone(),
            "max_check_attempts" => service.max_check_attempts = value.clone(),
            "active_checks_enabled" => service.active_checks_enabled = value.clone(),
            "passive_checks_enabled" => service.passive_checks_enabled = value.clone(),
            "activate" => service.activate = value.clone(),
            "template" => service.template = value.clone(),
            "comment" => service.comment = value.clone(),
            _ => {}
        }
    }
    if let Some(groups) = &diff.groups_to_set {
        service.groups = groups.clone();
    }
    if let Some(categories) = &diff.categories_to_set {
        service.categories = categories.clone();
    }
    for (name, value) in &diff.macros_to_set {
        match service.macros.iter_mut().find(|m| &m.name == name) {
            Some(existing) => existing.value = value.clone(),
            None => service.macros.push(ExternalMacro {
                name: name.clone(),
                value: value.clone(),
                is_password: false,
            }),
        }
    }
}

#[async_trait]
impl MonitoringClient for FakeMonitoringClient {
    async fn get_service(
        &self,
        host: &str,
        name: &str,
    ) -> Result<Option<ExternalService>, MonitoringError> {
        let key = (host.to_string(), name.to_string());
        Ok(self.state.lock().unwrap().services.get(&key).cloned())
    }

    async fn create_service(&self, desired: &DesiredService) -> Result<(), MonitoringError> {
        let service = mirror_external(desired);
        let mut state = self.state.lock().unwrap();
        state.created_services.push(service.clone());
        state.services.insert((service.host.clone(), service.name.clone()), service);
        Ok(())
    }

    async fn update_service(
        &self,
        host: &str,
        name: &str,
        diff: &Diff,
    ) -> Result<(), MonitoringError> {
        let key = (host.to_string(), name.to_string());
        let mut state = self.state.lock().unwrap();
        let service = state
            .services
            .get_mut(&key)
            .ok_or_else(|| MonitoringError::Api(format!("no such service: {host}/{name}")))?;
        apply_diff(service, diff);
        Ok(())
    }

    async fn delete_service(&self, host: &str, name: &str) -> Result<(), MonitoringError> {
        let key = (host.to_string(), name.to_string());
        let mut state = self.state.lock().unwrap();
        state.services.remove(&key);
        state
            .deleted_services
            .push(ExternalIdentity { host: host.to_string(), name: name.to_string() });
        Ok(())
    }

    async fn get_service_group(
        &self,
        name: &str,
    ) -> Result<Option<ExternalServiceGroup>, MonitoringError> {
        Ok(self.state.lock().unwrap().groups.get(name).cloned())
    }

    async fn create_service_group(
        &self,
        desired: &DesiredServiceGroup,
    ) -> Result<(), MonitoringError> {
        let group =
            ExternalServiceGroup { name: desired.name.clone(), comment: desired.comment.clone() };
        let mut state = self.state.lock().unwrap();
        state.created_groups.push(group.clone());
        state.groups.insert(group.name.clone(), group);
        Ok(())
    }

    async fn update_service_group(&self, name: &str, diff: &Diff) -> Result<(), MonitoringError> {
        let mut state = self.state.lock().unwrap();
        let group = state
            .groups
            .get_mut(name)
            .ok_or_else(|| MonitoringError::Api(format!("no such service group: {name}")))?;
        if let Some(comment) = diff.params_to_set.get("comment") {
            group.comment = comment.clone();
        }
        Ok(())
    }

    async fn delete_service_group(&self, name: &str) -> Result<(), MonitoringError> {
        let mut state = self.state.lock().unwrap();
        state.groups.remove(name);
        state.deleted_groups.push(name.to_string());
        Ok(())
    }
}

/// A client factory that always hands out the same fake client, so tests can
/// seed and inspect external state through the factory they injected.
#[derive(Clone)]
pub struct StaticClientFactory {
    client: Arc<FakeMonitoringClient>,
}

impl Default for StaticClientFactory {
    fn default() -> Self {
        Self { client: Arc::new(FakeMonitoringClient::default()) }
    }
}

impl StaticClientFactory {
    /// The shared fake client.
    pub fn client(&self) -> Arc<FakeMonitoringClient> {
        Arc::clone(&self.client)
    }
}

impl ClientFactory for StaticClientFactory {
    fn connect(
        &self,
        _spec: &PlatformSpec,
        _credentials: &Credentials,
    ) -> Result<Arc<dyn MonitoringClient>, MonitoringError> {
        Ok(self.client())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ServiceBuilder;

    #[tokio::test]
    async fn test_create_then_update_applies_diff() {
        let client = FakeMonitoringClient::default();
        let desired = ServiceBuilder::new()
            .host("central")
            .name("ping")
            .check_command("check_ping", &["100"])
            .build();
        client.create_service(&desired).await.unwrap();
        assert_eq!(client.created_services().len(), 1);

        let mut diff = Diff { need_update: true, ..Default::default() };
        diff.params_to_set.insert("check_command".to_string(), "check_ping!200".to_string());
        diff.groups_to_set = Some(vec!["sg1".to_string()]);
        client.update_service("central", "ping", &diff).await.unwrap();

        let stored = client.get_service("central", "ping").await.unwrap().unwrap();
        assert_eq!(stored.check_command, "check_ping!200");
        assert_eq!(stored.groups, vec!["sg1"]);
    }

    #[tokio::test]
    async fn test_delete_records_identity() {
        let client = FakeMonitoringClient::default();
        client.put_service(ExternalService {
            host: "central".to_string(),
            name: "ping".to_string(),
            ..Default::default()
        });
        client.delete_service("central", "ping").await.unwrap();
        assert!(client.get_service("central", "ping").await.unwrap().is_none());
        assert_eq!(client.deleted_services()[0].name, "ping");
    }
}
