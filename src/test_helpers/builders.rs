//! Builders for desired and external model instances in tests.

use std::collections::BTreeMap;

use crate::{
    diff::encoding,
    models::{
        DesiredObject, DesiredService, ExternalMacro, ExternalService, MonitoringObject,
        ObjectMeta, Policy,
    },
    reconciler::FINALIZER,
};

/// A builder for creating `DesiredService` instances in tests.
#[derive(Debug, Clone, Default)]
pub struct ServiceBuilder {
    service: DesiredService,
}

impl ServiceBuilder {
    /// Creates a new `ServiceBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host for the service.
    pub fn host(mut self, host: &str) -> Self {
        self.service.host = host.to_string();
        self
    }

    /// Sets the name for the service.
    pub fn name(mut self, name: &str) -> Self {
        self.service.name = name.to_string();
        self
    }

    /// Sets the check command and its arguments.
    pub fn check_command(mut self, command: &str, args: &[&str]) -> Self {
        self.service.check_command = command.to_string();
        self.service.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Sets the check interval, in minutes.
    pub fn check_interval(mut self, interval: u32) -> Self {
        self.service.check_interval = Some(interval);
        self
    }

    /// Pins the activation flag.
    pub fn activated(mut self, activated: bool) -> Self {
        self.service.activated = Some(activated);
        self
    }

    /// Sets the group membership.
    pub fn groups(mut self, groups: &[&str]) -> Self {
        self.service.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Sets one macro value.
    pub fn macro_value(mut self, name: &str, value: &str) -> Self {
        self.service.macros.insert(name.to_string(), value.to_string());
        self
    }

    /// Builds the `DesiredService`.
    pub fn build(self) -> DesiredService {
        self.service
    }
}

/// A builder for creating `ExternalService` instances in tests. Boolean
/// fields start at `"default"`, matching an external object whose flags have
/// never been pinned.
#[derive(Debug, Clone)]
pub struct ExternalServiceBuilder {
    service: ExternalService,
}

impl Default for ExternalServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalServiceBuilder {
    /// Creates a new `ExternalServiceBuilder`.
    pub fn new() -> Self {
        Self {
            service: ExternalService {
                active_checks_enabled: "default".to_string(),
                passive_checks_enabled: "default".to_string(),
                activate: "default".to_string(),
                ..Default::default()
            },
        }
    }

    /// Sets the name for the service.
    pub fn name(mut self, name: &str) -> Self {
        self.service.name = name.to_string();
        self
    }

    /// Sets the check command, including its `!`-joined arguments.
    pub fn check_command(mut self, command: &str) -> Self {
        self.service.check_command = command.to_string();
        self
    }

    /// Sets the normal check interval string.
    pub fn normal_check_interval(mut self, interval: &str) -> Self {
        self.service.normal_check_interval = interval.to_string();
        self
    }

    /// Sets the activation encoding.
    pub fn activate(mut self, activate: &str) -> Self {
        self.service.activate = activate.to_string();
        self
    }

    /// Sets the group membership.
    pub fn groups(mut self, groups: &[&str]) -> Self {
        self.service.groups = groups.iter().map(|g| g.to_string()).collect();
        self
    }

    /// Adds one macro.
    pub fn macro_value(mut self, name: &str, value: &str) -> Self {
        self.service.macros.push(ExternalMacro {
            name: name.to_string(),
            value: value.to_string(),
            is_password: false,
        });
        self
    }

    /// Builds the `ExternalService`.
    pub fn build(self) -> ExternalService {
        self.service
    }
}

/// Builds the external service a converged system would report for the given
/// desired service: every managed field mirrored in its external encoding.
pub fn mirror_external(desired: &DesiredService) -> ExternalService {
    ExternalService {
        host: desired.host.clone(),
        name: desired.name.clone(),
        check_command: encoding::join_args(&desired.check_command, &desired.args),
        normal_check_interval: desired
            .check_interval
            .map(|i| i.to_string())
            .unwrap_or_default(),
        retry_check_interval: desired
            .retry_interval
            .map(|i| i.to_string())
            .unwrap_or_default(),
        max_check_attempts: desired
            .max_check_attempts
            .map(|a| a.to_string())
            .unwrap_or_default(),
        active_checks_enabled: encoding::bool_str(desired.active_checks_enabled).to_string(),
        passive_checks_enabled: encoding::bool_str(desired.passive_checks_enabled).to_string(),
        activate: encoding::bool_str(desired.activated).to_string(),
        template: desired.template.clone(),
        groups: desired.groups.clone(),
        categories: desired.categories.clone(),
        macros: desired
            .macros
            .iter()
            .map(|(name, value)| ExternalMacro {
                name: name.clone(),
                value: value.clone(),
                is_password: false,
            })
            .collect(),
        comment: desired.comment.clone(),
    }
}

/// A builder for creating stored `MonitoringObject` instances in tests. The
/// built object carries the cleanup finalizer, like every generated object.
#[derive(Debug, Clone)]
pub struct ObjectBuilder {
    spec: DesiredObject,
    namespace: String,
    object_name: Option<String>,
    platform: Option<String>,
    policy: Policy,
    deletion_requested: bool,
}

impl ObjectBuilder {
    /// Starts a builder for a service-kind object.
    pub fn service(service: DesiredService) -> Self {
        Self {
            spec: DesiredObject::Service(service),
            namespace: "default".to_string(),
            object_name: None,
            platform: None,
            policy: Policy::default(),
            deletion_requested: false,
        }
    }

    /// Sets the namespace for the object.
    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Sets the store name for the object.
    pub fn object_name(mut self, name: &str) -> Self {
        self.object_name = Some(name.to_string());
        self
    }

    /// Sets the platform the object converges against.
    pub fn platform(mut self, platform: &str) -> Self {
        self.platform = Some(platform.to_string());
        self
    }

    /// Sets the convergence policy.
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Marks the object as deleted in the store.
    pub fn deletion_requested(mut self) -> Self {
        self.deletion_requested = true;
        self
    }

    /// Builds the `MonitoringObject`.
    pub fn build(self) -> MonitoringObject {
        let name = self.object_name.unwrap_or_else(|| match &self.spec {
            DesiredObject::Service(s) => s.name.clone(),
            DesiredObject::ServiceGroup(g) => g.name.clone(),
        });
        let mut meta = ObjectMeta::named(self.namespace, name);
        meta.finalizers = vec![FINALIZER.to_string()];
        meta.deletion_requested = self.deletion_requested;
        MonitoringObject {
            meta,
            platform: self.platform,
            policy: self.policy,
            spec: self.spec,
            status: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_external_is_a_noop_for_diffing() {
        let desired = ServiceBuilder::new()
            .host("central")
            .name("ping")
            .check_command("check_ping", &["100"])
            .check_interval(5)
            .activated(true)
            .groups(&["sg1"])
            .macro_value("TIMEOUT", "30")
            .build();
        let external = mirror_external(&desired);

        assert_eq!(external.check_command, "check_ping!100");
        assert_eq!(external.normal_check_interval, "5");
        assert_eq!(external.activate, "1");
        assert_eq!(external.active_checks_enabled, "default");
        assert!(crate::diff::diff_service(Some(&external), &desired, &[]).is_noop());
    }

    #[test]
    fn test_object_builder_defaults_name_from_spec() {
        let object = ObjectBuilder::service(ServiceBuilder::new().name("ping").build()).build();
        assert_eq!(object.meta.name, "ping");
        assert!(object.meta.finalizers.iter().any(|f| f == FINALIZER));
        assert!(!object.meta.deletion_requested);
    }

    #[test]
    fn test_external_builder_booleans_start_unpinned() {
        let external = ExternalServiceBuilder::new().name("ping").build();
        assert_eq!(external.activate, "default");
        assert_eq!(external.active_checks_enabled, "default");
        assert_eq!(external.passive_checks_enabled, "default");
    }
}
