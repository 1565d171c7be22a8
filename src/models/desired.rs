//! Desired monitoring objects: the target-state specifications compared
//! against the external monitoring system.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    condition::ObjectStatus,
    policy::Policy,
    resource::{ObjectMeta, ResourceId, TriggerKind},
};

/// The desired state of a monitoring service, keyed externally by host plus
/// name. Identity fields are immutable once the service has been created
/// against the external system.
///
/// Optional scalar fields carry three-way intent: `Some(true)`/`Some(false)`
/// pin the external value, `None` leaves it at the external system's default.
/// Numeric fields set to `None` are not managed at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredService {
    /// Host the service is attached to.
    #[serde(default)]
    pub host: String,
    /// Service name, unique per host.
    pub name: String,
    /// Name of the external service template the service is derived from.
    #[serde(default)]
    pub template: String,
    /// Check command, without arguments.
    #[serde(default)]
    pub check_command: String,
    /// Check command arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Interval between regular checks, in minutes.
    #[serde(default)]
    pub check_interval: Option<u32>,
    /// Interval between retries after a failed check, in minutes.
    #[serde(default)]
    pub retry_interval: Option<u32>,
    /// Number of check attempts before a failure is considered hard.
    #[serde(default)]
    pub max_check_attempts: Option<u32>,
    /// Whether active checks are enabled.
    #[serde(default)]
    pub active_checks_enabled: Option<bool>,
    /// Whether passive checks are accepted.
    #[serde(default)]
    pub passive_checks_enabled: Option<bool>,
    /// Whether the service is activated at all.
    #[serde(default)]
    pub activated: Option<bool>,
    /// Service groups the service belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Service categories the service belongs to.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Macro name to value mapping.
    #[serde(default)]
    pub macros: BTreeMap<String, String>,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
}

/// The desired state of a monitoring service group, keyed externally by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredServiceGroup {
    /// Group name.
    pub name: String,
    /// Free-form comment.
    #[serde(default)]
    pub comment: String,
}

/// A desired monitoring object of either supported kind. The `kind` tag is
/// what template documents declare to select the target object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DesiredObject {
    /// A monitoring service.
    Service(DesiredService),
    /// A monitoring service group.
    ServiceGroup(DesiredServiceGroup),
}

impl DesiredObject {
    /// The resource kind matching this object's variant.
    pub fn resource_kind(&self) -> TriggerKind {
        match self {
            DesiredObject::Service(_) => TriggerKind::MonitoringService,
            DesiredObject::ServiceGroup(_) => TriggerKind::MonitoringServiceGroup,
        }
    }
}

/// A desired monitoring object as stored in the declarative resource store,
/// with metadata, convergence policy and status attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringObject {
    /// Store metadata, including owner references and finalizers.
    pub meta: ObjectMeta,
    /// Name of the platform to converge against. `None` selects the default.
    #[serde(default)]
    pub platform: Option<String>,
    /// Per-resource convergence policy.
    #[serde(default)]
    pub policy: Policy,
    /// The desired object specification.
    pub spec: DesiredObject,
    /// Last-known convergence status.
    #[serde(default)]
    pub status: ObjectStatus,
}

impl MonitoringObject {
    /// The reconcile identity of this object.
    pub fn id(&self) -> ResourceId {
        ResourceId::new(
            self.spec.resource_kind(),
            self.meta.namespace.clone(),
            self.meta.name.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desired_object_kind_tag_roundtrip() {
        let doc = r#"
kind: service
host: central
name: ping
check_command: check_ping
args: ["100", "200"]
activated: true
"#;
        let object: DesiredObject = serde_yaml::from_str(doc).unwrap();
        match &object {
            DesiredObject::Service(s) => {
                assert_eq!(s.host, "central");
                assert_eq!(s.name, "ping");
                assert_eq!(s.args, vec!["100", "200"]);
                assert_eq!(s.activated, Some(true));
                assert_eq!(s.check_interval, None);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(object.resource_kind(), TriggerKind::MonitoringService);
    }

    #[test]
    fn test_service_group_kind_tag() {
        let doc = "kind: service-group\nname: web-services\n";
        let object: DesiredObject = serde_yaml::from_str(doc).unwrap();
        assert!(matches!(object, DesiredObject::ServiceGroup(_)));
        assert_eq!(object.resource_kind(), TriggerKind::MonitoringServiceGroup);
    }
}
