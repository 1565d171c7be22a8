//! Triggering resources: the cluster-visible objects whose presence or
//! annotations cause desired monitoring objects to be generated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// The kind of a resource identity, covering both triggering resources and
/// the resources this engine manages directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// An ingress-like edge route.
    Route,
    /// A cluster node.
    Node,
    /// A namespace.
    Namespace,
    /// A TLS certificate carried by a secret.
    Certificate,
    /// A generic annotated object.
    Object,
    /// A directly-authored or generated monitoring service definition.
    MonitoringService,
    /// A directly-authored or generated monitoring service group definition.
    MonitoringServiceGroup,
    /// A platform-defining resource.
    Platform,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerKind::Route => "route",
            TriggerKind::Node => "node",
            TriggerKind::Namespace => "namespace",
            TriggerKind::Certificate => "certificate",
            TriggerKind::Object => "object",
            TriggerKind::MonitoringService => "monitoring-service",
            TriggerKind::MonitoringServiceGroup => "monitoring-service-group",
            TriggerKind::Platform => "platform",
        };
        f.write_str(s)
    }
}

/// The reconcile identity of a resource: kind plus namespace plus name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// The resource kind.
    pub kind: TriggerKind,
    /// The resource namespace. Empty for cluster-scoped kinds such as nodes.
    pub namespace: String,
    /// The resource name.
    pub name: String,
}

impl ResourceId {
    /// Creates a new resource identity.
    pub fn new(kind: TriggerKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind, namespace: namespace.into(), name: name.into() }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

/// A reference from a generated object back to the resource that owns it.
/// Deleting the owner cascades to every object referencing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    /// Kind of the owning resource.
    pub kind: TriggerKind,
    /// Name of the owning resource.
    pub name: String,
    /// Unique identifier of the owning resource.
    pub uid: String,
}

/// The subset of store metadata the engine consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Resource name.
    pub name: String,
    /// Resource namespace.
    #[serde(default)]
    pub namespace: String,
    /// Unique identifier assigned by the store.
    #[serde(default)]
    pub uid: String,
    /// Optimistic-concurrency token assigned by the store.
    #[serde(default)]
    pub resource_version: String,
    /// Resource labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Resource annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// References to owning resources.
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    /// Finalizers deferring physical deletion.
    #[serde(default)]
    pub finalizers: Vec<String>,
    /// Whether the store has marked this resource for deletion.
    #[serde(default)]
    pub deletion_requested: bool,
}

impl ObjectMeta {
    /// Creates metadata with just a namespace and name set.
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), name: name.into(), ..Default::default() }
    }
}

/// Errors raised while building a placeholder context from a trigger.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The trigger carried certificate data that could not be decoded.
    #[error("invalid certificate data: {0}")]
    Certificate(String),
}

/// A triggering resource: anything whose observation produces desired
/// monitoring objects.
///
/// Each kind contributes its own placeholder entries on top of the base
/// context (name, namespace, labels, annotations). Implementations must not
/// mutate the underlying resource.
pub trait TriggerResource: Send + Sync {
    /// The kind of this trigger.
    fn kind(&self) -> TriggerKind;

    /// The trigger's metadata.
    fn meta(&self) -> &ObjectMeta;

    /// The reconcile identity of this trigger.
    fn id(&self) -> ResourceId {
        let meta = self.meta();
        ResourceId::new(self.kind(), meta.namespace.clone(), meta.name.clone())
    }

    /// Kind-specific placeholder entries merged on top of the base context.
    fn context_extensions(&self) -> Result<Map<String, Value>, ContextError> {
        Ok(Map::new())
    }
}

/// A single routing rule of an ingress-like resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Host the rule matches.
    pub host: String,
    /// URL scheme the backend is reached with.
    #[serde(default)]
    pub scheme: String,
    /// Path prefix of the rule.
    #[serde(default)]
    pub path: String,
}

/// An ingress-like edge route carrying one or more routing rules.
#[derive(Debug, Clone)]
pub struct RouteTrigger {
    /// Route metadata.
    pub meta: ObjectMeta,
    /// Routing rules of the route.
    pub rules: Vec<RouteRule>,
}

impl TriggerResource for RouteTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Route
    }

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn context_extensions(&self) -> Result<Map<String, Value>, ContextError> {
        let mut map = Map::new();
        map.insert("rules".to_string(), json!(self.rules));
        let hosts: Vec<&str> = self.rules.iter().map(|r| r.host.as_str()).collect();
        let paths: Vec<&str> = self.rules.iter().map(|r| r.path.as_str()).collect();
        map.insert("hosts".to_string(), json!(hosts));
        map.insert("paths".to_string(), json!(paths));
        Ok(map)
    }
}

/// A cluster node.
#[derive(Debug, Clone)]
pub struct NodeTrigger {
    /// Node metadata.
    pub meta: ObjectMeta,
    /// Node addresses keyed by address type (e.g. `InternalIP`).
    pub addresses: BTreeMap<String, String>,
}

impl TriggerResource for NodeTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Node
    }

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn context_extensions(&self) -> Result<Map<String, Value>, ContextError> {
        let mut map = Map::new();
        map.insert("addresses".to_string(), json!(self.addresses));
        Ok(map)
    }
}

/// A namespace.
#[derive(Debug, Clone)]
pub struct NamespaceTrigger {
    /// Namespace metadata.
    pub meta: ObjectMeta,
}

impl TriggerResource for NamespaceTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Namespace
    }

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }
}

/// A TLS certificate observed through a secret. Carries the raw PEM-encoded
/// chain; the placeholder context exposes decoded certificate metadata.
#[derive(Debug, Clone)]
pub struct CertificateTrigger {
    /// Secret metadata.
    pub meta: ObjectMeta,
    /// The PEM-encoded certificate chain.
    pub cert_pem: Vec<u8>,
}

impl TriggerResource for CertificateTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Certificate
    }

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }

    fn context_extensions(&self) -> Result<Map<String, Value>, ContextError> {
        let mut map = Map::new();
        map.insert("certificates".to_string(), json!(certificate_entries(&self.cert_pem)?));
        Ok(map)
    }
}

/// A generic annotated object. Only metadata participates in generation.
#[derive(Debug, Clone)]
pub struct ObjectTrigger {
    /// Object metadata.
    pub meta: ObjectMeta,
}

impl TriggerResource for ObjectTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Object
    }

    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }
}

/// Decodes a PEM chain into per-certificate placeholder entries: subject
/// common name, issuer, DNS names and validity bounds.
fn certificate_entries(pem_bytes: &[u8]) -> Result<Vec<Value>, ContextError> {
    let mut entries = Vec::new();
    for pem in x509_parser::pem::Pem::iter_from_buffer(pem_bytes) {
        let pem = pem.map_err(|e| ContextError::Certificate(e.to_string()))?;
        let cert = pem.parse_x509().map_err(|e| ContextError::Certificate(e.to_string()))?;

        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut dns_names = Vec::new();
        if let Ok(Some(san)) = cert.subject_alternative_name() {
            for name in &san.value.general_names {
                if let x509_parser::extensions::GeneralName::DNSName(dns) = name {
                    dns_names.push(dns.to_string());
                }
            }
        }

        entries.push(json!({
            "common_name": common_name,
            "issuer": cert.issuer().to_string(),
            "dns_names": dns_names,
            "not_before": cert.validity().not_before.timestamp(),
            "not_after": cert.validity().not_after.timestamp(),
        }));
    }
    if entries.is_empty() {
        return Err(ContextError::Certificate("no certificates found in PEM data".to_string()));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_id_display() {
        let id = ResourceId::new(TriggerKind::Route, "web", "storefront");
        assert_eq!(id.to_string(), "route/web/storefront");
    }

    #[test]
    fn test_route_trigger_context_extensions() {
        let trigger = RouteTrigger {
            meta: ObjectMeta::named("web", "storefront"),
            rules: vec![
                RouteRule {
                    host: "shop.example.com".to_string(),
                    scheme: "https".to_string(),
                    path: "/".to_string(),
                },
                RouteRule {
                    host: "api.example.com".to_string(),
                    scheme: "https".to_string(),
                    path: "/v1".to_string(),
                },
            ],
        };

        let ext = trigger.context_extensions().unwrap();
        assert_eq!(ext["hosts"], json!(["shop.example.com", "api.example.com"]));
        assert_eq!(ext["paths"], json!(["/", "/v1"]));
        assert_eq!(ext["rules"][1]["path"], json!("/v1"));
    }

    #[test]
    fn test_node_trigger_context_extensions() {
        let mut addresses = BTreeMap::new();
        addresses.insert("InternalIP".to_string(), "10.0.0.5".to_string());
        let trigger = NodeTrigger { meta: ObjectMeta::named("", "worker-1"), addresses };

        let ext = trigger.context_extensions().unwrap();
        assert_eq!(ext["addresses"]["InternalIP"], json!("10.0.0.5"));
    }

    #[test]
    fn test_certificate_trigger_rejects_garbage() {
        let trigger = CertificateTrigger {
            meta: ObjectMeta::named("web", "tls-cert"),
            cert_pem: b"not a pem".to_vec(),
        };
        assert!(trigger.context_extensions().is_err());
    }

    #[test]
    fn test_namespace_trigger_has_no_extensions() {
        let trigger = NamespaceTrigger { meta: ObjectMeta::named("", "payments") };
        assert!(trigger.context_extensions().unwrap().is_empty());
        assert_eq!(trigger.id(), ResourceId::new(TriggerKind::Namespace, "", "payments"));
    }
}
