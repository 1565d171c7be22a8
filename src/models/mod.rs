//! Data model for Vigil: triggering resources, desired and external
//! monitoring objects, convergence policies, templates, platforms and status
//! conditions.

pub mod condition;
pub mod desired;
pub mod external;
pub mod platform;
pub mod policy;
pub mod resource;
pub mod template;

pub use condition::{Condition, ObjectStatus, Phase, CONDITION_CONVERGED};
pub use desired::{DesiredObject, DesiredService, DesiredServiceGroup, MonitoringObject};
pub use external::{ExternalIdentity, ExternalMacro, ExternalService, ExternalServiceGroup};
pub use platform::{Credentials, CredentialsError, PlatformSpec};
pub use policy::Policy;
pub use resource::{
    CertificateTrigger, ContextError, NamespaceTrigger, NodeTrigger, ObjectMeta, ObjectTrigger,
    OwnerReference, ResourceId, RouteRule, RouteTrigger, TriggerKind, TriggerResource,
};
pub use template::{Template, TemplateKind, TemplateRef};
