//! Monitoring templates: named, versioned text documents evaluated against a
//! placeholder context to produce desired monitoring objects.

use serde::{Deserialize, Serialize};

use super::resource::ObjectMeta;

/// The object kind a template produces. Must match the `kind` tag of the
/// rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    /// The template renders a monitoring service.
    Service,
    /// The template renders a monitoring service group.
    ServiceGroup,
}

/// A monitoring template. Created and updated by operators; read-only to the
/// engine except for reverse lookups that re-trigger dependents on change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Template metadata; `resource_version` tracks template revisions.
    pub meta: ObjectMeta,
    /// The declared target object kind.
    pub kind: TemplateKind,
    /// The template body.
    pub body: String,
}

/// A reference to a template, carried by triggering resources in an ordered
/// annotation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    /// Namespace of the referenced template.
    pub namespace: String,
    /// Name of the referenced template.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_ref_list_json() {
        let raw = r#"[{"namespace":"monitoring","name":"http-check"},{"namespace":"monitoring","name":"cert-expiry"}]"#;
        let refs: Vec<TemplateRef> = serde_json::from_str(raw).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "http-check");
        assert_eq!(refs[1].name, "cert-expiry");
    }
}
