//! The placeholder/template engine. Two substitution modes, both pure:
//! literal `<key>` substring replacement for annotation-driven generation,
//! and full template evaluation against a nested placeholder map for
//! template-derived generation.

pub mod context;
pub mod filters;

use std::collections::BTreeMap;

use minijinja::Environment;
use thiserror::Error;

use crate::models::{DesiredObject, Template, TemplateKind};

/// Replaces every `<key>` occurrence in `input` with `values[key]`.
/// Unmatched keys are left verbatim; there is no error path.
pub fn substitute(input: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = input.to_string();
    for (key, value) in values {
        out = out.replace(&format!("<{key}>"), value);
    }
    out
}

/// Error type for the template service.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The template body failed to parse or render.
    #[error("failed to render template: {0}")]
    Render(#[from] minijinja::Error),

    /// The rendered output did not unmarshal into a desired object.
    #[error("failed to parse rendered template output: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The rendered object kind does not match the template's declared kind.
    #[error("template '{template}' declares kind {declared:?} but rendered a {produced} document")]
    KindMismatch {
        /// Name of the offending template.
        template: String,
        /// The kind the template declares.
        declared: TemplateKind,
        /// The kind the rendered document actually carried.
        produced: &'static str,
    },
}

/// Renders template bodies with the minijinja engine and unmarshals the
/// output into desired monitoring objects.
///
/// Undefined placeholder lookups are strict: referencing a missing value
/// fails the render rather than producing a partial object.
pub struct TemplateService {
    env: Environment<'static>,
}

impl TemplateService {
    /// Creates a new template service with the helper filter library
    /// registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.add_filter("join_args", filters::join_args);
        env.add_filter("csv", filters::csv);
        env.add_filter("trim_prefix", filters::trim_prefix);
        env.add_filter("trim_suffix", filters::trim_suffix);
        Self { env }
    }

    /// Renders a template body with the given context.
    pub fn render(
        &self,
        body: &str,
        context: serde_json::Value,
    ) -> Result<String, TemplateError> {
        tracing::debug!(context = %context, "Rendering template body with context.");
        Ok(self.env.render_str(body, context)?)
    }

    /// Checks a template body for syntax errors without rendering it.
    pub fn check(&self, body: &str) -> Result<(), TemplateError> {
        self.env.template_from_str(body)?;
        Ok(())
    }

    /// Evaluates a template against a placeholder context and unmarshals the
    /// rendered output into a desired object. Any render or parse failure is
    /// a hard error for the reconcile cycle; no partial object is produced.
    pub fn evaluate(
        &self,
        template: &Template,
        context: serde_json::Value,
    ) -> Result<DesiredObject, TemplateError> {
        let rendered = self.render(&template.body, context)?;
        let object: DesiredObject = serde_yaml::from_str(&rendered)?;

        let matches = matches!(
            (template.kind, &object),
            (TemplateKind::Service, DesiredObject::Service(_))
                | (TemplateKind::ServiceGroup, DesiredObject::ServiceGroup(_))
        );
        if !matches {
            return Err(TemplateError::KindMismatch {
                template: template.meta.name.clone(),
                declared: template.kind,
                produced: match object {
                    DesiredObject::Service(_) => "service",
                    DesiredObject::ServiceGroup(_) => "service-group",
                },
            });
        }
        Ok(object)
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::ObjectMeta;

    fn service_template(body: &str) -> Template {
        Template {
            meta: ObjectMeta::named("monitoring", "http-check"),
            kind: TemplateKind::Service,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_substitute_replaces_known_keys() {
        let mut values = BTreeMap::new();
        values.insert("host".to_string(), "central".to_string());
        values.insert("name".to_string(), "ping".to_string());

        let out = substitute("check <name> on <host> (<missing>)", &values);
        assert_eq!(out, "check ping on central (<missing>)");
    }

    #[test]
    fn test_substitute_with_empty_values_is_identity() {
        let out = substitute("<host> stays", &BTreeMap::new());
        assert_eq!(out, "<host> stays");
    }

    #[test]
    fn test_evaluate_renders_service_document() {
        let template = service_template(
            "kind: service\nhost: \"{{ name }}\"\nname: http\ncheck_command: check_http\nargs: [\"{{ hosts | first }}\"]\n",
        );
        let context = json!({"name": "storefront", "hosts": ["shop.example.com"]});

        let object = TemplateService::new().evaluate(&template, context).unwrap();
        match object {
            DesiredObject::Service(s) => {
                assert_eq!(s.host, "storefront");
                assert_eq!(s.args, vec!["shop.example.com"]);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_strict_undefined_is_hard_error() {
        let template = service_template("kind: service\nname: \"{{ nope }}\"\n");
        let result = TemplateService::new().evaluate(&template, json!({}));
        assert!(matches!(result, Err(TemplateError::Render(_))));
    }

    #[test]
    fn test_evaluate_malformed_output_is_hard_error() {
        let template = service_template("kind: service\nno name here: [");
        let result = TemplateService::new().evaluate(&template, json!({}));
        assert!(matches!(result, Err(TemplateError::Parse(_))));
    }

    #[test]
    fn test_evaluate_kind_mismatch() {
        let template = Template {
            meta: ObjectMeta::named("monitoring", "group"),
            kind: TemplateKind::ServiceGroup,
            body: "kind: service\nname: ping\n".to_string(),
        };
        let result = TemplateService::new().evaluate(&template, json!({}));
        assert!(matches!(result, Err(TemplateError::KindMismatch { .. })));
    }

    #[test]
    fn test_check_flags_syntax_errors() {
        let service = TemplateService::new();
        assert!(service.check("kind: service\nname: {{ name }}\n").is_ok());
        assert!(service.check("{{ name").is_err());
    }
}
