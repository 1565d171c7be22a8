//! The template-derived resource generator. Turns a triggering resource plus
//! its referenced templates (or its override annotations) into desired
//! monitoring objects owned by the trigger.
//!
//! Each referenced template produces one independent object named
//! `{trigger}-{template}` and tagged with reverse-lookup labels, so two
//! triggers sharing a template never collide on a store key and a template
//! change can be mapped back to every dependent with a label-selector list
//! instead of a full scan.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::{
    models::{
        resource::ContextError, DesiredObject, DesiredService, MonitoringObject, ObjectMeta,
        OwnerReference, Policy, ResourceId, Template, TemplateRef, TriggerResource,
    },
    reconciler::FINALIZER,
    store::{ResourceStore, StoreError},
    templating::{
        context::{literal_values, placeholder_context},
        substitute, TemplateError, TemplateService,
    },
};

/// Annotation carrying the JSON-encoded ordered list of template references.
pub const TEMPLATES_ANNOTATION: &str = "monitoring.vigil.io/templates";

/// Annotation selecting the platform generated objects converge against.
pub const PLATFORM_ANNOTATION: &str = "monitoring.vigil.io/platform";

/// Prefix of the per-field override annotations consumed by the literal
/// substitution path.
pub const OVERRIDE_PREFIX: &str = "monitoring.vigil.io/";

/// Reverse-lookup label carrying the source template's name.
pub const TEMPLATE_NAME_LABEL: &str = "monitoring.vigil.io/template-name";

/// Reverse-lookup label carrying the source template's namespace.
pub const TEMPLATE_NAMESPACE_LABEL: &str = "monitoring.vigil.io/template-namespace";

const OVERRIDE_KEYS: &[&str] = &[
    "name",
    "host",
    "template",
    "activated",
    "check-interval",
    "retry-interval",
    "max-check-attempts",
    "active-checks-enabled",
    "passive-checks-enabled",
    "check-command",
    "args",
    "groups",
    "categories",
    "macros",
];

/// Errors raised during generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The template-reference annotation is not valid JSON.
    #[error("malformed template reference annotation: {0}")]
    Annotation(serde_json::Error),

    /// A referenced template does not exist.
    #[error("template {namespace}/{name} not found")]
    TemplateNotFound {
        /// Namespace of the missing template.
        namespace: String,
        /// Name of the missing template.
        name: String,
    },

    /// An override annotation carried an unparseable value.
    #[error("invalid override annotation '{key}': {reason}")]
    Override {
        /// The offending annotation key, without prefix.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A generated object's store name is already taken by an object owned
    /// by a different resource.
    #[error("monitoring object {namespace}/{name} is owned by '{owner}', refusing to adopt it")]
    Conflict {
        /// Namespace of the contested object.
        namespace: String,
        /// Name of the contested object.
        name: String,
        /// Name of the resource currently owning it.
        owner: String,
    },

    /// Building the placeholder context failed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Template evaluation failed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The resource store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Generates and maintains desired monitoring objects for triggering
/// resources.
pub struct Generator {
    store: Arc<dyn ResourceStore>,
    templates: Arc<TemplateService>,
}

impl Generator {
    /// Creates a generator over the given store and template service.
    pub fn new(store: Arc<dyn ResourceStore>, templates: Arc<TemplateService>) -> Self {
        Self { store, templates }
    }

    /// Computes the desired monitoring objects for a trigger: one per
    /// referenced template, or a single object from the override
    /// annotations, or none at all.
    pub async fn desired_objects(
        &self,
        trigger: &dyn TriggerResource,
    ) -> Result<Vec<MonitoringObject>, GeneratorError> {
        let meta = trigger.meta();

        if let Some(raw) = meta.annotations.get(TEMPLATES_ANNOTATION) {
            let refs: Vec<TemplateRef> =
                serde_json::from_str(raw).map_err(GeneratorError::Annotation)?;
            let context = placeholder_context(trigger)?;

            let mut objects = Vec::with_capacity(refs.len());
            for reference in refs {
                let template = self
                    .store
                    .get_template(&reference.namespace, &reference.name)
                    .await?
                    .ok_or_else(|| GeneratorError::TemplateNotFound {
                        namespace: reference.namespace.clone(),
                        name: reference.name.clone(),
                    })?;
                let spec = self.templates.evaluate(&template, context.clone())?;
                objects.push(self.wrap(trigger, Some(&template), spec));
            }
            return Ok(objects);
        }

        if let Some(service) = self.from_overrides(trigger)? {
            return Ok(vec![self.wrap(trigger, None, DesiredObject::Service(service))]);
        }
        Ok(Vec::new())
    }

    /// Ensures the generated objects exist in the store, creating missing
    /// ones and updating those whose spec drifted. Returns the identities of
    /// all ensured objects.
    pub async fn apply(
        &self,
        trigger: &dyn TriggerResource,
    ) -> Result<Vec<ResourceId>, GeneratorError> {
        let desired = self.desired_objects(trigger).await?;
        let mut ensured = Vec::with_capacity(desired.len());

        for object in desired {
            let existing = self
                .store
                .get_monitoring_object(&object.meta.namespace, &object.meta.name)
                .await?;
            match existing {
                None => {
                    tracing::info!(object = %object.id(), "Creating generated monitoring object.");
                    ensured.push(object.id());
                    self.store.create_monitoring_object(object).await?;
                }
                Some(current) => {
                    let trigger_meta = trigger.meta();
                    if let Some(owner) = current.meta.owner_references.first() {
                        if owner.kind != trigger.kind() || owner.name != trigger_meta.name {
                            return Err(GeneratorError::Conflict {
                                namespace: current.meta.namespace.clone(),
                                name: current.meta.name.clone(),
                                owner: owner.name.clone(),
                            });
                        }
                    }
                    ensured.push(current.id());
                    if current.spec != object.spec || current.meta.labels != object.meta.labels {
                        tracing::info!(object = %current.id(), "Updating generated monitoring object.");
                        let mut updated = current;
                        updated.spec = object.spec;
                        updated.meta.labels = object.meta.labels;
                        self.store.update_monitoring_object(updated).await?;
                    }
                }
            }
        }
        Ok(ensured)
    }

    /// Maps a template back to the identities of every triggering resource
    /// that depends on it: a label-selector list over the reverse-lookup
    /// labels, followed by an owner-reference walk.
    pub async fn dependents_of_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<ResourceId>, GeneratorError> {
        let mut selector = BTreeMap::new();
        selector.insert(TEMPLATE_NAME_LABEL.to_string(), name.to_string());
        selector.insert(TEMPLATE_NAMESPACE_LABEL.to_string(), namespace.to_string());

        let objects = self.store.list_monitoring_objects(&selector).await?;
        let mut triggers = std::collections::BTreeSet::new();
        for object in objects {
            if let Some(owner) = object.meta.owner_references.first() {
                triggers.insert(ResourceId::new(
                    owner.kind,
                    object.meta.namespace.clone(),
                    owner.name.clone(),
                ));
            }
        }
        Ok(triggers.into_iter().collect())
    }

    /// Wraps an evaluated spec into a stored monitoring object owned by the
    /// trigger. Template-derived objects are named `{trigger}-{template}` so
    /// every (trigger, template) pair gets its own store key, and carry the
    /// reverse-lookup labels.
    fn wrap(
        &self,
        trigger: &dyn TriggerResource,
        template: Option<&Template>,
        spec: DesiredObject,
    ) -> MonitoringObject {
        let trigger_meta = trigger.meta();
        let name = match template {
            Some(template) => format!("{}-{}", trigger_meta.name, template.meta.name),
            None => trigger_meta.name.clone(),
        };

        let mut labels = BTreeMap::new();
        if let Some(template) = template {
            labels.insert(TEMPLATE_NAME_LABEL.to_string(), template.meta.name.clone());
            labels.insert(TEMPLATE_NAMESPACE_LABEL.to_string(), template.meta.namespace.clone());
        }

        MonitoringObject {
            meta: ObjectMeta {
                name,
                namespace: trigger_meta.namespace.clone(),
                labels,
                owner_references: vec![OwnerReference {
                    kind: trigger.kind(),
                    name: trigger_meta.name.clone(),
                    uid: trigger_meta.uid.clone(),
                }],
                finalizers: vec![FINALIZER.to_string()],
                ..Default::default()
            },
            platform: trigger_meta.annotations.get(PLATFORM_ANNOTATION).cloned(),
            policy: Policy::default(),
            spec,
            status: Default::default(),
        }
    }

    /// The literal-substitution path: builds one desired service from the
    /// per-field override annotations, with `<key>` placeholders resolved
    /// from the trigger's flat value map. Returns `None` when the trigger
    /// carries no override annotations.
    fn from_overrides(
        &self,
        trigger: &dyn TriggerResource,
    ) -> Result<Option<DesiredService>, GeneratorError> {
        let meta = trigger.meta();
        let values = literal_values(trigger);
        let lookup = |key: &'static str| {
            meta.annotations
                .get(&format!("{OVERRIDE_PREFIX}{key}"))
                .map(|raw| substitute(raw, &values))
        };

        if !OVERRIDE_KEYS.iter().any(|key| {
            meta.annotations.contains_key(&format!("{OVERRIDE_PREFIX}{key}"))
        }) {
            return Ok(None);
        }

        let mut service = DesiredService {
            name: lookup("name").unwrap_or_else(|| meta.name.clone()),
            host: lookup("host").unwrap_or_default(),
            template: lookup("template").unwrap_or_default(),
            check_command: lookup("check-command").unwrap_or_default(),
            ..Default::default()
        };
        if let Some(raw) = lookup("args") {
            service.args = split_csv(&raw);
        }
        if let Some(raw) = lookup("groups") {
            service.groups = split_csv(&raw);
        }
        if let Some(raw) = lookup("categories") {
            service.categories = split_csv(&raw);
        }
        service.activated = parse_bool("activated", lookup("activated"))?;
        service.active_checks_enabled =
            parse_bool("active-checks-enabled", lookup("active-checks-enabled"))?;
        service.passive_checks_enabled =
            parse_bool("passive-checks-enabled", lookup("passive-checks-enabled"))?;
        service.check_interval = parse_u32("check-interval", lookup("check-interval"))?;
        service.retry_interval = parse_u32("retry-interval", lookup("retry-interval"))?;
        service.max_check_attempts =
            parse_u32("max-check-attempts", lookup("max-check-attempts"))?;
        if let Some(raw) = lookup("macros") {
            service.macros = serde_json::from_str(&raw).map_err(|e| GeneratorError::Override {
                key: "macros",
                reason: e.to_string(),
            })?;
        }
        Ok(Some(service))
    }
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_bool(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<bool>, GeneratorError> {
    match raw.as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(GeneratorError::Override {
            key,
            reason: format!("expected 'true' or 'false', got '{other}'"),
        }),
    }
}

fn parse_u32(key: &'static str, raw: Option<String>) -> Result<Option<u32>, GeneratorError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u32>()
            .map(Some)
            .map_err(|e| GeneratorError::Override { key, reason: e.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{RouteRule, RouteTrigger, TemplateKind, TriggerKind},
        test_helpers::InMemoryStore,
    };

    fn route_with_annotations(annotations: &[(&str, &str)]) -> RouteTrigger {
        let mut meta = ObjectMeta::named("web", "storefront");
        meta.uid = "uid-1".to_string();
        for (key, value) in annotations {
            meta.annotations.insert(key.to_string(), value.to_string());
        }
        RouteTrigger {
            meta,
            rules: vec![RouteRule {
                host: "shop.example.com".to_string(),
                scheme: "https".to_string(),
                path: "/".to_string(),
            }],
        }
    }

    fn template(name: &str, body: &str) -> Template {
        Template {
            meta: ObjectMeta::named("monitoring", name),
            kind: TemplateKind::Service,
            body: body.to_string(),
        }
    }

    fn generator(store: Arc<InMemoryStore>) -> Generator {
        Generator::new(store, Arc::new(TemplateService::new()))
    }

    #[tokio::test]
    async fn test_two_template_refs_produce_two_owned_objects() {
        let store = Arc::new(InMemoryStore::default());
        store.put_template(template(
            "http-check",
            "kind: service\nhost: \"{{ hosts | first }}\"\nname: http\ncheck_command: check_http\n",
        ));
        store.put_template(template(
            "cert-expiry",
            "kind: service\nhost: \"{{ hosts | first }}\"\nname: cert\ncheck_command: check_cert\n",
        ));

        let trigger = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"http-check"},{"namespace":"monitoring","name":"cert-expiry"}]"#,
        )]);

        let objects = generator(store).desired_objects(&trigger).await.unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].meta.name, "storefront-http-check");
        assert_eq!(objects[1].meta.name, "storefront-cert-expiry");
        for object in &objects {
            let owner = &object.meta.owner_references[0];
            assert_eq!(owner.kind, TriggerKind::Route);
            assert_eq!(owner.name, "storefront");
            assert_eq!(owner.uid, "uid-1");
            assert_eq!(
                object.meta.labels.get(TEMPLATE_NAMESPACE_LABEL).unwrap(),
                "monitoring"
            );
            assert!(object.meta.finalizers.iter().any(|f| f == FINALIZER));
        }
    }

    #[tokio::test]
    async fn test_missing_template_is_a_hard_error() {
        let store = Arc::new(InMemoryStore::default());
        let trigger = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"nope"}]"#,
        )]);

        let err = generator(store).desired_objects(&trigger).await.unwrap_err();
        assert!(matches!(err, GeneratorError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_annotation_json_is_a_hard_error() {
        let store = Arc::new(InMemoryStore::default());
        let trigger = route_with_annotations(&[(TEMPLATES_ANNOTATION, "not json")]);

        let err = generator(store).desired_objects(&trigger).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Annotation(_)));
    }

    #[tokio::test]
    async fn test_override_annotations_with_literal_substitution() {
        let store = Arc::new(InMemoryStore::default());
        let trigger = route_with_annotations(&[
            ("monitoring.vigil.io/host", "central"),
            ("monitoring.vigil.io/check-command", "check_http"),
            ("monitoring.vigil.io/args", "<name>.web.svc, 443"),
            ("monitoring.vigil.io/activated", "true"),
            ("monitoring.vigil.io/check-interval", "5"),
            ("monitoring.vigil.io/groups", "sg1,sg2"),
            ("monitoring.vigil.io/macros", r#"{"TIMEOUT":"30"}"#),
        ]);

        let objects = generator(store).desired_objects(&trigger).await.unwrap();
        assert_eq!(objects.len(), 1);
        match &objects[0].spec {
            DesiredObject::Service(s) => {
                assert_eq!(s.name, "storefront");
                assert_eq!(s.host, "central");
                assert_eq!(s.args, vec!["storefront.web.svc", "443"]);
                assert_eq!(s.activated, Some(true));
                assert_eq!(s.check_interval, Some(5));
                assert_eq!(s.groups, vec!["sg1", "sg2"]);
                assert_eq!(s.macros.get("TIMEOUT").unwrap(), "30");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_override_boolean_is_rejected() {
        let store = Arc::new(InMemoryStore::default());
        let trigger = route_with_annotations(&[("monitoring.vigil.io/activated", "yes")]);

        let err = generator(store).desired_objects(&trigger).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Override { key: "activated", .. }));
    }

    #[tokio::test]
    async fn test_no_annotations_produce_no_objects() {
        let store = Arc::new(InMemoryStore::default());
        let trigger = route_with_annotations(&[]);
        let objects = generator(store).desired_objects(&trigger).await.unwrap();
        assert!(objects.is_empty());
    }

    #[tokio::test]
    async fn test_apply_creates_then_updates_on_drift() {
        let store = Arc::new(InMemoryStore::default());
        store.put_template(template(
            "http-check",
            "kind: service\nhost: central\nname: http\ncheck_command: check_http\n",
        ));
        let trigger = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"http-check"}]"#,
        )]);

        let generator = generator(store.clone());
        let ensured = generator.apply(&trigger).await.unwrap();
        assert_eq!(ensured.len(), 1);
        assert!(store.get_object("web", "storefront-http-check").is_some());

        // Template body changes; apply must update the stored spec.
        store.put_template(template(
            "http-check",
            "kind: service\nhost: central\nname: http\ncheck_command: check_https\n",
        ));
        generator.apply(&trigger).await.unwrap();
        match store.get_object("web", "storefront-http-check").unwrap().spec {
            DesiredObject::Service(s) => assert_eq!(s.check_command, "check_https"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shared_template_yields_one_object_per_trigger() {
        let store = Arc::new(InMemoryStore::default());
        store.put_template(template(
            "http-check",
            "kind: service\nhost: central\nname: http\n",
        ));
        let trigger_a = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"http-check"}]"#,
        )]);
        let mut trigger_b = trigger_a.clone();
        trigger_b.meta.name = "checkout".to_string();
        trigger_b.meta.uid = "uid-2".to_string();

        let generator = generator(store.clone());
        generator.apply(&trigger_a).await.unwrap();
        generator.apply(&trigger_b).await.unwrap();

        let a = store.get_object("web", "storefront-http-check").unwrap();
        let b = store.get_object("web", "checkout-http-check").unwrap();
        assert_eq!(a.meta.owner_references[0].name, "storefront");
        assert_eq!(b.meta.owner_references[0].name, "checkout");
    }

    #[tokio::test]
    async fn test_apply_refuses_object_owned_by_another_trigger() {
        let store = Arc::new(InMemoryStore::default());
        store.put_template(template(
            "http-check",
            "kind: service\nhost: central\nname: http\n",
        ));

        // An object already sits on the trigger's store key, but a different
        // route owns it.
        let mut squatter = crate::test_helpers::ObjectBuilder::service(
            crate::test_helpers::ServiceBuilder::new().host("central").name("http").build(),
        )
        .namespace("web")
        .object_name("storefront-http-check")
        .build();
        squatter.meta.owner_references = vec![OwnerReference {
            kind: TriggerKind::Route,
            name: "legacy-storefront".to_string(),
            uid: "uid-9".to_string(),
        }];
        store.put_object(squatter);

        let trigger = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"http-check"}]"#,
        )]);

        let err = generator(store).apply(&trigger).await.unwrap_err();
        match err {
            GeneratorError::Conflict { namespace, name, owner } => {
                assert_eq!(namespace, "web");
                assert_eq!(name, "storefront-http-check");
                assert_eq!(owner, "legacy-storefront");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dependents_of_template_walks_owner_references() {
        let store = Arc::new(InMemoryStore::default());
        store.put_template(template(
            "http-check",
            "kind: service\nhost: central\nname: http\n",
        ));
        let trigger_a = route_with_annotations(&[(
            TEMPLATES_ANNOTATION,
            r#"[{"namespace":"monitoring","name":"http-check"}]"#,
        )]);
        let mut trigger_b = trigger_a.clone();
        trigger_b.meta.name = "checkout".to_string();

        let generator = generator(store.clone());
        generator.apply(&trigger_a).await.unwrap();
        generator.apply(&trigger_b).await.unwrap();

        let dependents =
            generator.dependents_of_template("monitoring", "http-check").await.unwrap();
        let names: Vec<&str> = dependents.iter().map(|id| id.name.as_str()).collect();
        assert!(names.contains(&"storefront"));
        assert!(names.contains(&"checkout"));
    }
}
