//! Placeholder context construction. The base context (name, namespace,
//! labels, annotations) is always present; each trigger kind contributes its
//! own entries on top. Building a context never mutates the trigger.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::models::{resource::ContextError, TriggerResource};

/// Builds the nested placeholder map for template evaluation.
pub fn placeholder_context(trigger: &dyn TriggerResource) -> Result<Value, ContextError> {
    let meta = trigger.meta();
    let mut map = serde_json::Map::new();
    map.insert("name".to_string(), json!(meta.name));
    map.insert("namespace".to_string(), json!(meta.namespace));
    map.insert("labels".to_string(), json!(meta.labels));
    map.insert("annotations".to_string(), json!(meta.annotations));
    for (key, value) in trigger.context_extensions()? {
        map.insert(key, value);
    }
    Ok(Value::Object(map))
}

/// Builds the flat key/value map used by literal `<key>` substitution:
/// `name`, `namespace`, and every label under its own key.
pub fn literal_values(trigger: &dyn TriggerResource) -> BTreeMap<String, String> {
    let meta = trigger.meta();
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), meta.name.clone());
    values.insert("namespace".to_string(), meta.namespace.clone());
    for (key, value) in &meta.labels {
        values.insert(key.clone(), value.clone());
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectMeta, RouteRule, RouteTrigger};

    fn route() -> RouteTrigger {
        let mut meta = ObjectMeta::named("web", "storefront");
        meta.labels.insert("tier".to_string(), "frontend".to_string());
        RouteTrigger {
            meta,
            rules: vec![RouteRule {
                host: "shop.example.com".to_string(),
                scheme: "https".to_string(),
                path: "/".to_string(),
            }],
        }
    }

    #[test]
    fn test_placeholder_context_base_and_extensions() {
        let context = placeholder_context(&route()).unwrap();
        assert_eq!(context["name"], json!("storefront"));
        assert_eq!(context["namespace"], json!("web"));
        assert_eq!(context["labels"]["tier"], json!("frontend"));
        assert_eq!(context["hosts"], json!(["shop.example.com"]));
    }

    #[test]
    fn test_literal_values_flatten_labels() {
        let values = literal_values(&route());
        assert_eq!(values.get("name").unwrap(), "storefront");
        assert_eq!(values.get("namespace").unwrap(), "web");
        assert_eq!(values.get("tier").unwrap(), "frontend");
    }
}
