//! Lenient readers over the API Server's resources.
//!
//! Page props carry the API's JSON exactly as it arrived. The helpers here
//! pick out the few attributes the gateway needs for itself (titles, index
//! rows, edit-form values) and never fail: a missing or oddly typed
//! attribute reads as absent.

use std::fmt;

use serde_json::{Map, Value};

/// A resource id as the API sends it: a number or a slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceId {
    Number(i64),
    Slug(String),
}

impl ResourceId {
    pub fn read(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::String(s) if !s.is_empty() => Some(Self::Slug(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Slug(s) => f.write_str(s),
        }
    }
}

/// The category attributes the edit form works on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFields {
    pub id: Option<ResourceId>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryFields {
    pub fn read(category: &Value) -> Self {
        Self {
            id: category.get("id").and_then(ResourceId::read),
            name: text(category, "name"),
            description: text(category, "description"),
        }
    }
}

/// Copy `keys` out of `resource` as they were sent; absent keys become `null`.
pub fn pick(resource: &Value, keys: &[&str]) -> Value {
    let row: Map<String, Value> = keys
        .iter()
        .map(|key| {
            let value = resource.get(*key).cloned().unwrap_or(Value::Null);
            (key.to_string(), value)
        })
        .collect();
    Value::Object(row)
}

/// The resource's `name`, or `fallback` when it has none.
pub fn display_name<'a>(resource: &'a Value, fallback: &'a str) -> &'a str {
    resource
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
}

fn text(resource: &Value, key: &str) -> Option<String> {
    resource.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_numbers_or_slugs() {
        assert_eq!(ResourceId::read(&json!(5)), Some(ResourceId::Number(5)));
        assert_eq!(
            ResourceId::read(&json!("ruby-on-rails")).unwrap().to_string(),
            "ruby-on-rails"
        );
        assert_eq!(ResourceId::read(&json!("")), None);
        assert_eq!(ResourceId::read(&json!(null)), None);
        assert_eq!(ResourceId::read(&json!(1.5)), None);
    }

    #[test]
    fn test_category_fields_tolerate_shape() {
        let fields = CategoryFields::read(&json!({
            "id": 5,
            "name": "Web",
            "description": null,
            "created_at": "2022-08-27T08:42:52.000Z",
            "frameworks": [{"name": "Rails"}]
        }));
        assert_eq!(fields.id, Some(ResourceId::Number(5)));
        assert_eq!(fields.name.as_deref(), Some("Web"));
        assert_eq!(fields.description, None);

        assert_eq!(CategoryFields::read(&json!("not an object")), CategoryFields::default());
        assert_eq!(CategoryFields::read(&json!({"name": 7})).name, None);
    }

    #[test]
    fn test_pick_keeps_values_as_sent() {
        let category = json!({"id": "web", "name": "Web", "url": "/categories/web.json"});
        assert_eq!(pick(&category, &["id", "name"]), json!({"id": "web", "name": "Web"}));
        assert_eq!(
            pick(&category, &["id", "description"]),
            json!({"id": "web", "description": null})
        );
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(display_name(&json!({"name": "Rails"}), "Framework"), "Rails");
        assert_eq!(display_name(&json!({"name": ""}), "Framework"), "Framework");
        assert_eq!(display_name(&json!({"id": 1}), "Framework"), "Framework");
    }
}
