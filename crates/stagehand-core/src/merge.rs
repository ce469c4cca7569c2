//! Configuration merging.
//!
//! Configuration documents from plugins and the project are layered with
//! JSON Merge Patch (RFC 7396) semantics, later documents winning.
//! Values are addressed by dot-separated paths such as `auth.filterPassword`.

use crate::error::{CoreError, Result};
use serde_json::{Map, Value};

/// Resolve a dot-separated path to a JSON pointer.
///
/// Examples:
/// - `auth` → `/auth`
/// - `auth.filterPassword` → `/auth/filterPassword`
#[must_use]
pub fn resolve_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!("/{}", path.replace('.', "/"))
}

/// Look up the value at a dot-separated path.
#[must_use]
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    root.pointer(&resolve_path(path))
}

/// Apply a JSON Merge Patch (RFC 7396) to a value.
///
/// Rules:
/// - If patch is not an object, replace target with patch
/// - If patch is an object, merge recursively
///   - null values in patch remove keys from target
///   - other values replace/add keys
pub fn apply_merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_obj) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    let Value::Object(target_obj) = target else {
        return;
    };

    for (key, value) in patch_obj {
        if value.is_null() {
            target_obj.remove(key);
        } else if value.is_object() {
            let target_value = target_obj
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            apply_merge_patch(target_value, value);
        } else {
            target_obj.insert(key.clone(), value.clone());
        }
    }
}

/// Merge one configuration document into the accumulated configuration.
///
/// `source` names the document in error messages.
///
/// # Errors
/// Returns `CoreError::InvalidConfig` if the document is not an object.
pub fn merge_document(target: &mut Value, document: &Value, source: &str) -> Result<()> {
    match document {
        Value::Object(_) => {
            apply_merge_patch(target, document);
            Ok(())
        }
        // Empty YAML documents parse to null.
        Value::Null => Ok(()),
        other => Err(CoreError::InvalidConfig(format!(
            "{source}: expected a mapping at top level, found {}",
            kind_of(other)
        ))),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("auth"), "/auth");
        assert_eq!(resolve_path("auth.filterPassword"), "/auth/filterPassword");
        assert_eq!(resolve_path(""), "");
    }

    #[test]
    fn test_lookup() {
        let config = json!({ "auth": { "filterPassword": "truthy" } });

        assert_eq!(lookup(&config, "auth.filterPassword"), Some(&json!("truthy")));
        assert_eq!(lookup(&config, "auth.missing"), None);
        assert_eq!(lookup(&config, ""), Some(&config));
    }

    #[test]
    fn test_apply_merge_patch() {
        let mut target = json!({
            "test": { "success": true },
            "auth": { "filterPassword": "falsy", "strategy": "local" }
        });

        let patch = json!({
            "auth": { "filterPassword": "truthy" },
            "extra": { "success": true }
        });

        apply_merge_patch(&mut target, &patch);

        assert_eq!(target["test"]["success"], json!(true));
        assert_eq!(target["auth"]["filterPassword"], json!("truthy"));
        assert_eq!(target["auth"]["strategy"], json!("local"));
        assert_eq!(target["extra"]["success"], json!(true));
    }

    #[test]
    fn test_merge_patch_removes_null() {
        let mut target = json!({ "a": "keep", "b": "remove" });

        apply_merge_patch(&mut target, &json!({ "b": null, "c": "add" }));

        assert_eq!(target, json!({ "a": "keep", "c": "add" }));
    }

    #[test]
    fn test_merge_document_rejects_scalars() {
        let mut target = json!({});

        let err = merge_document(&mut target, &json!([1, 2]), "config/list.json").unwrap_err();
        assert!(err.to_string().contains("config/list.json"));
        assert!(err.to_string().contains("array"));

        merge_document(&mut target, &Value::Null, "config/empty.yml").unwrap();
        assert_eq!(target, json!({}));
    }
}
