//! Schema validation for outbound events.
//!
//! The validator holds one JSON-Schema document, compiled once at startup, and
//! answers a single question per event: does it conform? Callers get a plain
//! `bool`; which constraints failed is only logged.
//!
//! Compilation and evaluation are done by the `jsonschema` crate. The draft is
//! taken from the document's `$schema` (draft-04 through 2020-12); keyword
//! semantics, including how `$ref` siblings are treated, follow that draft.
//!
//! ## Load failures are fatal
//!
//! Without a schema no event can be safely accepted, so every load failure is
//! logged at error level and returned as [`SchemaLoadError`]. Callers must not
//! fall back to publishing unvalidated events.

use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, error, info};

/// Schema document could not be loaded.
#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("unable to read schema document {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("schema root must be an object or boolean, found {0}")]
    InvalidRoot(&'static str),

    #[error("unresolvable $ref '{0}'")]
    UnresolvedRef(String),

    /// The document is JSON but not a schema the validator can compile.
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// Validates event documents against a fixed schema.
pub struct SchemaValidator {
    root: JsonValue,
    compiled: Validator,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SchemaValidator {
    /// Load the schema from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let result = std::fs::read_to_string(path)
            .map_err(|source| SchemaLoadError::Read {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|doc| Self::from_json_str(&doc));

        if let Err(err) = &result {
            error!(path = %path.display(), error = %err, "unable to load event schema");
        }
        result
    }

    /// Parse the schema from an in-memory document.
    pub fn from_json_str(document: &str) -> Result<Self, SchemaLoadError> {
        let root: JsonValue = serde_json::from_str(document)?;
        Self::from_value(root)
    }

    /// Compile an already-parsed schema document.
    pub fn from_value(root: JsonValue) -> Result<Self, SchemaLoadError> {
        match &root {
            JsonValue::Object(_) | JsonValue::Bool(_) => {}
            other => return Err(SchemaLoadError::InvalidRoot(json_type_name(other))),
        }
        // Remote documents are never fetched, so every reference must be local.
        check_refs(&root, &root)?;

        let compiled = jsonschema::validator_for(&root)
            .map_err(|err| SchemaLoadError::Invalid(err.to_string()))?;
        Ok(Self { root, compiled })
    }

    pub fn schema(&self) -> &JsonValue {
        &self.root
    }

    /// Validate a serialized event document.
    ///
    /// Documents that are not valid JSON never conform.
    pub fn validate(&self, serialized_event: &str) -> bool {
        match serde_json::from_str::<JsonValue>(serialized_event) {
            Ok(instance) => self.validate_value(&instance),
            Err(err) => {
                info!(error = %err, "event rejected: document is not valid JSON");
                false
            }
        }
    }

    /// Validate an already-parsed event document.
    pub fn validate_value(&self, instance: &JsonValue) -> bool {
        if self.compiled.is_valid(instance) {
            debug!("event conforms to schema");
            return true;
        }

        for violation in self.compiled.iter_errors(instance) {
            info!(
                instance_path = %violation.instance_path,
                schema_path = %violation.schema_path,
                detail = %violation,
                "event rejected by schema"
            );
        }
        false
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn resolve_ref<'a>(root: &'a JsonValue, reference: &str) -> Option<&'a JsonValue> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    root.pointer(pointer)
}

/// Every `$ref` must point inside the document.
fn check_refs(root: &JsonValue, node: &JsonValue) -> Result<(), SchemaLoadError> {
    match node {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(reference)) = map.get("$ref") {
                if resolve_ref(root, reference).is_none() {
                    return Err(SchemaLoadError::UnresolvedRef(reference.clone()));
                }
            }
            for (key, child) in map {
                // Literal values, not subschemas.
                if key == "enum" || key == "const" || key == "default" || key == "examples" {
                    continue;
                }
                check_refs(root, child)?;
            }
            Ok(())
        }
        JsonValue::Array(items) => items.iter().try_for_each(|item| check_refs(root, item)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delivery_schema() -> SchemaValidator {
        SchemaValidator::from_value(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "required": ["type", "id"],
            "properties": {
                "type": { "type": "string", "enum": ["delivery", "wicket"] },
                "id": { "type": "string", "minLength": 1 },
                "runs": { "type": "integer", "minimum": 0, "maximum": 6 },
                "batsmen": {
                    "type": "array",
                    "items": { "$ref": "#/definitions/player" },
                    "maxItems": 2
                }
            },
            "definitions": {
                "player": {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" } }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn conforming_document_validates() {
        let v = delivery_schema();
        assert!(v.validate(r#"{"type":"delivery","id":"abc"}"#));
        assert!(v.validate(r#"{"type":"wicket","id":"x","runs":4,"batsmen":[{"name":"a"}]}"#));
    }

    #[test]
    fn missing_required_field_fails() {
        let v = delivery_schema();
        assert!(!v.validate(r#"{"type":"delivery"}"#));
    }

    #[test]
    fn wrong_field_type_fails() {
        let v = delivery_schema();
        assert!(!v.validate(r#"{"type":"delivery","id":42}"#));
        assert!(!v.validate(r#"{"type":"delivery","id":"abc","runs":"four"}"#));
    }

    #[test]
    fn numeric_and_length_bounds_apply() {
        let v = delivery_schema();
        assert!(!v.validate(r#"{"type":"delivery","id":""}"#));
        assert!(!v.validate(r#"{"type":"delivery","id":"abc","runs":7}"#));
        assert!(!v.validate(r#"{"type":"delivery","id":"abc","runs":-1}"#));
    }

    #[test]
    fn enum_rejects_unknown_values() {
        let v = delivery_schema();
        assert!(!v.validate(r#"{"type":"no-ball","id":"abc"}"#));
    }

    #[test]
    fn refs_are_followed_into_array_items() {
        let v = delivery_schema();
        assert!(!v.validate(r#"{"type":"delivery","id":"abc","batsmen":[{"nom":"a"}]}"#));
        assert!(!v.validate(
            r#"{"type":"delivery","id":"abc","batsmen":[{"name":"a"},{"name":"b"},{"name":"c"}]}"#
        ));
    }

    #[test]
    fn pattern_is_enforced() {
        let v = SchemaValidator::from_value(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": { "id": { "type": "string", "pattern": "^[a-z]+$" } }
        }))
        .unwrap();
        assert!(v.validate(r#"{"id":"abc"}"#));
        assert!(!v.validate(r#"{"id":"ABC-1"}"#));
    }

    #[test]
    fn unique_items_is_enforced() {
        let v = SchemaValidator::from_value(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "array",
            "uniqueItems": true
        }))
        .unwrap();
        assert!(v.validate("[1, 2, 3]"));
        assert!(!v.validate("[1, 2, 2]"));
    }

    #[test]
    fn multiple_of_and_min_properties_are_enforced() {
        let v = SchemaValidator::from_value(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "minProperties": 2,
            "properties": { "over": { "type": "integer", "multipleOf": 2 } }
        }))
        .unwrap();
        assert!(v.validate(r#"{"over":4,"id":"abc"}"#));
        assert!(!v.validate(r#"{"over":3,"id":"abc"}"#));
        assert!(!v.validate(r#"{"over":4}"#));
    }

    #[test]
    fn additional_properties_false_is_enforced() {
        let v = SchemaValidator::from_value(json!({
            "type": "object",
            "properties": { "id": { "type": "string" } },
            "additionalProperties": false
        }))
        .unwrap();
        assert!(v.validate(r#"{"id":"abc"}"#));
        assert!(!v.validate(r#"{"id":"abc","extra":true}"#));
    }

    #[test]
    fn combinators() {
        let v = SchemaValidator::from_value(json!({
            "oneOf": [
                { "type": "integer" },
                { "type": "number", "minimum": 10 }
            ],
            "not": { "const": 3 }
        }))
        .unwrap();
        assert!(v.validate("1"));
        assert!(v.validate("10.5"));
        assert!(!v.validate("12"));
        assert!(!v.validate("3"));

        let any = SchemaValidator::from_value(json!({
            "anyOf": [{ "type": "string" }, { "type": "null" }]
        }))
        .unwrap();
        assert!(any.validate("null"));
        assert!(!any.validate("true"));
    }

    #[test]
    fn draft04_boolean_exclusive_minimum() {
        let v = SchemaValidator::from_value(json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "number",
            "minimum": 0,
            "exclusiveMinimum": true
        }))
        .unwrap();
        assert!(!v.validate("0"));
        assert!(v.validate("0.5"));
    }

    #[test]
    fn invalid_json_never_validates() {
        let v = delivery_schema();
        assert!(!v.validate("{not json"));
    }

    #[test]
    fn unresolvable_ref_fails_to_load() {
        let err = SchemaValidator::from_value(json!({
            "properties": { "id": { "$ref": "#/definitions/missing" } }
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaLoadError::UnresolvedRef(r) if r == "#/definitions/missing"));
    }

    #[test]
    fn uncompilable_schema_fails_to_load() {
        let err = SchemaValidator::from_value(json!({ "type": 12 })).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Invalid(_)));
    }

    #[test]
    fn non_schema_root_fails_to_load() {
        let err = SchemaValidator::from_json_str("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, SchemaLoadError::InvalidRoot("array")));
    }

    #[test]
    fn unparsable_schema_fails_to_load() {
        let err = SchemaValidator::from_json_str("{").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Parse(_)));
    }

    #[test]
    fn missing_schema_file_fails_to_load() {
        let err = SchemaValidator::load("/definitely/not/here/schema.json").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Read { .. }));
    }
}
