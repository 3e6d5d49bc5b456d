use schemars::schema::{RootSchema, Schema};
use schemars::schema_for;
use serde_json::json;

use crate::NovaMapperConfig;

/// JSON schema for `nova-mapper.toml`.
///
/// This schema is intended for editor tooling (TOML JSON schema integration) and CI validation.
#[must_use]
pub fn json_schema() -> RootSchema {
    let mut schema = schema_for!(NovaMapperConfig);
    apply_semantic_constraints(&mut schema);
    schema
}

fn apply_semantic_constraints(schema: &mut RootSchema) {
    // JSON Schema does not apply defaults during validation, so these constraints only trigger
    // when the relevant keys are explicitly set.
    if let Some(constraint) = schema_from_json(json!({
        "if": {
            "required": ["options"],
            "properties": {
                "options": {
                    "required": ["enum_mapping_ignore_case"],
                    "properties": { "enum_mapping_ignore_case": { "const": true } }
                }
            }
        },
        "then": {
            "properties": {
                "options": {
                    "properties": {
                        "enum_mapping_strategy": { "const": "by_name" }
                    }
                }
            }
        }
    })) {
        push_all_of(schema, constraint);
    }

    if let Some(constraint) = schema_from_json(json!({
        "properties": {
            "options": {
                "properties": {
                    "included_constructors": { "minItems": 1 }
                }
            }
        }
    })) {
        push_all_of(schema, constraint);
    }

    allow_deprecated_aliases(schema);
}

fn push_all_of(root: &mut RootSchema, schema: Schema) {
    let subschemas = root.schema.subschemas();
    subschemas.all_of.get_or_insert_with(Vec::new).push(schema);
}

fn schema_from_json(value: serde_json::Value) -> Option<Schema> {
    serde_json::from_value(value).ok()
}

fn allow_deprecated_aliases(schema: &mut RootSchema) {
    // Keep the schema aligned with what the runtime accepts (serde aliases), while still steering
    // users away from legacy keys.
    let Some(property) = schema_from_json(json!({
        "deprecated": true,
        "description": "Deprecated alias for `options.deep_cloning`.",
        "default": null,
        "type": ["boolean", "null"]
    })) else {
        return;
    };
    add_deprecated_property(schema, "MapperOptionsLayer", "use_deep_cloning", property);
}

fn add_deprecated_property(
    schema: &mut RootSchema,
    definition_name: &str,
    property_name: &str,
    property_schema: Schema,
) {
    let Some(definition) = schema.definitions.get_mut(definition_name) else {
        return;
    };

    let Schema::Object(obj) = definition else {
        return;
    };

    let object_validation = obj.object();
    object_validation
        .properties
        .insert(property_name.to_string(), property_schema);
}
