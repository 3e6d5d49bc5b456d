//! Per-method configuration: ignore lists, explicit member paths, constant values and enum
//! overrides.

use serde::{Deserialize, Serialize};

use crate::MapperOptionsLayer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodConfig {
    /// Method-level option layer, applied last.
    pub options: MapperOptionsLayer,
    /// Source member paths that are intentionally not mapped.
    pub ignore_source: Vec<String>,
    /// Target member paths that are intentionally not mapped.
    pub ignore_target: Vec<String>,
    pub properties: Vec<PropertyMappingConfig>,
    pub values: Vec<ValueMappingConfig>,
    #[serde(rename = "enum")]
    pub enum_mapping: EnumMappingConfig,
}

impl MethodConfig {
    pub fn is_source_ignored(&self, path: &str) -> bool {
        self.ignore_source.iter().any(|p| p == path)
    }

    pub fn is_target_ignored(&self, path: &str) -> bool {
        self.ignore_target.iter().any(|p| p == path)
    }
}

/// Explicit `source -> target` member path pairing. Paths are dotted (`Value.Nested.Id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyMappingConfig {
    pub source: String,
    pub target: String,
    /// Name of another mapping method used to convert the value.
    #[serde(default, rename = "use")]
    pub use_mapping: Option<String>,
    /// Only applies when all previous configurations for the same target produced `null`.
    #[serde(default)]
    pub null_fallback: bool,
}

impl PropertyMappingConfig {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            use_mapping: None,
            null_fallback: false,
        }
    }
}

/// A constant (or user method result) assigned to a target member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValueMappingConfig {
    pub target: String,
    pub value: ConstantValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// `EnumType.Member`
    EnumMember(String),
    /// Name of a parameterless user method whose result is assigned.
    Method(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnumMappingConfig {
    /// Target value used for source values without a counterpart. For enum targets this is an
    /// `EnumType.Member` reference, for string targets a string.
    pub fallback: Option<EnumValue>,
    pub values: Vec<EnumValueOverride>,
    /// Source enum members that are intentionally not mapped.
    pub ignore_source_values: Vec<String>,
    /// Target enum members that are intentionally not mapped.
    pub ignore_target_values: Vec<String>,
}

/// Explicit enum value pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumValueOverride {
    pub source: EnumValue,
    pub target: EnumValue,
}

/// Operand of an enum value override.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumValue {
    /// `EnumType.Member`
    Member(String),
    String(String),
    Number(i64),
}

impl EnumValue {
    /// Split a `Type.Member` reference into its type and member names.
    pub fn member_parts(&self) -> Option<(&str, &str)> {
        match self {
            EnumValue::Member(path) => path.rsplit_once('.'),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn method_config_deserializes_from_json() {
        let config: MethodConfig = serde_json::from_str(
            r#"{
                "ignore_target": ["Id"],
                "properties": [
                    { "source": "MyValueId", "target": "Value.Id" },
                    { "source": "Backup", "target": "Name", "null_fallback": true },
                    { "source": "Engine", "target": "Motor", "use": "MapEngine" }
                ],
                "values": [
                    { "target": "Kind", "value": { "enum_member": "Kind.Car" } },
                    { "target": "Note", "value": "null" }
                ],
                "enum": {
                    "fallback": { "member": "Color.Unknown" },
                    "values": [
                        { "source": { "member": "Shade.Crimson" }, "target": { "member": "Color.Red" } }
                    ]
                },
                "options": { "deep_cloning": true }
            }"#,
        )
        .expect("method config should parse");

        assert!(config.is_target_ignored("Id"));
        assert_eq!(config.properties.len(), 3);
        assert_eq!(config.properties[2].use_mapping.as_deref(), Some("MapEngine"));
        assert!(config.properties[1].null_fallback);
        assert_eq!(config.values[1].value, ConstantValue::Null);
        assert_eq!(
            config.enum_mapping.values[0].target.member_parts(),
            Some(("Color", "Red"))
        );
        assert_eq!(config.options.deep_cloning, Some(true));
    }
}
