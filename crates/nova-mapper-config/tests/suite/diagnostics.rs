use nova_mapper_config::{
    ConfigValidationError, ConfigWarning, ConversionType, EnumMappingStrategy, MapperOptions,
    NovaMapperConfig,
};
use nova_mapper_types::Severity;
use pretty_assertions::assert_eq;

#[test]
fn reports_unknown_keys_with_full_paths() {
    let text = r#"
typo = 1

[options]
deep_clonning = true

[logging]
levle = "debug"
"#;

    let (_config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.unknown_keys,
        vec!["logging.levle", "options.deep_clonning", "typo"]
    );
}

#[test]
fn reports_deprecated_keys_but_honors_them() {
    let text = r#"
[options]
use_deep_cloning = true
"#;

    let (config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(config.options.deep_cloning, Some(true));
    assert_eq!(
        diagnostics.warnings,
        vec![ConfigWarning::DeprecatedKey {
            path: "options.use_deep_cloning".to_string(),
            message: "options.use_deep_cloning is deprecated; use options.deep_cloning instead"
                .to_string(),
        }]
    );
}

#[test]
fn ignore_case_without_by_name_is_a_warning() {
    let text = r#"
[options]
enum_mapping_strategy = "by_value"
enum_mapping_ignore_case = true
"#;

    let (_config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.warnings,
        vec![ConfigWarning::EnumIgnoreCaseWithoutByName]
    );
    assert!(diagnostics.is_ok());
}

#[test]
fn conflicting_conversions_are_errors() {
    let text = r#"
[options]
enabled_conversions = ["span", "memory"]
disabled_conversions = ["span"]
"#;

    let (_config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(
        diagnostics.errors,
        vec![ConfigValidationError::ConflictingConversion {
            conversion: ConversionType::Span
        }]
    );
}

#[test]
fn malformed_severity_override_codes_are_rejected() {
    let text = r#"
[options.severity_overrides]
SourceMemberNotFound = "error"
"not-a-code" = "info"
"#;

    let (config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");

    assert_eq!(diagnostics.errors.len(), 1);
    let options = MapperOptions::resolve([&config.options]);
    assert_eq!(
        options.severity_overrides.get("SourceMemberNotFound"),
        Some(&Severity::Error)
    );
}

#[test]
fn full_config_resolves_onto_defaults() {
    let text = r#"
[options]
enum_mapping_strategy = "by_name"
enum_mapping_ignore_case = true
property_name_mapping_strategy = "snake_case"
included_members = ["public"]
disabled_conversions = ["tuple"]
"#;

    let (config, diagnostics) =
        NovaMapperConfig::load_from_str_with_diagnostics(text).expect("config should parse");
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let options = MapperOptions::resolve([&config.options]);
    assert_eq!(options.enum_mapping_strategy, EnumMappingStrategy::ByName);
    assert!(options.enum_mapping_ignore_case);
    assert!(!options.is_enabled(ConversionType::Tuple));
    assert_eq!(options.included_members.len(), 1);
    assert!(options.allow_null_property_assignment);
}

#[test]
fn invalid_values_fail_to_parse() {
    let text = r#"
[options]
enum_mapping_strategy = "by_magic"
"#;

    let err = NovaMapperConfig::load_from_str_with_diagnostics(text)
        .expect_err("unknown variant should fail");
    assert!(err.to_string().contains("by_magic"), "{err}");
}
