use nova_mapper_config::json_schema;

#[test]
fn json_schema_includes_deprecated_deep_cloning_alias() {
    let schema = json_schema();
    let value = serde_json::to_value(schema).expect("schema serializes");

    let alias = value
        .pointer("/definitions/MapperOptionsLayer/properties/use_deep_cloning")
        .expect("use_deep_cloning schema property exists");
    assert_eq!(alias.get("deprecated").and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn json_schema_lists_conversion_families() {
    let schema = json_schema();
    let value = serde_json::to_value(schema).expect("schema serializes");

    let variants = value
        .pointer("/definitions/ConversionType/enum")
        .and_then(|v| v.as_array())
        .expect("ConversionType is a string enum");
    assert!(variants.iter().any(|v| v == "enum_to_string"));
    assert!(variants.iter().any(|v| v == "span"));
}

#[test]
fn json_schema_ties_ignore_case_to_by_name() {
    let schema = json_schema();
    let value = serde_json::to_value(schema).expect("schema serializes");

    let all_of = value
        .get("allOf")
        .and_then(|v| v.as_array())
        .expect("semantic constraints are attached");
    let text = serde_json::to_string(all_of).expect("serialize constraints");
    assert!(text.contains("enum_mapping_ignore_case"));
}
