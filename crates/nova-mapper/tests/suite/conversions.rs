use nova_mapper::{MapperDecl, MappingMethod, MethodParam};
use nova_mapper_types::{EnumDef, EnumMemberDef, PrimitiveType, TypeDef, TypeRef, TypeStore};
use pretty_assertions::assert_eq;

use super::{codes, method, resolve};

fn enumeration(store: &mut TypeStore, name: &str, members: &[(&str, i64)]) -> TypeRef {
    let def = EnumDef {
        underlying: PrimitiveType::Int,
        members: members
            .iter()
            .map(|(name, value)| EnumMemberDef::new(*name, *value))
            .collect(),
    };
    TypeRef::new(store.upsert_type(TypeDef::enumeration(name, def)))
}

#[test]
fn dictionaries_convert_values_in_a_loop() {
    let mut store = TypeStore::default();
    let source = store.parse("Dictionary<string, long>").expect("source");
    let target = store.parse("Dictionary<string, int>").expect("target");
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new("Map", source, target));

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Map"),
        "public partial Dictionary<string, int> Map(Dictionary<string, long> source) { \
         var target = new Dictionary<string, int>(); target.EnsureCapacity(source.Count); \
         foreach (var item in source) { target[item.Key] = (int)item.Value; } return target; }"
    );
}

#[test]
fn spans_are_copied_into_lists() {
    let mut store = TypeStore::default();
    let source = store.parse("Span<int>").expect("source");
    let target = store.parse("List<int>").expect("target");
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new("Map", source, target));

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Map"),
        "public partial List<int> Map(Span<int> source) { var target = new List<int>(); \
         target.EnsureCapacity(source.Length); foreach (var item in source) { target.Add(item); } \
         return target; }"
    );
}

#[test]
fn enums_whose_values_are_defined_in_the_target_are_cast() {
    let mut store = TypeStore::default();
    let source = enumeration(&mut store, "Color", &[("Red", 1), ("Blue", 2)]);
    let target = enumeration(
        &mut store,
        "ColorDto",
        &[("Red", 1), ("Blue", 2), ("Green", 3)],
    );
    let mapper = MapperDecl::new("M").with_method(MappingMethod::new("Map", source, target));

    let resolved = resolve(&store, &mapper);
    assert_eq!(
        method(&resolved, "Map"),
        "public partial ColorDto Map(Color source) { return (ColorDto)source; }"
    );
    assert!(resolved.diagnostics.is_empty(), "{:?}", resolved.diagnostics);
}

#[test]
fn several_enum_sources_cascade() {
    let mut store = TypeStore::default();
    let first = enumeration(&mut store, "Primary", &[("Red", 0), ("Green", 1)]);
    let second = enumeration(&mut store, "Secondary", &[("Red", 0), ("Blue", 2)]);
    let target = enumeration(
        &mut store,
        "Color",
        &[("Red", 0), ("Green", 1), ("Blue", 2)],
    );
    let mapper = MapperDecl::new("M").with_method(
        MappingMethod::new("Map", first, target).with_param(MethodParam::new("other", second)),
    );

    let resolved = resolve(&store, &mapper);
    let text = method(&resolved, "Map");
    assert!(
        text.starts_with("public partial Color Map(Primary source, Secondary other) { return source switch {"),
        "{text}"
    );
    assert!(text.contains("Primary.Red => Color.Red,"), "{text}");
    assert!(text.contains("Primary.Green => Color.Green,"), "{text}");
    assert!(text.contains("_ => other switch {"), "{text}");
    assert!(text.contains("Secondary.Blue => Color.Blue,"), "{text}");
    // Red is already produced by the first source.
    assert!(!text.contains("Secondary.Red"), "{text}");
    assert!(text.contains("throw new ArgumentOutOfRangeException(nameof(other),"), "{text}");
    assert!(codes(&resolved).is_empty(), "{:?}", resolved.diagnostics);
}

#[test]
fn cascades_report_target_values_nothing_produces() {
    let mut store = TypeStore::default();
    let first = enumeration(&mut store, "Primary", &[("Red", 0)]);
    let second = enumeration(&mut store, "Secondary", &[("Green", 1)]);
    let target = enumeration(
        &mut store,
        "Color",
        &[("Red", 0), ("Green", 1), ("Blue", 2)],
    );
    let mapper = MapperDecl::new("M").with_method(
        MappingMethod::new("Map", first, target).with_param(MethodParam::new("other", second)),
    );

    let resolved = resolve(&store, &mapper);
    assert_eq!(codes(&resolved), vec!["TargetEnumValueNotMapped"]);
    assert!(resolved.diagnostics[0].diagnostic.message.contains("Color.Blue"));
}
