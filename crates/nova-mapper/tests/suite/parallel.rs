use nova_mapper::{resolve_mappers, MapperDecl, MapperError, MappingMethod};
use nova_mapper_config::MapperOptionsLayer;
use nova_mapper_types::{TypeDef, TypeId, TypeRef, TypeStore};
use pretty_assertions::assert_eq;

#[test]
fn mappers_resolve_independently_and_keep_their_order() {
    let mut store = TypeStore::default();
    let int = store.parse("int").expect("int");
    let mut mappers = Vec::new();
    for idx in 0..16 {
        let source = store.upsert_type(TypeDef::class(format!("Source{idx}")).with_property("Id", int));
        let target = store.upsert_type(TypeDef::class(format!("Target{idx}")).with_property("Id", int));
        mappers.push(MapperDecl::new(format!("Mapper{idx}")).with_method(MappingMethod::new(
            "Map",
            TypeRef::new(source),
            TypeRef::new(target),
        )));
    }
    mappers.push(MapperDecl::new("Broken").with_method(MappingMethod::new(
        "Map",
        int,
        TypeRef::new(TypeId::from_raw(u32::MAX)),
    )));

    let results = resolve_mappers(&store, &MapperOptionsLayer::default(), &mappers);
    assert_eq!(results.len(), 17);
    for (idx, result) in results.iter().take(16).enumerate() {
        let resolved = result.as_ref().expect("resolves");
        assert_eq!(resolved.name, format!("Mapper{idx}"));
        assert_eq!(resolved.plans.len(), 1);
        assert!(resolved.diagnostics.is_empty());
    }
    assert_eq!(
        results[16].as_ref().map(|r| r.name.clone()),
        Err(&MapperError::UnknownType {
            mapper: "Broken".to_string(),
            method: "Map".to_string(),
            id: u32::MAX,
        })
    );
}
