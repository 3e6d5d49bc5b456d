use nova_mapper_types::helpers::{constructors, display, enum_def, find_member, implements};
use nova_mapper_types::{
    Accessibility, InterfaceShape, MemberKind, PrimitiveType, TypeDecl, TypeEnv, TypeStore,
};
use pretty_assertions::assert_eq;

fn load(json: &str) -> TypeStore {
    let decls: Vec<TypeDecl> = serde_json::from_str(json).expect("declarations should parse");
    let mut store = TypeStore::default();
    store.declare(&decls).expect("declarations should load");
    store
}

#[test]
fn self_referential_and_forward_declarations_load() {
    let store = load(
        r#"[
            { "kind": "class", "name": "Node", "members": [
                { "name": "Parent", "type": "Node?" },
                { "name": "Children", "type": "List<Node>" },
                { "name": "Tag", "type": "Tag" }
            ]},
            { "kind": "struct", "name": "Tag", "members": [
                { "name": "Value", "type": "string", "field": true }
            ]}
        ]"#,
    );

    let node = store.lookup_type("Node").expect("Node should be declared");
    let parent = find_member(&store, node, "Parent").expect("Parent member");
    assert_eq!(parent.ty.id, node);
    assert!(parent.ty.nullable);
    assert_eq!(
        display(
            &store,
            find_member(&store, node, "Children").expect("Children").ty
        ),
        "List<Node>"
    );

    let tag = store.lookup_type("Tag").expect("Tag should be declared");
    let value = find_member(&store, tag, "Value").expect("Value member");
    assert_eq!(value.kind, MemberKind::Field);
}

#[test]
fn member_accessors_default_to_public_get_set() {
    let store = load(
        r#"[
            { "kind": "class", "name": "Car", "members": [
                { "name": "Id", "type": "int" },
                { "name": "Name", "type": "string", "set": null },
                { "name": "Model", "type": "string", "init": true, "required": true },
                { "name": "Secret", "type": "string", "set": "private" }
            ]}
        ]"#,
    );
    let car = store.lookup_type("Car").expect("Car");

    let id = find_member(&store, car, "Id").expect("Id");
    assert!(id.is_readable() && id.is_writable() && !id.is_init_only());

    let name = find_member(&store, car, "Name").expect("Name");
    assert!(!name.is_writable());

    let model = find_member(&store, car, "Model").expect("Model");
    assert!(model.is_init_only());
    assert!(model.required);

    let secret = find_member(&store, car, "Secret").expect("Secret");
    assert_eq!(
        secret.setter.map(|s| s.accessibility),
        Some(Accessibility::Private)
    );

    assert_eq!(constructors(&store, car).len(), 1);
}

#[test]
fn enum_values_continue_from_the_previous_member() {
    let store = load(
        r#"[
            { "kind": "enum", "name": "Color", "underlying": "byte", "members": [
                { "name": "Red" },
                { "name": "Green", "value": 10, "description": "green-ish" },
                { "name": "Blue" }
            ]}
        ]"#,
    );
    let color = store.lookup_type("Color").expect("Color");
    let def = enum_def(&store, color).expect("Color should be an enum");
    assert_eq!(def.underlying, PrimitiveType::Byte);
    let values: Vec<_> = def
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.value))
        .collect();
    assert_eq!(values, vec![("Red", 0), ("Green", 10), ("Blue", 11)]);
    assert_eq!(def.members[1].description.as_deref(), Some("green-ish"));
}

#[test]
fn user_types_can_implement_collection_interfaces() {
    let store = load(
        r#"[
            { "kind": "class", "name": "Bag", "interfaces": ["ICollection<string>"] }
        ]"#,
    );
    let bag = store.lookup_type("Bag").expect("Bag");
    let string = store.well_known().string();
    let args = implements(&store, bag, InterfaceShape::Enumerable).expect("Bag is enumerable");
    assert_eq!(args.len(), 1);
    assert_eq!(args[0].id, string);
}

#[test]
fn unknown_type_references_fail_to_load() {
    let decls: Vec<TypeDecl> = serde_json::from_str(
        r#"[{ "kind": "class", "name": "Car", "members": [{ "name": "Engine", "type": "Engine" }] }]"#,
    )
    .expect("declarations should parse");
    let mut store = TypeStore::default();
    let err = store.declare(&decls).expect_err("Engine is unknown");
    assert_eq!(err.to_string(), "unknown type `Engine`");
}
