use nova_mapper_types::helpers::{
    array_element, constructors, display, find_member, find_method, implements, is_value_type,
};
use nova_mapper_types::{InterfaceShape, KnownType, TypeEnv, TypeRef, TypeStore};
use pretty_assertions::assert_eq;

#[test]
fn collection_mutation_methods_follow_the_library() {
    let mut store = TypeStore::default();
    let cases = [
        ("List<int>", "Add", true),
        ("HashSet<int>", "Add", true),
        ("SortedSet<int>", "Add", false),
        ("Stack<int>", "Push", true),
        ("Queue<int>", "Enqueue", true),
        ("LinkedList<int>", "AddLast", false),
    ];
    for (expr, add, has_capacity) in cases {
        let ty = store.parse(expr).expect("type should parse");
        assert!(find_method(&store, ty.id, add, 1).is_some(), "{expr}.{add}");
        assert_eq!(
            find_method(&store, ty.id, "EnsureCapacity", 1).is_some(),
            has_capacity,
            "{expr}.EnsureCapacity"
        );
    }
}

#[test]
fn arrays_are_lists_with_a_length() {
    let mut store = TypeStore::default();
    let array = store.parse("long[]").expect("type should parse");
    let long = TypeRef::new(store.lookup_type("long").expect("long"));
    assert_eq!(array_element(&store, array.id), Some(long));
    assert_eq!(
        implements(&store, array.id, InterfaceShape::ReadOnlyList),
        Some(vec![long])
    );
    assert!(find_member(&store, array.id, "Length").is_some());
    assert!(find_member(&store, array.id, "Count").is_none());
}

#[test]
fn span_and_memory_are_value_types_without_collection_interfaces() {
    let mut store = TypeStore::default();
    let span = store.parse("Span<int>").expect("type should parse");
    let memory = store.parse("ReadOnlyMemory<int>").expect("type should parse");
    assert!(is_value_type(&store, span.id));
    assert_eq!(implements(&store, span.id, InterfaceShape::Enumerable), None);

    let span_member = find_member(&store, memory.id, "Span").expect("Memory.Span");
    assert_eq!(display(&store, span_member.ty), "ReadOnlySpan<int>");
}

#[test]
fn read_only_collections_have_no_parameterless_constructor() {
    let mut store = TypeStore::default();
    let ro = store
        .parse("ReadOnlyCollection<string>")
        .expect("type should parse");
    let ctors = constructors(&store, ro.id);
    assert_eq!(ctors.len(), 1);
    assert_eq!(display(&store, ctors[0].params[0].ty), "IList<string>");
}

#[test]
fn key_value_pair_exposes_key_and_value() {
    let mut store = TypeStore::default();
    let string = TypeRef::new(store.well_known().string());
    let int = TypeRef::new(store.well_known().int());
    let pair = store.instantiate(KnownType::KeyValuePair, vec![string, int]);
    assert_eq!(
        find_member(&store, pair, "Key").map(|m| m.ty),
        Some(string)
    );
    assert_eq!(find_member(&store, pair, "Value").map(|m| m.ty), Some(int));
}

#[test]
fn read_only_interfaces_declare_no_mutation() {
    let mut store = TypeStore::default();
    for expr in ["IReadOnlyList<int>", "IReadOnlyCollection<int>", "IReadOnlySet<int>"] {
        let ty = store.parse(expr).expect("type should parse");
        assert!(find_method(&store, ty.id, "Add", 1).is_none(), "{expr}.Add");
    }
    for expr in ["ICollection<int>", "IList<int>", "IDictionary<string, int>"] {
        let ty = store.parse(expr).expect("type should parse");
        assert!(
            find_method(&store, ty.id, "EnsureCapacity", 1).is_none(),
            "{expr}.EnsureCapacity"
        );
    }

    let list = store.parse("IReadOnlyList<int>").expect("type should parse");
    let item = find_member(&store, list.id, "Item").expect("IReadOnlyList indexer");
    assert!(item.setter.is_none());

    let dict = store
        .parse("IReadOnlyDictionary<string, int>")
        .expect("type should parse");
    assert!(find_method(&store, dict.id, "Add", 2).is_none());
    let item = find_member(&store, dict.id, "Item").expect("IReadOnlyDictionary indexer");
    assert!(item.setter.is_none());
}
