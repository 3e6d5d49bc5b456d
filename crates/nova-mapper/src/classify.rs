//! Shape classification of types.
//!
//! Every type gets exactly one [`ShapeCategory`]. Categories are checked in a fixed order
//! because a type can qualify for several of them (a user class implementing `IDictionary` is
//! a dictionary, not an object).

use nova_mapper_types::helpers;
use nova_mapper_types::{
    InterfaceShape, KnownType, PrimitiveType, TypeEnv, TypeId, TypeKind, TypeRef,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Span,
    ReadOnlySpan,
    Memory,
    ReadOnlyMemory,
}

impl SpanKind {
    pub fn is_memory(self) -> bool {
        matches!(self, SpanKind::Memory | SpanKind::ReadOnlyMemory)
    }

    pub fn name(self) -> &'static str {
        match self {
            SpanKind::Span => "Span",
            SpanKind::ReadOnlySpan => "ReadOnlySpan",
            SpanKind::Memory => "Memory",
            SpanKind::ReadOnlyMemory => "ReadOnlyMemory",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImmutableKind {
    Array,
    List,
    HashSet,
}

/// Collection flavours, as far as building one is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Array,
    /// `IEnumerable<T>`: anything enumerable will do, built lazily.
    Enumerable,
    /// `List<T>` and the list-like interfaces a `List<T>` satisfies.
    List,
    /// `HashSet<T>`, `ISet<T>`, `IReadOnlySet<T>`.
    Set,
    SortedSet,
    Stack,
    Queue,
    LinkedList,
    ReadOnlyCollection,
    Immutable(ImmutableKind),
    /// A user type implementing `ICollection<T>`.
    Custom,
    /// A user type that can only be enumerated.
    EnumerableOnly,
}

impl CollectionKind {
    /// Whether items can be appended to an existing instance.
    pub fn is_appendable(self) -> bool {
        matches!(
            self,
            CollectionKind::List
                | CollectionKind::Set
                | CollectionKind::SortedSet
                | CollectionKind::Stack
                | CollectionKind::Queue
                | CollectionKind::LinkedList
                | CollectionKind::Custom
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DictionaryKind {
    /// `Dictionary<K, V>`, `IDictionary<K, V>`, `IReadOnlyDictionary<K, V>`.
    Dictionary,
    SortedDictionary,
    ReadOnlyDictionary,
    Immutable,
    /// A user type implementing `IDictionary<K, V>`.
    Custom,
    /// Read-only dictionary interface on a user type.
    ReadOnlyCustom,
}

impl DictionaryKind {
    pub fn is_appendable(self) -> bool {
        matches!(
            self,
            DictionaryKind::Dictionary | DictionaryKind::SortedDictionary | DictionaryKind::Custom
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeCategory {
    Primitive(PrimitiveType),
    Enum,
    Tuple,
    Span(SpanKind),
    Dictionary(DictionaryKind),
    Collection(CollectionKind),
    Object,
    Unknown,
}

/// A classified use of a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classified {
    pub category: ShapeCategory,
    pub nullable: bool,
}

/// Classify a type use. Nullability is unwrapped and reported next to the category.
pub fn classify_ref(env: &dyn TypeEnv, ty: TypeRef) -> Classified {
    Classified {
        category: classify(env, ty.id),
        nullable: ty.nullable,
    }
}

pub fn classify(env: &dyn TypeEnv, id: TypeId) -> ShapeCategory {
    let Some(def) = env.type_def(id) else {
        return ShapeCategory::Unknown;
    };
    match &def.kind {
        TypeKind::Primitive(p) => return ShapeCategory::Primitive(*p),
        TypeKind::Enum(_) => return ShapeCategory::Enum,
        TypeKind::Tuple(_) => return ShapeCategory::Tuple,
        TypeKind::Array { .. } => return ShapeCategory::Collection(CollectionKind::Array),
        TypeKind::Class | TypeKind::Struct | TypeKind::Interface => {}
    }

    if let Some(known) = def.known {
        if let Some(category) = classify_known(known) {
            return category;
        }
    }

    if helpers::implements(env, id, InterfaceShape::Dictionary).is_some() {
        return ShapeCategory::Dictionary(DictionaryKind::Custom);
    }
    if helpers::implements(env, id, InterfaceShape::ReadOnlyDictionary).is_some() {
        return ShapeCategory::Dictionary(DictionaryKind::ReadOnlyCustom);
    }
    if helpers::implements(env, id, InterfaceShape::Collection).is_some() {
        return ShapeCategory::Collection(CollectionKind::Custom);
    }
    if helpers::implements(env, id, InterfaceShape::Enumerable).is_some() {
        return ShapeCategory::Collection(CollectionKind::EnumerableOnly);
    }
    ShapeCategory::Object
}

fn classify_known(known: KnownType) -> Option<ShapeCategory> {
    use CollectionKind as C;
    use DictionaryKind as D;
    Some(match known {
        KnownType::Span => ShapeCategory::Span(SpanKind::Span),
        KnownType::ReadOnlySpan => ShapeCategory::Span(SpanKind::ReadOnlySpan),
        KnownType::Memory => ShapeCategory::Span(SpanKind::Memory),
        KnownType::ReadOnlyMemory => ShapeCategory::Span(SpanKind::ReadOnlyMemory),
        KnownType::Dictionary | KnownType::IDictionary | KnownType::IReadOnlyDictionary => {
            ShapeCategory::Dictionary(D::Dictionary)
        }
        KnownType::SortedDictionary => ShapeCategory::Dictionary(D::SortedDictionary),
        KnownType::ReadOnlyDictionary => ShapeCategory::Dictionary(D::ReadOnlyDictionary),
        KnownType::ImmutableDictionary => ShapeCategory::Dictionary(D::Immutable),
        KnownType::IEnumerable => ShapeCategory::Collection(C::Enumerable),
        KnownType::List
        | KnownType::IList
        | KnownType::ICollection
        | KnownType::IReadOnlyCollection
        | KnownType::IReadOnlyList => ShapeCategory::Collection(C::List),
        KnownType::HashSet | KnownType::ISet | KnownType::IReadOnlySet => {
            ShapeCategory::Collection(C::Set)
        }
        KnownType::SortedSet => ShapeCategory::Collection(C::SortedSet),
        KnownType::Stack => ShapeCategory::Collection(C::Stack),
        KnownType::Queue => ShapeCategory::Collection(C::Queue),
        KnownType::LinkedList => ShapeCategory::Collection(C::LinkedList),
        KnownType::ReadOnlyCollection => ShapeCategory::Collection(C::ReadOnlyCollection),
        KnownType::ImmutableArray => ShapeCategory::Collection(C::Immutable(ImmutableKind::Array)),
        KnownType::ImmutableList => ShapeCategory::Collection(C::Immutable(ImmutableKind::List)),
        KnownType::ImmutableHashSet => {
            ShapeCategory::Collection(C::Immutable(ImmutableKind::HashSet))
        }
        KnownType::KeyValuePair => return None,
    })
}

/// Element type of anything that can be enumerated (arrays, collections, spans and memories).
pub fn element_type(env: &dyn TypeEnv, id: TypeId) -> Option<TypeRef> {
    if let Some(element) = helpers::array_element(env, id) {
        return Some(element);
    }
    match helpers::known(env, id) {
        Some(KnownType::Span | KnownType::ReadOnlySpan | KnownType::Memory | KnownType::ReadOnlyMemory) => {
            helpers::generic_args(env, id).first().copied()
        }
        _ => helpers::implements(env, id, InterfaceShape::Enumerable)
            .and_then(|args| args.first().copied()),
    }
}

/// Key and value types of a dictionary, or of anything enumerating `KeyValuePair<K, V>`.
pub fn key_value_types(env: &dyn TypeEnv, id: TypeId) -> Option<(TypeRef, TypeRef)> {
    for shape in [InterfaceShape::Dictionary, InterfaceShape::ReadOnlyDictionary] {
        if let Some(args) = helpers::implements(env, id, shape) {
            if let [k, v] = args.as_slice() {
                return Some((*k, *v));
            }
        }
    }
    let element = element_type(env, id)?;
    if helpers::known(env, element.id) != Some(KnownType::KeyValuePair) {
        return None;
    }
    match helpers::generic_args(env, element.id) {
        [k, v] => Some((*k, *v)),
        _ => None,
    }
}

/// Expression yielding the element count of `id` without enumerating it, if there is one.
pub fn count_member(env: &dyn TypeEnv, id: TypeId) -> Option<&'static str> {
    if helpers::array_element(env, id).is_some() {
        return Some("Length");
    }
    if matches!(classify(env, id), ShapeCategory::Span(_)) {
        return Some("Length");
    }
    if helpers::known(env, id) == Some(KnownType::ImmutableArray) {
        return Some("Length");
    }
    let countable = [
        InterfaceShape::Collection,
        InterfaceShape::ReadOnlyCollection,
        InterfaceShape::Dictionary,
        InterfaceShape::ReadOnlyDictionary,
    ];
    countable
        .into_iter()
        .any(|shape| helpers::implements(env, id, shape).is_some())
        .then_some("Count")
}

/// Whether elements of `id` can be read by index.
pub fn is_indexable(env: &dyn TypeEnv, id: TypeId) -> bool {
    helpers::array_element(env, id).is_some()
        || matches!(
            helpers::known(env, id),
            Some(KnownType::Span | KnownType::ReadOnlySpan)
        )
        || helpers::implements(env, id, InterfaceShape::List).is_some()
        || helpers::implements(env, id, InterfaceShape::ReadOnlyList).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_mapper_types::{EnumDef, EnumMemberDef, TypeDef, TypeStore};

    #[test]
    fn library_types_are_classified_by_shape() {
        let mut store = TypeStore::default();
        let cases = [
            ("int", ShapeCategory::Primitive(PrimitiveType::Int)),
            ("string", ShapeCategory::Primitive(PrimitiveType::String)),
            ("int[]", ShapeCategory::Collection(CollectionKind::Array)),
            ("List<int>", ShapeCategory::Collection(CollectionKind::List)),
            (
                "IReadOnlyCollection<int>",
                ShapeCategory::Collection(CollectionKind::List),
            ),
            ("IEnumerable<int>", ShapeCategory::Collection(CollectionKind::Enumerable)),
            ("ISet<int>", ShapeCategory::Collection(CollectionKind::Set)),
            ("Stack<int>", ShapeCategory::Collection(CollectionKind::Stack)),
            (
                "ImmutableArray<int>",
                ShapeCategory::Collection(CollectionKind::Immutable(ImmutableKind::Array)),
            ),
            (
                "Dictionary<string, int>",
                ShapeCategory::Dictionary(DictionaryKind::Dictionary),
            ),
            (
                "IReadOnlyDictionary<string, int>",
                ShapeCategory::Dictionary(DictionaryKind::Dictionary),
            ),
            ("Span<int>", ShapeCategory::Span(SpanKind::Span)),
            ("ReadOnlyMemory<int>", ShapeCategory::Span(SpanKind::ReadOnlyMemory)),
            ("(int A, string B)", ShapeCategory::Tuple),
        ];
        for (expr, expected) in cases {
            let ty = store.parse(expr).expect(expr);
            assert_eq!(classify(&store, ty.id), expected, "{expr}");
        }
    }

    #[test]
    fn user_collections_win_over_objects() {
        let mut store = TypeStore::default();
        let int = store.parse("int").expect("int");
        let collection = store.parse("ICollection<int>").expect("collection");
        let dictionary = store.parse("IDictionary<string, int>").expect("dictionary");

        let bag = store.upsert_type(
            TypeDef::class("Bag")
                .with_interface(collection)
                .with_property("Name", int),
        );
        let lookup = store.upsert_type(TypeDef::class("Lookup").with_interface(dictionary));
        let car = store.upsert_type(TypeDef::class("Car").with_property("Seats", int));
        let color = store.upsert_type(TypeDef::enumeration(
            "Color",
            EnumDef {
                underlying: PrimitiveType::Int,
                members: vec![EnumMemberDef::new("Red", 1)],
            },
        ));

        assert_eq!(classify(&store, bag), ShapeCategory::Collection(CollectionKind::Custom));
        assert_eq!(classify(&store, lookup), ShapeCategory::Dictionary(DictionaryKind::Custom));
        assert_eq!(classify(&store, car), ShapeCategory::Object);
        assert_eq!(classify(&store, color), ShapeCategory::Enum);
        assert_eq!(
            classify(&store, TypeId::from_raw(u32::MAX)),
            ShapeCategory::Unknown
        );
    }

    #[test]
    fn counts_and_elements() {
        let mut store = TypeStore::default();
        let list = store.parse("List<long>").expect("list");
        let enumerable = store.parse("IEnumerable<long>").expect("enumerable");
        let span = store.parse("Span<int>").expect("span");
        let dict = store.parse("Dictionary<string, long>").expect("dict");
        let long = store.parse("long").expect("long");
        let string = store.parse("string").expect("string");

        assert_eq!(element_type(&store, list.id), Some(long));
        assert_eq!(count_member(&store, list.id), Some("Count"));
        assert_eq!(count_member(&store, enumerable.id), None);
        assert_eq!(count_member(&store, span.id), Some("Length"));
        assert_eq!(key_value_types(&store, dict.id), Some((string, long)));
        assert!(is_indexable(&store, span.id));
        assert!(!is_indexable(&store, enumerable.id));
    }
}
