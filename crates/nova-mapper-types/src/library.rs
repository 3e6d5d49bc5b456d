//! Shapes of the library collection types.
//!
//! Only what the mapping engine consults is modelled: implemented collection interfaces, the
//! count/length members, the mutation methods and the constructors.

use crate::{
    ConstructorDef, KnownType, MemberDef, MethodDef, ParamDef, TypeDef, TypeEnv, TypeRef,
    TypeStore,
};

pub(crate) fn fill_shape(store: &mut TypeStore, def: &mut TypeDef) {
    let Some(known) = def.known else {
        return;
    };
    let int = TypeRef::new(store.well_known().int());
    let boolean = TypeRef::new(store.well_known().bool());
    let args = def.type_args.clone();
    let t = args[0];

    match known {
        KnownType::IEnumerable => {}
        KnownType::ICollection => {
            def.interfaces.push(iface(store, KnownType::IEnumerable, &[t]));
            def.members.push(count(int));
            def.methods.push(method("Add", vec![ParamDef::new("item", t)], None));
        }
        KnownType::IList => {
            def.interfaces.push(iface(store, KnownType::ICollection, &[t]));
            def.members.push(count(int));
            def.members.push(indexer(t));
            def.methods.push(method("Add", vec![ParamDef::new("item", t)], None));
        }
        KnownType::IReadOnlyCollection => {
            def.interfaces.push(iface(store, KnownType::IEnumerable, &[t]));
            def.members.push(count(int));
        }
        KnownType::IReadOnlyList => {
            def.interfaces
                .push(iface(store, KnownType::IReadOnlyCollection, &[t]));
            def.members.push(count(int));
            def.members.push(read_only_indexer(t));
        }
        KnownType::ISet => {
            def.interfaces.push(iface(store, KnownType::ICollection, &[t]));
            def.members.push(count(int));
            def.methods
                .push(method("Add", vec![ParamDef::new("item", t)], Some(boolean)));
        }
        KnownType::IReadOnlySet => {
            def.interfaces
                .push(iface(store, KnownType::IReadOnlyCollection, &[t]));
            def.members.push(count(int));
        }
        KnownType::IDictionary | KnownType::IReadOnlyDictionary => {
            let (k, v) = (t, args[1]);
            let pair = TypeRef::new(store.instantiate(KnownType::KeyValuePair, vec![k, v]));
            let base = if known == KnownType::IDictionary {
                KnownType::ICollection
            } else {
                KnownType::IReadOnlyCollection
            };
            def.interfaces.push(iface(store, base, &[pair]));
            def.members.push(count(int));
            if known == KnownType::IDictionary {
                def.members.push(indexer(v));
                def.methods.push(method(
                    "Add",
                    vec![ParamDef::new("key", k), ParamDef::new("value", v)],
                    None,
                ));
            } else {
                def.members.push(read_only_indexer(v));
            }
        }
        KnownType::List => {
            list_like(store, def, t, &[KnownType::IList, KnownType::IReadOnlyList]);
            def.methods.push(method("Add", vec![ParamDef::new("item", t)], None));
            def.methods.push(ensure_capacity(int));
            capacity_ctors(store, def, t, int);
        }
        KnownType::HashSet => {
            list_like(store, def, t, &[KnownType::ISet, KnownType::IReadOnlySet]);
            def.methods
                .push(method("Add", vec![ParamDef::new("item", t)], Some(boolean)));
            def.methods.push(ensure_capacity(int));
            capacity_ctors(store, def, t, int);
        }
        KnownType::SortedSet => {
            list_like(store, def, t, &[KnownType::ISet, KnownType::IReadOnlySet]);
            def.methods
                .push(method("Add", vec![ParamDef::new("item", t)], Some(boolean)));
            def.constructors.push(ConstructorDef::public(Vec::new()));
            let enumerable = iface(store, KnownType::IEnumerable, &[t]);
            def.constructors.push(ConstructorDef::public(vec![ParamDef::new(
                "collection",
                enumerable,
            )]));
        }
        KnownType::Stack | KnownType::Queue => {
            list_like(store, def, t, &[KnownType::IReadOnlyCollection]);
            let add = if known == KnownType::Stack {
                "Push"
            } else {
                "Enqueue"
            };
            def.methods.push(method(add, vec![ParamDef::new("item", t)], None));
            def.methods.push(ensure_capacity(int));
            capacity_ctors(store, def, t, int);
        }
        KnownType::LinkedList => {
            list_like(
                store,
                def,
                t,
                &[KnownType::ICollection, KnownType::IReadOnlyCollection],
            );
            def.methods
                .push(method("AddLast", vec![ParamDef::new("value", t)], None));
            def.constructors.push(ConstructorDef::public(Vec::new()));
            let enumerable = iface(store, KnownType::IEnumerable, &[t]);
            def.constructors.push(ConstructorDef::public(vec![ParamDef::new(
                "collection",
                enumerable,
            )]));
        }
        KnownType::ReadOnlyCollection => {
            list_like(store, def, t, &[KnownType::IList, KnownType::IReadOnlyList]);
            let list = iface(store, KnownType::IList, &[t]);
            def.constructors
                .push(ConstructorDef::public(vec![ParamDef::new("list", list)]));
        }
        KnownType::Dictionary | KnownType::SortedDictionary | KnownType::ReadOnlyDictionary => {
            let (k, v) = (t, args[1]);
            def.interfaces.push(iface(store, KnownType::IDictionary, &[k, v]));
            def.interfaces
                .push(iface(store, KnownType::IReadOnlyDictionary, &[k, v]));
            def.members.push(count(int));
            def.members.push(indexer(v));
            let dictionary = iface(store, KnownType::IDictionary, &[k, v]);
            if known == KnownType::ReadOnlyDictionary {
                def.constructors.push(ConstructorDef::public(vec![ParamDef::new(
                    "dictionary",
                    dictionary,
                )]));
                return;
            }
            def.methods.push(method(
                "Add",
                vec![ParamDef::new("key", k), ParamDef::new("value", v)],
                None,
            ));
            def.constructors.push(ConstructorDef::public(Vec::new()));
            if known == KnownType::Dictionary {
                def.methods.push(ensure_capacity(int));
                def.constructors
                    .push(ConstructorDef::public(vec![ParamDef::new("capacity", int)]));
            }
            def.constructors.push(ConstructorDef::public(vec![ParamDef::new(
                "dictionary",
                dictionary,
            )]));
        }
        KnownType::ImmutableArray => {
            def.interfaces.push(iface(store, KnownType::IList, &[t]));
            def.interfaces.push(iface(store, KnownType::IReadOnlyList, &[t]));
            def.members.push(MemberDef::read_only("Length", int));
        }
        KnownType::ImmutableList => {
            list_like(store, def, t, &[KnownType::IList, KnownType::IReadOnlyList]);
        }
        KnownType::ImmutableHashSet => {
            list_like(store, def, t, &[KnownType::ISet, KnownType::IReadOnlySet]);
        }
        KnownType::ImmutableDictionary => {
            let (k, v) = (t, args[1]);
            def.interfaces.push(iface(store, KnownType::IDictionary, &[k, v]));
            def.interfaces
                .push(iface(store, KnownType::IReadOnlyDictionary, &[k, v]));
            def.members.push(count(int));
        }
        KnownType::Span | KnownType::ReadOnlySpan => {
            def.members.push(MemberDef::read_only("Length", int));
            def.members.push(indexer(t));
            let array = TypeRef::new(store.array_of(t));
            def.methods.push(method("ToArray", Vec::new(), Some(array)));
        }
        KnownType::Memory | KnownType::ReadOnlyMemory => {
            def.members.push(MemberDef::read_only("Length", int));
            let span_kind = if known == KnownType::Memory {
                KnownType::Span
            } else {
                KnownType::ReadOnlySpan
            };
            let span = TypeRef::new(store.instantiate(span_kind, vec![t]));
            def.members.push(MemberDef::read_only("Span", span));
            let array = TypeRef::new(store.array_of(t));
            def.methods.push(method("ToArray", Vec::new(), Some(array)));
        }
        KnownType::KeyValuePair => {
            let (k, v) = (t, args[1]);
            def.members.push(MemberDef::read_only("Key", k));
            def.members.push(MemberDef::read_only("Value", v));
            def.constructors.push(ConstructorDef::public(vec![
                ParamDef::new("key", k),
                ParamDef::new("value", v),
            ]));
        }
    }
}

pub(crate) fn fill_array_shape(store: &mut TypeStore, def: &mut TypeDef, element: TypeRef) {
    let int = TypeRef::new(store.well_known().int());
    def.interfaces.push(iface(store, KnownType::IList, &[element]));
    def.interfaces
        .push(iface(store, KnownType::IReadOnlyList, &[element]));
    def.members.push(MemberDef::read_only("Length", int));
    def.members.push(indexer(element));
}

fn list_like(store: &mut TypeStore, def: &mut TypeDef, t: TypeRef, interfaces: &[KnownType]) {
    let int = TypeRef::new(store.well_known().int());
    for known in interfaces {
        def.interfaces.push(iface(store, *known, &[t]));
    }
    def.members.push(count(int));
}

fn capacity_ctors(store: &mut TypeStore, def: &mut TypeDef, t: TypeRef, int: TypeRef) {
    let enumerable = iface(store, KnownType::IEnumerable, &[t]);
    def.constructors.push(ConstructorDef::public(Vec::new()));
    def.constructors
        .push(ConstructorDef::public(vec![ParamDef::new("capacity", int)]));
    def.constructors.push(ConstructorDef::public(vec![ParamDef::new(
        "collection",
        enumerable,
    )]));
}

fn iface(store: &mut TypeStore, known: KnownType, args: &[TypeRef]) -> TypeRef {
    TypeRef::new(store.instantiate(known, args.to_vec()))
}

fn count(int: TypeRef) -> MemberDef {
    MemberDef::read_only("Count", int)
}

fn indexer(ty: TypeRef) -> MemberDef {
    let mut member = MemberDef::property("Item", ty);
    member.is_indexer = true;
    member
}

fn read_only_indexer(ty: TypeRef) -> MemberDef {
    let mut member = MemberDef::read_only("Item", ty);
    member.is_indexer = true;
    member
}

fn ensure_capacity(int: TypeRef) -> MethodDef {
    method(
        "EnsureCapacity",
        vec![ParamDef::new("capacity", int)],
        Some(int),
    )
}

fn method(name: &str, params: Vec<ParamDef>, ret: Option<TypeRef>) -> MethodDef {
    MethodDef::instance(name, params, ret)
}
