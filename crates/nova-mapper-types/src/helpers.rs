//! Free-function queries over a [`TypeEnv`].
//!
//! These never panic: ids the environment does not know simply behave like empty classes.

use std::collections::{HashSet, VecDeque};

use crate::{
    Accessibility, ConstructorDef, EnumDef, InterfaceShape, KnownType, MemberDef, MethodDef,
    PrimitiveType, TupleElementDef, TypeEnv, TypeId, TypeKind, TypeRef,
};

/// Render a type use the way it is written in source, e.g. `List<int?>` or `string?`.
pub fn display(env: &dyn TypeEnv, ty: TypeRef) -> String {
    let name = env
        .type_def(ty.id)
        .map(|d| d.name.clone())
        .unwrap_or_else(|| format!("<unknown#{}>", ty.id.to_raw()));
    if ty.nullable {
        format!("{name}?")
    } else {
        name
    }
}

/// Name of the type without nullability, usable inside generated identifiers.
pub fn type_name(env: &dyn TypeEnv, id: TypeId) -> String {
    display(env, TypeRef::new(id))
}

pub fn primitive(env: &dyn TypeEnv, id: TypeId) -> Option<PrimitiveType> {
    env.type_def(id).and_then(|d| d.primitive_type())
}

pub fn enum_def(env: &dyn TypeEnv, id: TypeId) -> Option<&EnumDef> {
    env.type_def(id).and_then(|d| d.enum_def())
}

pub fn known(env: &dyn TypeEnv, id: TypeId) -> Option<KnownType> {
    env.type_def(id).and_then(|d| d.known)
}

pub fn generic_args(env: &dyn TypeEnv, id: TypeId) -> &[TypeRef] {
    env.type_def(id)
        .map(|d| d.type_args.as_slice())
        .unwrap_or_default()
}

pub fn array_element(env: &dyn TypeEnv, id: TypeId) -> Option<TypeRef> {
    match env.type_def(id).map(|d| &d.kind) {
        Some(TypeKind::Array { element }) => Some(*element),
        _ => None,
    }
}

pub fn tuple_elements(env: &dyn TypeEnv, id: TypeId) -> Option<&[TupleElementDef]> {
    match env.type_def(id).map(|d| &d.kind) {
        Some(TypeKind::Tuple(elements)) => Some(elements.as_slice()),
        _ => None,
    }
}

pub fn is_value_type(env: &dyn TypeEnv, id: TypeId) -> bool {
    match env.type_def(id).map(|d| &d.kind) {
        Some(TypeKind::Primitive(p)) => p.is_value_type(),
        Some(TypeKind::Enum(_) | TypeKind::Struct | TypeKind::Tuple(_)) => true,
        _ => false,
    }
}

pub fn is_interface(env: &dyn TypeEnv, id: TypeId) -> bool {
    matches!(
        env.type_def(id).map(|d| &d.kind),
        Some(TypeKind::Interface)
    )
}

pub fn is_abstract(env: &dyn TypeEnv, id: TypeId) -> bool {
    env.type_def(id).is_some_and(|d| d.is_abstract)
}

/// All types `id` can be viewed as: itself, its base chain and every (transitively) implemented
/// interface, in breadth-first order.
pub fn supertypes(env: &dyn TypeEnv, id: TypeId) -> Vec<TypeId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([id]);
    while let Some(current) = queue.pop_front() {
        if !seen.insert(current) {
            continue;
        }
        out.push(current);
        let Some(def) = env.type_def(current) else {
            continue;
        };
        if let Some(base) = def.base {
            queue.push_back(base.id);
        }
        for iface in &def.interfaces {
            queue.push_back(iface.id);
        }
    }
    out
}

/// If `id` implements the collection interface `shape`, return that interface's type arguments.
pub fn implements(env: &dyn TypeEnv, id: TypeId, shape: InterfaceShape) -> Option<Vec<TypeRef>> {
    supertypes(env, id).into_iter().find_map(|candidate| {
        let def = env.type_def(candidate)?;
        (def.known.and_then(KnownType::interface_shape) == Some(shape))
            .then(|| def.type_args.clone())
    })
}

/// Whether a value of type `from` can be assigned to `to` without any conversion.
pub fn is_assignable(env: &dyn TypeEnv, from: TypeId, to: TypeId) -> bool {
    if from == to || to == env.well_known().object() {
        return true;
    }
    let is_struct = matches!(env.type_def(from).map(|d| &d.kind), Some(TypeKind::Struct));
    if is_value_type(env, from) && !is_struct {
        // Primitive widening is a conversion, not an assignment.
        return false;
    }
    supertypes(env, from).contains(&to)
}

/// Instance and static members of `id` and its base chain. Members declared on a derived type
/// hide same-named base members.
pub fn members(env: &dyn TypeEnv, id: TypeId) -> Vec<&MemberDef> {
    let mut out: Vec<&MemberDef> = Vec::new();
    let mut names = HashSet::new();
    let mut seen = HashSet::new();
    let mut current = Some(id);
    while let Some(cur) = current {
        if !seen.insert(cur) {
            break;
        }
        let Some(def) = env.type_def(cur) else {
            break;
        };
        for member in &def.members {
            if names.insert(member.name.as_str()) {
                out.push(member);
            }
        }
        current = def.base.map(|b| b.id);
    }
    out
}

pub fn find_member<'a>(env: &'a dyn TypeEnv, id: TypeId, name: &str) -> Option<&'a MemberDef> {
    members(env, id).into_iter().find(|m| m.name == name)
}

/// Constructors of `id`. Classes without declared constructors get the implicit public
/// parameterless one; structs always have it.
pub fn constructors(env: &dyn TypeEnv, id: TypeId) -> Vec<ConstructorDef> {
    let Some(def) = env.type_def(id) else {
        return Vec::new();
    };
    match def.kind {
        TypeKind::Class
            if def.known.is_none() && def.constructors.is_empty() && !def.is_abstract =>
        {
            vec![ConstructorDef::public(Vec::new())]
        }
        TypeKind::Struct | TypeKind::Tuple(_) => {
            let mut ctors = def.constructors.clone();
            if !ctors.iter().any(ConstructorDef::is_parameterless) {
                ctors.insert(0, ConstructorDef::public(Vec::new()));
            }
            ctors
        }
        TypeKind::Class => {
            if def.is_abstract {
                Vec::new()
            } else {
                def.constructors.clone()
            }
        }
        _ => Vec::new(),
    }
}

/// Whether a parameterless constructor with an accessibility accepted by `visible` exists.
pub fn has_parameterless_constructor(
    env: &dyn TypeEnv,
    id: TypeId,
    visible: impl Fn(Accessibility) -> bool,
) -> bool {
    constructors(env, id)
        .iter()
        .any(|c| c.is_parameterless() && visible(c.accessibility))
}

/// Methods named `name` declared on `id` or any of its supertypes.
pub fn methods<'a>(env: &'a dyn TypeEnv, id: TypeId, name: &str) -> Vec<&'a MethodDef> {
    supertypes(env, id)
        .into_iter()
        .filter_map(|t| env.type_def(t))
        .flat_map(|d| d.methods.iter())
        .filter(|m| m.name == name)
        .collect()
}

pub fn find_method<'a>(
    env: &'a dyn TypeEnv,
    id: TypeId,
    name: &str,
    arity: usize,
) -> Option<&'a MethodDef> {
    methods(env, id, name)
        .into_iter()
        .find(|m| m.params.len() == arity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TypeDef, TypeStore};

    #[test]
    fn list_implements_the_collection_interfaces_transitively() {
        let mut store = TypeStore::default();
        let int = TypeRef::new(store.well_known().int());
        let list = store.instantiate(KnownType::List, vec![int]);

        for shape in [
            InterfaceShape::Enumerable,
            InterfaceShape::Collection,
            InterfaceShape::List,
            InterfaceShape::ReadOnlyList,
        ] {
            assert_eq!(implements(&store, list, shape), Some(vec![int]), "{shape:?}");
        }
        assert_eq!(implements(&store, list, InterfaceShape::Dictionary), None);
    }

    #[test]
    fn dictionary_enumerates_key_value_pairs() {
        let mut store = TypeStore::default();
        let string = TypeRef::new(store.well_known().string());
        let int = TypeRef::new(store.well_known().int());
        let dict = store.instantiate(KnownType::Dictionary, vec![string, int]);
        let pair = store.instantiate(KnownType::KeyValuePair, vec![string, int]);

        assert_eq!(
            implements(&store, dict, InterfaceShape::Enumerable),
            Some(vec![TypeRef::new(pair)])
        );
        assert!(find_method(&store, dict, "EnsureCapacity", 1).is_some());
    }

    #[test]
    fn implicit_constructor_is_synthesised_for_plain_classes() {
        let mut store = TypeStore::default();
        let id = store.upsert_type(TypeDef::class("Car"));
        assert_eq!(constructors(&store, id), vec![ConstructorDef::public(Vec::new())]);

        let abstract_id = store.upsert_type(TypeDef::class("Vehicle").abstract_type());
        assert!(constructors(&store, abstract_id).is_empty());
    }

    #[test]
    fn derived_members_hide_base_members() {
        let mut store = TypeStore::default();
        let int = TypeRef::new(store.well_known().int());
        let string = TypeRef::new(store.well_known().string());
        let base = store.upsert_type(
            TypeDef::class("Base")
                .with_property("Id", int)
                .with_property("Name", string),
        );
        let derived = store.upsert_type(
            TypeDef::class("Derived")
                .with_base(TypeRef::new(base))
                .with_property("Id", string),
        );

        let found: Vec<_> = members(&store, derived)
            .into_iter()
            .map(|m| (m.name.as_str(), m.ty))
            .collect();
        assert_eq!(found, vec![("Id", string), ("Name", string)]);
        assert!(is_assignable(&store, derived, base));
        assert!(!is_assignable(&store, base, derived));
    }

    #[test]
    fn display_marks_nullability() {
        let mut store = TypeStore::default();
        let int = TypeRef::new(store.well_known().int());
        let array = store.array_of(int.with_nullable(true));
        assert_eq!(display(&store, TypeRef::nullable(array)), "int?[]?");
    }
}
