use std::collections::HashMap;

use crate::helpers::display;
use crate::{
    KnownType, MemberDef, PrimitiveType, TupleElementDef, TypeDef, TypeEnv, TypeId, TypeKind,
    TypeRef, WellKnownTypes,
};

/// In-memory [`TypeEnv`].
///
/// Library types are instantiated on demand ([`TypeStore::instantiate`]) and deduplicated, so the
/// same type expression always yields the same [`TypeId`].
#[derive(Clone, Debug)]
pub struct TypeStore {
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeId>,
    instantiations: HashMap<(KnownType, Vec<TypeRef>), TypeId>,
    arrays: HashMap<TypeRef, TypeId>,
    tuples: HashMap<Vec<TupleElementDef>, TypeId>,
    well_known: WellKnownTypes,
}

impl Default for TypeStore {
    fn default() -> Self {
        let mut store = TypeStore {
            types: Vec::new(),
            by_name: HashMap::new(),
            instantiations: HashMap::new(),
            arrays: HashMap::new(),
            tuples: HashMap::new(),
            well_known: WellKnownTypes::new(Vec::new()),
        };

        let mut primitives = Vec::with_capacity(PrimitiveType::ALL.len());
        for prim in PrimitiveType::ALL {
            let id = store.push(TypeDef::primitive(prim));
            store.by_name.insert(prim.clr_name().to_string(), id);
            store
                .by_name
                .insert(format!("System.{}", prim.clr_name()), id);
            if let Some(keyword) = prim.keyword() {
                store.by_name.insert(keyword.to_string(), id);
            }
            primitives.push(id);
        }
        store.well_known = WellKnownTypes::new(primitives);
        store
    }
}

impl TypeStore {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
        self.types
            .iter()
            .enumerate()
            .map(|(idx, def)| (TypeId::from_raw(idx as u32), def))
    }

    /// Return the id registered for `name`, allocating a placeholder class when the name is new.
    ///
    /// Placeholders let declarations refer to each other before they are defined.
    pub fn intern_type_id(&mut self, name: &str) -> TypeId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = self.push(TypeDef::class(name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Replace the definition behind `id`.
    pub fn define_type(&mut self, id: TypeId, def: TypeDef) {
        if def.name != self.types[id.index()].name {
            self.by_name.insert(def.name.clone(), id);
        }
        self.types[id.index()] = def;
    }

    /// Define or overwrite a type by name, keeping the id stable.
    pub fn upsert_type(&mut self, def: TypeDef) -> TypeId {
        let id = self.intern_type_id(&def.name);
        self.types[id.index()] = def;
        id
    }

    pub fn type_def_mut(&mut self, id: TypeId) -> Option<&mut TypeDef> {
        self.types.get_mut(id.index())
    }

    /// Instantiate a library type with the given type arguments.
    ///
    /// # Panics
    ///
    /// Panics when `args.len()` does not match [`KnownType::arity`].
    pub fn instantiate(&mut self, known: KnownType, args: Vec<TypeRef>) -> TypeId {
        assert_eq!(
            args.len(),
            known.arity(),
            "wrong number of type arguments for {}",
            known.name()
        );
        if let Some(id) = self.instantiations.get(&(known, args.clone())) {
            return *id;
        }

        let name = format!(
            "{}<{}>",
            known.name(),
            args.iter()
                .map(|a| display(&*self, *a))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let kind = if known.is_interface() {
            TypeKind::Interface
        } else if known.is_value_type() {
            TypeKind::Struct
        } else {
            TypeKind::Class
        };
        let mut def = TypeDef {
            name: name.clone(),
            kind,
            known: Some(known),
            type_args: args.clone(),
            interfaces: Vec::new(),
            base: None,
            members: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            is_abstract: known.is_interface(),
        };

        // Register before filling the shape: interface lists of e.g. `IList<T>` instantiate
        // further types and must not observe a half-built entry under the same key.
        let id = self.push(def.clone());
        self.instantiations.insert((known, args), id);
        self.by_name.insert(name, id);

        crate::library::fill_shape(self, &mut def);
        self.types[id.index()] = def;
        id
    }

    /// `T[]`
    pub fn array_of(&mut self, element: TypeRef) -> TypeId {
        if let Some(id) = self.arrays.get(&element) {
            return *id;
        }
        let name = format!("{}[]", display(&*self, element));
        let mut def = TypeDef {
            name: name.clone(),
            kind: TypeKind::Array { element },
            known: None,
            type_args: vec![element],
            interfaces: Vec::new(),
            base: None,
            members: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            is_abstract: false,
        };
        let id = self.push(def.clone());
        self.arrays.insert(element, id);
        self.by_name.insert(name, id);

        crate::library::fill_array_shape(self, &mut def, element);
        self.types[id.index()] = def;
        id
    }

    /// A value tuple such as `(int A, string B)`.
    pub fn tuple_of(&mut self, elements: Vec<TupleElementDef>) -> TypeId {
        if let Some(id) = self.tuples.get(&elements) {
            return *id;
        }
        let name = format!(
            "({})",
            elements
                .iter()
                .map(|e| match &e.name {
                    Some(n) => format!("{} {n}", display(&*self, e.ty)),
                    None => display(&*self, e.ty),
                })
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut def = TypeDef::structure(name.clone());
        for (idx, element) in elements.iter().enumerate() {
            def.members
                .push(MemberDef::field(format!("Item{}", idx + 1), element.ty));
            if let Some(alias) = &element.name {
                def.members.push(MemberDef::field(alias.clone(), element.ty));
            }
        }
        def.type_args = elements.iter().map(|e| e.ty).collect();
        def.kind = TypeKind::Tuple(elements.clone());

        let id = self.push(def);
        self.tuples.insert(elements, id);
        self.by_name.insert(name, id);
        id
    }

    fn push(&mut self, def: TypeDef) -> TypeId {
        let id = TypeId::from_raw(
            u32::try_from(self.types.len()).unwrap_or(u32::MAX),
        );
        self.types.push(def);
        id
    }
}

impl TypeEnv for TypeStore {
    fn type_def(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(id.index())
    }

    fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}
