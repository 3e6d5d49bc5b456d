//! Declarative type loading.
//!
//! Declarations are plain serde data so they can come from JSON workspace files. Type references
//! inside them are type expressions (see [`TypeStore::parse`]).

use serde::Deserialize;

use crate::{
    Accessibility, ConstructorDef, EnumDef, EnumMemberDef, MemberDef, MemberKind, MethodDef,
    ParamDef, PrimitiveType, SetterDef, TypeDef, TypeExprError, TypeId, TypeStore,
};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDecl {
    Class(ObjectDecl),
    Struct(ObjectDecl),
    Interface(ObjectDecl),
    Enum(EnumDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(o) | TypeDecl::Struct(o) | TypeDecl::Interface(o) => &o.name,
            TypeDecl::Enum(e) => &e.name,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectDecl {
    pub name: String,
    pub base: Option<String>,
    pub interfaces: Vec<String>,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub members: Vec<MemberDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub methods: Vec<MethodDecl>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemberDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub field: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    /// Getter accessibility; `null` makes the member write-only.
    #[serde(default = "public")]
    pub get: Option<Accessibility>,
    /// Setter accessibility; `null` makes the member read-only.
    #[serde(default = "public")]
    pub set: Option<Accessibility>,
    #[serde(default)]
    pub init: bool,
    #[serde(default)]
    pub required: bool,
}

fn public() -> Option<Accessibility> {
    Some(Accessibility::Public)
}

fn public_accessibility() -> Accessibility {
    Accessibility::Public
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConstructorDecl {
    #[serde(default = "public_accessibility")]
    pub accessibility: Accessibility,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Return type expression; absent for `void`.
    #[serde(default)]
    pub returns: Option<String>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default = "public_accessibility")]
    pub accessibility: Accessibility,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    #[serde(default)]
    pub underlying: Option<String>,
    pub members: Vec<EnumMemberDecl>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EnumMemberDecl {
    pub name: String,
    /// Explicit value; defaults to the previous member's value plus one.
    #[serde(default)]
    pub value: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub serialization_name: Option<String>,
}

impl TypeStore {
    /// Load declarations into the store.
    ///
    /// All names are interned first, so declarations may reference each other (and themselves)
    /// regardless of their order.
    pub fn declare(&mut self, decls: &[TypeDecl]) -> Result<Vec<TypeId>, TypeExprError> {
        let ids: Vec<TypeId> = decls
            .iter()
            .map(|d| self.intern_type_id(d.name()))
            .collect();

        for (decl, id) in decls.iter().zip(&ids) {
            let def = match decl {
                TypeDecl::Class(o) => self.object_def(TypeDef::class(&o.name), o)?,
                TypeDecl::Struct(o) => self.object_def(TypeDef::structure(&o.name), o)?,
                TypeDecl::Interface(o) => self.object_def(TypeDef::interface(&o.name), o)?,
                TypeDecl::Enum(e) => self.enum_type(e)?,
            };
            self.define_type(*id, def);
        }
        Ok(ids)
    }

    fn object_def(
        &mut self,
        mut def: TypeDef,
        decl: &ObjectDecl,
    ) -> Result<TypeDef, TypeExprError> {
        def.is_abstract |= decl.is_abstract;
        if let Some(base) = &decl.base {
            def.base = Some(self.parse(base)?);
        }
        for iface in &decl.interfaces {
            def.interfaces.push(self.parse(iface)?);
        }
        for member in &decl.members {
            def.members.push(MemberDef {
                name: member.name.clone(),
                ty: self.parse(&member.ty)?,
                kind: if member.field {
                    MemberKind::Field
                } else {
                    MemberKind::Property
                },
                is_static: member.is_static,
                is_indexer: false,
                getter: member.get,
                setter: member.set.map(|accessibility| SetterDef {
                    accessibility,
                    init_only: member.init,
                }),
                required: member.required,
            });
        }
        for ctor in &decl.constructors {
            def.constructors.push(ConstructorDef {
                accessibility: ctor.accessibility,
                params: self.params(&ctor.params)?,
            });
        }
        for method in &decl.methods {
            let return_type = match &method.returns {
                Some(ret) => Some(self.parse(ret)?),
                None => None,
            };
            def.methods.push(MethodDef {
                name: method.name.clone(),
                params: self.params(&method.params)?,
                return_type,
                is_static: method.is_static,
                accessibility: method.accessibility,
            });
        }
        Ok(def)
    }

    fn params(&mut self, params: &[ParamDecl]) -> Result<Vec<ParamDef>, TypeExprError> {
        params
            .iter()
            .map(|p| Ok(ParamDef::new(p.name.clone(), self.parse(&p.ty)?)))
            .collect()
    }

    fn enum_type(&mut self, decl: &EnumDecl) -> Result<TypeDef, TypeExprError> {
        let underlying = match &decl.underlying {
            None => PrimitiveType::Int,
            Some(name) => PrimitiveType::from_keyword(name)
                .filter(|p| p.is_integral())
                .ok_or_else(|| TypeExprError::UnknownType(name.clone()))?,
        };
        let mut next = 0i64;
        let members = decl
            .members
            .iter()
            .map(|m| {
                let value = m.value.unwrap_or(next);
                next = value.wrapping_add(1);
                EnumMemberDef {
                    name: m.name.clone(),
                    value,
                    description: m.description.clone(),
                    serialization_name: m.serialization_name.clone(),
                }
            })
            .collect();
        Ok(TypeDef::enumeration(
            &decl.name,
            EnumDef {
                underlying,
                members,
            },
        ))
    }
}
