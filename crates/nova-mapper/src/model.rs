//! Declarations the engine resolves: mappers, their partial mapping methods and the
//! user-implemented methods they may reuse.

use nova_mapper_config::{MapperOptionsLayer, MethodConfig};
use nova_mapper_types::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub struct MapperDecl {
    pub name: String,
    /// Mapper-level options, applied on top of the workspace layer.
    pub options: MapperOptionsLayer,
    /// Methods whose bodies the engine generates.
    pub methods: Vec<MappingMethod>,
    /// Methods the user implemented; the engine only calls them.
    pub user_methods: Vec<UserMethod>,
}

impl MapperDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: MapperOptionsLayer::default(),
            methods: Vec::new(),
            user_methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MappingMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_user_method(mut self, method: UserMethod) -> Self {
        self.user_methods.push(method);
        self
    }

    pub fn with_options(mut self, options: MapperOptionsLayer) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParam {
    pub name: String,
    pub ty: TypeRef,
}

impl MethodParam {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// How a declared method picks its target type at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeDispatch {
    /// `object Map(object source, Type targetType)`
    TargetTypeParameter,
    /// `TTarget Map<TTarget>(object source)`
    GenericTarget,
}

/// A partial mapping method declared on a mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingMethod {
    pub name: String,
    pub params: Vec<MethodParam>,
    /// `None` for `void` methods mapping into an existing target.
    pub return_type: Option<TypeRef>,
    /// Name of the parameter holding the existing target instance.
    pub existing_target: Option<String>,
    pub config: MethodConfig,
    pub dispatch: Option<RuntimeDispatch>,
}

impl MappingMethod {
    /// `Target name(Source source)`
    pub fn new(name: impl Into<String>, source: TypeRef, target: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: vec![MethodParam::new("source", source)],
            return_type: Some(target),
            existing_target: None,
            config: MethodConfig::default(),
            dispatch: None,
        }
    }

    /// `void name(Source source, Target target)`
    pub fn existing(name: impl Into<String>, source: TypeRef, target: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: vec![
                MethodParam::new("source", source),
                MethodParam::new("target", target),
            ],
            return_type: None,
            existing_target: Some("target".to_string()),
            config: MethodConfig::default(),
            dispatch: None,
        }
    }

    pub fn with_config(mut self, config: MethodConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_param(mut self, param: MethodParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_dispatch(mut self, dispatch: RuntimeDispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Parameters that provide values, i.e. everything but the existing target.
    pub fn source_params(&self) -> impl Iterator<Item = &MethodParam> {
        self.params
            .iter()
            .filter(move |p| self.existing_target.as_deref() != Some(p.name.as_str()))
    }

    pub fn existing_target_param(&self) -> Option<&MethodParam> {
        let name = self.existing_target.as_deref()?;
        self.params.iter().find(|p| p.name == name)
    }

    /// The type the method produces, either returned or written into.
    pub fn target_type(&self) -> Option<TypeRef> {
        self.existing_target_param()
            .map(|p| p.ty)
            .or(self.return_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserMethodKind {
    /// `Target Map(Source source)` implemented by hand.
    Mapping,
    /// `Target Create()` or `Target Create(Source source)`, used instead of a constructor.
    ObjectFactory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMethod {
    pub name: String,
    pub params: Vec<MethodParam>,
    /// For a generic factory, the constraint of its type parameter (`object` when there is
    /// none); the factory serves every target assignable to it.
    pub return_type: TypeRef,
    pub kind: UserMethodKind,
    /// Name of the type parameter returned by a generic factory, `T Create<T>()`.
    pub type_param: Option<String>,
}

impl UserMethod {
    pub fn mapping(name: impl Into<String>, source: TypeRef, target: TypeRef) -> Self {
        Self {
            name: name.into(),
            params: vec![MethodParam::new("source", source)],
            return_type: target,
            kind: UserMethodKind::Mapping,
            type_param: None,
        }
    }

    pub fn factory(name: impl Into<String>, params: Vec<MethodParam>, target: TypeRef) -> Self {
        Self {
            name: name.into(),
            params,
            return_type: target,
            kind: UserMethodKind::ObjectFactory,
            type_param: None,
        }
    }

    /// `T name<T>(params) where T : constraint`, bound to the target at each use.
    pub fn generic_factory(
        name: impl Into<String>,
        type_param: impl Into<String>,
        params: Vec<MethodParam>,
        constraint: TypeRef,
    ) -> Self {
        Self {
            type_param: Some(type_param.into()),
            ..Self::factory(name, params, constraint)
        }
    }

    pub fn is_generic(&self) -> bool {
        self.type_param.is_some()
    }
}
