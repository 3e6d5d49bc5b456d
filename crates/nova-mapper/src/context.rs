//! Resolution state shared by all builders of one mapper.

use nova_mapper_config::{MapperOptions, MethodConfig};
use nova_mapper_types::helpers;
use nova_mapper_types::{KnownType, TypeEnv, TypeId, TypeKind, TypeRef};

use crate::builders::{self, Family, Selection};
use crate::cache::{Lookup, MappingKey, OptionScope, PlanCache};
use crate::classify::{self, ShapeCategory};
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::model::{MapperDecl, MethodParam};
use crate::plan::{Conversion, Expr, MappingPlan, MethodRef, Param, PlanKind, Signature, Stmt, Visibility};
use crate::{MAPPER_TARGET, REF_HANDLER};

/// Type of the reference handler parameter of generated methods.
pub(crate) const REF_HANDLER_TYPE: &str = "IReferenceHandler";

/// A source/target type pair. Both sides are non-nullable; nullability is handled by the
/// caller through [`crate::nullability`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pair {
    pub source: TypeRef,
    pub target: TypeRef,
    /// Map into an existing target instance.
    pub existing: bool,
}

impl Pair {
    pub fn new(source: TypeRef, target: TypeRef) -> Self {
        Self {
            source: source.non_nullable(),
            target: target.non_nullable(),
            existing: false,
        }
    }

    pub fn existing(source: TypeRef, target: TypeRef) -> Self {
        Self {
            existing: true,
            ..Self::new(source, target)
        }
    }
}

/// Why no conversion exists for a pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unmapped {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Unmapped {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A method the user wrote (or declared) that mappings may call by type or by name.
#[derive(Clone, Debug)]
pub(crate) struct KnownMapping {
    pub name: String,
    pub method: MethodRef,
    pub source: TypeRef,
    pub target: TypeRef,
    pub user_implemented: bool,
}

/// Per-mapper resolution state.
pub(crate) struct Resolver<'a> {
    pub env: &'a dyn TypeEnv,
    pub mapper: &'a MapperDecl,
    pub cache: PlanCache,
    pub sink: DiagnosticSink,
    pub known: Vec<KnownMapping>,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a dyn TypeEnv, mapper: &'a MapperDecl) -> Self {
        Self {
            env,
            mapper,
            cache: PlanCache::new(),
            sink: DiagnosticSink::new(),
            known: Vec::new(),
        }
    }

    /// Context for resolving on behalf of the declared method `method`.
    pub fn ctx<'r>(&'r self, options: &'r MapperOptions, method: &'r str) -> Ctx<'r> {
        Ctx {
            resolver: self,
            env: self.env,
            options,
            method,
        }
    }
}

/// What builders see: the environment, the options in effect and where to report.
#[derive(Clone, Copy)]
pub(crate) struct Ctx<'a> {
    pub resolver: &'a Resolver<'a>,
    pub env: &'a dyn TypeEnv,
    pub options: &'a MapperOptions,
    /// Declared method diagnostics are attributed to.
    pub method: &'a str,
}

/// The method whose body a builder produces.
#[derive(Clone, Debug)]
pub(crate) struct Body<'a> {
    /// Root expression of the source value (a parameter name).
    pub source: String,
    /// Additional source parameters of a declared method.
    pub extra: Vec<&'a MethodParam>,
    /// Existing target instance, when mapping into one.
    pub target: Option<String>,
    pub config: Option<&'a MethodConfig>,
    pub ref_handler: bool,
}

impl<'a> Body<'a> {
    pub fn generated(existing: bool, ref_handler: bool) -> Self {
        Self {
            source: "source".to_string(),
            extra: Vec::new(),
            target: existing.then(|| "target".to_string()),
            config: None,
            ref_handler,
        }
    }

    pub fn source_expr(&self) -> Expr {
        Expr::ident(self.source.clone())
    }

    pub fn target_expr(&self) -> Expr {
        Expr::ident(self.target.clone().unwrap_or_else(|| "target".to_string()))
    }

    pub fn ignores_source(&self, path: &str) -> bool {
        self.config.is_some_and(|c| c.is_source_ignored(path))
    }

    pub fn ignores_target(&self, path: &str) -> bool {
        self.config.is_some_and(|c| c.is_target_ignored(path))
    }
}

impl<'a> Ctx<'a> {
    pub fn report(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.resolver.sink.report(
            &self.resolver.mapper.name,
            self.method,
            kind,
            message,
            &self.options.severity_overrides,
        );
    }

    pub fn report_unmapped(&self, unmapped: Unmapped) {
        self.report(unmapped.kind, unmapped.message);
    }

    pub fn display(&self, ty: TypeRef) -> String {
        helpers::display(self.env, ty)
    }

    pub fn type_name(&self, id: TypeId) -> String {
        helpers::type_name(self.env, id)
    }

    pub fn classify(&self, id: TypeId) -> ShapeCategory {
        classify::classify(self.env, id)
    }

    pub fn could_not_map(&self, pair: &Pair) -> Unmapped {
        Unmapped::new(
            DiagnosticKind::CouldNotCreateMapping,
            format!(
                "Could not create mapping from {} to {}",
                self.display(pair.source),
                self.display(pair.target)
            ),
        )
    }

    /// The cache key of `pair` under the options in effect.
    pub fn key(&self, pair: &Pair) -> MappingKey {
        let scope = match (self.classify(pair.source.id), self.classify(pair.target.id)) {
            (ShapeCategory::Enum, ShapeCategory::Enum | ShapeCategory::Primitive(_))
            | (ShapeCategory::Primitive(_), ShapeCategory::Enum) => OptionScope::Enum,
            (ShapeCategory::Primitive(_), ShapeCategory::Primitive(_)) => OptionScope::Conversions,
            _ => OptionScope::Graph,
        };
        MappingKey::new(pair.source, pair.target, pair.existing, self.options, scope)
    }

    /// Whether values of the pair can be passed through unchanged.
    pub fn is_identity(&self, pair: &Pair) -> bool {
        if pair.existing {
            return false;
        }
        let assignable = pair.source.id == pair.target.id
            || helpers::is_assignable(self.env, pair.source.id, pair.target.id);
        assignable && (!self.options.deep_cloning || self.is_immutable(pair.target.id))
    }

    fn is_immutable(&self, id: TypeId) -> bool {
        matches!(
            self.env.type_def(id).map(|d| &d.kind),
            Some(TypeKind::Primitive(_) | TypeKind::Enum(_))
        )
    }

    /// A user-implemented mapping for exactly this pair.
    fn user_mapping(&self, pair: &Pair) -> Option<MethodRef> {
        if pair.existing {
            return None;
        }
        self.resolver
            .known
            .iter()
            .find(|m| m.user_implemented && m.source.id == pair.source.id && m.target.id == pair.target.id)
            .map(|m| m.method.clone())
    }

    /// Resolve how to convert a non-null source value of `pair.source` into `pair.target`.
    ///
    /// Never reports; the caller attributes failures to the member or method it resolves.
    pub fn resolve(&self, pair: Pair) -> Result<Conversion, Unmapped> {
        if self.is_identity(&pair) {
            return Ok(Conversion::Identity);
        }
        if let Some(method) = self.user_mapping(&pair) {
            return Ok(Conversion::Method(method));
        }
        let key = self.key(&pair);
        match self.resolver.cache.find(&key) {
            Some(Lookup::Hit(method) | Lookup::Deferred(method)) => {
                return Ok(Conversion::Method(method))
            }
            Some(Lookup::Failed) => return Err(self.could_not_map(&pair)),
            Some(Lookup::Begin(_)) | None => {}
        }

        let family = match builders::select(self, &pair) {
            Selection::Inline(conversion) => return Ok(conversion),
            Selection::Unmappable(unmapped) => return Err(unmapped),
            Selection::Decline => return Err(self.could_not_map(&pair)),
            Selection::Method(family) => family,
        };

        let ref_handler = self.uses_ref_handler(family, &pair);
        let base = method_base_name(self.env, pair.target.id);
        let method = match self.resolver.cache.lookup_or_begin(&key, &base, ref_handler) {
            Lookup::Hit(method) | Lookup::Deferred(method) => return Ok(Conversion::Method(method)),
            Lookup::Failed => return Err(self.could_not_map(&pair)),
            Lookup::Begin(method) => method,
        };

        tracing::trace!(
            target: MAPPER_TARGET,
            method = %method.name,
            ?family,
            source = %self.display(pair.source),
            target = %self.display(pair.target),
            "building generated mapping"
        );
        let body = Body::generated(pair.existing, ref_handler);
        match builders::build(self, &pair, family, &body) {
            Ok(stmts) => {
                let plan = MappingPlan {
                    id: method.plan,
                    name: method.name.clone(),
                    kind: if pair.existing {
                        PlanKind::ExistingTarget
                    } else {
                        PlanKind::NewInstance
                    },
                    source: Some(pair.source),
                    target: Some(pair.target),
                    signature: self.generated_signature(&pair, ref_handler),
                    body: stmts,
                };
                self.resolver.cache.complete(plan);
                Ok(Conversion::Method(method))
            }
            Err(unmapped) => {
                if self.resolver.cache.fail(method.plan) {
                    self.resolver.cache.complete(self.throw_stub(&method, &pair, &unmapped));
                }
                Err(unmapped)
            }
        }
    }

    pub fn uses_ref_handler(&self, family: Family, pair: &Pair) -> bool {
        self.options.use_reference_handling && family == Family::Object && !pair.existing
    }

    pub fn generated_signature(&self, pair: &Pair, ref_handler: bool) -> Signature {
        let mut params = vec![Param::new("source", self.display(pair.source))];
        if pair.existing {
            params.push(Param::new("target", self.display(pair.target)));
        }
        if ref_handler {
            params.push(Param::new(REF_HANDLER, REF_HANDLER_TYPE));
        }
        Signature {
            visibility: Visibility::Private,
            return_type: (!pair.existing).then(|| self.display(pair.target)),
            type_params: Vec::new(),
            params,
        }
    }

    /// Plan of a method that could not be built but is already called somewhere.
    pub fn throw_stub(&self, method: &MethodRef, pair: &Pair, unmapped: &Unmapped) -> MappingPlan {
        MappingPlan {
            id: method.plan,
            name: method.name.clone(),
            kind: PlanKind::ThrowStub,
            source: Some(pair.source),
            target: Some(pair.target),
            signature: self.generated_signature(pair, method.ref_handler),
            body: vec![throw_not_mapped(&unmapped.message)],
        }
    }
}

pub(crate) fn throw_not_mapped(message: &str) -> Stmt {
    Stmt::Throw(Expr::new_object(
        "InvalidOperationException",
        vec![Expr::string(message)],
    ))
}

/// `MapTo{Target}` with generic arguments spelled out (`MapToListOfInt32`).
pub fn method_base_name(env: &dyn TypeEnv, target: TypeId) -> String {
    format!("MapTo{}", type_ident(env, target))
}

fn type_ident(env: &dyn TypeEnv, id: TypeId) -> String {
    let Some(def) = env.type_def(id) else {
        return "Unknown".to_string();
    };
    match &def.kind {
        TypeKind::Primitive(p) => p.clr_name().to_string(),
        TypeKind::Array { element } => format!("{}Array", type_ident(env, element.id)),
        TypeKind::Tuple(_) => "ValueTuple".to_string(),
        _ => match def.known {
            Some(known) => {
                let args: Vec<String> = def
                    .type_args
                    .iter()
                    .map(|arg| type_ident(env, arg.id))
                    .collect();
                format!("{}Of{}", known.name(), args.join("And"))
            }
            _ => def
                .name
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_mapper_types::TypeStore;

    #[test]
    fn generated_names_spell_out_generic_arguments() {
        let mut store = TypeStore::default();
        let cases = [
            ("List<int>", "MapToListOfInt32"),
            ("Dictionary<string, long>", "MapToDictionaryOfStringAndInt64"),
            ("int[]", "MapToInt32Array"),
            ("(int A, string B)", "MapToValueTuple"),
            ("string", "MapToString"),
        ];
        for (expr, expected) in cases {
            let ty = store.parse(expr).expect(expr);
            assert_eq!(method_base_name(&store, ty.id), expected, "{expr}");
        }
    }
}
