//! Resolution of one mapper declaration.
//!
//! Declared methods are reserved in the plan cache before any body is built, so a nested
//! conversion for the same type pair calls the declared method instead of generating a copy.

use std::collections::HashMap;

use nova_mapper_config::{MapperOptions, MapperOptionsLayer};
use nova_mapper_types::helpers;
use nova_mapper_types::{TypeEnv, TypeId, TypeRef};

use crate::builders::{self, Family, Selection};
use crate::cache::MappingKey;
use crate::classify::ShapeCategory;
use crate::context::{throw_not_mapped, Body, Ctx, KnownMapping, Pair, Resolver, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::enums;
use crate::model::{MapperDecl, MappingMethod, MethodParam, RuntimeDispatch, UserMethodKind};
use crate::nullability::{self, NullPolicy, SourceValue};
use crate::plan::{
    Expr, MappingPlan, MethodRef, Param, Pattern, PlanId, PlanKind, Signature, Stmt, SwitchArm,
    Visibility,
};
use crate::{MapperError, ResolvedMapper, MAPPER_TARGET, REF_HANDLER};

const REF_HANDLER_IMPL: &str = "PreserveReferenceHandler";
const GENERIC_TARGET: &str = "TTarget";

/// A declared method with its slot and the options in effect for it.
struct Declared<'m> {
    method: &'m MappingMethod,
    id: PlanId,
    options: MapperOptions,
}

pub(crate) fn resolve(
    env: &dyn TypeEnv,
    defaults: &MapperOptionsLayer,
    mapper: &MapperDecl,
) -> Result<ResolvedMapper, MapperError> {
    validate(env, mapper)?;
    let mut resolver = Resolver::new(env, mapper);
    register_user_methods(&mut resolver, mapper);
    let declared = reserve_declared(&mut resolver, defaults, mapper);

    for entry in &declared {
        let span = tracing::debug_span!(
            target: MAPPER_TARGET,
            "resolve_method",
            mapper = %mapper.name,
            method = %entry.method.name
        );
        let _guard = span.enter();
        let method = resolver.cache.begin_reserved(entry.id);
        let ctx = resolver.ctx(&entry.options, &entry.method.name);
        let plan = build_declared(&ctx, entry.method, &method, &declared);
        tracing::debug!(target: MAPPER_TARGET, kind = ?plan.kind, "declared method resolved");
        resolver.cache.complete(plan);
    }

    let Resolver { cache, sink, .. } = resolver;
    Ok(ResolvedMapper {
        name: mapper.name.clone(),
        plans: cache.plans(),
        diagnostics: sink.into_vec(),
    })
}

fn validate(env: &dyn TypeEnv, mapper: &MapperDecl) -> Result<(), MapperError> {
    let known = |ty: TypeRef| env.type_def(ty.id).is_some();
    for method in &mapper.methods {
        if method.source_params().next().is_none() {
            return Err(MapperError::MissingSource {
                mapper: mapper.name.clone(),
                method: method.name.clone(),
            });
        }
        let types = method
            .params
            .iter()
            .map(|p| p.ty)
            .chain(method.return_type);
        for ty in types {
            if !known(ty) {
                return Err(MapperError::UnknownType {
                    mapper: mapper.name.clone(),
                    method: method.name.clone(),
                    id: ty.id.to_raw(),
                });
            }
        }
    }
    for method in &mapper.user_methods {
        let types = method.params.iter().map(|p| p.ty).chain([method.return_type]);
        for ty in types {
            if !known(ty) {
                return Err(MapperError::UnknownType {
                    mapper: mapper.name.clone(),
                    method: method.name.clone(),
                    id: ty.id.to_raw(),
                });
            }
        }
    }
    Ok(())
}

fn register_user_methods(resolver: &mut Resolver<'_>, mapper: &MapperDecl) {
    for method in &mapper.user_methods {
        let [source] = method.params.as_slice() else {
            continue;
        };
        if method.kind != UserMethodKind::Mapping || method.is_generic() {
            continue;
        }
        let (id, _) = resolver.cache.reserve(None, &method.name);
        let reference = resolver.cache.method_ref(id);
        resolver.known.push(KnownMapping {
            name: method.name.clone(),
            method: reference,
            source: source.ty,
            target: method.return_type,
            user_implemented: true,
        });
    }
}

/// Single-source methods creating a new instance can be called by nested conversions.
fn reusable_pair(method: &MappingMethod) -> Option<Pair> {
    if method.dispatch.is_some() || method.existing_target.is_some() {
        return None;
    }
    let mut sources = method.source_params();
    let source = sources.next()?;
    if sources.next().is_some() {
        return None;
    }
    Some(Pair::new(source.ty, method.return_type?))
}

fn reserve_declared<'m>(
    resolver: &mut Resolver<'_>,
    defaults: &MapperOptionsLayer,
    mapper: &'m MapperDecl,
) -> Vec<Declared<'m>> {
    let mut owners: HashMap<MappingKey, &str> = HashMap::new();
    let mut declared = Vec::with_capacity(mapper.methods.len());
    for method in &mapper.methods {
        let options = MapperOptions::resolve([defaults, &mapper.options, &method.config.options]);
        let pair = reusable_pair(method);
        // Entry methods do not take a reference handler, so nested calls must not reach them.
        let key = pair
            .filter(|_| !options.use_reference_handling)
            .map(|pair| resolver.ctx(&options, &method.name).key(&pair));
        let (id, registered) = resolver.cache.reserve(key, &method.name);
        if let Some(key) = key {
            if registered {
                owners.insert(key, &method.name);
            } else if let Some(owner) = owners.get(&key) {
                resolver.ctx(&options, &method.name).report(
                    DiagnosticKind::AmbiguousMappingMethod,
                    format!(
                        "{} maps the same types as {owner}; nested mappings call {owner}",
                        method.name
                    ),
                );
            }
        }
        if let Some(pair) = pair {
            let reference = resolver.cache.method_ref(id);
            resolver.known.push(KnownMapping {
                name: method.name.clone(),
                method: reference,
                source: pair.source,
                target: pair.target,
                user_implemented: false,
            });
        }
        declared.push(Declared {
            method,
            id,
            options,
        });
    }
    declared
}

fn declared_signature(ctx: &Ctx<'_>, method: &MappingMethod) -> Signature {
    let generic = method.dispatch == Some(RuntimeDispatch::GenericTarget);
    let return_type = if generic {
        Some(GENERIC_TARGET.to_string())
    } else {
        method.return_type.map(|ty| ctx.display(ty))
    };
    Signature {
        visibility: Visibility::PublicPartial,
        return_type,
        type_params: if generic {
            vec![GENERIC_TARGET.to_string()]
        } else {
            Vec::new()
        },
        params: method
            .params
            .iter()
            .map(|p| Param::new(p.name.clone(), ctx.display(p.ty)))
            .collect(),
    }
}

fn build_declared(
    ctx: &Ctx<'_>,
    method: &MappingMethod,
    reference: &MethodRef,
    declared: &[Declared<'_>],
) -> MappingPlan {
    let mut plan = MappingPlan {
        id: reference.plan,
        name: reference.name.clone(),
        kind: if method.existing_target.is_some() {
            PlanKind::ExistingTarget
        } else {
            PlanKind::NewInstance
        },
        source: method.source_params().next().map(|p| p.ty),
        target: method.target_type(),
        signature: declared_signature(ctx, method),
        body: Vec::new(),
    };
    let body = match method.dispatch {
        Some(dispatch) => {
            plan.kind = PlanKind::RuntimeDispatch;
            Ok(runtime_dispatch(ctx, method, dispatch, declared))
        }
        None => declared_body(ctx, method),
    };
    match body {
        Ok(stmts) => plan.body = stmts,
        Err(unmapped) => {
            plan.kind = PlanKind::ThrowStub;
            plan.body = vec![throw_not_mapped(&unmapped.message)];
            ctx.report_unmapped(unmapped);
        }
    }
    plan
}

fn declared_body(ctx: &Ctx<'_>, method: &MappingMethod) -> Result<Vec<Stmt>, Unmapped> {
    let sources: Vec<&MethodParam> = method.source_params().collect();
    let (source, extra) = sources
        .split_first()
        .ok_or_else(|| Unmapped::new(DiagnosticKind::CouldNotCreateMapping, "No source parameter"))?;
    let target = method.target_type().ok_or_else(|| {
        Unmapped::new(
            DiagnosticKind::CouldNotCreateMapping,
            format!("{} has neither a return type nor a target parameter", method.name),
        )
    })?;

    let enum_sources: Vec<&MethodParam> = sources
        .iter()
        .copied()
        .filter(|p| ctx.classify(p.ty.id) == ShapeCategory::Enum)
        .collect();
    if enum_sources.len() >= 2
        && method.existing_target.is_none()
        && ctx.classify(target.id) == ShapeCategory::Enum
    {
        return enums::build_cascade(ctx, &enum_sources, target, Some(&method.config.enum_mapping));
    }

    let existing = method.existing_target_param();
    let pair = match existing {
        Some(_) => Pair::existing(source.ty, target),
        None => Pair::new(source.ty, target),
    };

    let mut stmts = Vec::new();
    let mut source_name = source.name.clone();
    if source.ty.nullable {
        stmts.push(null_source_guard(ctx, source, target, existing.is_some()));
        if helpers::is_value_type(ctx.env, source.ty.id) {
            source_name = format!("{}Value", source.name);
            stmts.push(Stmt::let_var(
                source_name.clone(),
                Expr::ident(source.name.clone()).member("Value"),
            ));
        }
    }

    if !pair.existing && ctx.is_identity(&pair) {
        stmts.push(Stmt::ret(Expr::ident(source_name)));
        return Ok(stmts);
    }
    let selection = if enums::is_declared_enum_pair(ctx, &pair) {
        Selection::Method(Family::Enum)
    } else {
        builders::select(ctx, &pair)
    };
    let family = match selection {
        Selection::Inline(conversion) => {
            let value = SourceValue::new(Expr::ident(source_name), false, false);
            stmts.push(Stmt::ret(nullability::value(
                &value,
                &conversion,
                target.nullable,
                NullPolicy::method(ctx.options),
                None,
            )));
            return Ok(stmts);
        }
        Selection::Method(family) => family,
        Selection::Unmappable(unmapped) => return Err(unmapped),
        Selection::Decline => return Err(ctx.could_not_map(&pair)),
    };

    let ref_handler = ctx.uses_ref_handler(family, &pair);
    if ref_handler {
        stmts.push(Stmt::let_var(
            REF_HANDLER,
            Expr::new_object(REF_HANDLER_IMPL, Vec::new()),
        ));
    }
    let body = Body {
        source: source_name,
        extra: extra.to_vec(),
        target: existing.map(|p| p.name.clone()),
        config: Some(&method.config),
        ref_handler,
    };
    stmts.extend(builders::build(ctx, &pair, family, &body)?);
    Ok(stmts)
}

/// `if (source == null)` at the top of a declared method.
fn null_source_guard(ctx: &Ctx<'_>, source: &MethodParam, target: TypeRef, existing: bool) -> Stmt {
    let check = Expr::ident(source.name.clone()).is_null();
    let when_null = if existing {
        Stmt::Return(None)
    } else if target.nullable {
        Stmt::ret(Expr::null())
    } else if ctx.options.throw_on_mapping_null_mismatch {
        Stmt::Throw(Expr::new_object(
            "ArgumentNullException",
            vec![Expr::name_of(Expr::ident(source.name.clone()))],
        ))
    } else {
        if !ctx.options.suppress_null_mismatch_diagnostic {
            ctx.report(
                DiagnosticKind::NullableSourceTypeToNonNullableTargetType,
                format!(
                    "Mapping the nullable source of type {} to the non-nullable target type {}",
                    ctx.display(source.ty),
                    ctx.display(target)
                ),
            );
        }
        Stmt::ret(default_instance(ctx, target.id))
    };
    Stmt::if_then(check, vec![when_null])
}

fn default_instance(ctx: &Ctx<'_>, id: TypeId) -> Expr {
    let constructible = helpers::has_parameterless_constructor(ctx.env, id, |access| {
        ctx.options.includes_constructor(access)
    });
    if helpers::is_value_type(ctx.env, id) {
        Expr::literal("default")
    } else if constructible {
        Expr::new_object(ctx.type_name(id), Vec::new())
    } else {
        Expr::throw_new(
            "ArgumentNullException",
            vec![Expr::string("The source is null")],
        )
    }
}

/// Type-pattern switch over the other declared single-source mappings.
fn runtime_dispatch(
    ctx: &Ctx<'_>,
    method: &MappingMethod,
    dispatch: RuntimeDispatch,
    declared: &[Declared<'_>],
) -> Vec<Stmt> {
    let source = method.params.first().map(|p| p.name.as_str()).unwrap_or("source");
    let target_type = match dispatch {
        RuntimeDispatch::TargetTypeParameter => Expr::ident(
            method
                .params
                .get(1)
                .map(|p| p.name.as_str())
                .unwrap_or("targetType"),
        ),
        RuntimeDispatch::GenericTarget => Expr::TypeOf(GENERIC_TARGET.to_string()),
    };

    let mut candidates: Vec<(&MappingMethod, Pair, usize)> = declared
        .iter()
        .filter(|d| !std::ptr::eq(d.method, method))
        .filter_map(|d| Some((d.method, reusable_pair(d.method)?)))
        .map(|(m, pair)| (m, pair, helpers::supertypes(ctx.env, pair.source.id).len()))
        .collect();
    // Derived source types first so a base type pattern does not shadow them.
    candidates.sort_by_key(|(_, _, depth)| std::cmp::Reverse(*depth));

    let mut arms = Vec::with_capacity(candidates.len() + 2);
    for (idx, (candidate, pair, _)) in candidates.iter().enumerate() {
        let binding = format!("x{idx}");
        let call = Expr::Call {
            receiver: None,
            method: candidate.name.clone(),
            args: vec![Expr::ident(binding.clone())],
        };
        let value = match dispatch {
            RuntimeDispatch::TargetTypeParameter => call,
            RuntimeDispatch::GenericTarget => {
                Expr::cast(GENERIC_TARGET, Expr::cast("object", call))
            }
        };
        arms.push(SwitchArm {
            pattern: Pattern::Type {
                ty: ctx.type_name(pair.source.id),
                binding,
                guard: Some(target_type.clone().call(
                    "IsAssignableFrom",
                    vec![Expr::TypeOf(ctx.type_name(pair.target.id))],
                )),
            },
            value,
        });
    }
    let nullable_result = method.return_type.is_some_and(|ty| ty.nullable);
    arms.push(SwitchArm {
        pattern: Pattern::Null,
        value: if nullable_result {
            Expr::null()
        } else {
            Expr::throw_new(
                "ArgumentNullException",
                vec![Expr::name_of(Expr::ident(source))],
            )
        },
    });
    arms.push(SwitchArm {
        pattern: Pattern::Discard,
        value: Expr::throw_new(
            "ArgumentException",
            vec![
                Expr::string("Cannot map the source to the requested target type as there is no known type mapping"),
                Expr::name_of(Expr::ident(source)),
            ],
        ),
    });
    vec![Stmt::ret(Expr::Switch {
        subject: Box::new(Expr::ident(source)),
        arms,
    })]
}
