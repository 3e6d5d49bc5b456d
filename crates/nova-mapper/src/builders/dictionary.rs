//! Dictionaries, filled key by key.

use nova_mapper_config::ConversionType;
use nova_mapper_types::helpers;
use nova_mapper_types::{InterfaceShape, TypeId, TypeRef};

use super::collection::{can_reserve, disabled, enumerated, read_only_target, Element};
use super::{Family, Selection};
use crate::classify::{self, DictionaryKind, ShapeCategory};
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::plan::{Conversion, Expr, Stmt};

struct Entry {
    key: Element,
    value: Element,
    key_type: TypeRef,
    value_type: TypeRef,
}

impl Entry {
    fn resolve(ctx: &Ctx<'_>, pair: &Pair) -> Option<Result<Self, Unmapped>> {
        let (source_key, source_value) = classify::key_value_types(ctx.env, pair.source.id)?;
        let (target_key, target_value) = classify::key_value_types(ctx.env, pair.target.id)?;
        let resolve = || -> Result<Self, Unmapped> {
            Ok(Self {
                key: Element::resolve(ctx, source_key, target_key)?,
                value: Element::resolve(ctx, source_value, target_value)?,
                key_type: target_key,
                value_type: target_value,
            })
        };
        Some(resolve().map_err(|_| ctx.could_not_map(pair)))
    }

    fn is_identity(&self) -> bool {
        self.key.is_identity() && self.value.is_identity()
    }

    fn type_args(&self, ctx: &Ctx<'_>) -> String {
        format!("{}, {}", ctx.display(self.key_type), ctx.display(self.value_type))
    }
}

pub(super) fn select(
    ctx: &Ctx<'_>,
    pair: &Pair,
    _source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    let ShapeCategory::Dictionary(kind) = target else {
        return Selection::Decline;
    };
    let entry = match Entry::resolve(ctx, pair) {
        None => return Selection::Decline,
        Some(_) if !ctx.options.is_enabled(ConversionType::Dictionary) => {
            return disabled(ctx, pair, ConversionType::Dictionary)
        }
        Some(Err(unmapped)) => return Selection::Unmappable(unmapped),
        Some(Ok(entry)) => entry,
    };
    if kind == DictionaryKind::ReadOnlyCustom {
        return Selection::Unmappable(Unmapped::new(
            DiagnosticKind::CannotMapToReadOnlyType,
            format!("Cannot create the read-only dictionary {}", ctx.display(pair.target)),
        ));
    }

    let source_is_dictionary =
        helpers::implements(ctx.env, pair.source.id, InterfaceShape::Dictionary).is_some();
    if !entry.is_identity() || !source_is_dictionary {
        return Selection::Method(Family::Dictionary);
    }
    match kind {
        DictionaryKind::Dictionary | DictionaryKind::SortedDictionary => {
            Selection::Inline(Conversion::Inline(Expr::new_object(
                concrete_type(ctx, pair.target, &entry),
                vec![Expr::Source],
            )))
        }
        DictionaryKind::Immutable => Selection::Inline(Conversion::Inline(Expr::static_call(
            "ImmutableDictionary",
            "CreateRange",
            vec![Expr::Source],
        ))),
        _ => Selection::Method(Family::Dictionary),
    }
}

pub(super) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    let ShapeCategory::Dictionary(kind) = ctx.classify(pair.target.id) else {
        return Err(ctx.could_not_map(pair));
    };
    let entry = Entry::resolve(ctx, pair).ok_or_else(|| ctx.could_not_map(pair))??;
    let source = body.source_expr();

    if pair.existing {
        if !is_writable(ctx, pair.target.id, kind) {
            return Err(read_only_target(ctx, pair));
        }
        let reserve = can_reserve(ctx, pair.target.id);
        return Ok(fill(ctx, pair.source.id, reserve, &entry, source, body.target_expr(), true));
    }

    let target = Expr::ident("target");
    let mut stmts = Vec::new();
    match kind {
        DictionaryKind::ReadOnlyDictionary | DictionaryKind::Immutable => {
            let args = entry.type_args(ctx);
            stmts.push(Stmt::let_var(
                "target",
                Expr::new_object(format!("Dictionary<{args}>"), Vec::new()),
            ));
            stmts.extend(fill(ctx, pair.source.id, true, &entry, source, target.clone(), false));
            let result = if kind == DictionaryKind::Immutable {
                Expr::static_call("ImmutableDictionary", "CreateRange", vec![target])
            } else {
                Expr::new_object(format!("ReadOnlyDictionary<{args}>"), vec![target])
            };
            stmts.push(Stmt::ret(result));
        }
        _ => {
            if kind == DictionaryKind::Custom
                && !helpers::has_parameterless_constructor(ctx.env, pair.target.id, |access| {
                    ctx.options.includes_constructor(access)
                })
            {
                return Err(Unmapped::new(
                    DiagnosticKind::NoConstructorFound,
                    format!(
                        "{} has no accessible parameterless constructor",
                        ctx.display(pair.target)
                    ),
                ));
            }
            stmts.push(Stmt::let_var(
                "target",
                Expr::new_object(concrete_type(ctx, pair.target, &entry), Vec::new()),
            ));
            stmts.extend(fill(ctx, pair.source.id, reserves(ctx, pair.target.id, kind), &entry, source, target.clone(), false));
            stmts.push(Stmt::ret(target));
        }
    }
    Ok(stmts)
}

fn fill(
    ctx: &Ctx<'_>,
    source_type: TypeId,
    reserve: bool,
    entry: &Entry,
    source: Expr,
    target: Expr,
    existing: bool,
) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    if reserve {
        if let Some(count) = classify::count_member(ctx.env, source_type) {
            let mut capacity = source.clone().member(count);
            if existing {
                capacity = Expr::binary("+", capacity, target.clone().member("Count"));
            }
            stmts.push(Stmt::Expr(target.clone().call("EnsureCapacity", vec![capacity])));
        }
    }
    let item = Expr::ident("item");
    stmts.push(Stmt::ForEach {
        item: "item".to_string(),
        source: enumerated(ctx, source_type, source),
        body: vec![Stmt::assign(
            target.index(entry.key.apply(ctx, item.clone().member("Key"))),
            entry.value.apply(ctx, item.member("Value")),
        )],
    });
    stmts
}

fn concrete_type(ctx: &Ctx<'_>, target: TypeRef, entry: &Entry) -> String {
    if helpers::is_interface(ctx.env, target.id) {
        format!("Dictionary<{}>", entry.type_args(ctx))
    } else {
        ctx.display(target.non_nullable())
    }
}

fn reserves(ctx: &Ctx<'_>, target: TypeId, kind: DictionaryKind) -> bool {
    match kind {
        DictionaryKind::Dictionary => true,
        DictionaryKind::Custom => can_reserve(ctx, target),
        _ => false,
    }
}

/// Whether entries can be stored into an existing instance of `target`.
pub(super) fn is_writable(ctx: &Ctx<'_>, target: TypeId, kind: DictionaryKind) -> bool {
    kind.is_appendable() && helpers::find_method(ctx.env, target, "Add", 2).is_some()
}
