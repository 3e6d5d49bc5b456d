//! Casts between primitives, date conversions, `ToString` and `Parse`.

use nova_mapper_config::ConversionType;
use nova_mapper_types::helpers;
use nova_mapper_types::PrimitiveType;

use super::Selection;
use crate::classify::ShapeCategory;
use crate::context::{Ctx, Pair};
use crate::plan::{Conversion, Expr};

fn gated(ctx: &Ctx<'_>, conversion: ConversionType, template: Expr) -> Selection {
    if ctx.options.is_enabled(conversion) {
        Selection::Inline(Conversion::Inline(template))
    } else {
        Selection::Decline
    }
}

pub(super) fn select_cast(
    ctx: &Ctx<'_>,
    _pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    use PrimitiveType::*;

    let (ShapeCategory::Primitive(source), ShapeCategory::Primitive(target)) = (source, target)
    else {
        return Selection::Decline;
    };
    if source == String || target == String {
        return Selection::Decline;
    }
    match (source, target) {
        (DateTime, DateOnly) => gated(
            ctx,
            ConversionType::DateTimeToDateOnly,
            Expr::static_call("DateOnly", "FromDateTime", vec![Expr::Source]),
        ),
        (DateTime, TimeOnly) => gated(
            ctx,
            ConversionType::DateTimeToTimeOnly,
            Expr::static_call("TimeOnly", "FromDateTime", vec![Expr::Source]),
        ),
        _ if source.implicitly_converts_to(target) => {
            if ctx.options.is_enabled(ConversionType::ImplicitCast) {
                Selection::Inline(Conversion::Identity)
            } else {
                Selection::Decline
            }
        }
        // Narrowing is allowed; the cast never checks the range at runtime.
        _ if source.explicitly_converts_to(target) => gated(
            ctx,
            ConversionType::ExplicitCast,
            Expr::cast(target.display_name(), Expr::Source),
        ),
        _ => Selection::Decline,
    }
}

/// `ToString()` into strings, `T.Parse(..)` out of them.
pub(super) fn select_string(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    let string = ShapeCategory::Primitive(PrimitiveType::String);
    if target == string && source != string {
        return gated(
            ctx,
            ConversionType::ToStringMethod,
            Expr::Source.call("ToString", Vec::new()),
        );
    }
    if source != string {
        return Selection::Decline;
    }
    match target {
        ShapeCategory::Primitive(p) if p.has_parse_method() => gated(
            ctx,
            ConversionType::ParseMethod,
            Expr::static_call(p.display_name(), "Parse", vec![Expr::Source]),
        ),
        ShapeCategory::Object => {
            let parse = helpers::methods(ctx.env, pair.target.id, "Parse")
                .into_iter()
                .find(|m| {
                    m.is_static
                        && m.params.len() == 1
                        && m.params[0].ty.id == pair.source.id
                        && m.return_type.map(|r| r.id) == Some(pair.target.id)
                });
            match parse {
                Some(_) => gated(
                    ctx,
                    ConversionType::ParseMethod,
                    Expr::static_call(
                        &ctx.type_name(pair.target.id),
                        "Parse",
                        vec![Expr::Source],
                    ),
                ),
                None => Selection::Decline,
            }
        }
        _ => Selection::Decline,
    }
}
