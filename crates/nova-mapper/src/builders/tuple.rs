//! Value tuples, built element by element.

use nova_mapper_config::{ConversionType, PropertyNameMappingStrategy};
use nova_mapper_types::helpers;

use super::collection::disabled;
use super::{Family, Selection};
use crate::classify::ShapeCategory;
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::matching::{self, SourcePath, SourceRoot};
use crate::nullability::{self, NullPolicy};
use crate::plan::{Expr, Stmt};

pub(super) fn select(
    ctx: &Ctx<'_>,
    _pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    if target != ShapeCategory::Tuple
        || !matches!(source, ShapeCategory::Tuple | ShapeCategory::Object)
    {
        return Selection::Decline;
    }
    if !ctx.options.is_enabled(ConversionType::Tuple) {
        return disabled(ctx, _pair, ConversionType::Tuple);
    }
    Selection::Method(Family::Tuple)
}

pub(super) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    let elements = helpers::tuple_elements(ctx.env, pair.target.id)
        .ok_or_else(|| ctx.could_not_map(pair))?;
    let mut roots = vec![SourceRoot::new(body.source.clone(), pair.source)];
    roots.extend(body.extra.iter().map(|p| SourceRoot::new(p.name.clone(), p.ty)));
    let strategy = ctx.options.property_name_mapping_strategy;
    let configured = body.config.map(|c| c.properties.as_slice()).unwrap_or_default();

    let mut values = Vec::with_capacity(elements.len());
    for (idx, element) in elements.iter().enumerate() {
        let positional = format!("Item{}", idx + 1);
        let name = element.name.clone().unwrap_or_else(|| positional.clone());

        let explicit = configured
            .iter()
            .find(|p| p.target == name || p.target == positional);
        let source = match explicit {
            Some(config) => match matching::resolve_configured(ctx, &roots, &config.source) {
                Ok(source) => Some(source),
                Err(segment) => {
                    ctx.report(
                        DiagnosticKind::ConfiguredMappingSourceMemberNotFound,
                        format!(
                            "Specified member {segment} on source type {} was not found",
                            ctx.display(pair.source)
                        ),
                    );
                    None
                }
            },
            None => element
                .name
                .as_deref()
                .and_then(|n| matching::find_source(ctx, &roots, n, strategy))
                .or_else(|| {
                    matching::find_source(
                        ctx,
                        &roots,
                        &positional,
                        PropertyNameMappingStrategy::CaseSensitive,
                    )
                }),
        };

        let value = source.and_then(|source| element_value(ctx, &source, element.ty));
        let value = value.unwrap_or_else(|| {
            ctx.report(
                DiagnosticKind::SourceMemberNotFound,
                format!(
                    "The tuple element {name} of {} was not found on the mapping source type {}",
                    ctx.display(pair.target),
                    ctx.display(pair.source)
                ),
            );
            Expr::literal("default")
        });
        values.push((element.name.clone(), value));
    }
    Ok(vec![Stmt::ret(Expr::Tuple(values))])
}

fn element_value(
    ctx: &Ctx<'_>,
    source: &SourcePath,
    target: nova_mapper_types::TypeRef,
) -> Option<Expr> {
    let source_type = source.ty();
    let conversion = match ctx.resolve(Pair::new(source_type, target)) {
        Ok(conversion) => conversion,
        Err(unmapped) => {
            ctx.report_unmapped(unmapped);
            return None;
        }
    };
    let value = source.value(ctx);
    if value.nullable && !target.nullable && !ctx.options.suppress_null_mismatch_diagnostic {
        ctx.report(
            DiagnosticKind::NullableSourceValueToNonNullableTargetValue,
            format!(
                "Mapping the nullable source {} to the non-nullable tuple element {}",
                source.path,
                ctx.display(target)
            ),
        );
    }
    Some(nullability::value(
        &value,
        &conversion,
        target.nullable,
        NullPolicy::members(ctx.options),
        None,
    ))
}
