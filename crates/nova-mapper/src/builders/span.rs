//! `Span<T>`, `Memory<T>` and their read-only views.
//!
//! Spans and memories have no storage of their own: anything but a view change copies into a
//! fresh array, which converts implicitly to every span and memory type.

use nova_mapper_config::ConversionType;
use nova_mapper_types::helpers;

use super::collection::{self, disabled, Element};
use super::{Family, Selection};
use crate::classify::{self, CollectionKind, ShapeCategory, SpanKind};
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::plan::{Conversion, Expr, Stmt};

fn gate(kind: SpanKind) -> ConversionType {
    if kind.is_memory() {
        ConversionType::Memory
    } else {
        ConversionType::Span
    }
}

/// Whether a `source` view can be reinterpreted as a `target` view without copying.
fn is_view_change(source: SpanKind, target: SpanKind) -> bool {
    use SpanKind::*;
    matches!(
        (source, target),
        (Span, ReadOnlySpan) | (Memory, ReadOnlyMemory)
    )
}

/// Whether `target` is a span over the memory `source`.
fn is_span_of(source: SpanKind, target: SpanKind) -> bool {
    use SpanKind::*;
    matches!(
        (source, target),
        (Memory, Span) | (Memory, ReadOnlySpan) | (ReadOnlyMemory, ReadOnlySpan)
    )
}

pub(super) fn select(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    let ShapeCategory::Span(target_kind) = target else {
        return Selection::Decline;
    };
    let (Some(source_element), Some(target_element)) = (
        classify::element_type(ctx.env, pair.source.id),
        classify::element_type(ctx.env, pair.target.id),
    ) else {
        return Selection::Decline;
    };
    if !ctx.options.is_enabled(gate(target_kind)) {
        return disabled(ctx, pair, gate(target_kind));
    }
    if let ShapeCategory::Span(source_kind) = source {
        if !ctx.options.is_enabled(gate(source_kind)) {
            return disabled(ctx, pair, gate(source_kind));
        }
    }
    let element = match Element::resolve(ctx, source_element, target_element) {
        Ok(element) => element,
        Err(_) => return Selection::Unmappable(ctx.could_not_map(pair)),
    };
    if !element.is_identity() {
        return Selection::Method(Family::Span);
    }
    match source {
        ShapeCategory::Span(source_kind) if is_view_change(source_kind, target_kind) => {
            Selection::Inline(Conversion::Identity)
        }
        ShapeCategory::Span(source_kind) if is_span_of(source_kind, target_kind) => {
            Selection::Inline(Conversion::Inline(Expr::Source.member("Span")))
        }
        ShapeCategory::Collection(CollectionKind::Array)
            if helpers::is_assignable(ctx.env, source_element.id, target_element.id) =>
        {
            Selection::Inline(Conversion::Identity)
        }
        _ => Selection::Method(Family::Span),
    }
}

pub(super) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    let (Some(source_element), Some(target_element)) = (
        classify::element_type(ctx.env, pair.source.id),
        classify::element_type(ctx.env, pair.target.id),
    ) else {
        return Err(ctx.could_not_map(pair));
    };
    let element = Element::resolve(ctx, source_element, target_element)
        .map_err(|_| ctx.could_not_map(pair))?;
    let element_type = ctx.display(target_element);
    Ok(collection::build_array(
        ctx,
        pair,
        &element,
        &element_type,
        body.source_expr(),
    ))
}

#[cfg(test)]
mod tests {
    use nova_mapper_config::MapperOptions;
    use nova_mapper_types::TypeStore;
    use pretty_assertions::assert_eq;

    use crate::builders::testing::{resolve, squash};

    #[test]
    fn views_pass_through() {
        let mut store = TypeStore::default();
        let options = MapperOptions::default();
        let cases = [
            ("Span<int>", "ReadOnlySpan<int>", "source"),
            ("Memory<int>", "ReadOnlyMemory<int>", "source"),
            ("Memory<int>", "Span<int>", "source.Span"),
            ("int[]", "ReadOnlySpan<int>", "source"),
            ("Span<int>", "int[]", "source.ToArray()"),
        ];
        for (source, target, expected) in cases {
            let resolved = resolve(&mut store, &options, source, target);
            assert_eq!(resolved.conversion.as_deref(), Ok(expected), "{source} -> {target}");
        }
    }

    #[test]
    fn differing_elements_materialize_an_array() {
        let mut store = TypeStore::default();
        let resolved = resolve(
            &mut store,
            &MapperOptions::default(),
            "ReadOnlySpan<long>",
            "ReadOnlySpan<int>",
        );
        assert_eq!(
            squash(&resolved.plans[0]),
            "private ReadOnlySpan<int> MapToReadOnlySpanOfInt32(ReadOnlySpan<long> source) { \
             var target = new int[source.Length]; \
             for (var i = 0; i < source.Length; i++) { target[i] = (int)source[i]; } return target; }"
        );
    }
}
