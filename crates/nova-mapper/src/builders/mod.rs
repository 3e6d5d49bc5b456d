//! Conversion builders, one per shape family.
//!
//! Selection and building are separate steps: [`select`] runs the prioritized selector list
//! and either yields an inline conversion, names the family that builds a dedicated method, or
//! declines. Building a method body happens only after the plan cache handed out a slot, so
//! recursive type graphs never build the same body twice.

mod collection;
mod dictionary;
mod object;
mod primitive;
mod span;
mod tuple;

use crate::classify::{self, ShapeCategory};
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::enums;
use crate::plan::{Conversion, Stmt};

/// Families that need a method of their own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Enum,
    Collection,
    Dictionary,
    Span,
    Tuple,
    Object,
}

#[derive(Debug)]
pub(crate) enum Selection {
    Inline(Conversion),
    Method(Family),
    Decline,
    /// The pair belongs to a family that cannot produce it.
    Unmappable(Unmapped),
}

type Selector = fn(&Ctx<'_>, &Pair, ShapeCategory, ShapeCategory) -> Selection;

/// Selectors in priority order.
const SELECTORS: &[Selector] = &[
    primitive::select_cast,
    enums::select,
    primitive::select_string,
    dictionary::select,
    span::select,
    collection::select,
    tuple::select,
    object::select_constructor,
    object::select,
];

pub(crate) fn select(ctx: &Ctx<'_>, pair: &Pair) -> Selection {
    let source = ctx.classify(pair.source.id);
    let target = ctx.classify(pair.target.id);
    if pair.existing {
        return select_existing(ctx, pair, target);
    }
    for selector in SELECTORS {
        match selector(ctx, pair, source, target) {
            Selection::Decline => continue,
            selection => return selection,
        }
    }
    Selection::Decline
}

/// Only mutable containers can be mapped into.
fn select_existing(ctx: &Ctx<'_>, pair: &Pair, target: ShapeCategory) -> Selection {
    let read_only = || Selection::Unmappable(collection::read_only_target(ctx, pair));
    match target {
        ShapeCategory::Collection(kind)
            if collection::append_method(ctx, pair.target.id, kind).is_some() =>
        {
            if classify::element_type(ctx.env, pair.source.id).is_some() {
                Selection::Method(Family::Collection)
            } else {
                Selection::Decline
            }
        }
        ShapeCategory::Dictionary(kind) if dictionary::is_writable(ctx, pair.target.id, kind) => {
            if classify::key_value_types(ctx.env, pair.source.id).is_some() {
                Selection::Method(Family::Dictionary)
            } else {
                Selection::Decline
            }
        }
        ShapeCategory::Object => Selection::Method(Family::Object),
        ShapeCategory::Collection(_) | ShapeCategory::Dictionary(_) | ShapeCategory::Span(_) => {
            read_only()
        }
        _ => Selection::Decline,
    }
}

pub(crate) fn build(
    ctx: &Ctx<'_>,
    pair: &Pair,
    family: Family,
    body: &Body<'_>,
) -> Result<Vec<Stmt>, Unmapped> {
    match family {
        Family::Enum => enums::build(ctx, pair, body),
        Family::Collection => collection::build(ctx, pair, body),
        Family::Dictionary => dictionary::build(ctx, pair, body),
        Family::Span => span::build(ctx, pair, body),
        Family::Tuple => tuple::build(ctx, pair, body),
        Family::Object => object::build(ctx, pair, body),
    }
}
