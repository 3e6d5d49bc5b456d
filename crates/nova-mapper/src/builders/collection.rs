//! Arrays, lists, sets and the other enumerable targets.

use nova_mapper_config::ConversionType;
use nova_mapper_types::helpers;
use nova_mapper_types::{TypeId, TypeRef};

use super::{Family, Selection};
use crate::classify::{self, CollectionKind, ImmutableKind, ShapeCategory};
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::nullability::{self, NullAction, NullPolicy, SourceValue};
use crate::plan::{Conversion, Expr, Stmt};

/// Conversion of one element (or key, or value) of a container.
#[derive(Clone, Debug)]
pub(super) struct Element {
    conversion: Conversion,
    source: TypeRef,
    target: TypeRef,
    value_type: bool,
}

impl Element {
    pub(super) fn resolve(ctx: &Ctx<'_>, source: TypeRef, target: TypeRef) -> Result<Self, Unmapped> {
        let mut conversion = ctx.resolve(Pair::new(source, target))?;
        if conversion.is_identity()
            && source.id != target.id
            && !helpers::is_assignable(ctx.env, source.id, target.id)
        {
            // Implicit widening is not applied to generic arguments.
            conversion = Conversion::Inline(Expr::cast(
                ctx.display(target.non_nullable()),
                Expr::Source,
            ));
        }
        Ok(Self {
            conversion,
            source,
            target,
            value_type: helpers::is_value_type(ctx.env, source.id),
        })
    }

    /// Elements are copied as they are.
    pub(super) fn is_identity(&self) -> bool {
        self.conversion.is_identity()
            && !NullAction::is_mismatch(self.source.nullable, self.target.nullable)
    }

    /// Whether the conversion can sit inside a lambda without shadowing its parameter.
    pub(super) fn is_lambda_safe(&self) -> bool {
        match &self.conversion {
            Conversion::Inline(template) => !template.contains_lambda(),
            _ => true,
        }
    }

    pub(super) fn apply(&self, ctx: &Ctx<'_>, item: Expr) -> Expr {
        let value = SourceValue::new(item, self.source.nullable, self.value_type);
        nullability::value(
            &value,
            &self.conversion,
            self.target.nullable,
            NullPolicy::members(ctx.options),
            None,
        )
    }

    /// `Enumerable.Select(source, x => conv(x))`
    pub(super) fn select(&self, ctx: &Ctx<'_>, source: Expr) -> Expr {
        let lambda = Expr::Lambda {
            param: "x".to_string(),
            body: Box::new(self.apply(ctx, Expr::ident("x"))),
        };
        Expr::static_call("Enumerable", "Select", vec![source, lambda])
    }
}

/// The expression enumerated by `foreach`: memories expose their items through `.Span`.
pub(super) fn enumerated(ctx: &Ctx<'_>, id: TypeId, source: Expr) -> Expr {
    match ctx.classify(id) {
        ShapeCategory::Span(kind) if kind.is_memory() => source.member("Span"),
        _ => source,
    }
}

pub(super) fn disabled(ctx: &Ctx<'_>, pair: &Pair, conversion: ConversionType) -> Selection {
    Selection::Unmappable(Unmapped::new(
        DiagnosticKind::CouldNotCreateMapping,
        format!(
            "Could not create mapping from {} to {}: {conversion:?} conversions are disabled",
            ctx.display(pair.source),
            ctx.display(pair.target)
        ),
    ))
}

pub(super) fn select(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    let ShapeCategory::Collection(kind) = target else {
        return Selection::Decline;
    };
    let (Some(source_element), Some(target_element)) = (
        classify::element_type(ctx.env, pair.source.id),
        classify::element_type(ctx.env, pair.target.id),
    ) else {
        return Selection::Decline;
    };
    if !ctx.options.is_enabled(ConversionType::Enumerable) {
        return disabled(ctx, pair, ConversionType::Enumerable);
    }
    if kind == CollectionKind::EnumerableOnly {
        return Selection::Unmappable(Unmapped::new(
            DiagnosticKind::CannotMapToReadOnlyType,
            format!(
                "{} can only be enumerated and cannot be created",
                ctx.display(pair.target)
            ),
        ));
    }
    let element = match Element::resolve(ctx, source_element, target_element) {
        Ok(element) => element,
        Err(_) => return Selection::Unmappable(ctx.could_not_map(pair)),
    };

    let from_span = matches!(source, ShapeCategory::Span(_));
    let inline = |template| Selection::Inline(Conversion::Inline(template));
    match kind {
        CollectionKind::Enumerable if !from_span && element.is_lambda_safe() => {
            inline(element.select(ctx, Expr::Source))
        }
        CollectionKind::Array if from_span && element.is_identity() => {
            inline(Expr::Source.call("ToArray", Vec::new()))
        }
        CollectionKind::Immutable(immutable) if !from_span && element.is_lambda_safe() => {
            let items = if element.is_identity() {
                Expr::Source
            } else {
                element.select(ctx, Expr::Source)
            };
            inline(Expr::static_call(
                immutable_factory(immutable),
                "CreateRange",
                vec![items],
            ))
        }
        CollectionKind::List
        | CollectionKind::Set
        | CollectionKind::SortedSet
        | CollectionKind::Stack
        | CollectionKind::Queue
        | CollectionKind::LinkedList
            if !from_span && element.is_identity() =>
        {
            inline(Expr::new_object(
                concrete_type(ctx, pair.target, kind, target_element),
                vec![Expr::Source],
            ))
        }
        _ => Selection::Method(Family::Collection),
    }
}

pub(super) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    let ShapeCategory::Collection(kind) = ctx.classify(pair.target.id) else {
        return Err(ctx.could_not_map(pair));
    };
    let (Some(source_element), Some(target_element)) = (
        classify::element_type(ctx.env, pair.source.id),
        classify::element_type(ctx.env, pair.target.id),
    ) else {
        return Err(ctx.could_not_map(pair));
    };
    let element = Element::resolve(ctx, source_element, target_element)
        .map_err(|_| ctx.could_not_map(pair))?;
    let source = body.source_expr();

    if pair.existing {
        if append_method(ctx, pair.target.id, kind).is_none() {
            return Err(read_only_target(ctx, pair));
        }
        let reserve = can_reserve(ctx, pair.target.id);
        let target = body.target_expr();
        return Ok(fill(ctx, pair.source.id, kind, reserve, &element, source, target, true));
    }

    let target = Expr::ident("target");
    let element_type = ctx.display(target_element);
    let mut stmts = Vec::new();
    match kind {
        CollectionKind::Array => return Ok(build_array(ctx, pair, &element, &element_type, source)),
        CollectionKind::ReadOnlyCollection
        | CollectionKind::Immutable(_)
        | CollectionKind::Enumerable => {
            stmts.push(Stmt::let_var(
                "target",
                Expr::new_object(format!("List<{element_type}>"), Vec::new()),
            ));
            stmts.extend(fill(ctx, pair.source.id, CollectionKind::List, true, &element, source, target.clone(), false));
            let result = match kind {
                CollectionKind::ReadOnlyCollection => Expr::new_object(
                    format!("ReadOnlyCollection<{element_type}>"),
                    vec![target],
                ),
                CollectionKind::Immutable(immutable) => {
                    Expr::static_call(immutable_factory(immutable), "CreateRange", vec![target])
                }
                _ => target,
            };
            stmts.push(Stmt::ret(result));
        }
        _ => {
            if kind == CollectionKind::Custom
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
            let ty = concrete_type(ctx, pair.target, kind, target_element);
            stmts.push(Stmt::let_var("target", Expr::new_object(ty, Vec::new())));
            stmts.extend(fill(ctx, pair.source.id, kind, reserves(ctx, pair.target.id, kind), &element, source, target.clone(), false));
            stmts.push(Stmt::ret(target));
        }
    }
    Ok(stmts)
}

/// Reserve capacity, then append every converted item of `source` to `target`.
#[allow(clippy::too_many_arguments)]
fn fill(
    ctx: &Ctx<'_>,
    source_type: TypeId,
    kind: CollectionKind,
    reserve: bool,
    element: &Element,
    source: Expr,
    target: Expr,
    existing: bool,
) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    if reserve {
        let capacity = |count: Expr| {
            if existing {
                Expr::binary("+", count, target.clone().member("Count"))
            } else {
                count
            }
        };
        let ensure = |count: Expr| Stmt::Expr(target.clone().call("EnsureCapacity", vec![capacity(count)]));
        match classify::count_member(ctx.env, source_type) {
            Some(count) => stmts.push(ensure(source.clone().member(count))),
            None => stmts.push(Stmt::if_then(
                Expr::static_call(
                    "Enumerable",
                    "TryGetNonEnumeratedCount",
                    vec![source.clone(), Expr::OutVar("sourceCount".to_string())],
                ),
                vec![ensure(Expr::ident("sourceCount"))],
            )),
        }
    }
    stmts.push(Stmt::ForEach {
        item: "item".to_string(),
        source: enumerated(ctx, source_type, source),
        body: vec![Stmt::Expr(target.call(
            add_method(kind),
            vec![element.apply(ctx, Expr::ident("item"))],
        ))],
    });
    stmts
}

pub(super) fn build_array(
    ctx: &Ctx<'_>,
    pair: &Pair,
    element: &Element,
    element_type: &str,
    source: Expr,
) -> Vec<Stmt> {
    let target = Expr::ident("target");
    let memory = matches!(ctx.classify(pair.source.id), ShapeCategory::Span(kind) if kind.is_memory());
    let count = classify::count_member(ctx.env, pair.source.id);
    match count {
        Some(count) if memory || classify::is_indexable(ctx.env, pair.source.id) => {
            let items = enumerated(ctx, pair.source.id, source.clone());
            let len = source.member(count);
            let index = Expr::ident("i");
            vec![
                Stmt::let_var(
                    "target",
                    Expr::NewArray {
                        element: element_type.to_string(),
                        len: Box::new(len.clone()),
                    },
                ),
                Stmt::For {
                    index: "i".to_string(),
                    bound: len,
                    body: vec![Stmt::assign(
                        target.clone().index(index.clone()),
                        element.apply(ctx, items.index(index)),
                    )],
                },
                Stmt::ret(target),
            ]
        }
        _ => {
            let mut stmts = vec![Stmt::let_var(
                "target",
                Expr::new_object(format!("List<{element_type}>"), Vec::new()),
            )];
            stmts.extend(fill(ctx, pair.source.id, CollectionKind::List, true, element, source, target.clone(), false));
            stmts.push(Stmt::ret(target.call("ToArray", Vec::new())));
            stmts
        }
    }
}

/// Type instantiated for `target`: interfaces get `List<T>` or `HashSet<T>`.
fn concrete_type(ctx: &Ctx<'_>, target: TypeRef, kind: CollectionKind, element: TypeRef) -> String {
    if !helpers::is_interface(ctx.env, target.id) {
        return ctx.display(target.non_nullable());
    }
    match kind {
        CollectionKind::Set => format!("HashSet<{}>", ctx.display(element)),
        _ => format!("List<{}>", ctx.display(element)),
    }
}

fn reserves(ctx: &Ctx<'_>, target: TypeId, kind: CollectionKind) -> bool {
    match kind {
        CollectionKind::List | CollectionKind::Set | CollectionKind::Stack | CollectionKind::Queue => {
            true
        }
        CollectionKind::Custom => can_reserve(ctx, target),
        _ => false,
    }
}

/// Whether `target` itself declares `EnsureCapacity`.
pub(super) fn can_reserve(ctx: &Ctx<'_>, target: TypeId) -> bool {
    helpers::find_method(ctx.env, target, "EnsureCapacity", 1).is_some()
}

/// The method appending one item to an existing instance of `target`, if the type has one.
/// Read-only interfaces classify like their mutable counterparts but declare no `Add`.
pub(super) fn append_method(
    ctx: &Ctx<'_>,
    target: TypeId,
    kind: CollectionKind,
) -> Option<&'static str> {
    if !kind.is_appendable() {
        return None;
    }
    let name = add_method(kind);
    helpers::find_method(ctx.env, target, name, 1).map(|_| name)
}

pub(super) fn read_only_target(ctx: &Ctx<'_>, pair: &Pair) -> Unmapped {
    Unmapped::new(
        DiagnosticKind::CannotMapToReadOnlyType,
        format!(
            "Cannot map into the read-only type {}",
            ctx.display(pair.target)
        ),
    )
}

fn add_method(kind: CollectionKind) -> &'static str {
    match kind {
        CollectionKind::Stack => "Push",
        CollectionKind::Queue => "Enqueue",
        CollectionKind::LinkedList => "AddLast",
        _ => "Add",
    }
}

fn immutable_factory(kind: ImmutableKind) -> &'static str {
    match kind {
        ImmutableKind::Array => "ImmutableArray",
        ImmutableKind::List => "ImmutableList",
        ImmutableKind::HashSet => "ImmutableHashSet",
    }
}

#[cfg(test)]
mod tests {
    use nova_mapper_config::MapperOptions;
    use nova_mapper_types::TypeStore;
    use pretty_assertions::assert_eq;

    use crate::builders::testing::{resolve, resolve_existing, squash};
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn span_to_list_reserves_and_appends() {
        let mut store = TypeStore::default();
        let resolved = resolve(&mut store, &MapperOptions::default(), "Span<int>", "List<int>");
        assert_eq!(resolved.conversion.as_deref(), Ok("MapToListOfInt32(source)"));
        assert_eq!(
            squash(&resolved.plans[0]),
            "private List<int> MapToListOfInt32(Span<int> source) { var target = new List<int>(); \
             target.EnsureCapacity(source.Length); foreach (var item in source) { target.Add(item); } \
             return target; }"
        );
    }

    #[test]
    fn enumerable_targets_project_lazily() {
        let mut store = TypeStore::default();
        let resolved = resolve(&mut store, &MapperOptions::default(), "List<long>", "IEnumerable<int>");
        assert_eq!(
            resolved.conversion.as_deref(),
            Ok("Enumerable.Select(source, x => (int)x)")
        );
        assert!(resolved.plans.is_empty());
    }

    #[test]
    fn identical_elements_use_the_copy_constructor() {
        let mut store = TypeStore::default();
        let resolved = resolve(&mut store, &MapperOptions::default(), "int[]", "List<int>");
        assert_eq!(resolved.conversion.as_deref(), Ok("new List<int>(source)"));
    }

    #[test]
    fn arrays_are_filled_by_index() {
        let mut store = TypeStore::default();
        let resolved = resolve(&mut store, &MapperOptions::default(), "List<long>", "int[]");
        assert_eq!(
            squash(&resolved.plans[0]),
            "private int[] MapToInt32Array(List<long> source) { var target = new int[source.Count]; \
             for (var i = 0; i < source.Count; i++) { target[i] = (int)source[i]; } return target; }"
        );
    }

    #[test]
    fn unknown_counts_use_the_non_enumerating_hint() {
        let mut store = TypeStore::default();
        let resolved = resolve(&mut store, &MapperOptions::default(), "IEnumerable<long>", "List<int>");
        assert_eq!(
            squash(&resolved.plans[0]),
            "private List<int> MapToListOfInt32(IEnumerable<long> source) { var target = new List<int>(); \
             if (Enumerable.TryGetNonEnumeratedCount(source, out var sourceCount)) { target.EnsureCapacity(sourceCount); } \
             foreach (var item in source) { target.Add((int)item); } return target; }"
        );
    }

    #[test]
    fn existing_collections_are_appended_to() {
        let mut store = TypeStore::default();
        let resolved = resolve_existing(&mut store, &MapperOptions::default(), "IEnumerable<int>", "List<int>");
        assert_eq!(
            squash(&resolved.plans[0]),
            "private void MapToListOfInt32(IEnumerable<int> source, List<int> target) { \
             if (Enumerable.TryGetNonEnumeratedCount(source, out var sourceCount)) { target.EnsureCapacity(sourceCount + target.Count); } \
             foreach (var item in source) { target.Add(item); } }"
        );
    }

    #[test]
    fn read_only_interfaces_cannot_be_mapped_into() {
        let mut store = TypeStore::default();
        for target in ["IReadOnlyList<int>", "IReadOnlyCollection<int>", "IReadOnlySet<int>"] {
            let resolved = resolve_existing(&mut store, &MapperOptions::default(), "List<long>", target);
            let err = resolved.conversion.expect_err(target);
            assert_eq!(err.kind, DiagnosticKind::CannotMapToReadOnlyType, "{target}");
            assert!(resolved.plans.is_empty(), "{target}");
        }
    }

    #[test]
    fn mutable_interfaces_are_appended_to_without_reserving() {
        let mut store = TypeStore::default();
        let cases = [
            ("ICollection<int>", "MapToICollectionOfInt32"),
            ("IList<int>", "MapToIListOfInt32"),
        ];
        for (target, method) in cases {
            let resolved = resolve_existing(&mut store, &MapperOptions::default(), "List<long>", target);
            assert_eq!(
                squash(&resolved.plans[0]),
                format!(
                    "private void {method}(List<long> source, {target} target) {{ \
                     foreach (var item in source) {{ target.Add((int)item); }} }}"
                ),
                "{target}"
            );
        }
    }

    #[test]
    fn disabled_enumerables_cannot_be_mapped() {
        let mut store = TypeStore::default();
        let options = MapperOptions {
            enabled_conversions: MapperOptions::default()
                .enabled_conversions
                .into_iter()
                .filter(|c| *c != nova_mapper_config::ConversionType::Enumerable)
                .collect(),
            ..MapperOptions::default()
        };
        let resolved = resolve(&mut store, &options, "List<long>", "List<int>");
        assert!(resolved.conversion.is_err());
    }
}
