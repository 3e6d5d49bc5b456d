//! Finding the source value of a target member.
//!
//! Candidates are tried in a fixed order: a source member with exactly the target's name, a
//! source member matching under the naming strategy, an additional method parameter named like
//! the target, and finally a flattened path (`ValueId` reads `Value.Id`).

use nova_mapper_config::PropertyNameMappingStrategy;
use nova_mapper_types::helpers;
use nova_mapper_types::{TypeId, TypeRef};

use crate::context::Ctx;
use crate::members;
use crate::naming::{self, NameMatch};
use crate::nullability::SourceValue;
use crate::path::{self, MemberHop, MemberPath};
use crate::plan::Expr;

/// A named value a mapping reads from: the source parameter or an additional parameter.
#[derive(Clone, Debug)]
pub(crate) struct SourceRoot {
    pub name: String,
    pub ty: TypeRef,
}

impl SourceRoot {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A resolved source value: a root plus the member path read from it.
#[derive(Clone, Debug)]
pub(crate) struct SourcePath {
    pub path: MemberPath,
    pub root: TypeRef,
}

impl SourcePath {
    pub fn new(root: &SourceRoot, hops: Vec<MemberHop>) -> Self {
        Self {
            path: MemberPath::new(root.name.clone(), hops),
            root: root.ty,
        }
    }

    /// Type of the value, ignoring nullable intermediate hops.
    pub fn ty(&self) -> TypeRef {
        self.path.member_type().unwrap_or(self.root)
    }

    /// Null checks that must pass before the value itself can be read.
    pub fn guards(&self) -> Vec<Expr> {
        let mut guards = Vec::new();
        if self.root.nullable && !self.path.is_empty() {
            guards.push(Expr::ident(self.path.root.clone()).not_null());
        }
        guards.extend(
            self.path
                .nullable_prefixes()
                .iter()
                .map(|prefix| prefix.to_expr().not_null()),
        );
        guards
    }

    /// The value read after [`SourcePath::guards`] passed.
    pub fn guarded_value(&self, ctx: &Ctx<'_>) -> SourceValue {
        let ty = self.ty();
        SourceValue::new(
            self.path.to_expr(),
            ty.nullable,
            helpers::is_value_type(ctx.env, ty.id),
        )
    }

    /// The value read where no statement can guard it: null intermediates make it `null`.
    pub fn value(&self, ctx: &Ctx<'_>) -> SourceValue {
        if self.guards().is_empty() {
            return self.guarded_value(ctx);
        }
        let ty = self.ty();
        SourceValue::new(
            self.path.conditional_access(self.root.nullable),
            true,
            helpers::is_value_type(ctx.env, ty.id),
        )
    }

    /// First member read from the root, if any.
    pub fn first_member(&self) -> Option<&str> {
        self.path.first()
    }

    /// `Value.Id`, or the root name for a bare parameter.
    pub fn display_name(&self) -> String {
        if self.path.is_empty() {
            self.path.root.clone()
        } else {
            self.path.to_string()
        }
    }
}

/// Find the value for target member `target` among `roots`; `roots[0]` is the mapped source.
pub(crate) fn find_source(
    ctx: &Ctx<'_>,
    roots: &[SourceRoot],
    target: &str,
    strategy: PropertyNameMappingStrategy,
) -> Option<SourcePath> {
    let (source, extra) = roots.split_first()?;

    let mut best: Option<(NameMatch, &nova_mapper_types::MemberDef)> = None;
    for member in members::readable(ctx.env, source.ty.id, ctx.options) {
        match naming::match_names(strategy, &member.name, target) {
            Some(NameMatch::Exact) => {
                best = Some((NameMatch::Exact, member));
                break;
            }
            Some(NameMatch::Transformed) if best.is_none() => {
                best = Some((NameMatch::Transformed, member));
            }
            _ => {}
        }
    }
    if let Some((_, member)) = best {
        return Some(SourcePath::new(source, vec![MemberHop::new(ctx.env, member)]));
    }
    if let Some(param) = extra.iter().find(|p| p.name.eq_ignore_ascii_case(target)) {
        return Some(SourcePath::new(param, Vec::new()));
    }

    let key = naming::flatten_key(strategy, target);
    let mut visited = Vec::new();
    let hops = flatten(ctx, source.ty.id, &key, strategy, &mut visited)?;
    (hops.len() > 1).then(|| SourcePath::new(source, hops))
}

/// Split `key` into member names along a path starting at `ty`, depth first. Each type is
/// entered at most once per path.
fn flatten(
    ctx: &Ctx<'_>,
    ty: TypeId,
    key: &str,
    strategy: PropertyNameMappingStrategy,
    visited: &mut Vec<TypeId>,
) -> Option<Vec<MemberHop>> {
    if visited.contains(&ty) {
        return None;
    }
    visited.push(ty);
    for member in members::readable(ctx.env, ty, ctx.options) {
        let member_key = naming::flatten_key(strategy, &member.name);
        if member_key == key {
            visited.pop();
            return Some(vec![MemberHop::new(ctx.env, member)]);
        }
        let Some(rest) = key.strip_prefix(member_key.as_str()) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        if let Some(tail) = flatten(ctx, member.ty.id, rest, strategy, visited) {
            visited.pop();
            let mut hops = vec![MemberHop::new(ctx.env, member)];
            hops.extend(tail);
            return Some(hops);
        }
    }
    visited.pop();
    None
}

/// Resolve a configured dotted source path. A first segment naming an additional parameter
/// starts the path at that parameter.
///
/// On failure returns the unresolved segment.
pub(crate) fn resolve_configured(
    ctx: &Ctx<'_>,
    roots: &[SourceRoot],
    path: &str,
) -> Result<SourcePath, String> {
    let segments = path::segments(path).ok_or_else(|| path.to_string())?;
    let (root, rest) = match roots.iter().skip(1).find(|r| r.name == segments[0]) {
        Some(param) => (param, &segments[1..]),
        None => match roots.first() {
            Some(source) => (source, &segments[..]),
            None => return Err(path.to_string()),
        },
    };
    let hops = path::resolve_hops(ctx.env, root.ty.id, rest, |m| {
        members::is_readable(m, ctx.options)
    })
    .map_err(|idx| rest[idx].to_string())?;
    Ok(SourcePath::new(root, hops))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Resolver;
    use crate::model::MapperDecl;
    use crate::render::expr_to_string;
    use nova_mapper_config::{MapperOptions, PropertyNameMappingStrategy as S};
    use nova_mapper_types::{TypeDef, TypeEnv, TypeStore};

    fn store() -> (TypeStore, TypeRef) {
        let mut store = TypeStore::default();
        let string = store.parse("string").expect("string");
        let value = store.upsert_type(TypeDef::class("C").with_property("Id", string));
        let nullable = store.upsert_type(TypeDef::class("D").with_property("Name", string));
        let source = store.upsert_type(
            TypeDef::class("A")
                .with_property("Value", TypeRef::new(value))
                .with_property("Other", TypeRef::nullable(nullable))
                .with_property("first_name", string)
                .with_property("FirstName", string),
        );
        (store, TypeRef::new(source))
    }

    #[test]
    fn exact_names_win_over_strategy_matches() {
        let (store, source) = store();
        let mapper = MapperDecl::new("M");
        let resolver = Resolver::new(&store, &mapper);
        let options = MapperOptions::default();
        let ctx = resolver.ctx(&options, "Map");
        let roots = [SourceRoot::new("source", source)];

        let found = find_source(&ctx, &roots, "FirstName", S::SnakeCase).expect("match");
        assert_eq!(found.path.to_string(), "FirstName");
        let found = find_source(&ctx, &roots, "first_name", S::SnakeCase).expect("match");
        assert_eq!(found.path.to_string(), "first_name");
    }

    #[test]
    fn flattened_names_resolve_nested_paths() {
        let (store, source) = store();
        let mapper = MapperDecl::new("M");
        let resolver = Resolver::new(&store, &mapper);
        let options = MapperOptions::default();
        let ctx = resolver.ctx(&options, "Map");
        let roots = [SourceRoot::new("source", source)];

        let found = find_source(&ctx, &roots, "ValueId", S::CaseSensitive).expect("flattened");
        assert_eq!(expr_to_string(&found.path.to_expr()), "source.Value.Id");
        assert!(found.guards().is_empty());

        let found = find_source(&ctx, &roots, "OtherName", S::CaseSensitive).expect("flattened");
        assert_eq!(found.guards().len(), 1);
        assert_eq!(expr_to_string(&found.value(&ctx).expr), "source.Other?.Name");
        assert!(find_source(&ctx, &roots, "ValueName", S::CaseSensitive).is_none());
    }

    #[test]
    fn parameters_rank_between_strategy_matches_and_flattening() {
        let (store, source) = store();
        let mapper = MapperDecl::new("M");
        let resolver = Resolver::new(&store, &mapper);
        let options = MapperOptions::default();
        let ctx = resolver.ctx(&options, "Map");
        let int = TypeRef::new(store.well_known().int());
        let roots = [
            SourceRoot::new("source", source),
            SourceRoot::new("firstName", int),
            SourceRoot::new("value", int),
            SourceRoot::new("valueId", int),
        ];

        let found = find_source(&ctx, &roots, "firstName", S::SnakeCase).expect("member");
        assert_eq!(found.path.to_string(), "first_name");
        let found = find_source(&ctx, &roots, "Value", S::CaseSensitive).expect("member");
        assert_eq!(found.path.to_string(), "Value");
        let found = find_source(&ctx, &roots, "ValueId", S::CaseSensitive).expect("parameter");
        assert!(found.path.is_empty());
        assert_eq!(found.ty(), int);
        // Case-sensitive matching skips the member `Value` for `VALUE`.
        let found = find_source(&ctx, &roots, "VALUE", S::CaseSensitive).expect("parameter");
        assert!(found.path.is_empty());
        assert_eq!(found.ty(), int);
    }

    #[test]
    fn configured_paths_report_the_missing_segment() {
        let (store, source) = store();
        let mapper = MapperDecl::new("M");
        let resolver = Resolver::new(&store, &mapper);
        let options = MapperOptions::default();
        let ctx = resolver.ctx(&options, "Map");
        let int = TypeRef::new(store.well_known().int());
        let roots = [
            SourceRoot::new("source", source),
            SourceRoot::new("count", int),
        ];

        let found = resolve_configured(&ctx, &roots, "Value.Id").expect("resolves");
        assert_eq!(found.path.to_string(), "Value.Id");
        let found = resolve_configured(&ctx, &roots, "count").expect("parameter");
        assert!(found.path.is_empty());
        assert_eq!(found.ty(), int);
        assert_eq!(
            resolve_configured(&ctx, &roots, "Value.Missing").map(|p| p.path.to_string()),
            Err("Missing".to_string())
        );
    }
}
