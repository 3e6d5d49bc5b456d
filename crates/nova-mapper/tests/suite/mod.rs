use nova_mapper::render::plan_to_string;
use nova_mapper::{resolve_mapper, MapperDecl, ResolvedMapper};
use nova_mapper_config::MapperOptionsLayer;
use nova_mapper_types::TypeStore;

mod conversions;
mod declared;
mod graphs;
mod parallel;

pub(crate) fn resolve(store: &TypeStore, mapper: &MapperDecl) -> ResolvedMapper {
    resolve_mapper(store, &MapperOptionsLayer::default(), mapper).expect("mapper resolves")
}

/// Rendered method `name` with all whitespace runs collapsed to one space.
pub(crate) fn method(resolved: &ResolvedMapper, name: &str) -> String {
    let plan = resolved
        .plan(name)
        .unwrap_or_else(|| panic!("no plan named {name}"));
    squash(&plan_to_string(plan))
}

pub(crate) fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn codes(resolved: &ResolvedMapper) -> Vec<&'static str> {
    resolved
        .diagnostics
        .iter()
        .map(|d| d.diagnostic.code)
        .collect()
}
