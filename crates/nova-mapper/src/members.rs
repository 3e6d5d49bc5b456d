//! Which members take part in a mapping.

use nova_mapper_config::MapperOptions;
use nova_mapper_types::helpers;
use nova_mapper_types::{MemberDef, TypeEnv, TypeId};

/// Members a value can be read from. Static members, indexers and write-only members never
/// take part.
pub fn readable<'a>(
    env: &'a dyn TypeEnv,
    id: TypeId,
    options: &MapperOptions,
) -> Vec<&'a MemberDef> {
    helpers::members(env, id)
        .into_iter()
        .filter(|m| is_readable(m, options))
        .collect()
}

pub fn is_readable(member: &MemberDef, options: &MapperOptions) -> bool {
    !member.is_static
        && !member.is_indexer
        && member
            .getter
            .is_some_and(|access| options.includes_member(access))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Writability {
    Settable,
    InitOnly,
    /// No setter; the member can only be mapped into.
    ReadOnly,
}

#[derive(Clone, Copy, Debug)]
pub struct TargetMember<'a> {
    pub def: &'a MemberDef,
    pub access: Writability,
}

/// Members of `id` a mapping can write to, or at least map into.
///
/// Members whose setter is excluded by the visibility options are left out entirely.
pub fn targets<'a>(
    env: &'a dyn TypeEnv,
    id: TypeId,
    options: &MapperOptions,
) -> Vec<TargetMember<'a>> {
    helpers::members(env, id)
        .into_iter()
        .filter(|m| !m.is_static && !m.is_indexer)
        .filter_map(|def| {
            let access = match def.setter {
                Some(setter) if options.includes_member(setter.accessibility) => {
                    if setter.init_only {
                        Writability::InitOnly
                    } else {
                        Writability::Settable
                    }
                }
                Some(_) => return None,
                None if is_readable(def, options) => Writability::ReadOnly,
                None => return None,
            };
            Some(TargetMember { def, access })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_mapper_types::{Accessibility, MemberDef, TypeDef, TypeStore};

    #[test]
    fn visibility_filters_members() {
        let mut store = TypeStore::default();
        let int = store.parse("int").expect("int");
        let mut hidden = MemberDef::property("Hidden", int);
        hidden.getter = Some(Accessibility::Private);
        let mut stat = MemberDef::property("Static", int);
        stat.is_static = true;
        let id = store.upsert_type(
            TypeDef::class("Car")
                .with_property("Seats", int)
                .with_member(MemberDef::read_only("Wheels", int))
                .with_member(MemberDef::property("Secret", int).with_setter(Accessibility::Private))
                .with_member(MemberDef::property("Code", int).init_only())
                .with_member(MemberDef::property("Sink", int).write_only())
                .with_member(hidden)
                .with_member(stat),
        );

        let options = MapperOptions::default();
        let readable: Vec<_> = readable(&store, id, &options)
            .into_iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(readable, vec!["Seats", "Wheels", "Secret", "Code"]);

        let targets: Vec<_> = targets(&store, id, &options)
            .into_iter()
            .map(|t| (t.def.name.as_str(), t.access))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("Seats", Writability::Settable),
                ("Wheels", Writability::ReadOnly),
                ("Code", Writability::InitOnly),
                ("Sink", Writability::Settable),
                ("Hidden", Writability::Settable),
            ]
        );
    }
}
