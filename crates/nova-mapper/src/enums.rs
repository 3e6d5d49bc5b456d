//! Enum mapping strategies: raw casts, switches over members, enum/string switches and
//! cascades over several enum sources.

use std::collections::HashSet;

use nova_mapper_config::{
    ConversionType, EnumMappingConfig, EnumMappingStrategy, EnumNamingStrategy, EnumValue,
};
use nova_mapper_types::helpers;
use nova_mapper_types::{EnumDef, EnumMemberDef, PrimitiveType, TypeId, TypeRef};

use crate::builders::{Family, Selection};
use crate::classify::ShapeCategory;
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::model::MethodParam;
use crate::naming::enum_member_name;
use crate::plan::{Conversion, Expr, Pattern, Stmt, SwitchArm};

/// One `source member => target member` pairing of a resolved enum mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMappingEntry {
    pub source: String,
    pub target: String,
    /// Comes from an explicit value override.
    pub explicit: bool,
}

pub(crate) fn select(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    let enabled = |conversion| ctx.options.is_enabled(conversion);
    match (source, target) {
        (ShapeCategory::Enum, ShapeCategory::Enum) if enabled(ConversionType::EnumToEnum) => {
            match ctx.options.enum_mapping_strategy {
                EnumMappingStrategy::ByValue => {
                    Selection::Inline(Conversion::Inline(Expr::cast(
                        ctx.type_name(pair.target.id),
                        Expr::Source,
                    )))
                }
                _ => Selection::Method(Family::Enum),
            }
        }
        (ShapeCategory::Enum, ShapeCategory::Primitive(PrimitiveType::String))
            if enabled(ConversionType::EnumToString) =>
        {
            Selection::Method(Family::Enum)
        }
        (ShapeCategory::Primitive(PrimitiveType::String), ShapeCategory::Enum)
            if enabled(ConversionType::StringToEnum) =>
        {
            Selection::Method(Family::Enum)
        }
        (ShapeCategory::Enum, ShapeCategory::Primitive(p))
        | (ShapeCategory::Primitive(p), ShapeCategory::Enum)
            if p.is_integral() && enabled(ConversionType::EnumUnderlyingType) =>
        {
            Selection::Inline(Conversion::Inline(Expr::cast(
                ctx.type_name(pair.target.id),
                Expr::Source,
            )))
        }
        _ => Selection::Decline,
    }
}

/// Whether a declared method for `pair` maps one enum to another. Such methods always get a
/// body from [`build`], which consults the method's value overrides, fallback and ignore
/// lists before settling on a raw cast.
pub(crate) fn is_declared_enum_pair(ctx: &Ctx<'_>, pair: &Pair) -> bool {
    !pair.existing
        && ctx.options.is_enabled(ConversionType::EnumToEnum)
        && ctx.classify(pair.source.id) == ShapeCategory::Enum
        && ctx.classify(pair.target.id) == ShapeCategory::Enum
}

/// Body of an enum mapping method.
pub(crate) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    let config = body.config.map(|c| &c.enum_mapping);
    let source = body.source_expr();
    let value = match (
        helpers::enum_def(ctx.env, pair.source.id),
        helpers::enum_def(ctx.env, pair.target.id),
    ) {
        (Some(source_def), Some(target_def)) => {
            enum_to_enum(ctx, pair, source, source_def, target_def, config)
        }
        (Some(source_def), None) => enum_to_string(ctx, pair, source, source_def, config),
        (None, Some(target_def)) => string_to_enum(ctx, pair, source, target_def, config),
        (None, None) => return Err(ctx.could_not_map(pair)),
    };
    Ok(vec![Stmt::ret(value)])
}

/// Member references in overrides are `Type.Member`; only the last segment of a possibly
/// qualified type name is compared.
fn same_type_name(reference: &str, actual: &str) -> bool {
    let last = |s: &str| s.rsplit('.').next().unwrap_or(s).to_string();
    last(reference) == last(actual)
}

/// Resolve an override operand to a member of the enum `id`.
fn enum_operand<'d>(
    ctx: &Ctx<'_>,
    id: TypeId,
    def: &'d EnumDef,
    operand: &EnumValue,
) -> Option<&'d EnumMemberDef> {
    match operand {
        EnumValue::Member(_) => {
            let (ty, member) = operand.member_parts()?;
            same_type_name(ty, &ctx.type_name(id))
                .then(|| def.member(member))
                .flatten()
        }
        EnumValue::Number(value) => def.members.iter().find(|m| m.value == *value),
        EnumValue::String(_) => None,
    }
}

fn member_expr(ctx: &Ctx<'_>, id: TypeId, member: &str) -> Expr {
    Expr::ident(ctx.type_name(id)).member(member)
}

fn out_of_range(ctx: &Ctx<'_>, source: &Expr, source_ty: TypeRef) -> Expr {
    Expr::throw_new(
        "ArgumentOutOfRangeException",
        vec![
            Expr::name_of(source.clone()),
            source.clone(),
            Expr::string(&format!(
                "The value of enum {} is not supported",
                ctx.type_name(source_ty.id)
            )),
        ],
    )
}

/// Target member used as the fallback, if one is configured and valid.
fn enum_fallback(
    ctx: &Ctx<'_>,
    target: TypeId,
    def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Option<String> {
    let fallback = config?.fallback.as_ref()?;
    match enum_operand(ctx, target, def, fallback) {
        Some(member) => Some(member.name.clone()),
        None => {
            ctx.report(
                DiagnosticKind::TargetEnumValueDoesNotMatchTargetEnumType,
                format!(
                    "Enum fallback value {fallback:?} is not a member of {}",
                    ctx.type_name(target)
                ),
            );
            None
        }
    }
}

fn check_ignored_values(
    ctx: &Ctx<'_>,
    config: Option<&EnumMappingConfig>,
    source: Option<(TypeId, &EnumDef)>,
    target: Option<(TypeId, &EnumDef)>,
) {
    let Some(config) = config else {
        return;
    };
    if let Some((id, def)) = source {
        for name in config.ignore_source_values.iter().filter(|n| def.member(n).is_none()) {
            ctx.report(
                DiagnosticKind::IgnoredSourceMemberNotFound,
                format!(
                    "Ignored source enum value {name} does not exist on {}",
                    ctx.type_name(id)
                ),
            );
        }
    }
    if let Some((id, def)) = target {
        for name in config.ignore_target_values.iter().filter(|n| def.member(n).is_none()) {
            ctx.report(
                DiagnosticKind::IgnoredTargetMemberNotFound,
                format!(
                    "Ignored target enum value {name} does not exist on {}",
                    ctx.type_name(id)
                ),
            );
        }
    }
}

fn is_ignored(names: Option<&Vec<String>>, name: &str) -> bool {
    names.is_some_and(|names| names.iter().any(|n| n == name))
}

/// Explicit overrides between two enums, with invalid and duplicated entries reported and
/// dropped.
fn enum_overrides(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source_def: &EnumDef,
    target_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Vec<EnumMappingEntry> {
    let mut out: Vec<EnumMappingEntry> = Vec::new();
    for entry in config.map(|c| c.values.as_slice()).unwrap_or_default() {
        let Some(source) = enum_operand(ctx, pair.source.id, source_def, &entry.source) else {
            ctx.report(
                DiagnosticKind::SourceEnumValueDoesNotMatchSourceEnumType,
                format!(
                    "Enum value override source {:?} is not a member of {}",
                    entry.source,
                    ctx.type_name(pair.source.id)
                ),
            );
            continue;
        };
        let Some(target) = enum_operand(ctx, pair.target.id, target_def, &entry.target) else {
            ctx.report(
                DiagnosticKind::TargetEnumValueDoesNotMatchTargetEnumType,
                format!(
                    "Enum value override target {:?} is not a member of {}",
                    entry.target,
                    ctx.type_name(pair.target.id)
                ),
            );
            continue;
        };
        if out.iter().any(|e| e.source == source.name) {
            ctx.report(
                DiagnosticKind::EnumSourceValueDuplicated,
                format!(
                    "Enum source value {}.{} is mapped more than once",
                    ctx.type_name(pair.source.id),
                    source.name
                ),
            );
            continue;
        }
        out.push(EnumMappingEntry {
            source: source.name.clone(),
            target: target.name.clone(),
            explicit: true,
        });
    }
    out
}

/// The target member `member` pairs with under the active strategy.
fn implicit_target<'d>(
    ctx: &Ctx<'_>,
    member: &EnumMemberDef,
    target_def: &'d EnumDef,
) -> Option<&'d EnumMemberDef> {
    match ctx.options.enum_mapping_strategy {
        EnumMappingStrategy::ByName if ctx.options.enum_mapping_ignore_case => target_def
            .members
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(&member.name)),
        EnumMappingStrategy::ByName => target_def.member(&member.name),
        EnumMappingStrategy::ByValue | EnumMappingStrategy::ByValueCheckDefined => {
            target_def.members.iter().find(|t| t.value == member.value)
        }
    }
}

/// Pair the members of one source enum. Target members in `shadowed` are produced by an
/// earlier source of a cascade; source members pairing with them, explicitly or not, get no
/// arm.
///
/// Returns the entries plus the source members that found no target at all.
fn pair_members(
    ctx: &Ctx<'_>,
    source_def: &EnumDef,
    target_def: &EnumDef,
    overrides: &[EnumMappingEntry],
    config: Option<&EnumMappingConfig>,
    shadowed: &HashSet<String>,
) -> (Vec<EnumMappingEntry>, Vec<String>) {
    let ignored_sources = config.map(|c| &c.ignore_source_values);
    let ignored_targets = config.map(|c| &c.ignore_target_values);
    let mut entries = Vec::new();
    let mut unmatched = Vec::new();
    for member in &source_def.members {
        if is_ignored(ignored_sources, &member.name) {
            continue;
        }
        let entry = overrides
            .iter()
            .find(|e| e.source == member.name)
            .cloned()
            .or_else(|| {
                implicit_target(ctx, member, target_def)
                    .filter(|t| !is_ignored(ignored_targets, &t.name))
                    .map(|t| EnumMappingEntry {
                        source: member.name.clone(),
                        target: t.name.clone(),
                        explicit: false,
                    })
            });
        match entry {
            Some(entry) if shadowed.contains(&entry.target) => {}
            Some(entry) => entries.push(entry),
            None => unmatched.push(member.name.clone()),
        }
    }
    (entries, unmatched)
}

fn report_unmapped_targets(
    ctx: &Ctx<'_>,
    target: TypeId,
    target_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
    claimed: &HashSet<String>,
) {
    let ignored = config.map(|c| &c.ignore_target_values);
    for member in &target_def.members {
        if !claimed.contains(&member.name) && !is_ignored(ignored, &member.name) {
            ctx.report(
                DiagnosticKind::TargetEnumValueNotMapped,
                format!(
                    "Enum member {}.{} has no source value",
                    ctx.type_name(target),
                    member.name
                ),
            );
        }
    }
}

fn enum_to_enum(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: Expr,
    source_def: &EnumDef,
    target_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Expr {
    check_ignored_values(
        ctx,
        config,
        Some((pair.source.id, source_def)),
        Some((pair.target.id, target_def)),
    );
    let overrides = enum_overrides(ctx, pair, source_def, target_def, config);
    let fallback = enum_fallback(ctx, pair.target.id, target_def, config);
    let has_ignores = config.is_some_and(|c| {
        !c.ignore_source_values.is_empty() || !c.ignore_target_values.is_empty()
    });

    if ctx.options.enum_mapping_strategy == EnumMappingStrategy::ByValue
        && overrides.is_empty()
        && fallback.is_none()
        && !has_ignores
    {
        for member in source_def
            .members
            .iter()
            .filter(|m| !target_def.is_defined(m.value))
        {
            ctx.report(
                DiagnosticKind::SourceEnumValueNotMapped,
                format!(
                    "Enum member {}.{} ({}) has no target value",
                    ctx.type_name(pair.source.id),
                    member.name,
                    member.value
                ),
            );
        }
        return Expr::cast(ctx.type_name(pair.target.id), source);
    }

    let (entries, unmatched) =
        pair_members(ctx, source_def, target_def, &overrides, config, &HashSet::new());
    if fallback.is_none() {
        for name in unmatched {
            ctx.report(
                DiagnosticKind::SourceEnumValueNotMapped,
                format!(
                    "Enum member {}.{name} has no target value",
                    ctx.type_name(pair.source.id)
                ),
            );
        }
    }
    let mut produced: HashSet<String> = entries.iter().map(|e| e.target.clone()).collect();
    produced.extend(fallback.clone());
    report_unmapped_targets(ctx, pair.target.id, target_def, config, &produced);

    let default = match fallback {
        Some(name) => member_expr(ctx, pair.target.id, &name),
        None => out_of_range(ctx, &source, pair.source),
    };
    enum_switch(ctx, pair.source.id, pair.target.id, source, &entries, default)
}

fn enum_switch(
    ctx: &Ctx<'_>,
    source_ty: TypeId,
    target_ty: TypeId,
    subject: Expr,
    entries: &[EnumMappingEntry],
    default: Expr,
) -> Expr {
    let mut arms: Vec<SwitchArm> = entries
        .iter()
        .map(|entry| SwitchArm {
            pattern: Pattern::Value(member_expr(ctx, source_ty, &entry.source)),
            value: member_expr(ctx, target_ty, &entry.target),
        })
        .collect();
    arms.push(SwitchArm {
        pattern: Pattern::Discard,
        value: default,
    });
    Expr::Switch {
        subject: Box::new(subject),
        arms,
    }
}

fn enum_to_string(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: Expr,
    source_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Expr {
    check_ignored_values(ctx, config, Some((pair.source.id, source_def)), None);
    let strategy = ctx.options.enum_naming_strategy;
    let ignored = config.map(|c| &c.ignore_source_values);

    let mut overrides: Vec<(String, String)> = Vec::new();
    for entry in config.map(|c| c.values.as_slice()).unwrap_or_default() {
        let Some(member) = enum_operand(ctx, pair.source.id, source_def, &entry.source) else {
            ctx.report(
                DiagnosticKind::SourceEnumValueDoesNotMatchSourceEnumType,
                format!(
                    "Enum value override source {:?} is not a member of {}",
                    entry.source,
                    ctx.type_name(pair.source.id)
                ),
            );
            continue;
        };
        let EnumValue::String(text) = &entry.target else {
            ctx.report(
                DiagnosticKind::TargetEnumValueDoesNotMatchTargetEnumType,
                format!("Enum value override target {:?} is not a string", entry.target),
            );
            continue;
        };
        if overrides.iter().any(|(name, _)| *name == member.name) {
            ctx.report(
                DiagnosticKind::EnumSourceValueDuplicated,
                format!(
                    "Enum source value {}.{} is mapped more than once",
                    ctx.type_name(pair.source.id),
                    member.name
                ),
            );
            continue;
        }
        overrides.push((member.name.clone(), text.clone()));
    }

    let mut arms = Vec::new();
    for member in &source_def.members {
        if is_ignored(ignored, &member.name) {
            continue;
        }
        let pattern = Pattern::Value(member_expr(ctx, pair.source.id, &member.name));
        let value = match overrides.iter().find(|(name, _)| *name == member.name) {
            Some((_, text)) => Expr::string(text),
            None if strategy == EnumNamingStrategy::MemberName => {
                Expr::name_of(member_expr(ctx, pair.source.id, &member.name))
            }
            None => Expr::string(&enum_member_name(strategy, member)),
        };
        arms.push(SwitchArm { pattern, value });
    }
    let default = match config.and_then(|c| c.fallback.as_ref()) {
        Some(EnumValue::String(text)) => Expr::string(text),
        Some(other) => {
            ctx.report(
                DiagnosticKind::TargetEnumValueDoesNotMatchTargetEnumType,
                format!("Enum fallback value {other:?} is not a string"),
            );
            source.clone().call("ToString", Vec::new())
        }
        None => source.clone().call("ToString", Vec::new()),
    };
    arms.push(SwitchArm {
        pattern: Pattern::Discard,
        value: default,
    });
    Expr::Switch {
        subject: Box::new(source),
        arms,
    }
}

fn string_to_enum(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: Expr,
    target_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Expr {
    check_ignored_values(ctx, config, None, Some((pair.target.id, target_def)));
    let strategy = ctx.options.enum_naming_strategy;
    let ignore_case = ctx.options.enum_mapping_ignore_case;
    let ignored = config.map(|c| &c.ignore_target_values);

    let mut cases: Vec<(String, String)> = Vec::new();
    let mut push_case = |text: String, member: String| {
        let duplicate = cases.iter().any(|(existing, _)| {
            if ignore_case {
                existing.eq_ignore_ascii_case(&text)
            } else {
                *existing == text
            }
        });
        if duplicate {
            ctx.report(
                DiagnosticKind::EnumStringSourceValueDuplicated,
                format!("String value \"{text}\" maps to more than one enum member"),
            );
        } else {
            cases.push((text, member));
        }
    };

    for entry in config.map(|c| c.values.as_slice()).unwrap_or_default() {
        let EnumValue::String(text) = &entry.source else {
            ctx.report(
                DiagnosticKind::SourceEnumValueDoesNotMatchSourceEnumType,
                format!("Enum value override source {:?} is not a string", entry.source),
            );
            continue;
        };
        let Some(member) = enum_operand(ctx, pair.target.id, target_def, &entry.target) else {
            ctx.report(
                DiagnosticKind::TargetEnumValueDoesNotMatchTargetEnumType,
                format!(
                    "Enum value override target {:?} is not a member of {}",
                    entry.target,
                    ctx.type_name(pair.target.id)
                ),
            );
            continue;
        };
        push_case(text.clone(), member.name.clone());
    }
    for member in &target_def.members {
        if !is_ignored(ignored, &member.name) {
            push_case(enum_member_name(strategy, member), member.name.clone());
        }
    }

    let mut arms: Vec<SwitchArm> = cases
        .into_iter()
        .map(|(text, member)| {
            let pattern = if ignore_case {
                Pattern::Guarded {
                    binding: "s".to_string(),
                    guard: Expr::ident("s").call(
                        "Equals",
                        vec![
                            Expr::string(&text),
                            Expr::ident("StringComparison").member("OrdinalIgnoreCase"),
                        ],
                    ),
                }
            } else {
                Pattern::Value(Expr::string(&text))
            };
            SwitchArm {
                pattern,
                value: member_expr(ctx, pair.target.id, &member),
            }
        })
        .collect();

    let target_name = ctx.type_name(pair.target.id);
    let default = match enum_fallback(ctx, pair.target.id, target_def, config) {
        Some(name) => member_expr(ctx, pair.target.id, &name),
        None if strategy == EnumNamingStrategy::MemberName => Expr::static_call(
            "Enum",
            &format!("Parse<{target_name}>"),
            vec![source.clone(), Expr::literal(ignore_case.to_string())],
        ),
        None => out_of_range(ctx, &source, pair.source),
    };
    arms.push(SwitchArm {
        pattern: Pattern::Discard,
        value: default,
    });
    Expr::Switch {
        subject: Box::new(source),
        arms,
    }
}

/// Cascading switch over several enum sources: each source's default arm switches over the
/// next source, the last one ends in the fallback or a throw. A target member is produced by
/// the first source that can supply it.
pub(crate) fn build_cascade(
    ctx: &Ctx<'_>,
    sources: &[&MethodParam],
    target: TypeRef,
    config: Option<&EnumMappingConfig>,
) -> Result<Vec<Stmt>, Unmapped> {
    let target_def = helpers::enum_def(ctx.env, target.id).ok_or_else(|| {
        Unmapped::new(
            DiagnosticKind::CouldNotCreateMapping,
            format!("{} is not an enum", ctx.type_name(target.id)),
        )
    })?;
    check_ignored_values(ctx, config, None, Some((target.id, target_def)));
    let fallback = enum_fallback(ctx, target.id, target_def, config);

    let mut claimed = HashSet::new();
    let mut levels = Vec::new();
    for param in sources {
        let Some(source_def) = helpers::enum_def(ctx.env, param.ty.id) else {
            continue;
        };
        let pair = Pair::new(param.ty, target);
        let overrides: Vec<EnumMappingEntry> =
            enum_overrides_silent(ctx, &pair, source_def, target_def, config);
        let (entries, unmatched) =
            pair_members(ctx, source_def, target_def, &overrides, config, &claimed);
        claimed.extend(entries.iter().map(|e| e.target.clone()));
        for name in unmatched {
            ctx.report(
                DiagnosticKind::SourceEnumValueNotMapped,
                format!(
                    "Enum member {}.{name} has no target value",
                    ctx.type_name(param.ty.id)
                ),
            );
        }
        levels.push((param, entries));
    }
    claimed.extend(fallback.clone());
    report_unmapped_targets(ctx, target.id, target_def, config, &claimed);

    let last = levels
        .last()
        .map(|(param, _)| Expr::ident(param.name.clone()))
        .unwrap_or_else(|| Expr::ident("source"));
    let mut value = match fallback {
        Some(name) => member_expr(ctx, target.id, &name),
        None => Expr::throw_new(
            "ArgumentOutOfRangeException",
            vec![
                Expr::name_of(last),
                Expr::string(&format!(
                    "None of the source values maps to a member of {}",
                    ctx.type_name(target.id)
                )),
            ],
        ),
    };
    for (param, entries) in levels.into_iter().rev() {
        value = enum_switch(
            ctx,
            param.ty.id,
            target.id,
            Expr::ident(param.name.clone()),
            &entries,
            value,
        );
    }
    Ok(vec![Stmt::ret(value)])
}

/// Overrides that apply to one source of a cascade; operands of other source enums are
/// skipped without a diagnostic.
fn enum_overrides_silent(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source_def: &EnumDef,
    target_def: &EnumDef,
    config: Option<&EnumMappingConfig>,
) -> Vec<EnumMappingEntry> {
    config
        .map(|c| c.values.as_slice())
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| {
            let source = enum_operand(ctx, pair.source.id, source_def, &entry.source)?;
            let target = enum_operand(ctx, pair.target.id, target_def, &entry.target)?;
            Some(EnumMappingEntry {
                source: source.name.clone(),
                target: target.name.clone(),
                explicit: true,
            })
        })
        .collect()
}
