//! Objects: construction, member matching, flattening and unflattening.
//!
//! A new instance is created by a user object factory when one exists for the target type,
//! otherwise by the accessible constructor with the most parameters that can all be supplied.
//! Init-only and required members go into the object initializer; every other member is
//! assigned afterwards. Assignments reading through nullable intermediate members are grouped
//! under one null check per distinct set of guards.

use std::collections::HashSet;

use nova_mapper_config::{ConstantValue, ConversionType, PropertyNameMappingStrategy};
use nova_mapper_types::helpers;
use nova_mapper_types::{ConstructorDef, MemberDef, PrimitiveType, TypeId, TypeRef};

use super::{Family, Selection};
use crate::classify::ShapeCategory;
use crate::context::{Body, Ctx, Pair, Unmapped};
use crate::diagnostics::DiagnosticKind;
use crate::matching::{self, SourcePath, SourceRoot};
use crate::members::{self, TargetMember, Writability};
use crate::model::UserMethodKind;
use crate::nullability::{self, NullPolicy};
use crate::path;
use crate::plan::{Conversion, Expr, Stmt};
use crate::REF_HANDLER;

const EXISTING_REFERENCE: &str = "existingTargetReference";

/// `new T(source)` when `T` has an accessible constructor taking the source.
pub(super) fn select_constructor(
    ctx: &Ctx<'_>,
    pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    if target != ShapeCategory::Object
        || source == ShapeCategory::Unknown
        || pair.source.id == pair.target.id
        || !ctx.options.is_enabled(ConversionType::Constructor)
    {
        return Selection::Decline;
    }
    let object = ctx.env.well_known().object();
    let accepts_source = helpers::constructors(ctx.env, pair.target.id)
        .iter()
        .any(|ctor| {
            ctx.options.includes_constructor(ctor.accessibility)
                && ctor.params.len() == 1
                && ctor.params[0].ty.id != object
                && assignable(ctx, pair.source, ctor.params[0].ty)
        });
    if !accepts_source {
        return Selection::Decline;
    }
    Selection::Inline(Conversion::Inline(Expr::new_object(
        ctx.type_name(pair.target.id),
        vec![Expr::Source],
    )))
}

pub(super) fn select(
    _ctx: &Ctx<'_>,
    _pair: &Pair,
    source: ShapeCategory,
    target: ShapeCategory,
) -> Selection {
    match (source, target) {
        (ShapeCategory::Object | ShapeCategory::Tuple, ShapeCategory::Object) => {
            Selection::Method(Family::Object)
        }
        _ => Selection::Decline,
    }
}

pub(super) fn build(ctx: &Ctx<'_>, pair: &Pair, body: &Body<'_>) -> Result<Vec<Stmt>, Unmapped> {
    ObjectBuilder::new(ctx, pair, body).build()
}

fn assignable(ctx: &Ctx<'_>, from: TypeRef, to: TypeRef) -> bool {
    from.id == to.id || helpers::is_assignable(ctx.env, from.id, to.id)
}

/// Where an assigned value comes from.
enum Value {
    /// Candidates in order; a later one is only read when all earlier ones are `null`.
    Sources(Vec<(SourcePath, Conversion)>),
    /// Mapped into the current instance of a read-only member.
    Into(SourcePath),
    Constant(Expr),
}

struct Assignment<'c> {
    /// Dotted target path as configured or matched.
    name: String,
    path: Vec<&'c MemberDef>,
    value: Value,
}

impl Assignment<'_> {
    fn root(&self) -> &str {
        self.path.first().map(|m| m.name.as_str()).unwrap_or_default()
    }
}

/// Statements after construction, grouped by the null checks guarding them.
#[derive(Default)]
struct Guarded {
    groups: Vec<(Vec<Expr>, Vec<Stmt>)>,
    /// `(group, target prefix)` pairs already initialized with `??=`.
    prepared: HashSet<(usize, String)>,
}

impl Guarded {
    fn index(&mut self, guards: Vec<Expr>) -> usize {
        match self.groups.iter().position(|(g, _)| *g == guards) {
            Some(idx) => idx,
            None => {
                self.groups.push((guards, Vec::new()));
                self.groups.len() - 1
            }
        }
    }

    fn push(&mut self, guards: Vec<Expr>, stmts: impl IntoIterator<Item = Stmt>) {
        let idx = self.index(guards);
        self.groups[idx].1.extend(stmts);
    }

    fn into_stmts(self) -> Vec<Stmt> {
        let mut out = Vec::new();
        for (guards, stmts) in self.groups {
            match guards.into_iter().reduce(|a, b| Expr::binary("&&", a, b)) {
                Some(cond) => out.push(Stmt::if_then(cond, stmts)),
                None => out.extend(stmts),
            }
        }
        out
    }
}

struct ObjectBuilder<'c> {
    ctx: &'c Ctx<'c>,
    pair: &'c Pair,
    body: &'c Body<'c>,
    roots: Vec<SourceRoot>,
    targets: Vec<TargetMember<'c>>,
    /// Root members of the mapping source that were read.
    used: HashSet<String>,
    /// Root members of the target that received a value or were dealt with otherwise.
    mapped: HashSet<String>,
}

impl<'c> ObjectBuilder<'c> {
    fn new(ctx: &'c Ctx<'c>, pair: &'c Pair, body: &'c Body<'c>) -> Self {
        let mut roots = vec![SourceRoot::new(body.source.clone(), pair.source)];
        roots.extend(body.extra.iter().map(|p| SourceRoot::new(p.name.clone(), p.ty)));
        Self {
            ctx,
            pair,
            body,
            roots,
            targets: members::targets(ctx.env, pair.target.id, ctx.options),
            used: HashSet::new(),
            mapped: HashSet::new(),
        }
    }

    fn build(mut self) -> Result<Vec<Stmt>, Unmapped> {
        let mut assignments = self.configured();
        self.values(&mut assignments);
        self.check_ignored();

        let new_instance = !self.pair.existing;
        let target = if new_instance {
            Expr::ident("target")
        } else {
            self.body.target_expr()
        };

        let mut stmts = Vec::new();
        let mut factory = None;
        let mut ctor_args = Vec::new();
        let mut consumed: Vec<String> = Vec::new();
        if new_instance {
            if self.body.ref_handler {
                stmts.push(Stmt::if_then(
                    self.ref_handler_call(
                        "TryGetReference",
                        vec![self.body.source_expr(), Expr::OutVar(EXISTING_REFERENCE.to_string())],
                    ),
                    vec![Stmt::ret(Expr::ident(EXISTING_REFERENCE))],
                ));
            }
            factory = self.factory();
            if factory.is_none() {
                let (args, params) = self.constructor(&assignments)?;
                ctor_args = args;
                consumed = params;
            }
        }
        let is_consumed =
            |name: &str| consumed.iter().any(|param| param.eq_ignore_ascii_case(name));
        for target in &self.targets {
            if is_consumed(&target.def.name) {
                self.mapped.insert(target.def.name.clone());
            }
        }

        self.match_members(&mut assignments, &is_consumed);

        let mut init = Vec::new();
        let mut after = Guarded::default();
        for assignment in &assignments {
            self.mapped.insert(assignment.root().to_string());
            if assignment.path.len() > 1 {
                self.place_nested(&mut after, &target, assignment);
                continue;
            }
            if is_consumed(assignment.root()) {
                continue;
            }
            let Some(member) = assignment.path.first().copied() else {
                continue;
            };
            let access = self.writability(member);
            let initializer = new_instance
                && factory.is_none()
                && (access == Writability::InitOnly
                    || (access == Writability::Settable && member.required));
            match (&assignment.value, access) {
                (Value::Into(source), _) => {
                    self.map_into(&mut after, source, member, target.clone().member(&member.name))
                }
                (value, Writability::Settable | Writability::InitOnly) if initializer => {
                    if let Some(expr) = self.expression(value, member.ty, &assignment.name) {
                        init.push((member.name.clone(), expr));
                    }
                }
                (value, Writability::Settable) => self.place(
                    &mut after,
                    Vec::new(),
                    value,
                    target.clone().member(&member.name),
                    member.ty,
                    &assignment.name,
                ),
                (_, Writability::InitOnly | Writability::ReadOnly) => self.ctx.report(
                    DiagnosticKind::CannotMapToReadOnlyMember,
                    format!(
                        "Cannot map to the member {} of {} because it cannot be set here",
                        member.name,
                        self.ctx.display(self.pair.target)
                    ),
                ),
            }
        }

        if new_instance {
            let create = match factory {
                Some(call) => call,
                None => Expr::New {
                    ty: self.ctx.display(self.pair.target.non_nullable()),
                    args: ctor_args,
                    init,
                },
            };
            stmts.push(Stmt::let_var("target", create));
            if self.body.ref_handler {
                stmts.push(Stmt::Expr(self.ref_handler_call(
                    "SetReference",
                    vec![self.body.source_expr(), target.clone()],
                )));
            }
        }
        stmts.extend(after.into_stmts());
        self.report_unmapped(new_instance, &is_consumed);
        if new_instance {
            stmts.push(Stmt::ret(target));
        }
        Ok(stmts)
    }

    fn ref_handler_call(&self, method: &str, args: Vec<Expr>) -> Expr {
        Expr::ident(REF_HANDLER).call(
            format!(
                "{method}<{}, {}>",
                self.ctx.display(self.pair.source),
                self.ctx.display(self.pair.target)
            ),
            args,
        )
    }

    fn writability(&self, member: &MemberDef) -> Writability {
        self.targets
            .iter()
            .find(|t| t.def.name == member.name)
            .map(|t| t.access)
            .unwrap_or(Writability::ReadOnly)
    }

    fn read(&mut self, source: &SourcePath) {
        if source.path.root == self.body.source {
            if let Some(first) = source.first_member() {
                self.used.insert(first.to_string());
            }
        }
    }

    /// Resolve a dotted target path against the target type.
    fn target_path(&self, target: &str) -> Option<Vec<&'c MemberDef>> {
        let options = self.ctx.options;
        let not_found = |segment: &str| {
            self.ctx.report(
                DiagnosticKind::ConfiguredMappingTargetMemberNotFound,
                format!(
                    "Specified member {segment} on mapping target type {} was not found",
                    self.ctx.display(self.pair.target)
                ),
            );
        };
        let Some(segments) = path::segments(target) else {
            not_found(target);
            return None;
        };
        let mut current = self.pair.target.id;
        let mut members = Vec::with_capacity(segments.len());
        for segment in segments {
            let member = helpers::members(self.ctx.env, current).into_iter().find(|m| {
                m.name == segment
                    && !m.is_static
                    && !m.is_indexer
                    && (members::is_readable(m, options)
                        || m.setter.is_some_and(|s| options.includes_member(s.accessibility)))
            });
            let Some(member) = member else {
                not_found(segment);
                return None;
            };
            current = member.ty.id;
            members.push(member);
        }
        Some(members)
    }

    /// Explicit `source -> target` configurations, grouped by target path.
    fn configured(&mut self) -> Vec<Assignment<'c>> {
        let mut out: Vec<Assignment<'c>> = Vec::new();
        let Some(config) = self.body.config else {
            return out;
        };
        for property in &config.properties {
            let existing = out.iter().position(|a| a.name == property.target);
            if existing.is_some() && !property.null_fallback {
                self.ctx.report(
                    DiagnosticKind::MultipleConfigurationsForTargetMember,
                    format!(
                        "Multiple mappings are configured for the target member {}; only the first one is used",
                        property.target
                    ),
                );
                continue;
            }
            let Some(path) = self.target_path(&property.target) else {
                continue;
            };
            let source = match matching::resolve_configured(self.ctx, &self.roots, &property.source) {
                Ok(source) => source,
                Err(segment) => {
                    self.ctx.report(
                        DiagnosticKind::ConfiguredMappingSourceMemberNotFound,
                        format!(
                            "Specified member {segment} on source type {} was not found",
                            self.ctx.display(self.pair.source)
                        ),
                    );
                    continue;
                }
            };
            self.read(&source);
            let Some(last) = path.last().copied() else {
                continue;
            };

            if path.len() == 1 && self.writability(last) == Writability::ReadOnly {
                if existing.is_none() {
                    out.push(Assignment {
                        name: property.target.clone(),
                        path,
                        value: Value::Into(source),
                    });
                }
                continue;
            }
            let Some(conversion) = self.convert(
                &source,
                last.ty,
                property.use_mapping.as_deref(),
                &property.target,
            ) else {
                self.mapped.insert(path[0].name.clone());
                continue;
            };
            match existing {
                Some(idx) => {
                    if let Value::Sources(chain) = &mut out[idx].value {
                        chain.push((source, conversion));
                    }
                }
                None => out.push(Assignment {
                    name: property.target.clone(),
                    path,
                    value: Value::Sources(vec![(source, conversion)]),
                }),
            }
        }
        out
    }

    /// Constant values and user method results assigned to target members.
    fn values(&mut self, assignments: &mut Vec<Assignment<'c>>) {
        let Some(config) = self.body.config else {
            return;
        };
        for entry in &config.values {
            if assignments.iter().any(|a| a.name == entry.target) {
                self.ctx.report(
                    DiagnosticKind::MultipleConfigurationsForTargetMember,
                    format!(
                        "Multiple mappings are configured for the target member {}; only the first one is used",
                        entry.target
                    ),
                );
                continue;
            }
            let Some(path) = self.target_path(&entry.target) else {
                continue;
            };
            let Some(last) = path.last().copied() else {
                continue;
            };
            match self.constant(&entry.value, last.ty) {
                Ok(expr) => assignments.push(Assignment {
                    name: entry.target.clone(),
                    path,
                    value: Value::Constant(expr),
                }),
                Err(unmapped) => {
                    self.mapped.insert(path[0].name.clone());
                    self.ctx.report_unmapped(unmapped);
                }
            }
        }
    }

    fn constant(&self, value: &ConstantValue, target: TypeRef) -> Result<Expr, Unmapped> {
        let ctx = self.ctx;
        let mismatch = || {
            Unmapped::new(
                DiagnosticKind::MapValueTypeMismatch,
                format!(
                    "Cannot assign {} to a member of type {}",
                    describe(value),
                    ctx.display(target)
                ),
            )
        };
        let primitive = helpers::primitive(ctx.env, target.id);
        match value {
            ConstantValue::Null if target.nullable => Ok(Expr::null()),
            ConstantValue::Null => Err(mismatch()),
            ConstantValue::Bool(value) if primitive == Some(PrimitiveType::Bool) => {
                Ok(Expr::literal(value.to_string()))
            }
            ConstantValue::Number(value) => number_literal(primitive, *value).ok_or_else(mismatch),
            ConstantValue::String(value) if primitive == Some(PrimitiveType::String) => {
                Ok(Expr::string(value))
            }
            ConstantValue::EnumMember(reference) => {
                let def = helpers::enum_def(ctx.env, target.id).ok_or_else(mismatch)?;
                let (ty, member) = reference.rsplit_once('.').ok_or_else(mismatch)?;
                let name = ctx.type_name(target.id);
                let same_type = ty.rsplit('.').next() == name.rsplit('.').next();
                if same_type && def.member(member).is_some() {
                    Ok(Expr::ident(name).member(member))
                } else {
                    Err(mismatch())
                }
            }
            ConstantValue::Method(name) => {
                let method = ctx
                    .resolver
                    .mapper
                    .user_methods
                    .iter()
                    .find(|m| m.name == *name && m.params.is_empty())
                    .ok_or_else(|| {
                        Unmapped::new(
                            DiagnosticKind::ReferencedMappingNotFound,
                            format!("The parameterless method {name} was not found"),
                        )
                    })?;
                if assignable(ctx, method.return_type, target) {
                    Ok(Expr::Call {
                        receiver: None,
                        method: name.clone(),
                        args: Vec::new(),
                    })
                } else {
                    Err(mismatch())
                }
            }
            ConstantValue::Bool(_) | ConstantValue::String(_) => Err(mismatch()),
        }
    }

    fn check_ignored(&self) {
        let Some(config) = self.body.config else {
            return;
        };
        let root = |path: &str| path.split('.').next().unwrap_or(path).to_string();
        for ignored in &config.ignore_target {
            let name = root(ignored);
            if !self.targets.iter().any(|t| t.def.name == name) {
                self.ctx.report(
                    DiagnosticKind::IgnoredTargetMemberNotFound,
                    format!(
                        "Ignored target member {ignored} on {} was not found",
                        self.ctx.display(self.pair.target)
                    ),
                );
            }
        }
        let readable = members::readable(self.ctx.env, self.pair.source.id, self.ctx.options);
        for ignored in &config.ignore_source {
            let name = root(ignored);
            let known = readable.iter().any(|m| m.name == name)
                || self.body.extra.iter().any(|p| p.name == name);
            if !known {
                self.ctx.report(
                    DiagnosticKind::IgnoredSourceMemberNotFound,
                    format!(
                        "Ignored source member {ignored} on {} was not found",
                        self.ctx.display(self.pair.source)
                    ),
                );
            }
        }
    }

    /// Conversion of `source` into `target`, honouring a referenced mapping by name.
    ///
    /// A referenced mapping that cannot be used is reported and implicit resolution applies.
    fn convert(
        &self,
        source: &SourcePath,
        target: TypeRef,
        use_mapping: Option<&str>,
        member: &str,
    ) -> Option<Conversion> {
        if let Some(name) = use_mapping {
            match self.referenced(name, source.ty(), target) {
                Ok(conversion) => return Some(conversion),
                Err(unmapped) => self.ctx.report_unmapped(unmapped),
            }
        }
        match self.ctx.resolve(Pair::new(source.ty(), target)) {
            Ok(conversion) => Some(conversion),
            Err(unmapped) => {
                self.ctx.report(
                    unmapped.kind,
                    format!(
                        "{} (member {} to {member})",
                        unmapped.message,
                        source.display_name()
                    ),
                );
                None
            }
        }
    }

    fn referenced(&self, name: &str, source: TypeRef, target: TypeRef) -> Result<Conversion, Unmapped> {
        let candidates: Vec<_> = self
            .ctx
            .resolver
            .known
            .iter()
            .filter(|m| m.name == name)
            .collect();
        let mapping = match candidates.as_slice() {
            [] => {
                return Err(Unmapped::new(
                    DiagnosticKind::ReferencedMappingNotFound,
                    format!("Referenced mapping {name} was not found"),
                ))
            }
            [mapping] => *mapping,
            _ => {
                return Err(Unmapped::new(
                    DiagnosticKind::ReferencedMappingAmbiguous,
                    format!("Referenced mapping {name} matches {} methods", candidates.len()),
                ))
            }
        };
        if !assignable(self.ctx, source.non_nullable(), mapping.source.non_nullable()) {
            return Err(Unmapped::new(
                DiagnosticKind::ReferencedMappingSourceTypeMismatch,
                format!(
                    "Referenced mapping {name} takes {} but the source is {}",
                    self.ctx.display(mapping.source),
                    self.ctx.display(source)
                ),
            ));
        }
        if !assignable(self.ctx, mapping.target.non_nullable(), target.non_nullable()) {
            return Err(Unmapped::new(
                DiagnosticKind::ReferencedMappingTargetTypeMismatch,
                format!(
                    "Referenced mapping {name} returns {} but the target is {}",
                    self.ctx.display(mapping.target),
                    self.ctx.display(target)
                ),
            ));
        }
        Ok(Conversion::Method(mapping.method.clone()))
    }

    /// A user object factory for the target, called with the source when it accepts it.
    /// Factories returning the target type itself win over generic ones bound to it.
    fn factory(&self) -> Option<Expr> {
        let ctx = self.ctx;
        let target = self.pair.target;
        let factories = || {
            ctx.resolver
                .mapper
                .user_methods
                .iter()
                .filter(|m| m.kind == UserMethodKind::ObjectFactory)
        };
        let exact: Vec<_> = factories()
            .filter(|m| !m.is_generic() && m.return_type.id == target.id)
            .collect();
        let generic: Vec<_> = factories()
            .filter(|m| m.is_generic() && assignable(ctx, target, m.return_type))
            .collect();
        let (method, args) = [exact, generic].into_iter().find_map(|candidates| {
            candidates
                .iter()
                .find(|m| m.params.len() == 1 && assignable(ctx, self.pair.source, m.params[0].ty))
                .map(|m| (*m, vec![self.body.source_expr()]))
                .or_else(|| {
                    candidates
                        .iter()
                        .find(|m| m.params.is_empty())
                        .map(|m| (*m, Vec::new()))
                })
        })?;
        let name = if method.is_generic() {
            format!("{}<{}>", method.name, ctx.type_name(target.id))
        } else {
            method.name.clone()
        };
        let call = Expr::Call {
            receiver: None,
            method: name,
            args,
        };
        if !method.return_type.nullable {
            return Some(call);
        }
        let fallback = if self.has_parameterless_constructor(self.pair.target.id) {
            Expr::new_object(ctx.type_name(self.pair.target.id), Vec::new())
        } else {
            Expr::throw_new(
                "InvalidOperationException",
                vec![Expr::string(&format!(
                    "The object factory {} returned null",
                    method.name
                ))],
            )
        };
        Some(call.coalesce(fallback))
    }

    fn has_parameterless_constructor(&self, id: TypeId) -> bool {
        helpers::has_parameterless_constructor(self.ctx.env, id, |access| {
            self.ctx.options.includes_constructor(access)
        })
    }

    /// Arguments of the accessible constructor with the most parameters that can all be
    /// supplied, plus the names of those parameters.
    fn constructor(
        &mut self,
        assignments: &[Assignment<'c>],
    ) -> Result<(Vec<Expr>, Vec<String>), Unmapped> {
        let mut ctors: Vec<ConstructorDef> = helpers::constructors(self.ctx.env, self.pair.target.id)
            .into_iter()
            .filter(|c| self.ctx.options.includes_constructor(c.accessibility))
            .collect();
        if ctors.is_empty() {
            return Err(Unmapped::new(
                DiagnosticKind::NoConstructorFound,
                format!(
                    "{} has no accessible constructor",
                    self.ctx.display(self.pair.target)
                ),
            ));
        }
        ctors.sort_by_key(|c| std::cmp::Reverse(c.params.len()));
        for ctor in &ctors {
            if let Some((args, reads)) = self.constructor_args(ctor, assignments) {
                for source in &reads {
                    self.read(source);
                }
                let names = ctor.params.iter().map(|p| p.name.clone()).collect();
                return Ok((args, names));
            }
        }
        Err(Unmapped::new(
            DiagnosticKind::NoConstructorFound,
            format!(
                "No accessible constructor of {} has parameters that can all be mapped",
                self.ctx.display(self.pair.target)
            ),
        ))
    }

    fn constructor_args(
        &self,
        ctor: &ConstructorDef,
        assignments: &[Assignment<'c>],
    ) -> Option<(Vec<Expr>, Vec<SourcePath>)> {
        let strategy = match self.ctx.options.property_name_mapping_strategy {
            PropertyNameMappingStrategy::CaseSensitive => PropertyNameMappingStrategy::CaseInsensitive,
            strategy => strategy,
        };
        let mut args = Vec::with_capacity(ctor.params.len());
        let mut reads = Vec::new();
        for param in &ctor.params {
            let configured = assignments
                .iter()
                .find(|a| a.path.len() == 1 && a.root().eq_ignore_ascii_case(&param.name));
            if let Some(assignment) = configured {
                let value = match &assignment.value {
                    Value::Into(source) => {
                        let conversion = self.ctx.resolve(Pair::new(source.ty(), param.ty)).ok()?;
                        Value::Sources(vec![(source.clone(), conversion)])
                    }
                    Value::Sources(chain) => Value::Sources(chain.clone()),
                    Value::Constant(expr) => Value::Constant(expr.clone()),
                };
                args.push(self.expression(&value, param.ty, &param.name)?);
                continue;
            }
            let source = matching::find_source(self.ctx, &self.roots, &param.name, strategy)?;
            let conversion = self.ctx.resolve(Pair::new(source.ty(), param.ty)).ok()?;
            let value = Value::Sources(vec![(source.clone(), conversion)]);
            args.push(self.expression(&value, param.ty, &param.name)?);
            reads.push(source);
        }
        Some((args, reads))
    }

    /// Auto-match every target member without a configuration.
    fn match_members(
        &mut self,
        assignments: &mut Vec<Assignment<'c>>,
        is_consumed: &dyn Fn(&str) -> bool,
    ) {
        let strategy = self.ctx.options.property_name_mapping_strategy;
        let claimed: HashSet<String> = assignments.iter().map(|a| a.root().to_string()).collect();
        let targets = self.targets.clone();
        for target in targets {
            let name = target.def.name.as_str();
            if self.body.ignores_target(name) || is_consumed(name) || claimed.contains(name) {
                continue;
            }
            let Some(source) = matching::find_source(self.ctx, &self.roots, name, strategy) else {
                continue;
            };
            let ignored = source.path.root == self.body.source
                && source.first_member().is_some_and(|m| self.body.ignores_source(m));
            if ignored {
                continue;
            }
            self.read(&source);
            if target.access == Writability::ReadOnly {
                assignments.push(Assignment {
                    name: name.to_string(),
                    path: vec![target.def],
                    value: Value::Into(source),
                });
                continue;
            }
            match self.convert(&source, target.def.ty, None, name) {
                Some(conversion) => assignments.push(Assignment {
                    name: name.to_string(),
                    path: vec![target.def],
                    value: Value::Sources(vec![(source, conversion)]),
                }),
                None => {
                    self.mapped.insert(name.to_string());
                }
            }
        }
    }

    /// Expression form of a value, for initializers, constructor arguments and fallback chains.
    fn expression(&self, value: &Value, target: TypeRef, member: &str) -> Option<Expr> {
        let chain = match value {
            Value::Constant(expr) => return Some(expr.clone()),
            Value::Into(_) => return None,
            Value::Sources(chain) => chain,
        };
        let policy = NullPolicy::members(self.ctx.options);
        let pass_null = NullPolicy {
            allow_null_assignment: true,
            throw_on_mismatch: false,
        };
        let last = chain.len().checked_sub(1)?;
        let mut expr: Option<Expr> = None;
        for (idx, (source, conversion)) in chain.iter().enumerate() {
            let value = source.value(self.ctx);
            let next = if idx == last {
                self.check_null_mismatch(source, value.nullable, target, member);
                nullability::value(&value, conversion, target.nullable, policy, self.default_value(target))
            } else {
                nullability::value(&value, conversion, true, pass_null, None)
            };
            expr = Some(match expr {
                Some(previous) => previous.coalesce(next),
                None => next,
            });
        }
        expr
    }

    /// Value substituted for `null` when a non-nullable target must get something.
    fn default_value(&self, ty: TypeRef) -> Option<Expr> {
        if helpers::primitive(self.ctx.env, ty.id) == Some(PrimitiveType::String) {
            return Some(Expr::string(""));
        }
        if helpers::is_value_type(self.ctx.env, ty.id) {
            return Some(Expr::literal("default"));
        }
        self.has_parameterless_constructor(ty.id)
            .then(|| Expr::new_object(self.ctx.type_name(ty.id), Vec::new()))
    }

    fn check_null_mismatch(&self, source: &SourcePath, nullable: bool, target: TypeRef, member: &str) {
        if nullable && !target.nullable && !self.ctx.options.suppress_null_mismatch_diagnostic {
            self.ctx.report(
                DiagnosticKind::NullableSourceValueToNonNullableTargetValue,
                format!(
                    "Mapping the nullable source member {} to the non-nullable target member {member}",
                    source.display_name()
                ),
            );
        }
    }

    /// Statement form of an assignment to `target`.
    fn place(
        &self,
        after: &mut Guarded,
        target_guards: Vec<Expr>,
        value: &Value,
        target: Expr,
        ty: TypeRef,
        member: &str,
    ) {
        match value {
            Value::Sources(chain) if chain.len() == 1 => {
                let (source, conversion) = &chain[0];
                let mut guards = source.guards();
                guards.extend(target_guards);
                let value = source.guarded_value(self.ctx);
                self.check_null_mismatch(source, value.nullable, ty, member);
                let stmts = nullability::assign(
                    &value,
                    conversion,
                    target,
                    ty.nullable,
                    NullPolicy::members(self.ctx.options),
                );
                after.push(guards, stmts);
            }
            value => {
                if let Some(expr) = self.expression(value, ty, member) {
                    after.push(target_guards, [Stmt::assign(target, expr)]);
                }
            }
        }
    }

    /// Map `source` into the current instance of the read-only member `target`.
    fn map_into(&self, after: &mut Guarded, source: &SourcePath, member: &MemberDef, target: Expr) {
        let read_only = || {
            self.ctx.report(
                DiagnosticKind::CannotMapToReadOnlyMember,
                format!(
                    "Cannot map to the read-only member {}.{}",
                    self.ctx.display(self.pair.target),
                    member.name
                ),
            )
        };
        match self.ctx.resolve(Pair::existing(source.ty(), member.ty)) {
            Ok(conversion) => {
                let value = source.guarded_value(self.ctx);
                let mut guards = source.guards();
                if value.nullable {
                    guards.push(value.expr.clone().not_null());
                }
                if member.ty.nullable {
                    guards.push(target.clone().not_null());
                }
                match conversion.apply_existing(value.unwrapped(), target) {
                    Some(stmt) => after.push(guards, [stmt]),
                    None => read_only(),
                }
            }
            Err(unmapped) if unmapped.kind == DiagnosticKind::CouldNotCreateMapping => read_only(),
            Err(unmapped) => self.ctx.report_unmapped(unmapped),
        }
    }

    /// Assignment to a nested target path (`target.Value.Id = ..`).
    fn place_nested(&self, after: &mut Guarded, root: &Expr, assignment: &Assignment<'c>) {
        let Some((last, intermediates)) = assignment.path.split_last() else {
            return;
        };
        let report = |kind: DiagnosticKind, message: String| self.ctx.report(kind, message);
        let target_name = self.ctx.display(self.pair.target);

        let mut expr = root.clone();
        let mut prefix = String::new();
        let mut setup = Vec::new();
        let mut target_guards = Vec::new();
        for hop in intermediates {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(&hop.name);
            let member = expr.clone().member(hop.name.clone());
            if helpers::is_value_type(self.ctx.env, hop.ty.id) {
                report(
                    DiagnosticKind::CannotMapToTemporarySourceMember,
                    format!(
                        "Cannot map to {} of {target_name} because {prefix} is a value type read as a temporary copy",
                        assignment.name
                    ),
                );
                return;
            }
            match hop.setter {
                Some(setter) if setter.init_only => {
                    report(
                        DiagnosticKind::CannotMapToInitOnlyMemberPath,
                        format!(
                            "Cannot map to {} of {target_name} because {prefix} is init-only",
                            assignment.name
                        ),
                    );
                    return;
                }
                Some(_) if hop.ty.nullable => {
                    if !self.has_parameterless_constructor(hop.ty.id) {
                        report(
                            DiagnosticKind::NoConstructorFound,
                            format!(
                                "Cannot create {prefix} of {target_name}: {} has no accessible parameterless constructor",
                                self.ctx.type_name(hop.ty.id)
                            ),
                        );
                        return;
                    }
                    setup.push((
                        prefix.clone(),
                        Stmt::CoalesceAssign {
                            target: member.clone(),
                            value: Expr::new_object(self.ctx.type_name(hop.ty.id), Vec::new()),
                        },
                    ));
                }
                None if hop.ty.nullable => target_guards.push(member.clone().not_null()),
                _ => {}
            }
            expr = member;
        }
        match last.setter {
            Some(setter) if setter.init_only => {
                report(
                    DiagnosticKind::CannotMapToInitOnlyMemberPath,
                    format!("Cannot map to the init-only member {} of {target_name}", assignment.name),
                );
                return;
            }
            Some(setter) if self.ctx.options.includes_member(setter.accessibility) => {}
            _ => {
                report(
                    DiagnosticKind::CannotMapToReadOnlyMember,
                    format!("Cannot map to the read-only member {} of {target_name}", assignment.name),
                );
                return;
            }
        }

        let guards = match &assignment.value {
            Value::Sources(chain) if chain.len() == 1 => {
                let mut guards = chain[0].0.guards();
                guards.extend(target_guards.iter().cloned());
                guards
            }
            _ => target_guards.clone(),
        };
        let group = after.index(guards);
        for (prefix, stmt) in setup {
            if after.prepared.insert((group, prefix)) {
                after.groups[group].1.push(stmt);
            }
        }
        let value = match &assignment.value {
            Value::Into(source) => {
                match self.ctx.resolve(Pair::new(source.ty(), last.ty)) {
                    Ok(conversion) => Value::Sources(vec![(source.clone(), conversion)]),
                    Err(unmapped) => {
                        self.ctx.report_unmapped(unmapped);
                        return;
                    }
                }
            }
            Value::Sources(chain) => Value::Sources(chain.clone()),
            Value::Constant(expr) => Value::Constant(expr.clone()),
        };
        self.place(
            after,
            target_guards,
            &value,
            expr.member(last.name.clone()),
            last.ty,
            &assignment.name,
        );
    }

    fn report_unmapped(&self, new_instance: bool, is_consumed: &dyn Fn(&str) -> bool) {
        let strategy = self.ctx.options.required_mapping_strategy;
        for target in &self.targets {
            let name = target.def.name.as_str();
            if self.mapped.contains(name) || is_consumed(name) || self.body.ignores_target(name) {
                continue;
            }
            if target.def.required && new_instance {
                self.ctx.report(
                    DiagnosticKind::RequiredMemberNotMapped,
                    format!(
                        "Required member {name} on mapping target type {} was not found on the mapping source type {}",
                        self.ctx.display(self.pair.target),
                        self.ctx.display(self.pair.source)
                    ),
                );
                continue;
            }
            if target.access == Writability::ReadOnly || !strategy.reports_unmapped_target() {
                continue;
            }
            self.ctx.report(
                DiagnosticKind::SourceMemberNotFound,
                format!(
                    "The member {name} on the mapping target type {} was not found on the mapping source type {}",
                    self.ctx.display(self.pair.target),
                    self.ctx.display(self.pair.source)
                ),
            );
        }

        if !strategy.reports_unmapped_source()
            || self.ctx.classify(self.pair.source.id) == ShapeCategory::Tuple
        {
            return;
        }
        for member in members::readable(self.ctx.env, self.pair.source.id, self.ctx.options) {
            if self.used.contains(&member.name) || self.body.ignores_source(&member.name) {
                continue;
            }
            self.ctx.report(
                DiagnosticKind::SourceMemberNotMapped,
                format!(
                    "The member {} on the mapping source type {} is not mapped to any member on the mapping target type {}",
                    member.name,
                    self.ctx.display(self.pair.source),
                    self.ctx.display(self.pair.target)
                ),
            );
        }
    }
}

fn number_literal(primitive: Option<PrimitiveType>, value: f64) -> Option<Expr> {
    let primitive = primitive.filter(|p| p.is_numeric())?;
    if !value.is_finite() {
        return None;
    }
    if primitive.is_integral() {
        return (value.fract() == 0.0).then(|| Expr::literal(format!("{}", value as i64)));
    }
    let suffix = match primitive {
        PrimitiveType::Decimal => "m",
        PrimitiveType::Float => "f",
        _ => "d",
    };
    Some(Expr::literal(format!("{value}{suffix}")))
}

fn describe(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Null => "null".to_string(),
        ConstantValue::Bool(value) => value.to_string(),
        ConstantValue::Number(value) => value.to_string(),
        ConstantValue::String(value) => format!("\"{value}\""),
        ConstantValue::EnumMember(member) => member.clone(),
        ConstantValue::Method(name) => format!("{name}()"),
    }
}
