//! Null policy: what happens when a nullable value meets a target.
//!
//! | source   | target   | allow null assignment | throw | action                               |
//! |----------|----------|-----------------------|-------|--------------------------------------|
//! | non-null | any      |                       |       | assign                               |
//! | nullable | nullable | yes                   |       | assign, `null` flows through         |
//! | nullable | nullable | no                    | no    | assign when not null, else skip      |
//! | nullable | nullable | no                    | yes   | assign when not null, else throw     |
//! | nullable | non-null |                       | no    | assign when not null, else skip      |
//! | nullable | non-null |                       | yes   | assign when not null, else throw     |

use nova_mapper_config::MapperOptions;

use crate::plan::{Conversion, Expr, Stmt};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullAction {
    /// Assign the converted value unconditionally.
    Assign,
    /// `null` flows through; non-null values are converted.
    AssignOrNull,
    /// Assign only when the source is not null.
    GuardSkip,
    /// Assign when the source is not null, throw otherwise.
    GuardThrow,
}

impl NullAction {
    /// Whether a nullable value is written to a non-nullable target.
    pub fn is_mismatch(source_nullable: bool, target_nullable: bool) -> bool {
        source_nullable && !target_nullable
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NullPolicy {
    pub allow_null_assignment: bool,
    pub throw_on_mismatch: bool,
}

impl NullPolicy {
    /// Policy for member assignments.
    pub fn members(options: &MapperOptions) -> Self {
        Self {
            allow_null_assignment: options.allow_null_property_assignment,
            throw_on_mismatch: options.throw_on_property_mapping_null_mismatch,
        }
    }

    /// Policy for the value a mapping method returns.
    pub fn method(options: &MapperOptions) -> Self {
        Self {
            allow_null_assignment: true,
            throw_on_mismatch: options.throw_on_mapping_null_mismatch,
        }
    }

    pub fn decide(self, source_nullable: bool, target_nullable: bool) -> NullAction {
        match (source_nullable, target_nullable) {
            (false, _) => NullAction::Assign,
            (true, true) if self.allow_null_assignment => NullAction::AssignOrNull,
            (true, _) if self.throw_on_mismatch => NullAction::GuardThrow,
            (true, _) => NullAction::GuardSkip,
        }
    }
}

/// A value read from the source side.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceValue {
    /// Expression reading the value.
    pub expr: Expr,
    /// Plain expression used inside `nameof(..)`.
    pub name: Expr,
    pub nullable: bool,
    /// `Nullable<T>` when nullable: the underlying value is read with `.Value`.
    pub value_type: bool,
}

impl SourceValue {
    pub fn new(expr: Expr, nullable: bool, value_type: bool) -> Self {
        Self {
            name: expr.clone(),
            expr,
            nullable,
            value_type,
        }
    }

    /// The non-null value, assuming a null check already happened.
    pub fn unwrapped(&self) -> Expr {
        if self.nullable && self.value_type {
            self.expr.clone().member("Value")
        } else {
            self.expr.clone()
        }
    }

    fn throw_null(&self) -> Expr {
        Expr::throw_null(&self.name)
    }
}

/// Statements writing `source` (converted) into `target`.
pub fn assign(
    source: &SourceValue,
    conversion: &Conversion,
    target: Expr,
    target_nullable: bool,
    policy: NullPolicy,
) -> Vec<Stmt> {
    let action = policy.decide(source.nullable, target_nullable);
    let converted = || conversion.apply(source.unwrapped());
    match action {
        NullAction::Assign => vec![Stmt::assign(target, conversion.apply(source.expr.clone()))],
        NullAction::AssignOrNull if conversion.is_identity() => {
            vec![Stmt::assign(target, source.expr.clone())]
        }
        NullAction::AssignOrNull => vec![Stmt::If {
            cond: source.expr.clone().not_null(),
            then: vec![Stmt::assign(target.clone(), converted())],
            otherwise: vec![Stmt::assign(target, Expr::null())],
        }],
        NullAction::GuardSkip => vec![Stmt::if_then(
            source.expr.clone().not_null(),
            vec![Stmt::assign(target, converted())],
        )],
        NullAction::GuardThrow => vec![Stmt::If {
            cond: source.expr.clone().not_null(),
            then: vec![Stmt::assign(target, converted())],
            otherwise: vec![Stmt::Throw(Expr::new_object(
                "ArgumentNullException",
                vec![Expr::name_of(source.name.clone())],
            ))],
        }],
    }
}

/// Expression form, for constructor arguments, object initializers and tuple elements where
/// the write cannot be skipped. `fallback` replaces a null source for non-nullable targets
/// unless the policy asks to throw.
pub fn value(
    source: &SourceValue,
    conversion: &Conversion,
    target_nullable: bool,
    policy: NullPolicy,
    fallback: Option<Expr>,
) -> Expr {
    if !source.nullable {
        return conversion.apply(source.expr.clone());
    }
    let when_null = if target_nullable && !policy.throw_on_mismatch {
        Expr::null()
    } else if target_nullable && policy.allow_null_assignment {
        Expr::null()
    } else {
        match fallback {
            Some(fallback) if !policy.throw_on_mismatch => fallback,
            _ => source.throw_null(),
        }
    };
    if conversion.is_identity() {
        if target_nullable && matches!(when_null, Expr::Literal(ref l) if l == "null") {
            return source.expr.clone();
        }
        return source.expr.clone().coalesce(when_null);
    }
    Expr::conditional(
        source.expr.clone().not_null(),
        conversion.apply(source.unwrapped()),
        when_null,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::expr_to_string;

    fn squash(stmts: &[Stmt]) -> String {
        let plan = crate::plan::MappingPlan {
            id: crate::plan::PlanId(0),
            name: "M".to_string(),
            kind: crate::plan::PlanKind::NewInstance,
            source: None,
            target: None,
            signature: crate::plan::Signature {
                visibility: crate::plan::Visibility::Private,
                return_type: None,
                type_params: Vec::new(),
                params: Vec::new(),
            },
            body: stmts.to_vec(),
        };
        let text = crate::render::plan_to_string(&plan);
        let body = text.split_once('\n').map(|(_, b)| b).unwrap_or_default();
        body.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn nullable_int() -> SourceValue {
        SourceValue::new(Expr::ident("source").member("Value"), true, true)
    }

    fn policy(allow: bool, throw: bool) -> NullPolicy {
        NullPolicy {
            allow_null_assignment: allow,
            throw_on_mismatch: throw,
        }
    }

    #[test]
    fn decision_table() {
        use NullAction::*;
        let cases = [
            (false, false, policy(true, false), Assign),
            (false, true, policy(false, true), Assign),
            (true, true, policy(true, false), AssignOrNull),
            (true, true, policy(false, false), GuardSkip),
            (true, true, policy(false, true), GuardThrow),
            (true, false, policy(true, false), GuardSkip),
            (true, false, policy(true, true), GuardThrow),
        ];
        for (source, target, policy, expected) in cases {
            assert_eq!(policy.decide(source, target), expected, "{source} {target} {policy:?}");
        }
    }

    #[test]
    fn nullable_value_to_non_nullable_is_guarded() {
        let target = Expr::ident("target").member("Value");
        let stmts = assign(
            &nullable_int(),
            &Conversion::Identity,
            target.clone(),
            false,
            policy(true, false),
        );
        assert_eq!(
            squash(&stmts),
            "{ if (source.Value != null) { target.Value = source.Value.Value; } }"
        );

        let stmts = assign(
            &nullable_int(),
            &Conversion::Identity,
            target,
            false,
            policy(true, true),
        );
        assert_eq!(
            squash(&stmts),
            "{ if (source.Value != null) { target.Value = source.Value.Value; } else { throw new ArgumentNullException(nameof(source.Value)); } }"
        );
    }

    #[test]
    fn nullable_to_nullable_flows_through() {
        let stmts = assign(
            &nullable_int(),
            &Conversion::Identity,
            Expr::ident("target").member("Value"),
            true,
            policy(true, false),
        );
        assert_eq!(squash(&stmts), "{ target.Value = source.Value; }");

        let cast = Conversion::Inline(Expr::cast("long", Expr::Source));
        let stmts = assign(
            &nullable_int(),
            &cast,
            Expr::ident("target").member("Value"),
            true,
            policy(true, false),
        );
        assert_eq!(
            squash(&stmts),
            "{ if (source.Value != null) { target.Value = (long)source.Value.Value; } else { target.Value = null; } }"
        );
    }

    #[test]
    fn expression_form_uses_coalesce() {
        let name = SourceValue::new(Expr::ident("source").member("Name"), true, false);
        let expr = value(
            &name,
            &Conversion::Identity,
            false,
            policy(true, false),
            Some(Expr::string("")),
        );
        assert_eq!(expr_to_string(&expr), "source.Name ?? \"\"");

        let expr = value(&name, &Conversion::Identity, false, policy(true, true), None);
        assert_eq!(
            expr_to_string(&expr),
            "source.Name ?? throw new ArgumentNullException(nameof(source.Name))"
        );
    }
}
