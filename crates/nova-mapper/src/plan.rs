//! The mapping plan: a small statement/expression tree per generated method.
//!
//! Plans are owned by the [`PlanCache`](crate::PlanCache); everything else refers to them by
//! [`PlanId`]. A call to another plan stores the callee's id and name, so a plan can call a
//! method whose body is still being resolved.

use nova_mapper_types::TypeRef;

/// Index of a plan inside its cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlanId(pub(crate) u32);

impl PlanId {
    pub fn to_raw(self) -> u32 {
        self.0
    }
}

/// Reference to a (possibly unfinished) mapping method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRef {
    pub plan: PlanId,
    pub name: String,
    /// The callee was still being resolved when this reference was handed out.
    pub deferred: bool,
    /// The callee takes the reference handler as trailing argument.
    pub ref_handler: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Hole of an inline conversion template, replaced by [`Conversion::apply`].
    Source,
    Ident(String),
    Literal(String),
    Member {
        receiver: Box<Expr>,
        name: String,
        /// `receiver?.name`
        conditional: bool,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    Cast {
        ty: String,
        expr: Box<Expr>,
    },
    Call {
        receiver: Option<Box<Expr>>,
        method: String,
        args: Vec<Expr>,
    },
    /// Call of another mapping plan.
    Mapping {
        method: MethodRef,
        args: Vec<Expr>,
    },
    New {
        ty: String,
        args: Vec<Expr>,
        init: Vec<(String, Expr)>,
    },
    NewArray {
        element: String,
        len: Box<Expr>,
    },
    Tuple(Vec<(Option<String>, Expr)>),
    Binary {
        op: &'static str,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Lambda {
        param: String,
        body: Box<Expr>,
    },
    Switch {
        subject: Box<Expr>,
        arms: Vec<SwitchArm>,
    },
    Throw(Box<Expr>),
    NameOf(Box<Expr>),
    TypeOf(String),
    /// `out var name`
    OutVar(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchArm {
    pub pattern: Pattern,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    Value(Expr),
    /// `Type name when guard`
    Type {
        ty: String,
        binding: String,
        guard: Option<Expr>,
    },
    /// `{ } name when guard`
    Guarded {
        binding: String,
        guard: Expr,
    },
    Null,
    Discard,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
    },
    Assign {
        target: Expr,
        value: Expr,
    },
    /// `target ??= value;`
    CoalesceAssign {
        target: Expr,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    ForEach {
        item: String,
        source: Expr,
        body: Vec<Stmt>,
    },
    For {
        index: String,
        bound: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Throw(Expr),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Expr::Literal(text.into())
    }

    pub fn string(value: &str) -> Self {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        Expr::Literal(format!("\"{escaped}\""))
    }

    pub fn null() -> Self {
        Expr::literal("null")
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            receiver: Box::new(self),
            name: name.into(),
            conditional: false,
        }
    }

    pub fn conditional_member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            receiver: Box::new(self),
            name: name.into(),
            conditional: true,
        }
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index {
            receiver: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn cast(ty: impl Into<String>, expr: Expr) -> Self {
        Expr::Cast {
            ty: ty.into(),
            expr: Box::new(expr),
        }
    }

    pub fn call(self, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: Some(Box::new(self)),
            method: method.into(),
            args,
        }
    }

    pub fn static_call(ty: &str, method: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            receiver: Some(Box::new(Expr::ident(ty))),
            method: method.to_string(),
            args,
        }
    }

    pub fn new_object(ty: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::New {
            ty: ty.into(),
            args,
            init: Vec::new(),
        }
    }

    pub fn binary(op: &'static str, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn not_null(self) -> Self {
        Expr::binary("!=", self, Expr::null())
    }

    pub fn is_null(self) -> Self {
        Expr::binary("==", self, Expr::null())
    }

    pub fn coalesce(self, fallback: Expr) -> Self {
        Expr::binary("??", self, fallback)
    }

    pub fn conditional(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn throw_new(ty: &str, args: Vec<Expr>) -> Self {
        Expr::Throw(Box::new(Expr::new_object(ty, args)))
    }

    pub fn name_of(expr: Expr) -> Self {
        Expr::NameOf(Box::new(expr))
    }

    /// `throw new ArgumentNullException(nameof(expr))`
    pub fn throw_null(expr: &Expr) -> Self {
        Expr::throw_new("ArgumentNullException", vec![Expr::name_of(expr.clone())])
    }

    /// Replace every [`Expr::Source`] hole with `value`.
    pub fn substitute(&self, value: &Expr) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute(value));
        let all = |v: &[Expr]| v.iter().map(|e| e.substitute(value)).collect::<Vec<_>>();
        match self {
            Expr::Source => value.clone(),
            Expr::Ident(_)
            | Expr::Literal(_)
            | Expr::TypeOf(_)
            | Expr::OutVar(_) => self.clone(),
            Expr::Member {
                receiver,
                name,
                conditional,
            } => Expr::Member {
                receiver: sub(receiver),
                name: name.clone(),
                conditional: *conditional,
            },
            Expr::Index { receiver, index } => Expr::Index {
                receiver: sub(receiver),
                index: sub(index),
            },
            Expr::Cast { ty, expr } => Expr::Cast {
                ty: ty.clone(),
                expr: sub(expr),
            },
            Expr::Call {
                receiver,
                method,
                args,
            } => Expr::Call {
                receiver: receiver.as_ref().map(|r| sub(r)),
                method: method.clone(),
                args: all(args),
            },
            Expr::Mapping { method, args } => Expr::Mapping {
                method: method.clone(),
                args: all(args),
            },
            Expr::New { ty, args, init } => Expr::New {
                ty: ty.clone(),
                args: all(args),
                init: init
                    .iter()
                    .map(|(name, e)| (name.clone(), e.substitute(value)))
                    .collect(),
            },
            Expr::NewArray { element, len } => Expr::NewArray {
                element: element.clone(),
                len: sub(len),
            },
            Expr::Tuple(elements) => Expr::Tuple(
                elements
                    .iter()
                    .map(|(name, e)| (name.clone(), e.substitute(value)))
                    .collect(),
            ),
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op,
                lhs: sub(lhs),
                rhs: sub(rhs),
            },
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => Expr::Conditional {
                cond: sub(cond),
                then: sub(then),
                otherwise: sub(otherwise),
            },
            Expr::Lambda { param, body } => Expr::Lambda {
                param: param.clone(),
                body: sub(body),
            },
            Expr::Switch { subject, arms } => Expr::Switch {
                subject: sub(subject),
                arms: arms
                    .iter()
                    .map(|arm| SwitchArm {
                        pattern: arm.pattern.clone(),
                        value: arm.value.substitute(value),
                    })
                    .collect(),
            },
            Expr::Throw(e) => Expr::Throw(sub(e)),
            Expr::NameOf(e) => Expr::NameOf(sub(e)),
        }
    }

    /// Whether a lambda occurs anywhere in the expression.
    pub fn contains_lambda(&self) -> bool {
        matches!(self, Expr::Lambda { .. }) || self.children().into_iter().any(Expr::contains_lambda)
    }

    fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Source
            | Expr::Ident(_)
            | Expr::Literal(_)
            | Expr::TypeOf(_)
            | Expr::OutVar(_) => Vec::new(),
            Expr::Member { receiver, .. } => vec![&**receiver],
            Expr::Index { receiver, index } => vec![&**receiver, &**index],
            Expr::Cast { expr, .. }
            | Expr::Throw(expr)
            | Expr::NameOf(expr)
            | Expr::Lambda { body: expr, .. } => vec![&**expr],
            Expr::Call { receiver, args, .. } => receiver.iter().map(|r| &**r).chain(args).collect(),
            Expr::Mapping { args, .. } => args.iter().collect(),
            Expr::New { args, init, .. } => args.iter().chain(init.iter().map(|(_, e)| e)).collect(),
            Expr::NewArray { len, .. } => vec![&**len],
            Expr::Tuple(elements) => elements.iter().map(|(_, e)| e).collect(),
            Expr::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => vec![&**cond, &**then, &**otherwise],
            Expr::Switch { subject, arms } => std::iter::once(&**subject)
                .chain(arms.iter().map(|arm| &arm.value))
                .collect(),
        }
    }

    fn visit_calls<'a>(&'a self, out: &mut Vec<&'a MethodRef>) {
        match self {
            Expr::Source
            | Expr::Ident(_)
            | Expr::Literal(_)
            | Expr::TypeOf(_)
            | Expr::OutVar(_) => {}
            Expr::Mapping { method, args } => {
                out.push(method);
                args.iter().for_each(|e| e.visit_calls(out));
            }
            Expr::Member { receiver, .. } => receiver.visit_calls(out),
            Expr::Index { receiver, index } => {
                receiver.visit_calls(out);
                index.visit_calls(out);
            }
            Expr::Cast { expr, .. }
            | Expr::Throw(expr)
            | Expr::NameOf(expr)
            | Expr::Lambda { body: expr, .. } => expr.visit_calls(out),
            Expr::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    receiver.visit_calls(out);
                }
                args.iter().for_each(|e| e.visit_calls(out));
            }
            Expr::New { args, init, .. } => {
                args.iter().for_each(|e| e.visit_calls(out));
                init.iter().for_each(|(_, e)| e.visit_calls(out));
            }
            Expr::NewArray { len, .. } => len.visit_calls(out),
            Expr::Tuple(elements) => elements.iter().for_each(|(_, e)| e.visit_calls(out)),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.visit_calls(out);
                rhs.visit_calls(out);
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.visit_calls(out);
                then.visit_calls(out);
                otherwise.visit_calls(out);
            }
            Expr::Switch { subject, arms } => {
                subject.visit_calls(out);
                arms.iter().for_each(|arm| arm.value.visit_calls(out));
            }
        }
    }
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Assign { target, value }
    }

    pub fn let_var(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            value,
        }
    }

    pub fn if_then(cond: Expr, then: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise: Vec::new(),
        }
    }

    pub fn ret(expr: Expr) -> Self {
        Stmt::Return(Some(expr))
    }

    fn visit_calls<'a>(&'a self, out: &mut Vec<&'a MethodRef>) {
        match self {
            Stmt::Let { value: e, .. } | Stmt::Expr(e) | Stmt::Throw(e) => e.visit_calls(out),
            Stmt::Return(e) => {
                if let Some(e) = e {
                    e.visit_calls(out);
                }
            }
            Stmt::Assign { target, value } | Stmt::CoalesceAssign { target, value } => {
                target.visit_calls(out);
                value.visit_calls(out);
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.visit_calls(out);
                then.iter().for_each(|s| s.visit_calls(out));
                otherwise.iter().for_each(|s| s.visit_calls(out));
            }
            Stmt::ForEach { source, body, .. } => {
                source.visit_calls(out);
                body.iter().for_each(|s| s.visit_calls(out));
            }
            Stmt::For { bound, body, .. } => {
                bound.visit_calls(out);
                body.iter().for_each(|s| s.visit_calls(out));
            }
        }
    }
}

/// How to turn a non-null source value into a non-null target value.
#[derive(Clone, Debug, PartialEq)]
pub enum Conversion {
    /// The source value can be used as is.
    Identity,
    /// Template over [`Expr::Source`].
    Inline(Expr),
    /// Call of a generated, declared or user-implemented method.
    Method(MethodRef),
}

impl Conversion {
    pub fn is_identity(&self) -> bool {
        matches!(self, Conversion::Identity)
    }

    /// Produce the converted value of `source`.
    pub fn apply(&self, source: Expr) -> Expr {
        match self {
            Conversion::Identity => source,
            Conversion::Inline(template) => template.substitute(&source),
            Conversion::Method(method) => Expr::Mapping {
                method: method.clone(),
                args: call_args(method, vec![source]),
            },
        }
    }

    /// Statement mapping `source` into the existing instance `target`.
    pub fn apply_existing(&self, source: Expr, target: Expr) -> Option<Stmt> {
        match self {
            Conversion::Method(method) => Some(Stmt::Expr(Expr::Mapping {
                method: method.clone(),
                args: call_args(method, vec![source, target]),
            })),
            _ => None,
        }
    }
}

fn call_args(method: &MethodRef, mut args: Vec<Expr>) -> Vec<Expr> {
    if method.ref_handler {
        args.push(Expr::ident(crate::REF_HANDLER));
    }
    args
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Declared by the user; the engine provides the body.
    PublicPartial,
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub visibility: Visibility,
    /// `None` for `void`.
    pub return_type: Option<String>,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlanKind {
    /// Creates and returns a new target value.
    NewInstance,
    /// Writes into an existing target instance.
    ExistingTarget,
    /// Dispatches over the other mappings by the runtime type of the source.
    RuntimeDispatch,
    /// No mapping could be created; the body throws.
    ThrowStub,
}

impl PlanKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanKind::NewInstance => "new_instance",
            PlanKind::ExistingTarget => "existing_target",
            PlanKind::RuntimeDispatch => "runtime_dispatch",
            PlanKind::ThrowStub => "throw_stub",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MappingPlan {
    pub id: PlanId,
    pub name: String,
    pub kind: PlanKind,
    pub source: Option<TypeRef>,
    pub target: Option<TypeRef>,
    pub signature: Signature,
    pub body: Vec<Stmt>,
}

impl MappingPlan {
    /// Every call of another mapping method within this plan, in body order.
    pub fn calls(&self) -> Vec<&MethodRef> {
        let mut out = Vec::new();
        for stmt in &self.body {
            stmt.visit_calls(&mut out);
        }
        out
    }

    /// Calls of this plan from within its own body.
    pub fn self_calls(&self) -> usize {
        self.calls().iter().filter(|m| m.plan == self.id).count()
    }

    /// Whether the body allocates a new target instance.
    pub fn allocates(&self) -> bool {
        fn expr(e: &Expr) -> bool {
            match e {
                Expr::New { .. } | Expr::NewArray { .. } => true,
                Expr::Cast { expr: e, .. } | Expr::Throw(e) => expr(e),
                Expr::Conditional {
                    then, otherwise, ..
                } => expr(then) || expr(otherwise),
                Expr::Binary { lhs, rhs, .. } => expr(lhs) || expr(rhs),
                _ => false,
            }
        }
        fn stmt(s: &Stmt) -> bool {
            match s {
                Stmt::Let { value, .. } | Stmt::Return(Some(value)) => expr(value),
                Stmt::Assign { value, .. } | Stmt::CoalesceAssign { value, .. } => expr(value),
                Stmt::If {
                    then, otherwise, ..
                } => then.iter().any(stmt) || otherwise.iter().any(stmt),
                Stmt::ForEach { body, .. } | Stmt::For { body, .. } => body.iter().any(stmt),
                _ => false,
            }
        }
        self.body.iter().any(stmt)
    }
}
