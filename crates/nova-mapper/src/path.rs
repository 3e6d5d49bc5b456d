//! Member paths such as `Value.Nested.Id`.

use std::fmt;

use nova_mapper_types::helpers;
use nova_mapper_types::{MemberDef, MemberKind, TypeEnv, TypeId, TypeRef};

use crate::plan::Expr;

/// One member access of a [`MemberPath`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberHop {
    pub name: String,
    pub ty: TypeRef,
    pub kind: MemberKind,
    /// The member's type is a value type (`Nullable<T>` when `ty.nullable`).
    pub value_type: bool,
}

impl MemberHop {
    pub fn new(env: &dyn TypeEnv, member: &MemberDef) -> Self {
        Self {
            name: member.name.clone(),
            ty: member.ty,
            kind: member.kind,
            value_type: helpers::is_value_type(env, member.ty.id),
        }
    }
}

/// An ordered sequence of member accesses starting at a named root (a method parameter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberPath {
    pub root: String,
    pub hops: Vec<MemberHop>,
}

impl MemberPath {
    pub fn new(root: impl Into<String>, hops: Vec<MemberHop>) -> Self {
        Self {
            root: root.into(),
            hops,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// A path is nullable when any of its hops is.
    pub fn is_nullable(&self) -> bool {
        self.hops.iter().any(|hop| hop.ty.nullable)
    }

    /// Whether a hop before the last one can be null.
    pub fn has_nullable_intermediate(&self) -> bool {
        self.hops
            .iter()
            .take(self.hops.len().saturating_sub(1))
            .any(|hop| hop.ty.nullable)
    }

    /// Type of the value the path yields when no intermediate hop is null.
    pub fn member_type(&self) -> Option<TypeRef> {
        self.hops.last().map(|hop| hop.ty)
    }

    pub fn first(&self) -> Option<&str> {
        self.hops.first().map(|hop| hop.name.as_str())
    }

    /// Prefixes ending in a nullable intermediate hop, outermost first.
    pub fn nullable_prefixes(&self) -> Vec<MemberPath> {
        let last = self.hops.len().saturating_sub(1);
        self.hops
            .iter()
            .enumerate()
            .filter(|(idx, hop)| *idx < last && hop.ty.nullable)
            .map(|(idx, _)| MemberPath::new(self.root.clone(), self.hops[..=idx].to_vec()))
            .collect()
    }

    pub fn prefix(&self, len: usize) -> MemberPath {
        MemberPath::new(self.root.clone(), self.hops[..len.min(self.hops.len())].to_vec())
    }

    /// Plain access, assuming intermediate hops were checked for null. Nullable value types
    /// passed through are unwrapped with `.Value`.
    pub fn to_expr(&self) -> Expr {
        let last = self.hops.len().saturating_sub(1);
        let mut expr = Expr::ident(self.root.clone());
        for (idx, hop) in self.hops.iter().enumerate() {
            expr = expr.member(hop.name.clone());
            if idx < last && hop.ty.nullable && hop.value_type {
                expr = expr.member("Value");
            }
        }
        expr
    }

    /// Null-conditional access (`a.B?.C`), usable where no statement can guard the access.
    pub fn to_conditional_expr(&self) -> Expr {
        self.conditional_access(false)
    }

    /// Like [`MemberPath::to_conditional_expr`]; `root_nullable` guards the first hop too.
    pub fn conditional_access(&self, root_nullable: bool) -> Expr {
        let mut expr = Expr::ident(self.root.clone());
        let mut previous_nullable = root_nullable;
        for hop in &self.hops {
            expr = if previous_nullable {
                expr.conditional_member(hop.name.clone())
            } else {
                expr.member(hop.name.clone())
            };
            previous_nullable = hop.ty.nullable;
        }
        expr
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, hop) in self.hops.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            f.write_str(&hop.name)?;
        }
        Ok(())
    }
}

/// Split a dotted path into its segments. Empty segments make the path invalid.
pub fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').map(str::trim).collect();
    (!parts.iter().any(|p| p.is_empty())).then_some(parts)
}

/// Resolve `path` starting at type `root`, accepting only members allowed by `visible`.
///
/// On failure returns the index of the segment that could not be resolved.
pub fn resolve_hops(
    env: &dyn TypeEnv,
    root: TypeId,
    path: &[&str],
    visible: impl Fn(&MemberDef) -> bool,
) -> Result<Vec<MemberHop>, usize> {
    let mut hops = Vec::with_capacity(path.len());
    let mut current = root;
    for (idx, segment) in path.iter().enumerate() {
        let member = helpers::members(env, current)
            .into_iter()
            .find(|m| m.name == *segment && !m.is_static && !m.is_indexer && visible(m))
            .ok_or(idx)?;
        hops.push(MemberHop::new(env, member));
        current = member.ty.id;
    }
    Ok(hops)
}
