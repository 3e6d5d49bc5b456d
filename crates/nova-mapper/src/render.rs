//! Debug renderer producing C#-like text for plans.
//!
//! This is not the code emitter. It exists so plans can be read in logs, compared in tests and
//! printed by the CLI.

use std::fmt::Write as _;

use crate::plan::{Expr, MappingPlan, Pattern, Signature, Stmt, Visibility};

const INDENT: &str = "    ";

/// Render a whole method: signature plus body.
pub fn plan_to_string(plan: &MappingPlan) -> String {
    let mut out = String::new();
    out.push_str(&signature_to_string(&plan.name, &plan.signature));
    out.push('\n');
    block(&mut out, &plan.body, 0);
    out
}

/// Render every plan as members of `partial class {mapper}`.
pub fn mapper_to_string<'a>(
    mapper: &str,
    plans: impl IntoIterator<Item = &'a MappingPlan>,
) -> String {
    let mut out = format!("partial class {mapper}\n{{\n");
    let mut first = true;
    for plan in plans {
        if !first {
            out.push('\n');
        }
        first = false;
        for line in plan_to_string(plan).lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "{INDENT}{line}");
            }
        }
    }
    out.push_str("}\n");
    out
}

pub fn signature_to_string(name: &str, sig: &Signature) -> String {
    let visibility = match sig.visibility {
        Visibility::PublicPartial => "public partial",
        Visibility::Private => "private",
    };
    let ret = sig.return_type.as_deref().unwrap_or("void");
    let generics = if sig.type_params.is_empty() {
        String::new()
    } else {
        format!("<{}>", sig.type_params.join(", "))
    };
    let params = sig
        .params
        .iter()
        .map(|p| format!("{} {}", p.ty, p.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{visibility} {ret} {name}{generics}({params})")
}

/// Render a single expression as it would appear at indentation level 0.
pub fn expr_to_string(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, 0);
    out
}

fn pad(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push_str(INDENT);
    }
}

fn block(out: &mut String, stmts: &[Stmt], indent: usize) {
    pad(out, indent);
    out.push_str("{\n");
    for stmt in stmts {
        write_stmt(out, stmt, indent + 1);
    }
    pad(out, indent);
    out.push_str("}\n");
}

fn write_stmt(out: &mut String, stmt: &Stmt, indent: usize) {
    pad(out, indent);
    match stmt {
        Stmt::Let { name, value } => {
            let _ = write!(out, "var {name} = ");
            write_expr(out, value, indent);
            out.push_str(";\n");
        }
        Stmt::Assign { target, value } => {
            write_expr(out, target, indent);
            out.push_str(" = ");
            write_expr(out, value, indent);
            out.push_str(";\n");
        }
        Stmt::CoalesceAssign { target, value } => {
            write_expr(out, target, indent);
            out.push_str(" ??= ");
            write_expr(out, value, indent);
            out.push_str(";\n");
        }
        Stmt::Expr(expr) => {
            write_expr(out, expr, indent);
            out.push_str(";\n");
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            out.push_str("if (");
            write_expr(out, cond, indent);
            out.push_str(")\n");
            block(out, then, indent);
            if !otherwise.is_empty() {
                pad(out, indent);
                out.push_str("else\n");
                block(out, otherwise, indent);
            }
        }
        Stmt::ForEach { item, source, body } => {
            let _ = write!(out, "foreach (var {item} in ");
            write_expr(out, source, indent);
            out.push_str(")\n");
            block(out, body, indent);
        }
        Stmt::For { index, bound, body } => {
            let _ = write!(out, "for (var {index} = 0; {index} < ");
            write_expr(out, bound, indent);
            let _ = writeln!(out, "; {index}++)");
            block(out, body, indent);
        }
        Stmt::Return(None) => out.push_str("return;\n"),
        Stmt::Return(Some(expr)) => {
            out.push_str("return ");
            write_expr(out, expr, indent);
            out.push_str(";\n");
        }
        Stmt::Throw(expr) => {
            out.push_str("throw ");
            write_expr(out, expr, indent);
            out.push_str(";\n");
        }
    }
}

/// Expressions that need parentheses when used as an operand or receiver.
fn is_compound(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Cast { .. }
            | Expr::Binary { .. }
            | Expr::Conditional { .. }
            | Expr::Lambda { .. }
            | Expr::Switch { .. }
            | Expr::Throw(_)
    )
}

fn write_operand(out: &mut String, expr: &Expr, indent: usize) {
    if is_compound(expr) {
        out.push('(');
        write_expr(out, expr, indent);
        out.push(')');
    } else {
        write_expr(out, expr, indent);
    }
}

fn write_args(out: &mut String, args: &[Expr], indent: usize) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(out, arg, indent);
    }
    out.push(')');
}

fn write_expr(out: &mut String, expr: &Expr, indent: usize) {
    match expr {
        Expr::Source => out.push_str("<source>"),
        Expr::Ident(name) | Expr::Literal(name) => out.push_str(name),
        Expr::Member {
            receiver,
            name,
            conditional,
        } => {
            write_operand(out, receiver, indent);
            out.push_str(if *conditional { "?." } else { "." });
            out.push_str(name);
        }
        Expr::Index { receiver, index } => {
            write_operand(out, receiver, indent);
            out.push('[');
            write_expr(out, index, indent);
            out.push(']');
        }
        Expr::Cast { ty, expr } => {
            let _ = write!(out, "({ty})");
            write_operand(out, expr, indent);
        }
        Expr::Call {
            receiver,
            method,
            args,
        } => {
            if let Some(receiver) = receiver {
                write_operand(out, receiver, indent);
                out.push('.');
            }
            out.push_str(method);
            write_args(out, args, indent);
        }
        Expr::Mapping { method, args } => {
            out.push_str(&method.name);
            write_args(out, args, indent);
        }
        Expr::New { ty, args, init } => {
            let _ = write!(out, "new {ty}");
            write_args(out, args, indent);
            if !init.is_empty() {
                out.push('\n');
                pad(out, indent);
                out.push_str("{\n");
                for (name, value) in init {
                    pad(out, indent + 1);
                    let _ = write!(out, "{name} = ");
                    write_expr(out, value, indent + 1);
                    out.push_str(",\n");
                }
                pad(out, indent);
                out.push('}');
            }
        }
        Expr::NewArray { element, len } => {
            // `new int[n][]` for jagged arrays.
            let (base, rank) = match element.find('[') {
                Some(pos) => element.split_at(pos),
                None => (element.as_str(), ""),
            };
            let _ = write!(out, "new {base}[");
            write_expr(out, len, indent);
            let _ = write!(out, "]{rank}");
        }
        Expr::Tuple(elements) => {
            out.push('(');
            for (i, (name, value)) in elements.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(name) = name {
                    let _ = write!(out, "{name}: ");
                }
                write_expr(out, value, indent);
            }
            out.push(')');
        }
        Expr::Binary { op, lhs, rhs } => {
            write_binary_operand(out, op, lhs, indent);
            let _ = write!(out, " {op} ");
            let rhs_is_throw = matches!(**rhs, Expr::Throw(_)) && *op == "??";
            if rhs_is_throw {
                write_expr(out, rhs, indent);
            } else {
                write_binary_operand(out, op, rhs, indent);
            }
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            write_operand(out, cond, indent);
            out.push_str(" ? ");
            write_operand(out, then, indent);
            out.push_str(" : ");
            // `throw` is allowed as the last operand of a conditional.
            if matches!(**otherwise, Expr::Throw(_)) {
                write_expr(out, otherwise, indent);
            } else {
                write_operand(out, otherwise, indent);
            }
        }
        Expr::Lambda { param, body } => {
            let _ = write!(out, "{param} => ");
            write_expr(out, body, indent);
        }
        Expr::Switch { subject, arms } => {
            write_operand(out, subject, indent);
            out.push_str(" switch\n");
            pad(out, indent);
            out.push_str("{\n");
            for arm in arms {
                pad(out, indent + 1);
                write_pattern(out, &arm.pattern, indent + 1);
                out.push_str(" => ");
                write_expr(out, &arm.value, indent + 1);
                out.push_str(",\n");
            }
            pad(out, indent);
            out.push('}');
        }
        Expr::Throw(inner) => {
            out.push_str("throw ");
            write_expr(out, inner, indent);
        }
        Expr::NameOf(inner) => {
            out.push_str("nameof(");
            write_expr(out, inner, indent);
            out.push(')');
        }
        Expr::TypeOf(ty) => {
            let _ = write!(out, "typeof({ty})");
        }
        Expr::OutVar(name) => {
            let _ = write!(out, "out var {name}");
        }
    }
}

fn write_binary_operand(out: &mut String, op: &str, operand: &Expr, indent: usize) {
    match operand {
        // `a ?? b ?? c` and `a + b + c` chain without parentheses.
        Expr::Binary { op: inner, .. } if *inner == op && matches!(op, "??" | "+" | "&&") => {
            write_expr(out, operand, indent)
        }
        Expr::Binary { op: inner, .. } if op == "&&" && matches!(*inner, "==" | "!=") => {
            write_expr(out, operand, indent)
        }
        Expr::Cast { .. } => write_expr(out, operand, indent),
        _ => write_operand(out, operand, indent),
    }
}

fn write_pattern(out: &mut String, pattern: &Pattern, indent: usize) {
    match pattern {
        Pattern::Value(expr) => write_expr(out, expr, indent),
        Pattern::Type { ty, binding, guard } => {
            let _ = write!(out, "{ty} {binding}");
            if let Some(guard) = guard {
                out.push_str(" when ");
                write_expr(out, guard, indent);
            }
        }
        Pattern::Guarded { binding, guard } => {
            let _ = write!(out, "{{ }} {binding} when ");
            write_expr(out, guard, indent);
        }
        Pattern::Null => out.push_str("null"),
        Pattern::Discard => out.push('_'),
    }
}
