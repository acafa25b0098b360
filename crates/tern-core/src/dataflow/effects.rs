//! Names defined and used by CFG statements

use super::cfg::CfgStmt;
use crate::ast::{Expr, ExprKind, Stmt, StmtKind};
use std::collections::BTreeSet;

/// Names a statement (re)defines
pub fn defined_names(stmt: &CfgStmt) -> BTreeSet<String> {
    let mut defs = BTreeSet::new();
    match stmt {
        CfgStmt::Param(name) => {
            defs.insert(name.clone());
        }
        CfgStmt::Stmt(stmt) => match &stmt.kind {
            StmtKind::Let { name, .. } => {
                defs.insert(name.clone());
            }
            StmtKind::Assign { target, .. } => {
                if let ExprKind::Var(name) = &target.kind {
                    defs.insert(name.clone());
                }
            }
            _ => {}
        },
        CfgStmt::Condition(_) => {}
    }
    defs
}

/// Names a statement reads. A store through a field, index or deref reads
/// the variables of its target.
pub fn used_names(stmt: &CfgStmt) -> BTreeSet<String> {
    let mut uses = BTreeSet::new();
    match stmt {
        CfgStmt::Param(_) => {}
        CfgStmt::Condition(cond) => collect_expr(cond, &mut uses),
        CfgStmt::Stmt(stmt) => match &stmt.kind {
            StmtKind::Let { value, .. } | StmtKind::Expr(value) | StmtKind::Return(Some(value)) => {
                collect_expr(value, &mut uses)
            }
            StmtKind::Assign { target, value } => {
                if !matches!(target.kind, ExprKind::Var(_)) {
                    collect_expr(target, &mut uses);
                }
                collect_expr(value, &mut uses);
            }
            StmtKind::Struct(decl) => {
                for field in &decl.fields {
                    collect_expr(&field.value, &mut uses);
                }
            }
            _ => {}
        },
    }
    uses
}

/// Root variable of a field, index or deref store target (`a` in `a.b[i] = v`)
pub fn store_base(target: &Expr) -> Option<&str> {
    match &target.kind {
        ExprKind::Var(_) => None,
        _ => root_var(target),
    }
}

fn root_var(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Var(name) => Some(name),
        ExprKind::Field { base, .. } | ExprKind::Index { base, .. } | ExprKind::Deref(base) => root_var(base),
        _ => None,
    }
}

/// Every variable mentioned in `expr`, including captures inside nested
/// lambda and `if` bodies. Lambda parameters are not free.
pub fn collect_expr(expr: &Expr, out: &mut BTreeSet<String>) {
    match &expr.kind {
        ExprKind::Literal(_) => {}
        ExprKind::Var(name) => {
            out.insert(name.clone());
        }
        ExprKind::Unary { operand: inner, .. }
        | ExprKind::Field { base: inner, .. }
        | ExprKind::Ref(inner)
        | ExprKind::Deref(inner) => collect_expr(inner, out),
        ExprKind::Binary { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        ExprKind::Index { base, index } => {
            collect_expr(base, out);
            collect_expr(index, out);
        }
        ExprKind::Call { callee, args } => {
            collect_expr(callee, out);
            for arg in args {
                collect_expr(arg, out);
            }
        }
        ExprKind::Array(elems) => {
            for elem in elems {
                collect_expr(elem, out);
            }
        }
        ExprKind::Record(fields) => {
            for field in fields {
                collect_expr(&field.value, out);
            }
        }
        ExprKind::If {
            condition,
            then_body,
            else_body,
        } => {
            collect_expr(condition, out);
            collect_body(then_body, out);
            if let Some(body) = else_body {
                collect_body(body, out);
            }
        }
        ExprKind::Lambda { params, body } => {
            let mut inner = BTreeSet::new();
            collect_body(body, &mut inner);
            for param in params {
                inner.remove(&param.name);
            }
            out.extend(inner);
        }
    }
}

/// Free variables of a statement list. A `let`, function or struct binds
/// its name for the statements after it, nested bodies are scoped blocks,
/// and nested function declarations contribute their own free variables.
pub fn collect_body(body: &[Stmt], out: &mut BTreeSet<String>) {
    let mut bound = BTreeSet::new();
    for stmt in body {
        let mut uses = BTreeSet::new();
        collect_stmt(stmt, &mut uses);
        out.extend(uses.into_iter().filter(|name| !bound.contains(name)));
        match &stmt.kind {
            StmtKind::Let { name, .. } => {
                bound.insert(name.clone());
            }
            StmtKind::Function(decl) => {
                bound.insert(decl.name.clone());
            }
            StmtKind::Struct(decl) => {
                bound.insert(decl.name.clone());
            }
            _ => {}
        }
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut BTreeSet<String>) {
    match &stmt.kind {
        StmtKind::Let { value, .. } | StmtKind::Expr(value) | StmtKind::Return(Some(value)) => {
            collect_expr(value, out)
        }
        StmtKind::Assign { target, value } => {
            collect_expr(target, out);
            collect_expr(value, out);
        }
        StmtKind::If {
            condition,
            then_body,
            else_body,
        } => {
            collect_expr(condition, out);
            collect_body(then_body, out);
            if let Some(body) = else_body {
                collect_body(body, out);
            }
        }
        StmtKind::While { condition, body } => {
            collect_expr(condition, out);
            collect_body(body, out);
        }
        StmtKind::Function(decl) => {
            let mut inner = BTreeSet::new();
            collect_body(&decl.body, &mut inner);
            inner.remove(&decl.name);
            for param in &decl.params {
                inner.remove(&param.name);
            }
            out.extend(inner);
        }
        StmtKind::Struct(decl) => {
            for field in &decl.fields {
                collect_expr(&field.value, out);
            }
        }
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
    }
}
