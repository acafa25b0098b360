//! Typed intermediate representation
//!
//! Mirrors the surface AST with a type on every expression, statement,
//! parameter and function. Lowering builds the tree over arena ids
//! (`TypedProgram<TypeId>`) and finalises it to owned [`Type`]s once the
//! whole program has been inferred, so a use site early in a module sees the
//! type fixed by constraints found later.

mod lower;

pub use lower::Lowerer;

use crate::ast::{BinOp, Literal, Span, UnaryOp};
use crate::types::{Type, VarId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedProgram<T = Type> {
    pub modules: Vec<TypedModule<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedModule<T = Type> {
    pub name: String,
    pub body: Vec<TypedStmt<T>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedStmt<T = Type> {
    pub kind: TypedStmtKind<T>,
    /// Result type: the value for expression statements and `if`, `Unit` otherwise
    pub ty: T,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedStmtKind<T = Type> {
    Let {
        name: String,
        value: TypedExpr<T>,
        /// Variables quantified when the binding was generalised
        generalized: Vec<VarId>,
    },
    Assign {
        target: TypedExpr<T>,
        value: TypedExpr<T>,
    },
    Expr(TypedExpr<T>),
    If {
        condition: TypedExpr<T>,
        then_body: Vec<TypedStmt<T>>,
        else_body: Option<Vec<TypedStmt<T>>>,
    },
    While {
        condition: TypedExpr<T>,
        body: Vec<TypedStmt<T>>,
    },
    Function(TypedFunction<T>),
    Struct(TypedStruct<T>),
    Return(Option<TypedExpr<T>>),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedParam<T = Type> {
    pub name: String,
    pub ty: T,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedFunction<T = Type> {
    pub name: String,
    pub params: Vec<TypedParam<T>>,
    pub ret: T,
    pub body: Vec<TypedStmt<T>>,
    /// The full function type
    pub ty: T,
    pub generalized: Vec<VarId>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedStruct<T = Type> {
    pub name: String,
    pub fields: Vec<TypedField<T>>,
    pub ty: T,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedField<T = Type> {
    pub name: String,
    pub value: TypedExpr<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedExpr<T = Type> {
    pub kind: TypedExprKind<T>,
    pub ty: T,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedExprKind<T = Type> {
    Literal(Literal),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr<T>>,
    },
    Binary {
        op: BinOp,
        left: Box<TypedExpr<T>>,
        right: Box<TypedExpr<T>>,
    },
    Call {
        callee: Box<TypedExpr<T>>,
        args: Vec<TypedExpr<T>>,
    },
    Field {
        base: Box<TypedExpr<T>>,
        field: String,
    },
    Index {
        base: Box<TypedExpr<T>>,
        index: Box<TypedExpr<T>>,
    },
    Array(Vec<TypedExpr<T>>),
    Record(Vec<TypedField<T>>),
    Ref(Box<TypedExpr<T>>),
    Deref(Box<TypedExpr<T>>),
    If {
        condition: Box<TypedExpr<T>>,
        then_body: Vec<TypedStmt<T>>,
        else_body: Option<Vec<TypedStmt<T>>>,
    },
    Lambda {
        params: Vec<TypedParam<T>>,
        body: Vec<TypedStmt<T>>,
    },
}

// Type mapping. Used to finalise arena ids into owned types.

fn map_body<T, U, F: FnMut(T) -> U>(body: Vec<TypedStmt<T>>, f: &mut F) -> Vec<TypedStmt<U>> {
    body.into_iter().map(|s| s.map(f)).collect()
}

fn map_params<T, U, F: FnMut(T) -> U>(params: Vec<TypedParam<T>>, f: &mut F) -> Vec<TypedParam<U>> {
    params
        .into_iter()
        .map(|p| TypedParam {
            name: p.name,
            ty: f(p.ty),
            span: p.span,
        })
        .collect()
}

fn map_fields<T, U, F: FnMut(T) -> U>(fields: Vec<TypedField<T>>, f: &mut F) -> Vec<TypedField<U>> {
    fields
        .into_iter()
        .map(|field| TypedField {
            name: field.name,
            value: field.value.map(f),
        })
        .collect()
}

impl<T> TypedProgram<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: &mut F) -> TypedProgram<U> {
        TypedProgram {
            modules: self
                .modules
                .into_iter()
                .map(|m| TypedModule {
                    name: m.name,
                    body: map_body(m.body, f),
                })
                .collect(),
        }
    }
}

impl<T> TypedStmt<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: &mut F) -> TypedStmt<U> {
        let kind = match self.kind {
            TypedStmtKind::Let {
                name,
                value,
                generalized,
            } => TypedStmtKind::Let {
                name,
                value: value.map(f),
                generalized,
            },
            TypedStmtKind::Assign { target, value } => TypedStmtKind::Assign {
                target: target.map(f),
                value: value.map(f),
            },
            TypedStmtKind::Expr(e) => TypedStmtKind::Expr(e.map(f)),
            TypedStmtKind::If {
                condition,
                then_body,
                else_body,
            } => TypedStmtKind::If {
                condition: condition.map(f),
                then_body: map_body(then_body, f),
                else_body: else_body.map(|body| map_body(body, f)),
            },
            TypedStmtKind::While { condition, body } => TypedStmtKind::While {
                condition: condition.map(f),
                body: map_body(body, f),
            },
            TypedStmtKind::Function(func) => TypedStmtKind::Function(TypedFunction {
                name: func.name,
                params: map_params(func.params, f),
                ret: f(func.ret),
                body: map_body(func.body, f),
                ty: f(func.ty),
                generalized: func.generalized,
                span: func.span,
            }),
            TypedStmtKind::Struct(decl) => TypedStmtKind::Struct(TypedStruct {
                name: decl.name,
                fields: map_fields(decl.fields, f),
                ty: f(decl.ty),
                span: decl.span,
            }),
            TypedStmtKind::Return(value) => TypedStmtKind::Return(value.map(|v| v.map(f))),
            TypedStmtKind::Break => TypedStmtKind::Break,
            TypedStmtKind::Continue => TypedStmtKind::Continue,
        };
        TypedStmt {
            kind,
            ty: f(self.ty),
            span: self.span,
        }
    }
}

impl<T> TypedExpr<T> {
    pub fn map<U, F: FnMut(T) -> U>(self, f: &mut F) -> TypedExpr<U> {
        let boxed = |e: Box<TypedExpr<T>>, f: &mut F| Box::new(e.map(f));
        let kind = match self.kind {
            TypedExprKind::Literal(lit) => TypedExprKind::Literal(lit),
            TypedExprKind::Var(name) => TypedExprKind::Var(name),
            TypedExprKind::Unary { op, operand } => TypedExprKind::Unary {
                op,
                operand: boxed(operand, f),
            },
            TypedExprKind::Binary { op, left, right } => TypedExprKind::Binary {
                op,
                left: boxed(left, f),
                right: boxed(right, f),
            },
            TypedExprKind::Call { callee, args } => TypedExprKind::Call {
                callee: boxed(callee, f),
                args: args.into_iter().map(|a| a.map(f)).collect(),
            },
            TypedExprKind::Field { base, field } => TypedExprKind::Field {
                base: boxed(base, f),
                field,
            },
            TypedExprKind::Index { base, index } => TypedExprKind::Index {
                base: boxed(base, f),
                index: boxed(index, f),
            },
            TypedExprKind::Array(elems) => TypedExprKind::Array(elems.into_iter().map(|e| e.map(f)).collect()),
            TypedExprKind::Record(fields) => TypedExprKind::Record(map_fields(fields, f)),
            TypedExprKind::Ref(inner) => TypedExprKind::Ref(boxed(inner, f)),
            TypedExprKind::Deref(inner) => TypedExprKind::Deref(boxed(inner, f)),
            TypedExprKind::If {
                condition,
                then_body,
                else_body,
            } => TypedExprKind::If {
                condition: boxed(condition, f),
                then_body: map_body(then_body, f),
                else_body: else_body.map(|body| map_body(body, f)),
            },
            TypedExprKind::Lambda { params, body } => TypedExprKind::Lambda {
                params: map_params(params, f),
                body: map_body(body, f),
            },
        };
        TypedExpr {
            kind,
            ty: f(self.ty),
            span: self.span,
        }
    }
}

impl TypedProgram {
    /// Every typed expression in the program, outermost first
    pub fn exprs(&self) -> Vec<&TypedExpr> {
        let mut out = Vec::new();
        for module in &self.modules {
            collect_body(&module.body, &mut out);
        }
        out
    }
}

fn collect_body<'a, T>(body: &'a [TypedStmt<T>], out: &mut Vec<&'a TypedExpr<T>>) {
    for stmt in body {
        match &stmt.kind {
            TypedStmtKind::Let { value, .. } | TypedStmtKind::Expr(value) => collect_expr(value, out),
            TypedStmtKind::Assign { target, value } => {
                collect_expr(target, out);
                collect_expr(value, out);
            }
            TypedStmtKind::If {
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
            TypedStmtKind::While { condition, body } => {
                collect_expr(condition, out);
                collect_body(body, out);
            }
            TypedStmtKind::Function(func) => collect_body(&func.body, out),
            TypedStmtKind::Struct(decl) => {
                for field in &decl.fields {
                    collect_expr(&field.value, out);
                }
            }
            TypedStmtKind::Return(Some(value)) => collect_expr(value, out),
            TypedStmtKind::Return(None) | TypedStmtKind::Break | TypedStmtKind::Continue => {}
        }
    }
}

fn collect_expr<'a, T>(expr: &'a TypedExpr<T>, out: &mut Vec<&'a TypedExpr<T>>) {
    out.push(expr);
    match &expr.kind {
        TypedExprKind::Literal(_) | TypedExprKind::Var(_) => {}
        TypedExprKind::Unary { operand: inner, .. }
        | TypedExprKind::Field { base: inner, .. }
        | TypedExprKind::Ref(inner)
        | TypedExprKind::Deref(inner) => collect_expr(inner, out),
        TypedExprKind::Binary { left, right, .. } => {
            collect_expr(left, out);
            collect_expr(right, out);
        }
        TypedExprKind::Index { base, index } => {
            collect_expr(base, out);
            collect_expr(index, out);
        }
        TypedExprKind::Call { callee, args } => {
            collect_expr(callee, out);
            for arg in args {
                collect_expr(arg, out);
            }
        }
        TypedExprKind::Array(elems) => {
            for elem in elems {
                collect_expr(elem, out);
            }
        }
        TypedExprKind::Record(fields) => {
            for field in fields {
                collect_expr(&field.value, out);
            }
        }
        TypedExprKind::If {
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
        TypedExprKind::Lambda { body, .. } => collect_body(body, out),
    }
}

// Pretty-printing. Expressions render in source form; statements carry
// their types, one per line, nested bodies indented.

impl<T> fmt::Display for TypedExprKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedExprKind::Literal(lit) => write!(f, "{lit}"),
            TypedExprKind::Var(name) => write!(f, "{name}"),
            TypedExprKind::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand.kind),
            TypedExprKind::Binary { op, left, right } => {
                write!(f, "({} {} {})", left.kind, op.symbol(), right.kind)
            }
            TypedExprKind::Call { callee, args } => {
                write!(f, "{}(", callee.kind)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg.kind)?;
                }
                write!(f, ")")
            }
            TypedExprKind::Field { base, field } => write!(f, "{}.{field}", base.kind),
            TypedExprKind::Index { base, index } => write!(f, "{}[{}]", base.kind, index.kind),
            TypedExprKind::Array(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem.kind)?;
                }
                write!(f, "]")
            }
            TypedExprKind::Record(fields) if fields.is_empty() => write!(f, "{{}}"),
            TypedExprKind::Record(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", field.name, field.value.kind)?;
                }
                write!(f, " }}")
            }
            TypedExprKind::Ref(inner) => write!(f, "ref {}", inner.kind),
            TypedExprKind::Deref(inner) => write!(f, "*{}", inner.kind),
            TypedExprKind::If { condition, else_body, .. } => {
                write!(f, "if {} {{ .. }}", condition.kind)?;
                if else_body.is_some() {
                    write!(f, " else {{ .. }}")?;
                }
                Ok(())
            }
            TypedExprKind::Lambda { params, .. } => {
                write!(f, "fun (")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", param.name)?;
                }
                write!(f, ") => {{ .. }}")
            }
        }
    }
}

impl<T: fmt::Display> fmt::Display for TypedExpr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.ty)
    }
}

fn write_body<T: fmt::Display>(f: &mut fmt::Formatter<'_>, body: &[TypedStmt<T>], depth: usize) -> fmt::Result {
    for stmt in body {
        write_stmt(f, stmt, depth)?;
    }
    Ok(())
}

fn write_stmt<T: fmt::Display>(f: &mut fmt::Formatter<'_>, stmt: &TypedStmt<T>, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    match &stmt.kind {
        TypedStmtKind::Let { name, value, .. } => writeln!(f, "{pad}let {name}: {} = {}", value.ty, value.kind),
        TypedStmtKind::Assign { target, value } => {
            writeln!(f, "{pad}{} = {}: {}", target.kind, value.kind, value.ty)
        }
        TypedStmtKind::Expr(e) => writeln!(f, "{pad}{e}"),
        TypedStmtKind::If {
            condition,
            then_body,
            else_body,
        } => {
            writeln!(f, "{pad}if {}: {}", condition.kind, stmt.ty)?;
            write_body(f, then_body, depth + 1)?;
            if let Some(body) = else_body {
                writeln!(f, "{pad}else")?;
                write_body(f, body, depth + 1)?;
            }
            Ok(())
        }
        TypedStmtKind::While { condition, body } => {
            writeln!(f, "{pad}while {}", condition.kind)?;
            write_body(f, body, depth + 1)
        }
        TypedStmtKind::Function(func) => {
            write!(f, "{pad}fun {}(", func.name)?;
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", param.name, param.ty)?;
            }
            writeln!(f, ") -> {}", func.ret)?;
            write_body(f, &func.body, depth + 1)
        }
        TypedStmtKind::Struct(decl) => writeln!(f, "{pad}struct {}: {}", decl.name, decl.ty),
        TypedStmtKind::Return(Some(value)) => writeln!(f, "{pad}return {value}"),
        TypedStmtKind::Return(None) => writeln!(f, "{pad}return"),
        TypedStmtKind::Break => writeln!(f, "{pad}break"),
        TypedStmtKind::Continue => writeln!(f, "{pad}continue"),
    }
}

impl<T: fmt::Display> fmt::Display for TypedStmt<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl<T: fmt::Display> fmt::Display for TypedModule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        write_body(f, &self.body, 1)
    }
}

impl<T: fmt::Display> fmt::Display for TypedProgram<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for module in &self.modules {
            write!(f, "{module}")?;
        }
        Ok(())
    }
}
