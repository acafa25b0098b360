//! Untyped program tree
//!
//! This is the boundary with the parser: every node carries the source span
//! it was parsed from, and the semantic passes only ever read it. The
//! [`build`] module offers terse constructors for trees assembled by hand
//! (tests, demos, embedding tools that synthesize code).

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Source location (1-based lines and columns, end inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// A span covering a single whole line
    pub fn line(line: u32) -> Self {
        Self::new(line, 1, line, 1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_col, self.end_line, self.end_col
        )
    }
}

/// A whole compilation: one or more modules
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub modules: Vec<Module>,
}

impl Program {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Program made of a single anonymous module
    pub fn single(body: Vec<Stmt>) -> Self {
        Self::new(vec![Module::new("main", body)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub body: Vec<Stmt>,
}

impl Module {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Top-level function declarations, in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.body.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Function(decl) => Some(decl),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Let { name: String, value: Expr },
    Assign { target: Expr, value: Expr },
    Expr(Expr),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While { condition: Expr, body: Vec<Stmt> },
    Function(FunctionDecl),
    Struct(StructDecl),
    Return(Option<Expr>),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: SmallVec<[Param; 4]>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<FieldInit>,
    pub span: Span,
}

/// `name = value` inside a struct declaration or record literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: String,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Array(Vec<Expr>),
    Record(Vec<FieldInit>),
    Ref(Box<Expr>),
    Deref(Box<Expr>),
    If {
        condition: Box<Expr>,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Lambda {
        params: SmallVec<[Param; 4]>,
        body: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Num(f64),
    Bool(bool),
    Str(String),
    None,
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Num(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::None => write!(f, "none"),
            Literal::Unit => write!(f, "()"),
        }
    }
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    write!(f, "({})", names.join(", "))
}

fn write_fields(f: &mut fmt::Formatter<'_>, fields: &[FieldInit]) -> fmt::Result {
    write!(f, "{{")?;
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, " {} = {}", field.name, field.value)?;
    }
    if !fields.is_empty() {
        write!(f, " ")?;
    }
    write!(f, "}}")
}

/// Expressions render as compact single-line source. Nested blocks (if/lambda
/// bodies) are elided to `{ .. }`.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Var(name) => write!(f, "{name}"),
            ExprKind::Unary { op, operand } => write!(f, "{}{operand}", op.symbol()),
            ExprKind::Binary { op, left, right } => {
                write!(f, "({left} {} {right})", op.symbol())
            }
            ExprKind::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Field { base, field } => write!(f, "{base}.{field}"),
            ExprKind::Index { base, index } => write!(f, "{base}[{index}]"),
            ExprKind::Array(elems) => {
                write!(f, "[")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, "]")
            }
            ExprKind::Record(fields) => write_fields(f, fields),
            ExprKind::Ref(inner) => write!(f, "ref {inner}"),
            ExprKind::Deref(inner) => write!(f, "*{inner}"),
            ExprKind::If {
                condition,
                else_body,
                ..
            } => {
                write!(f, "if {condition} {{ .. }}")?;
                if else_body.is_some() {
                    write!(f, " else {{ .. }}")?;
                }
                Ok(())
            }
            ExprKind::Lambda { params, .. } => {
                write!(f, "fun ")?;
                write_params(f, params)?;
                write!(f, " => {{ .. }}")
            }
        }
    }
}

/// Statements render as their header line only; bodies are elided.
impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Let { name, value } => write!(f, "let {name} = {value}"),
            StmtKind::Assign { target, value } => write!(f, "{target} = {value}"),
            StmtKind::Expr(expr) => write!(f, "{expr}"),
            StmtKind::If { condition, .. } => write!(f, "if {condition}"),
            StmtKind::While { condition, .. } => write!(f, "while {condition}"),
            StmtKind::Function(decl) => {
                write!(f, "fun {}", decl.name)?;
                write_params(f, &decl.params)
            }
            StmtKind::Struct(decl) => {
                write!(f, "struct {} ", decl.name)?;
                write_fields(f, &decl.fields)
            }
            StmtKind::Return(Some(value)) => write!(f, "return {value}"),
            StmtKind::Return(None) => write!(f, "return"),
            StmtKind::Break => write!(f, "break"),
            StmtKind::Continue => write!(f, "continue"),
        }
    }
}

/// Terse constructors for hand-assembled trees.
///
/// Every node gets a default span; use [`Expr::at`] / [`Stmt::at`] to place
/// nodes when locations matter.
pub mod build {
    use super::*;

    fn expr(kind: ExprKind) -> Expr {
        Expr {
            kind,
            span: Span::default(),
        }
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt {
            kind,
            span: Span::default(),
        }
    }

    fn params(names: &[&str]) -> SmallVec<[Param; 4]> {
        names
            .iter()
            .map(|name| Param {
                name: (*name).to_string(),
                span: Span::default(),
            })
            .collect()
    }

    pub fn num(n: f64) -> Expr {
        expr(ExprKind::Literal(Literal::Num(n)))
    }

    pub fn boolean(b: bool) -> Expr {
        expr(ExprKind::Literal(Literal::Bool(b)))
    }

    pub fn string(s: &str) -> Expr {
        expr(ExprKind::Literal(Literal::Str(s.to_string())))
    }

    pub fn none() -> Expr {
        expr(ExprKind::Literal(Literal::None))
    }

    pub fn unit() -> Expr {
        expr(ExprKind::Literal(Literal::Unit))
    }

    pub fn var(name: &str) -> Expr {
        expr(ExprKind::Var(name.to_string()))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        expr(ExprKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        expr(ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn call(callee: &str, args: Vec<Expr>) -> Expr {
        call_expr(var(callee), args)
    }

    pub fn call_expr(callee: Expr, args: Vec<Expr>) -> Expr {
        expr(ExprKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn field(base: Expr, name: &str) -> Expr {
        expr(ExprKind::Field {
            base: Box::new(base),
            field: name.to_string(),
        })
    }

    pub fn index(base: Expr, idx: Expr) -> Expr {
        expr(ExprKind::Index {
            base: Box::new(base),
            index: Box::new(idx),
        })
    }

    pub fn array(elems: Vec<Expr>) -> Expr {
        expr(ExprKind::Array(elems))
    }

    pub fn record(fields: Vec<(&str, Expr)>) -> Expr {
        expr(ExprKind::Record(field_inits(fields)))
    }

    pub fn reference(inner: Expr) -> Expr {
        expr(ExprKind::Ref(Box::new(inner)))
    }

    pub fn deref(inner: Expr) -> Expr {
        expr(ExprKind::Deref(Box::new(inner)))
    }

    pub fn if_expr(condition: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Expr {
        expr(ExprKind::If {
            condition: Box::new(condition),
            then_body,
            else_body,
        })
    }

    pub fn lambda(param_names: &[&str], body: Vec<Stmt>) -> Expr {
        expr(ExprKind::Lambda {
            params: params(param_names),
            body,
        })
    }

    pub fn let_(name: &str, value: Expr) -> Stmt {
        stmt(StmtKind::Let {
            name: name.to_string(),
            value,
        })
    }

    pub fn assign(name: &str, value: Expr) -> Stmt {
        assign_to(var(name), value)
    }

    pub fn assign_to(target: Expr, value: Expr) -> Stmt {
        stmt(StmtKind::Assign { target, value })
    }

    pub fn expr_stmt(e: Expr) -> Stmt {
        stmt(StmtKind::Expr(e))
    }

    pub fn if_(condition: Expr, then_body: Vec<Stmt>, else_body: Option<Vec<Stmt>>) -> Stmt {
        stmt(StmtKind::If {
            condition,
            then_body,
            else_body,
        })
    }

    pub fn while_(condition: Expr, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::While { condition, body })
    }

    pub fn function_decl(name: &str, param_names: &[&str], body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            params: params(param_names),
            body,
            span: Span::default(),
        }
    }

    pub fn function(name: &str, param_names: &[&str], body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::Function(function_decl(name, param_names, body)))
    }

    /// `fun name(params) => body_expr`
    pub fn arrow_function(name: &str, param_names: &[&str], body: Expr) -> Stmt {
        function(name, param_names, vec![expr_stmt(body)])
    }

    pub fn structure(name: &str, fields: Vec<(&str, Expr)>) -> Stmt {
        stmt(StmtKind::Struct(StructDecl {
            name: name.to_string(),
            fields: field_inits(fields),
            span: Span::default(),
        }))
    }

    pub fn ret(value: Option<Expr>) -> Stmt {
        stmt(StmtKind::Return(value))
    }

    pub fn break_() -> Stmt {
        stmt(StmtKind::Break)
    }

    pub fn continue_() -> Stmt {
        stmt(StmtKind::Continue)
    }

    fn field_inits(fields: Vec<(&str, Expr)>) -> Vec<FieldInit> {
        fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: name.to_string(),
                value,
            })
            .collect()
    }
}

impl Expr {
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl Stmt {
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn test_stmt_display() {
        let stmt = let_("y", binary(BinOp::Mul, var("x"), num(2.0)));
        assert_eq!(stmt.to_string(), "let y = (x * 2)");

        let stmt = expr_stmt(call("print", vec![var("y"), string("hi")]));
        assert_eq!(stmt.to_string(), "print(y, \"hi\")");
    }

    #[test]
    fn test_function_display_elides_body() {
        let stmt = arrow_function("add", &["a", "b"], binary(BinOp::Add, var("a"), var("b")));
        assert_eq!(stmt.to_string(), "fun add(a, b)");
    }

    #[test]
    fn test_record_display() {
        let e = record(vec![("x", num(1.0)), ("y", boolean(true))]);
        assert_eq!(e.to_string(), "{ x = 1, y = true }");
        assert_eq!(record(vec![]).to_string(), "{}");
    }

    #[test]
    fn test_module_functions() {
        let module = Module::new(
            "m",
            vec![
                let_("x", num(1.0)),
                arrow_function("f", &["a"], var("a")),
                arrow_function("g", &[], num(0.0)),
            ],
        );
        let names: Vec<&str> = module.functions().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["f", "g"]);
    }

    #[test]
    fn test_span_display() {
        assert_eq!(Span::new(3, 5, 3, 12).to_string(), "3:5-3:12");
    }
}
