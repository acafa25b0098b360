//! Hindley–Milner inference over the surface AST
//!
//! Each module is checked in two passes. The first gives every top-level
//! function a placeholder and infers the functions in declaration order,
//! generalising each as it completes. The second walks the remaining
//! statements in order. Errors are collected; inference never stops early.

mod session;

pub use session::InferenceSession;

use crate::ast::{Expr, ExprKind, FunctionDecl, Module, Program, Span, Stmt, StmtKind, StructDecl};
use crate::types::{TypeEnv, TypeError, TypeId};
use std::collections::HashMap;
use tracing::debug;

impl InferenceSession {
    /// Infer every module of `program`, returning the collected errors
    pub fn infer_program(&mut self, program: &Program) -> Vec<TypeError> {
        let mut inferencer = Inferencer { session: self };
        for module in &program.modules {
            inferencer.infer_module(module);
        }
        self.take_errors()
    }
}

/// Inference walker producing only types
pub struct Inferencer<'s> {
    session: &'s mut InferenceSession,
}

impl<'s> Inferencer<'s> {
    pub fn new(session: &'s mut InferenceSession) -> Self {
        Self { session }
    }

    pub fn infer_module(&mut self, module: &Module) -> TypeEnv {
        debug!(module = %module.name, "inferring module");
        let base = self.session.base_env();
        let (mut env, placeholders) = self.session.register_functions(&base, module);

        for stmt in &module.body {
            if let StmtKind::Function(decl) = &stmt.kind {
                let placeholder = placeholder_for(&placeholders, decl);
                env = self.function(&env, decl, placeholder);
            }
        }
        for stmt in &module.body {
            if !matches!(stmt.kind, StmtKind::Function(_)) {
                env = self.stmt(&env, stmt).0;
            }
        }
        env
    }

    fn function(&mut self, env: &TypeEnv, decl: &FunctionDecl, placeholder: Option<TypeId>) -> TypeEnv {
        let frame = self.session.enter_function(env, Some(&decl.name), &decl.params);
        let body = self.block(&frame.env, &decl.body);
        self.session.exit_function(&frame, body, decl.span);
        self.session
            .bind_function(env, &decl.name, frame.fun, placeholder, decl.span)
            .0
    }

    fn structure(&mut self, env: &TypeEnv, decl: &StructDecl) -> TypeEnv {
        let fields = decl
            .fields
            .iter()
            .map(|f| (f.name.clone(), self.expr(env, &f.value)))
            .collect();
        let record = self.session.record(fields);
        self.session.let_binding(env, &decl.name, record).0
    }

    /// A block opens a scope; its type is that of its last statement
    fn block(&mut self, env: &TypeEnv, stmts: &[Stmt]) -> TypeId {
        let mut env = env.clone();
        let mut result = self.session.unit();
        for stmt in stmts {
            let (next, ty) = self.stmt(&env, stmt);
            env = next;
            result = ty;
        }
        result
    }

    fn stmt(&mut self, env: &TypeEnv, stmt: &Stmt) -> (TypeEnv, TypeId) {
        let unit = self.session.unit();
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let ty = self.expr(env, value);
                (self.session.let_binding(env, name, ty).0, unit)
            }
            StmtKind::Assign { target, value } => {
                let target_ty = self.expr(env, target);
                let value_ty = self.expr(env, value);
                self.session.constrain(target_ty, value_ty, stmt.span);
                (env.clone(), unit)
            }
            StmtKind::Expr(e) => {
                let ty = self.expr(env, e);
                (env.clone(), ty)
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let ty = self.if_(env, condition, then_body, else_body.as_deref(), stmt.span);
                (env.clone(), ty)
            }
            StmtKind::While { condition, body } => {
                let cond = self.expr(env, condition);
                self.session.condition(cond, condition.span);
                self.block(env, body);
                (env.clone(), unit)
            }
            StmtKind::Function(decl) => (self.function(env, decl, None), unit),
            StmtKind::Struct(decl) => (self.structure(env, decl), unit),
            StmtKind::Return(value) => {
                let value = value.as_ref().map(|v| self.expr(env, v));
                (env.clone(), self.session.ret(value, stmt.span))
            }
            StmtKind::Break | StmtKind::Continue => (env.clone(), unit),
        }
    }

    fn if_(
        &mut self,
        env: &TypeEnv,
        condition: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
        span: Span,
    ) -> TypeId {
        let cond = self.expr(env, condition);
        self.session.condition(cond, condition.span);
        let then_ty = self.block(env, then_body);
        let else_ty = else_body.map(|body| self.block(env, body));
        self.session.branches(then_ty, else_ty, span)
    }

    pub fn expr(&mut self, env: &TypeEnv, expr: &Expr) -> TypeId {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Literal(lit) => self.session.literal(lit),
            ExprKind::Var(name) => self.session.lookup(env, name, span),
            ExprKind::Unary { op, operand } => {
                let operand = self.expr(env, operand);
                self.session.unary(*op, operand, span)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.expr(env, left);
                let right = self.expr(env, right);
                self.session.binary(*op, left, right, span)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.expr(env, callee);
                let args = args.iter().map(|a| self.expr(env, a)).collect();
                self.session.call(callee, args, span)
            }
            ExprKind::Field { base, field } => {
                let base = self.expr(env, base);
                self.session.field(base, field, span)
            }
            ExprKind::Index { base, index } => {
                let base = self.expr(env, base);
                let index = self.expr(env, index);
                self.session.index(base, index, span)
            }
            ExprKind::Array(elems) => {
                let elems: Vec<_> = elems.iter().map(|e| (self.expr(env, e), e.span)).collect();
                self.session.array(&elems)
            }
            ExprKind::Record(fields) => {
                let fields = fields
                    .iter()
                    .map(|f| (f.name.clone(), self.expr(env, &f.value)))
                    .collect();
                self.session.record(fields)
            }
            ExprKind::Ref(inner) => {
                let inner = self.expr(env, inner);
                self.session.reference(inner)
            }
            ExprKind::Deref(inner) => {
                let inner = self.expr(env, inner);
                self.session.deref(inner, span)
            }
            ExprKind::If {
                condition,
                then_body,
                else_body,
            } => self.if_(env, condition, then_body, else_body.as_deref(), span),
            ExprKind::Lambda { params, body } => {
                let frame = self.session.enter_function(env, None, params);
                let body_ty = self.block(&frame.env, body);
                self.session.exit_function(&frame, body_ty, span);
                frame.fun
            }
        }
    }
}

/// Placeholder lookup shared with the lowering walker
pub(crate) fn placeholder_for(placeholders: &HashMap<String, TypeId>, decl: &FunctionDecl) -> Option<TypeId> {
    placeholders.get(&decl.name).copied()
}
