//! AST to typed tree
//!
//! Walks the program in the same order as [`Inferencer`](crate::infer::Inferencer)
//! and applies the same session rules, recording the arena id of every node.

use super::*;
use crate::ast::{Expr, ExprKind, FunctionDecl, Module, Param, Program, Stmt, StmtKind, StructDecl};
use crate::infer::{placeholder_for, InferenceSession};
use crate::types::{TypeEnv, TypeError, TypeId, TypeScheme};
use tracing::debug;

impl InferenceSession {
    /// Lower every module, then finalise all types against the completed
    /// substitution.
    pub fn lower_program(&mut self, program: &Program) -> (TypedProgram, Vec<TypeError>) {
        let mut lowerer = Lowerer::new(self);
        let modules = program.modules.iter().map(|m| lowerer.lower_module(m)).collect();
        let raw = TypedProgram { modules };

        let arena = &mut self.arena;
        let typed = raw.map(&mut |id| arena.to_type(id));
        (typed, self.take_errors())
    }
}

/// Lowering walker producing a typed tree over arena ids
pub struct Lowerer<'s> {
    session: &'s mut InferenceSession,
}

impl<'s> Lowerer<'s> {
    pub fn new(session: &'s mut InferenceSession) -> Self {
        Self { session }
    }

    pub fn lower_module(&mut self, module: &Module) -> TypedModule<TypeId> {
        debug!(module = %module.name, "lowering module");
        let base = self.session.base_env();
        let (mut env, placeholders) = self.session.register_functions(&base, module);

        let mut lowered: Vec<Option<TypedStmt<TypeId>>> = vec![None; module.body.len()];
        for (slot, stmt) in lowered.iter_mut().zip(&module.body) {
            if let StmtKind::Function(decl) = &stmt.kind {
                let placeholder = placeholder_for(&placeholders, decl);
                let (next, func) = self.function(&env, decl, placeholder);
                env = next;
                *slot = Some(self.unit_stmt(TypedStmtKind::Function(func), stmt.span));
            }
        }
        for (slot, stmt) in lowered.iter_mut().zip(&module.body) {
            if !matches!(stmt.kind, StmtKind::Function(_)) {
                let (next, typed) = self.stmt(&env, stmt);
                env = next;
                *slot = Some(typed);
            }
        }

        TypedModule {
            name: module.name.clone(),
            body: lowered.into_iter().flatten().collect(),
        }
    }

    fn unit_stmt(&self, kind: TypedStmtKind<TypeId>, span: Span) -> TypedStmt<TypeId> {
        TypedStmt {
            kind,
            ty: self.session.unit(),
            span,
        }
    }

    fn params(params: &[Param], tys: &[TypeId]) -> Vec<TypedParam<TypeId>> {
        params
            .iter()
            .zip(tys)
            .map(|(param, ty)| TypedParam {
                name: param.name.clone(),
                ty: *ty,
                span: param.span,
            })
            .collect()
    }

    fn function(
        &mut self,
        env: &TypeEnv,
        decl: &FunctionDecl,
        placeholder: Option<TypeId>,
    ) -> (TypeEnv, TypedFunction<TypeId>) {
        let frame = self.session.enter_function(env, Some(&decl.name), &decl.params);
        let (body, body_ty) = self.block(&frame.env, &decl.body);
        self.session.exit_function(&frame, body_ty, decl.span);
        let (env, scheme) = self
            .session
            .bind_function(env, &decl.name, frame.fun, placeholder, decl.span);

        let func = TypedFunction {
            name: decl.name.clone(),
            params: Self::params(&decl.params, &frame.params),
            ret: frame.ret,
            body,
            ty: frame.fun,
            generalized: quantified(&scheme),
            span: decl.span,
        };
        (env, func)
    }

    fn structure(&mut self, env: &TypeEnv, decl: &StructDecl) -> (TypeEnv, TypedStruct<TypeId>) {
        let fields: Vec<TypedField<TypeId>> = decl
            .fields
            .iter()
            .map(|f| TypedField {
                name: f.name.clone(),
                value: self.expr(env, &f.value),
            })
            .collect();
        let record = self
            .session
            .record(fields.iter().map(|f| (f.name.clone(), f.value.ty)).collect());
        let (env, _) = self.session.let_binding(env, &decl.name, record);
        let typed = TypedStruct {
            name: decl.name.clone(),
            fields,
            ty: record,
            span: decl.span,
        };
        (env, typed)
    }

    fn block(&mut self, env: &TypeEnv, stmts: &[Stmt]) -> (Vec<TypedStmt<TypeId>>, TypeId) {
        let mut env = env.clone();
        let mut typed = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            let (next, lowered) = self.stmt(&env, stmt);
            env = next;
            typed.push(lowered);
        }
        let ty = typed.last().map_or_else(|| self.session.unit(), |s| s.ty);
        (typed, ty)
    }

    fn stmt(&mut self, env: &TypeEnv, stmt: &Stmt) -> (TypeEnv, TypedStmt<TypeId>) {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Let { name, value } => {
                let value = self.expr(env, value);
                let (env, scheme) = self.session.let_binding(env, name, value.ty);
                let kind = TypedStmtKind::Let {
                    name: name.clone(),
                    value,
                    generalized: quantified(&scheme),
                };
                (env, self.unit_stmt(kind, span))
            }
            StmtKind::Assign { target, value } => {
                let target = self.expr(env, target);
                let value = self.expr(env, value);
                self.session.constrain(target.ty, value.ty, span);
                (env.clone(), self.unit_stmt(TypedStmtKind::Assign { target, value }, span))
            }
            StmtKind::Expr(e) => {
                let e = self.expr(env, e);
                let ty = e.ty;
                (
                    env.clone(),
                    TypedStmt {
                        kind: TypedStmtKind::Expr(e),
                        ty,
                        span,
                    },
                )
            }
            StmtKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let (condition, then_body, else_body, ty) =
                    self.if_(env, condition, then_body, else_body.as_deref(), span);
                let kind = TypedStmtKind::If {
                    condition,
                    then_body,
                    else_body,
                };
                (env.clone(), TypedStmt { kind, ty, span })
            }
            StmtKind::While { condition, body } => {
                let condition = self.expr(env, condition);
                self.session.condition(condition.ty, condition.span);
                let (body, _) = self.block(env, body);
                (env.clone(), self.unit_stmt(TypedStmtKind::While { condition, body }, span))
            }
            StmtKind::Function(decl) => {
                let (env, func) = self.function(env, decl, None);
                (env, self.unit_stmt(TypedStmtKind::Function(func), span))
            }
            StmtKind::Struct(decl) => {
                let (env, typed) = self.structure(env, decl);
                (env, self.unit_stmt(TypedStmtKind::Struct(typed), span))
            }
            StmtKind::Return(value) => {
                let value = value.as_ref().map(|v| self.expr(env, v));
                let ty = self.session.ret(value.as_ref().map(|v| v.ty), span);
                let kind = TypedStmtKind::Return(value);
                (env.clone(), TypedStmt { kind, ty, span })
            }
            StmtKind::Break => (env.clone(), self.unit_stmt(TypedStmtKind::Break, span)),
            StmtKind::Continue => (env.clone(), self.unit_stmt(TypedStmtKind::Continue, span)),
        }
    }

    #[allow(clippy::type_complexity)]
    fn if_(
        &mut self,
        env: &TypeEnv,
        condition: &Expr,
        then_body: &[Stmt],
        else_body: Option<&[Stmt]>,
        span: Span,
    ) -> (
        TypedExpr<TypeId>,
        Vec<TypedStmt<TypeId>>,
        Option<Vec<TypedStmt<TypeId>>>,
        TypeId,
    ) {
        let condition = self.expr(env, condition);
        self.session.condition(condition.ty, condition.span);
        let (then_body, then_ty) = self.block(env, then_body);
        let else_part = else_body.map(|body| self.block(env, body));
        let else_ty = else_part.as_ref().map(|(_, ty)| *ty);
        let ty = self.session.branches(then_ty, else_ty, span);
        (condition, then_body, else_part.map(|(body, _)| body), ty)
    }

    pub fn expr(&mut self, env: &TypeEnv, expr: &Expr) -> TypedExpr<TypeId> {
        let span = expr.span;
        let (kind, ty) = match &expr.kind {
            ExprKind::Literal(lit) => (TypedExprKind::Literal(lit.clone()), self.session.literal(lit)),
            ExprKind::Var(name) => (
                TypedExprKind::Var(name.clone()),
                self.session.lookup(env, name, span),
            ),
            ExprKind::Unary { op, operand } => {
                let operand = self.expr(env, operand);
                let ty = self.session.unary(*op, operand.ty, span);
                (
                    TypedExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                )
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.expr(env, left);
                let right = self.expr(env, right);
                let ty = self.session.binary(*op, left.ty, right.ty, span);
                (
                    TypedExprKind::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                )
            }
            ExprKind::Call { callee, args } => {
                let callee = self.expr(env, callee);
                let args: Vec<_> = args.iter().map(|a| self.expr(env, a)).collect();
                let ty = self
                    .session
                    .call(callee.ty, args.iter().map(|a| a.ty).collect(), span);
                (
                    TypedExprKind::Call {
                        callee: Box::new(callee),
                        args,
                    },
                    ty,
                )
            }
            ExprKind::Field { base, field } => {
                let base = self.expr(env, base);
                let ty = self.session.field(base.ty, field, span);
                (
                    TypedExprKind::Field {
                        base: Box::new(base),
                        field: field.clone(),
                    },
                    ty,
                )
            }
            ExprKind::Index { base, index } => {
                let base = self.expr(env, base);
                let index = self.expr(env, index);
                let ty = self.session.index(base.ty, index.ty, span);
                (
                    TypedExprKind::Index {
                        base: Box::new(base),
                        index: Box::new(index),
                    },
                    ty,
                )
            }
            ExprKind::Array(elems) => {
                let elems: Vec<_> = elems.iter().map(|e| self.expr(env, e)).collect();
                let tys: Vec<_> = elems.iter().map(|e| (e.ty, e.span)).collect();
                let ty = self.session.array(&tys);
                (TypedExprKind::Array(elems), ty)
            }
            ExprKind::Record(fields) => {
                let fields: Vec<_> = fields
                    .iter()
                    .map(|f| TypedField {
                        name: f.name.clone(),
                        value: self.expr(env, &f.value),
                    })
                    .collect();
                let ty = self
                    .session
                    .record(fields.iter().map(|f| (f.name.clone(), f.value.ty)).collect());
                (TypedExprKind::Record(fields), ty)
            }
            ExprKind::Ref(inner) => {
                let inner = self.expr(env, inner);
                let ty = self.session.reference(inner.ty);
                (TypedExprKind::Ref(Box::new(inner)), ty)
            }
            ExprKind::Deref(inner) => {
                let inner = self.expr(env, inner);
                let ty = self.session.deref(inner.ty, span);
                (TypedExprKind::Deref(Box::new(inner)), ty)
            }
            ExprKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let (condition, then_body, else_body, ty) =
                    self.if_(env, condition, then_body, else_body.as_deref(), span);
                (
                    TypedExprKind::If {
                        condition: Box::new(condition),
                        then_body,
                        else_body,
                    },
                    ty,
                )
            }
            ExprKind::Lambda { params, body } => {
                let frame = self.session.enter_function(env, None, params);
                let (body, body_ty) = self.block(&frame.env, body);
                self.session.exit_function(&frame, body_ty, span);
                (
                    TypedExprKind::Lambda {
                        params: Self::params(params, &frame.params),
                        body,
                    },
                    frame.fun,
                )
            }
        };
        TypedExpr { kind, ty, span }
    }
}

fn quantified(scheme: &TypeScheme) -> Vec<VarId> {
    scheme.vars.iter().copied().collect()
}
