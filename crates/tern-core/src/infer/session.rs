//! Inference session and the typing rules shared by both walkers
//!
//! [`Inferencer`](super::Inferencer) and [`Lowerer`](crate::tir::Lowerer)
//! traverse the tree independently but route every constraint through the
//! methods here, in the same order, so the typed tree always agrees with
//! plain inference.

use crate::ast::{BinOp, Literal, Module, Param, Span, UnaryOp};
use crate::config::SemaConfig;
use crate::prelude::prelude_env;
use crate::types::{unify, TypeArena, TypeEnv, TypeError, TypeId, TypeKind, TypeScheme};
use std::collections::{BTreeMap, HashMap};

/// Owns every type variable allocated while checking one program.
///
/// Sessions share nothing, so independent programs can be checked on
/// separate threads, each with its own session.
#[derive(Debug)]
pub struct InferenceSession {
    pub(crate) arena: TypeArena,
    errors: Vec<TypeError>,
    prelude: bool,
    /// Return-type variables of the enclosing functions, innermost last
    returns: Vec<TypeId>,
}

/// Scope opened for a function or lambda body
pub(crate) struct FunctionFrame {
    pub env: TypeEnv,
    pub params: Vec<TypeId>,
    pub ret: TypeId,
    pub fun: TypeId,
}

impl InferenceSession {
    pub fn new() -> Self {
        Self::with_config(&SemaConfig::default())
    }

    pub fn with_config(config: &SemaConfig) -> Self {
        Self {
            arena: TypeArena::new(),
            errors: Vec::new(),
            prelude: config.prelude,
            returns: Vec::new(),
        }
    }

    pub fn arena(&self) -> &TypeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut TypeArena {
        &mut self.arena
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<TypeError> {
        std::mem::take(&mut self.errors)
    }

    /// Environment every module starts from
    pub fn base_env(&mut self) -> TypeEnv {
        if self.prelude {
            prelude_env(&mut self.arena)
        } else {
            TypeEnv::empty()
        }
    }

    pub(crate) fn report(&mut self, error: TypeError) {
        tracing::debug!(%error, "type error");
        self.errors.push(error);
    }

    pub(crate) fn fresh(&mut self) -> TypeId {
        self.arena.fresh_var()
    }

    /// Unify, collecting the failure instead of propagating it
    pub(crate) fn constrain(&mut self, expected: TypeId, found: TypeId, span: Span) -> bool {
        match unify(&mut self.arena, expected, found, span) {
            Ok(()) => true,
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    pub(crate) fn literal(&mut self, lit: &Literal) -> TypeId {
        match lit {
            Literal::Num(_) => self.arena.num(),
            Literal::Bool(_) => self.arena.bool(),
            Literal::Str(_) => self.arena.string(),
            Literal::None => self.arena.none(),
            Literal::Unit => self.arena.unit(),
        }
    }

    pub(crate) fn lookup(&mut self, env: &TypeEnv, name: &str, span: Span) -> TypeId {
        match env.lookup(name) {
            Some(scheme) => self.arena.instantiate(scheme),
            None => {
                self.report(TypeError::undefined_name(name, span));
                self.fresh()
            }
        }
    }

    pub(crate) fn unary(&mut self, op: UnaryOp, operand: TypeId, span: Span) -> TypeId {
        let expected = match op {
            UnaryOp::Neg => self.arena.num(),
            UnaryOp::Not => self.arena.bool(),
        };
        self.constrain(expected, operand, span);
        expected
    }

    pub(crate) fn binary(&mut self, op: BinOp, left: TypeId, right: TypeId, span: Span) -> TypeId {
        match op {
            // numeric or string addition: both sides share one type
            BinOp::Add => {
                let shared = self.fresh();
                self.constrain(shared, left, span);
                self.constrain(shared, right, span);
                shared
            }
            BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                let num = self.arena.num();
                self.constrain(num, left, span);
                self.constrain(num, right, span);
                num
            }
            BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
                let num = self.arena.num();
                self.constrain(num, left, span);
                self.constrain(num, right, span);
                self.arena.bool()
            }
            BinOp::Eq | BinOp::NotEq => {
                self.constrain(left, right, span);
                self.arena.bool()
            }
            BinOp::And | BinOp::Or => {
                let b = self.arena.bool();
                self.constrain(b, left, span);
                self.constrain(b, right, span);
                b
            }
        }
    }

    /// The callee must match `(args) -> result`; arity errors surface as
    /// unification failures.
    pub(crate) fn call(&mut self, callee: TypeId, args: Vec<TypeId>, span: Span) -> TypeId {
        let result = self.fresh();
        let expected = self.arena.fun(args, result);
        self.constrain(callee, expected, span);
        result
    }

    pub(crate) fn field(&mut self, base: TypeId, field: &str, span: Span) -> TypeId {
        let root = self.arena.resolve(base);
        match self.arena.kind(root).clone() {
            TypeKind::Record(fields) => match fields.get(field) {
                Some(ty) => *ty,
                None => {
                    let record = self.arena.to_type(root);
                    self.report(TypeError::undefined_field(field, &record, span));
                    self.fresh()
                }
            },
            TypeKind::Var(_) => {
                // not yet known to be a record; left unchecked
                tracing::debug!(field, %span, "field access on unresolved type");
                self.fresh()
            }
            _ => {
                let ty = self.arena.to_type(root);
                self.report(TypeError::undefined_field(field, &ty, span));
                self.fresh()
            }
        }
    }

    pub(crate) fn index(&mut self, base: TypeId, index: TypeId, span: Span) -> TypeId {
        let num = self.arena.num();
        self.constrain(num, index, span);
        let elem = self.fresh();
        let array = self.arena.array(elem);
        self.constrain(array, base, span);
        elem
    }

    pub(crate) fn array(&mut self, elems: &[(TypeId, Span)]) -> TypeId {
        let elem = self.fresh();
        for (ty, span) in elems {
            self.constrain(elem, *ty, *span);
        }
        self.arena.array(elem)
    }

    pub(crate) fn record(&mut self, fields: Vec<(String, TypeId)>) -> TypeId {
        let fields: BTreeMap<String, TypeId> = fields.into_iter().collect();
        self.arena.record(fields)
    }

    pub(crate) fn reference(&mut self, inner: TypeId) -> TypeId {
        self.arena.reference(inner)
    }

    pub(crate) fn deref(&mut self, target: TypeId, span: Span) -> TypeId {
        let inner = self.fresh();
        let expected = self.arena.reference(inner);
        self.constrain(expected, target, span);
        inner
    }

    pub(crate) fn condition(&mut self, ty: TypeId, span: Span) {
        let b = self.arena.bool();
        self.constrain(b, ty, span);
    }

    /// Result of an `if`: both branches unify; a missing else yields `Unit`.
    /// Branches that disagree leave a fresh variable so uses of the result
    /// report nothing further.
    pub(crate) fn branches(&mut self, then_ty: TypeId, else_ty: Option<TypeId>, span: Span) -> TypeId {
        match else_ty {
            Some(else_ty) if self.constrain(then_ty, else_ty, span) => then_ty,
            Some(_) => self.fresh(),
            None => self.arena.unit(),
        }
    }

    pub(crate) fn unit(&self) -> TypeId {
        self.arena.unit()
    }

    /// `return value?` constrains the innermost function's return type. The
    /// statement itself never yields a value, so its type is unconstrained.
    pub(crate) fn ret(&mut self, value: Option<TypeId>, span: Span) -> TypeId {
        if let Some(&expected) = self.returns.last() {
            let found = value.unwrap_or_else(|| self.arena.unit());
            self.constrain(expected, found, span);
        }
        self.fresh()
    }

    /// `let name = value`: generalise against the environment *before* the
    /// binding and return the extended environment.
    pub(crate) fn let_binding(&mut self, env: &TypeEnv, name: &str, value: TypeId) -> (TypeEnv, TypeScheme) {
        let scheme = self.generalize(env, value, None);
        (env.extend(name, scheme.clone()), scheme)
    }

    pub(crate) fn generalize(&mut self, env: &TypeEnv, ty: TypeId, skip: Option<&str>) -> TypeScheme {
        let env_free = env.free_vars_except(&mut self.arena, skip);
        self.arena.generalize(ty, &env_free)
    }

    /// Fresh parameter and return variables, with the function's own name
    /// bound monomorphically inside the body.
    pub(crate) fn enter_function(&mut self, env: &TypeEnv, name: Option<&str>, params: &[Param]) -> FunctionFrame {
        let param_tys: Vec<TypeId> = params.iter().map(|_| self.fresh()).collect();
        let ret = self.fresh();
        let fun = self.arena.fun(param_tys.clone(), ret);

        let mut inner = env.clone();
        if let Some(name) = name {
            inner = inner.extend(name, TypeScheme::monomorphic(fun));
        }
        for (param, ty) in params.iter().zip(&param_tys) {
            inner = inner.extend(param.name.as_str(), TypeScheme::monomorphic(*ty));
        }
        self.returns.push(ret);

        FunctionFrame {
            env: inner,
            params: param_tys,
            ret,
            fun,
        }
    }

    pub(crate) fn exit_function(&mut self, frame: &FunctionFrame, body: TypeId, span: Span) {
        self.returns.pop();
        self.constrain(frame.ret, body, span);
    }

    /// Bind a declared function in the outer environment, generalised.
    ///
    /// Top-level functions were pre-registered under `placeholder`; the
    /// inferred type is unified with it (callers in earlier functions may
    /// have constrained it) and the placeholder itself is ignored when
    /// computing which variables are still in use by the environment.
    pub(crate) fn bind_function(
        &mut self,
        env: &TypeEnv,
        name: &str,
        fun: TypeId,
        placeholder: Option<TypeId>,
        span: Span,
    ) -> (TypeEnv, TypeScheme) {
        let skip = match placeholder {
            Some(placeholder) => {
                self.constrain(placeholder, fun, span);
                Some(name)
            }
            None => None,
        };
        let scheme = self.generalize(env, fun, skip);
        tracing::debug!(function = name, ty = %self.arena.to_type(fun), "bound function");
        (env.extend(name, scheme.clone()), scheme)
    }

    /// First pass over a module: a monomorphic placeholder per top-level
    /// function so bodies can call any function regardless of order.
    pub(crate) fn register_functions(&mut self, env: &TypeEnv, module: &Module) -> (TypeEnv, HashMap<String, TypeId>) {
        let mut env = env.clone();
        let mut placeholders = HashMap::new();
        for decl in module.functions() {
            let placeholder = self.fresh();
            env = env.extend(decl.name.as_str(), TypeScheme::monomorphic(placeholder));
            placeholders.insert(decl.name.clone(), placeholder);
        }
        tracing::debug!(module = %module.name, functions = placeholders.len(), "registered functions");
        (env, placeholders)
    }
}

impl Default for InferenceSession {
    fn default() -> Self {
        Self::new()
    }
}
