//! Constant propagation

use super::cfg::{BasicBlock, Cfg, CfgStmt};
use super::effects::{defined_names, store_base, used_names};
use super::lattice::{ConstEnv, ConstLattice, ConstValue};
use super::solver::{DataflowAnalysis, Direction};
use crate::ast::{BinOp, Expr, ExprKind, StmtKind, UnaryOp};
use std::collections::BTreeSet;

/// Forward analysis mapping each variable to ⊤ (not yet seen), a known
/// constant, or ⊥ (varies or unknown).
///
/// Expressions fold over literals, variables, unary and binary operators.
/// Anything else (calls, field and index reads, aggregates) is ⊥, as are
/// parameters and variables stored through (`a[i] = v` makes `a` ⊥).
/// Names the graph reads but never defines come from an outer scope and
/// are ⊥ from the entry on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantPropagation;

impl ConstantPropagation {
    pub fn new() -> Self {
        Self
    }

    /// Abstract value of `expr` under `env`
    pub fn eval(&self, expr: &Expr, env: &ConstEnv) -> ConstLattice {
        match &expr.kind {
            ExprKind::Literal(lit) => ConstLattice::Constant(lit.into()),
            ExprKind::Var(name) => env.get(name),
            ExprKind::Unary { op, operand } => match self.eval(operand, env) {
                ConstLattice::Constant(v) => fold_unary(*op, &v),
                other => other,
            },
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left, env);
                let right = self.eval(right, env);
                match (&left, &right) {
                    (ConstLattice::Bottom, _) | (_, ConstLattice::Bottom) => ConstLattice::Bottom,
                    (ConstLattice::Top, _) | (_, ConstLattice::Top) => ConstLattice::Top,
                    (ConstLattice::Constant(l), ConstLattice::Constant(r)) => fold_binary(*op, l, r),
                }
            }
            _ => ConstLattice::Bottom,
        }
    }

    fn apply(&self, stmt: &CfgStmt, env: &mut ConstEnv) {
        match stmt {
            CfgStmt::Param(name) => env.set(name.clone(), ConstLattice::Bottom),
            CfgStmt::Stmt(stmt) => match &stmt.kind {
                StmtKind::Let { name, value } => {
                    let value = self.eval(value, env);
                    env.set(name.clone(), value);
                }
                StmtKind::Assign { target, value } => match &target.kind {
                    ExprKind::Var(name) => {
                        let value = self.eval(value, env);
                        env.set(name.clone(), value);
                    }
                    _ => {
                        if let Some(base) = store_base(target) {
                            env.set(base, ConstLattice::Bottom);
                        }
                    }
                },
                _ => {}
            },
            CfgStmt::Condition(_) => {}
        }
    }
}

fn fold_unary(op: UnaryOp, value: &ConstValue) -> ConstLattice {
    match (op, value) {
        (UnaryOp::Neg, ConstValue::Num(n)) => ConstLattice::Constant(ConstValue::Num(-n)),
        (UnaryOp::Not, ConstValue::Bool(b)) => ConstLattice::Constant(ConstValue::Bool(!b)),
        _ => ConstLattice::Bottom,
    }
}

fn fold_binary(op: BinOp, left: &ConstValue, right: &ConstValue) -> ConstLattice {
    use ConstValue::{Bool, Num, Str};

    let value = match (op, left, right) {
        (BinOp::Add, Num(a), Num(b)) => Num(a + b),
        (BinOp::Add, Str(a), Str(b)) => Str(format!("{a}{b}")),
        (BinOp::Sub, Num(a), Num(b)) => Num(a - b),
        (BinOp::Mul, Num(a), Num(b)) => Num(a * b),
        (BinOp::Div | BinOp::Mod, Num(_), Num(b)) if *b == 0.0 => return ConstLattice::Bottom,
        (BinOp::Div, Num(a), Num(b)) => Num(a / b),
        (BinOp::Mod, Num(a), Num(b)) => Num(a % b),
        (BinOp::Lt, Num(a), Num(b)) => Bool(a < b),
        (BinOp::LtEq, Num(a), Num(b)) => Bool(a <= b),
        (BinOp::Gt, Num(a), Num(b)) => Bool(a > b),
        (BinOp::GtEq, Num(a), Num(b)) => Bool(a >= b),
        (BinOp::Eq, Num(a), Num(b)) => Bool(a == b),
        (BinOp::NotEq, Num(a), Num(b)) => Bool(a != b),
        (BinOp::Eq, a, b) => Bool(a == b),
        (BinOp::NotEq, a, b) => Bool(a != b),
        (BinOp::And, Bool(a), Bool(b)) => Bool(*a && *b),
        (BinOp::Or, Bool(a), Bool(b)) => Bool(*a || *b),
        _ => return ConstLattice::Bottom,
    };
    match value {
        Num(n) if !n.is_finite() => ConstLattice::Bottom,
        value => ConstLattice::Constant(value),
    }
}

impl DataflowAnalysis for ConstantPropagation {
    type Fact = ConstEnv;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn initial_value(&self, cfg: &Cfg) -> ConstEnv {
        let mut used = BTreeSet::new();
        let mut defined = BTreeSet::new();
        for stmt in cfg.blocks.values().flat_map(|block| &block.stmts) {
            used.extend(used_names(stmt));
            defined.extend(defined_names(stmt));
        }

        let mut env = ConstEnv::new();
        for name in used.difference(&defined) {
            env.set(name.clone(), ConstLattice::Bottom);
        }
        env
    }

    fn boundary_value(&self) -> ConstEnv {
        ConstEnv::new()
    }

    fn meet(&self, values: &[ConstEnv], _block: &BasicBlock) -> ConstEnv {
        values.iter().fold(ConstEnv::new(), |acc, env| acc.join(env))
    }

    fn transfer(&self, input: &ConstEnv, block: &BasicBlock) -> ConstEnv {
        let mut env = input.clone();
        for stmt in &block.stmts {
            self.apply(stmt, &mut env);
        }
        env
    }
}
