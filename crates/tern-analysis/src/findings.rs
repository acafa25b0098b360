//! Diagnostics derived from dataflow facts
//!
//! Every CFG block holds at most one statement, so a block's IN and OUT facts
//! are also the facts just before and just after that statement.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tern_core::ast::{Span, Stmt, StmtKind};
use tern_core::dataflow::{
    collect_body, defined_names, used_names, BlockId, Cfg, CfgStmt, ConstEnv, ConstLattice, ConstValue,
    ConstantPropagation, DataflowResult, NameSet,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A value is stored to a variable that no path reads afterwards
    DeadStore { block: BlockId, name: String, span: Span },
    /// A branch condition folds to the same boolean on every path
    ConstantCondition { block: BlockId, value: bool, span: Span },
}

impl Finding {
    pub fn block(&self) -> BlockId {
        match self {
            Finding::DeadStore { block, .. } | Finding::ConstantCondition { block, .. } => *block,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::DeadStore { block, name, .. } => {
                write!(f, "{block}: value stored to `{name}` is never read")
            }
            Finding::ConstantCondition { block, value, .. } => {
                write!(f, "{block}: condition is always {value}")
            }
        }
    }
}

/// Names read by function declarations anywhere in `body`. Such reads are
/// invisible to the enclosing graph, so stores to these names are never
/// reported as dead.
pub fn captured_names(body: &[Stmt]) -> BTreeSet<String> {
    let mut captured = BTreeSet::new();
    collect_declarations(body, &mut captured);
    captured
}

fn collect_declarations(body: &[Stmt], out: &mut BTreeSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Function(_) => collect_body(std::slice::from_ref(stmt), out),
            StmtKind::If {
                then_body, else_body, ..
            } => {
                collect_declarations(then_body, out);
                if let Some(body) = else_body {
                    collect_declarations(body, out);
                }
            }
            StmtKind::While { body, .. } => collect_declarations(body, out),
            _ => {}
        }
    }
}

/// `let` and assignment statements whose variable is dead right after them
pub fn dead_stores(cfg: &Cfg, live: &DataflowResult<NameSet>, captured: &BTreeSet<String>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for block in cfg.blocks.values() {
        let Some(live_out) = live.out_fact(block.id) else {
            continue;
        };
        let mut live_after = live_out.clone();
        let mut found = Vec::new();

        for stmt in block.stmts.iter().rev() {
            let defs = defined_names(stmt);
            if let CfgStmt::Stmt(s) = stmt {
                for name in &defs {
                    if !live_after.contains(name) && !captured.contains(name) {
                        found.push(Finding::DeadStore {
                            block: block.id,
                            name: name.clone(),
                            span: s.span,
                        });
                    }
                }
            }
            for name in &defs {
                live_after.remove(name);
            }
            for name in used_names(stmt) {
                live_after.insert(name);
            }
        }

        found.reverse();
        findings.extend(found);
    }
    findings
}

/// Branch conditions that evaluate to a known boolean
pub fn constant_conditions(cfg: &Cfg, constants: &DataflowResult<ConstEnv>) -> Vec<Finding> {
    let analysis = ConstantPropagation::new();
    let mut findings = Vec::new();
    for block in cfg.blocks.values() {
        let Some(env) = constants.in_fact(block.id) else {
            continue;
        };
        for stmt in &block.stmts {
            let CfgStmt::Condition(cond) = stmt else {
                continue;
            };
            if let ConstLattice::Constant(ConstValue::Bool(value)) = analysis.eval(cond, env) {
                findings.push(Finding::ConstantCondition {
                    block: block.id,
                    value,
                    span: cond.span,
                });
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_core::ast::build::*;
    use tern_core::ast::BinOp;
    use tern_core::dataflow::{analyze, CfgBuilder, LiveVariables};

    fn dead(stmts: &[Stmt]) -> Vec<String> {
        let cfg = CfgBuilder::new().build_for_stmts(stmts);
        let live = analyze(&LiveVariables, &cfg);
        dead_stores(&cfg, &live, &captured_names(stmts))
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_overwritten_value_is_dead() {
        let found = dead(&[
            let_("x", num(1.0)),
            assign("x", num(2.0)),
            expr_stmt(call("print", vec![var("x")])),
        ]);
        assert_eq!(found, vec!["B2: value stored to `x` is never read"]);
    }

    #[test]
    fn test_read_in_loop_is_not_dead() {
        let found = dead(&[
            let_("i", num(0.0)),
            while_(
                binary(BinOp::Lt, var("i"), num(3.0)),
                vec![assign("i", binary(BinOp::Add, var("i"), num(1.0)))],
            ),
        ]);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_captured_by_declaration_is_not_dead() {
        let found = dead(&[
            let_("step", num(2.0)),
            function("inc", &["n"], vec![ret(Some(binary(BinOp::Add, var("n"), var("step"))))]),
        ]);
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn test_shadowed_in_lambda_is_still_dead() {
        let found = dead(&[
            let_("x", num(1.0)),
            let_(
                "show",
                lambda(
                    &[],
                    vec![
                        let_("x", string("local")),
                        expr_stmt(call("print", vec![var("x")])),
                    ],
                ),
            ),
            expr_stmt(call("show", vec![])),
        ]);
        assert_eq!(found, vec!["B2: value stored to `x` is never read"]);
    }

    #[test]
    fn test_constant_condition() {
        let stmts = [
            let_("debug", boolean(false)),
            if_(var("debug"), vec![expr_stmt(call("print", vec![string("on")]))], None),
            if_(var("flag"), vec![expr_stmt(call("print", vec![string("flag")]))], None),
        ];
        let cfg = CfgBuilder::new().build_for_stmts(&stmts);
        let constants = analyze(&ConstantPropagation, &cfg);
        let found: Vec<String> = constant_conditions(&cfg, &constants)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(found, vec!["B3: condition is always false"]);
    }
}
