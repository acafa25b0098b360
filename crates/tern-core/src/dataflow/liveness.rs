//! Live variables

use super::cfg::{BasicBlock, Cfg};
use super::effects::{defined_names, used_names};
use super::lattice::NameSet;
use super::solver::{DataflowAnalysis, Direction};

/// Backward analysis of which variables may be read before being redefined.
///
/// The transfer walks the block's statements last to first: a statement's
/// definitions stop being live above it and its uses become live.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariables;

impl LiveVariables {
    pub fn new() -> Self {
        Self
    }
}

impl DataflowAnalysis for LiveVariables {
    type Fact = NameSet;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn initial_value(&self, _cfg: &Cfg) -> NameSet {
        NameSet::new()
    }

    fn boundary_value(&self) -> NameSet {
        NameSet::new()
    }

    fn meet(&self, values: &[NameSet], _block: &BasicBlock) -> NameSet {
        NameSet::union_all(values)
    }

    fn transfer(&self, input: &NameSet, block: &BasicBlock) -> NameSet {
        let mut live = input.clone();
        for stmt in block.stmts.iter().rev() {
            for name in defined_names(stmt) {
                live.remove(&name);
            }
            for name in used_names(stmt) {
                live.insert(name);
            }
        }
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::BinOp;
    use crate::dataflow::{analyze, BlockId, CfgBuilder};

    #[test]
    fn test_use_keeps_definition_live() {
        // B2: let x = 1, B3: let y = (x + 1), B4: y
        let cfg = CfgBuilder::new().build_for_stmts(&[
            let_("x", num(1.0)),
            let_("y", binary(BinOp::Add, var("x"), num(1.0))),
            expr_stmt(var("y")),
        ]);
        let result = analyze(&LiveVariables, &cfg);
        assert_eq!(result.out_fact(BlockId(2)).unwrap().to_string(), "{x}");
        assert_eq!(result.out_fact(BlockId(3)).unwrap().to_string(), "{y}");
        assert_eq!(result.in_fact(BlockId(4)).unwrap().to_string(), "{y}");
        assert!(result.in_fact(cfg.entry).unwrap().is_empty());
    }

    #[test]
    fn test_callee_is_read() {
        let cfg = CfgBuilder::new().build_for_stmts(&[expr_stmt(call("print", vec![var("y")]))]);
        let result = analyze(&LiveVariables, &cfg);
        assert_eq!(result.in_fact(cfg.entry).unwrap().to_string(), "{print, y}");
    }

    #[test]
    fn test_loop_variable_live_around_back_edge() {
        let cfg = CfgBuilder::new().build_for_stmts(&[
            let_("i", num(0.0)),
            while_(
                binary(BinOp::Lt, var("i"), num(3.0)),
                vec![assign("i", binary(BinOp::Add, var("i"), num(1.0)))],
            ),
        ]);
        let result = analyze(&LiveVariables, &cfg);
        let body = BlockId(4);
        assert!(result.out_fact(body).unwrap().contains("i"));
        assert!(result.in_fact(body).unwrap().contains("i"));
        assert!(!result.in_fact(cfg.entry).unwrap().contains("i"));
    }

    #[test]
    fn test_redefinition_kills_liveness() {
        let cfg = CfgBuilder::new().build_for_stmts(&[
            let_("x", num(1.0)),
            assign("x", num(2.0)),
            expr_stmt(var("x")),
        ]);
        let result = analyze(&LiveVariables, &cfg);
        assert!(result.out_fact(BlockId(2)).unwrap().is_empty());
    }
}
