//! Tests for CFG construction and the built-in dataflow analyses

use std::collections::HashSet;
use tern_core::ast::build::*;
use tern_core::ast::{BinOp, FunctionDecl, Program, Stmt};
use tern_core::dataflow::{
    analyze, BlockId, Cfg, CfgBuilder, ConstValue, ConstantPropagation, Direction, LiveVariables,
    ReachingDefinitions,
};

fn count_fn() -> FunctionDecl {
    function_decl(
        "count",
        &["n"],
        vec![
            let_("i", num(0.0)),
            while_(
                binary(BinOp::Lt, var("i"), var("n")),
                vec![assign("i", binary(BinOp::Add, var("i"), num(1.0)))],
            ),
            ret(Some(var("i"))),
        ],
    )
}

/// Successor and predecessor lists mirror each other, every block but the
/// exit is reachable from the entry, and no edge points at a missing block.
fn assert_well_formed(cfg: &Cfg) {
    let reachable: HashSet<BlockId> = cfg.reverse_postorder().into_iter().collect();
    for block in cfg.blocks.values() {
        for succ in &block.successors {
            let target = cfg.block(*succ).expect("edge to missing block");
            assert!(target.predecessors.contains(&block.id), "{} -> {succ} not mirrored", block.id);
        }
        for pred in &block.predecessors {
            let source = cfg.block(*pred).expect("edge from missing block");
            assert!(source.successors.contains(&block.id), "{pred} -> {} not mirrored", block.id);
        }
        assert!(
            block.id == cfg.exit || reachable.contains(&block.id),
            "{} is unreachable",
            block.id
        );
    }
}

#[test]
fn test_function_cfg_snapshot() {
    let cfg = CfgBuilder::new().build_for_function(&count_fn());
    assert_well_formed(&cfg);
    insta::assert_snapshot!(cfg.to_string(), @r"
    B0 (entry):
        param n
        -> B2

    B1 (exit):

    B2:
        let i = 0
        -> B3

    B3:
        branch (i < n)
        -> B4, B5

    B4:
        i = (i + 1)
        -> B3

    B5:
        -> B6

    B6:
        return i
        -> B1
    ");
}

#[test]
fn test_live_variables_snapshot() {
    let cfg = CfgBuilder::new().build_for_function(&count_fn());
    let live = analyze(&LiveVariables, &cfg);
    assert_eq!(live.direction, Direction::Backward);
    assert!(live.converged);
    insta::assert_snapshot!(live.to_string(), @r"
    B0: in {} out {n}
    B1: in {} out {}
    B2: in {n} out {i, n}
    B3: in {i, n} out {i, n}
    B4: in {i, n} out {i, n}
    B5: in {i} out {i}
    B6: in {i} out {}
    ");
}

#[test]
fn test_reaching_definitions_snapshot() {
    let cfg = CfgBuilder::new().build_for_function(&count_fn());
    let reaching = analyze(&ReachingDefinitions, &cfg);
    insta::assert_snapshot!(reaching.to_string(), @r"
    B0: in {} out {n}
    B1: in {i, n} out {i, n}
    B2: in {n} out {i, n}
    B3: in {i, n} out {i, n}
    B4: in {i, n} out {i, n}
    B5: in {i, n} out {i, n}
    B6: in {i, n} out {i, n}
    ");
}

#[test]
fn test_constant_propagation_snapshot() {
    let cfg = CfgBuilder::new().build_for_function(&count_fn());
    let constants = analyze(&ConstantPropagation, &cfg);
    insta::assert_snapshot!(constants.to_string(), @r"
    B0: in {} out {n = ⊥}
    B1: in {i = ⊥, n = ⊥} out {i = ⊥, n = ⊥}
    B2: in {n = ⊥} out {i = 0, n = ⊥}
    B3: in {i = ⊥, n = ⊥} out {i = ⊥, n = ⊥}
    B4: in {i = ⊥, n = ⊥} out {i = ⊥, n = ⊥}
    B5: in {i = ⊥, n = ⊥} out {i = ⊥, n = ⊥}
    B6: in {i = ⊥, n = ⊥} out {i = ⊥, n = ⊥}
    ");
}

#[test]
fn test_straight_line_facts() {
    let stmts = vec![
        let_("x", num(10.0)),
        let_("y", binary(BinOp::Mul, var("x"), num(2.0))),
        expr_stmt(call("print", vec![var("y")])),
    ];
    let cfg = CfgBuilder::new().build_for_stmts(&stmts);
    assert_well_formed(&cfg);

    let reaching = analyze(&ReachingDefinitions, &cfg);
    assert_eq!(reaching.out_fact(cfg.exit).unwrap().to_string(), "{x, y}");

    let constants = analyze(&ConstantPropagation, &cfg);
    let exit = constants.out_fact(cfg.exit).unwrap();
    assert_eq!(exit.constant("y"), Some(&ConstValue::Num(20.0)));

    let live = analyze(&LiveVariables, &cfg);
    assert_eq!(live.in_fact(cfg.entry).unwrap().to_string(), "{print}");
}

#[test]
fn test_nested_jumps_resolve_to_innermost_loop() {
    let stmts = vec![while_(
        var("outer"),
        vec![
            while_(
                var("inner"),
                vec![if_(var("stop"), vec![break_()], Some(vec![continue_()]))],
            ),
            assign("k", num(1.0)),
        ],
    )];
    let cfg = CfgBuilder::new().build_for_stmts(&stmts);
    assert_well_formed(&cfg);

    // B2 outer header, B3 inner header, B4 if, B5 break, B6 continue,
    // B7 inner merge, B8 assignment, B9 outer merge
    let succs = |id: usize| cfg.block(BlockId(id)).unwrap().successors.clone();
    assert_eq!(succs(2), vec![BlockId(3), BlockId(9)]);
    assert_eq!(succs(3), vec![BlockId(4), BlockId(7)]);
    assert_eq!(succs(5), vec![BlockId(7)]);
    assert_eq!(succs(6), vec![BlockId(3)]);
    assert_eq!(succs(8), vec![BlockId(2)]);
    assert_eq!(succs(9), vec![cfg.exit]);
}

#[test]
fn test_code_after_return_is_dropped() {
    let func = function_decl(
        "f",
        &[],
        vec![ret(Some(num(1.0))), expr_stmt(call("print", vec![num(2.0)]))],
    );
    let cfg = CfgBuilder::new().build_for_function(&func);
    assert_well_formed(&cfg);
    assert_eq!(cfg.len(), 3);
    assert!(!cfg.to_string().contains("print"));
}

#[test]
fn test_loop_tail_after_break_is_dropped() {
    let stmts = vec![while_(var("c"), vec![break_(), assign("x", num(1.0))])];
    let cfg = CfgBuilder::new().build_for_stmts(&stmts);
    assert_well_formed(&cfg);
    assert!(!cfg.to_string().contains("x = 1"));
}

#[test]
fn test_stray_break_goes_to_exit() {
    let cfg = CfgBuilder::new().build_for_stmts(&[let_("a", num(1.0)), break_()]);
    assert_well_formed(&cfg);
    assert!(cfg.block(cfg.exit).unwrap().predecessors.contains(&BlockId(3)));
}

#[test]
fn test_program_cfg_skips_function_bodies() {
    let program = Program::single(vec![
        function("f", &["a"], vec![let_("hidden", var("a"))]),
        let_("x", num(1.0)),
    ]);
    let cfg = CfgBuilder::new().build_for_program(&program);
    assert_well_formed(&cfg);
    assert_eq!(cfg.len(), 3);
    assert!(!cfg.to_string().contains("hidden"));
}

#[test]
fn test_analyses_are_deterministic() {
    let stmts: Vec<Stmt> = vec![
        let_("a", num(1.0)),
        if_(
            var("c"),
            vec![assign("a", num(2.0))],
            Some(vec![while_(var("d"), vec![assign("b", var("a"))])]),
        ),
        expr_stmt(var("a")),
    ];
    let first = CfgBuilder::new().build_for_stmts(&stmts);
    let second = CfgBuilder::new().build_for_stmts(&stmts);
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(analyze(&LiveVariables, &first), analyze(&LiveVariables, &second));
    assert_eq!(analyze(&ConstantPropagation, &first), analyze(&ConstantPropagation, &second));
}
