//! Property tests for unification, inference and the dataflow solver

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tern_core::ast::build::*;
use tern_core::ast::{BinOp, Expr, Program, Stmt};
use tern_core::dataflow::{
    BlockId, CfgBuilder, ConstantPropagation, DataflowAnalysis, FixpointSolver, LiveVariables, ReachingDefinitions,
};
use tern_core::types::{unify_types, Type, TypeArena, UnifyError, VarId};
use tern_core::{infer_program, lower_program, SolverConfig, WorklistOrder};

fn arb_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Num),
        Just(Type::Bool),
        Just(Type::String),
        Just(Type::None),
        Just(Type::Unit),
        (0u32..4).prop_map(|v| Type::Var(VarId(v))),
    ];
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::array),
            inner.clone().prop_map(Type::reference),
            (prop::collection::vec(inner.clone(), 0..3), inner.clone()).prop_map(|(p, r)| Type::fun(p, r)),
            prop::collection::btree_map("[a-d]", inner, 0..3).prop_map(Type::Record),
        ]
    })
}

fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        (0u8..4).prop_map(|n| num(f64::from(n))),
        any::<bool>().prop_map(boolean),
        "[abc]".prop_map(|name| var(&name)),
    ];
    leaf.prop_recursive(2, 8, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| binary(BinOp::Add, l, r)),
            (inner.clone(), inner).prop_map(|(l, r)| binary(BinOp::Lt, l, r)),
        ]
    })
}

fn arb_stmts() -> impl Strategy<Value = Vec<Stmt>> {
    let simple = prop_oneof![
        4 => ("[abc]", arb_expr()).prop_map(|(name, e)| assign(&name, e)),
        2 => ("[abc]", arb_expr()).prop_map(|(name, e)| let_(&name, e)),
        1 => arb_expr().prop_map(expr_stmt),
        1 => Just(break_()),
        1 => Just(continue_()),
    ];
    let stmt = simple.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (
                arb_expr(),
                prop::collection::vec(inner.clone(), 0..3),
                prop::option::of(prop::collection::vec(inner.clone(), 0..3)),
            )
                .prop_map(|(c, t, e)| if_(c, t, e)),
            (arb_expr(), prop::collection::vec(inner, 0..3)).prop_map(|(c, b)| while_(c, b)),
        ]
    });
    prop::collection::vec(stmt, 0..6)
}

fn insertion_solver() -> FixpointSolver {
    FixpointSolver::with_config(SolverConfig {
        worklist_order: WorklistOrder::Insertion,
        ..SolverConfig::default()
    })
}

fn same_fixpoint<A>(analysis: &A, stmts: &[Stmt]) -> Result<(), TestCaseError>
where
    A: DataflowAnalysis,
    A::Fact: std::fmt::Debug,
{
    let cfg = CfgBuilder::new().build_for_stmts(stmts);
    let rpo = FixpointSolver::new().solve(analysis, &cfg);
    let again = FixpointSolver::new().solve(analysis, &cfg);
    let insertion = insertion_solver().solve(analysis, &cfg);
    prop_assert!(rpo.converged);
    prop_assert_eq!(&rpo.in_facts, &again.in_facts);
    prop_assert_eq!(&rpo.out_facts, &again.out_facts);
    prop_assert_eq!(&rpo.in_facts, &insertion.in_facts);
    prop_assert_eq!(&rpo.out_facts, &insertion.out_facts);
    Ok(())
}

proptest! {
    #[test]
    fn resolution_is_idempotent(ty in arb_type()) {
        let mut arena = TypeArena::new();
        let id = arena.from_type(&ty, &mut HashMap::new());
        let root = arena.resolve(id);
        prop_assert_eq!(arena.resolve(root), root);

        let once = arena.to_type(id);
        let twice = arena.to_type(root);
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.free_vars().len(), ty.free_vars().len());
    }

    #[test]
    fn unification_makes_types_equal(a in arb_type(), b in arb_type()) {
        let mut arena = TypeArena::new();
        let mut vars = HashMap::new();
        let ia = arena.from_type(&a, &mut vars);
        let ib = arena.from_type(&b, &mut vars);
        if unify_types(&mut arena, ia, ib).is_ok() {
            prop_assert_eq!(arena.to_type(ia), arena.to_type(ib));
        }
    }

    #[test]
    fn unification_success_is_symmetric(a in arb_type(), b in arb_type()) {
        let forward = {
            let mut arena = TypeArena::new();
            let mut vars = HashMap::new();
            let (ia, ib) = (arena.from_type(&a, &mut vars), arena.from_type(&b, &mut vars));
            unify_types(&mut arena, ia, ib).is_ok()
        };
        let backward = {
            let mut arena = TypeArena::new();
            let mut vars = HashMap::new();
            let (ia, ib) = (arena.from_type(&a, &mut vars), arena.from_type(&b, &mut vars));
            unify_types(&mut arena, ib, ia).is_ok()
        };
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn occurs_check_rejects_cycles(ty in arb_type()) {
        let mut arena = TypeArena::new();
        let mut vars = HashMap::new();
        let wrapped = Type::fun(vec![Type::Var(VarId(0))], ty);
        let id = arena.from_type(&wrapped, &mut vars);
        let var = vars[&VarId(0)];
        let err = unify_types(&mut arena, var, id).unwrap_err();
        prop_assert!(matches!(err, UnifyError::InfiniteType { .. }), "{}", err);
    }

    #[test]
    fn records_need_identical_fields(
        left in prop::collection::btree_map("[a-d]", Just(Type::Num), 0..4),
        right in prop::collection::btree_map("[a-d]", Just(Type::Num), 0..4),
    ) {
        prop_assume!(left.keys().ne(right.keys()));
        let mut arena = TypeArena::new();
        let mut vars = HashMap::new();
        let l = arena.from_type(&Type::Record(left), &mut vars);
        let r = arena.from_type(&Type::Record(right), &mut vars);
        let err = unify_types(&mut arena, l, r).unwrap_err();
        prop_assert!(matches!(err, UnifyError::FieldMismatch { .. }), "{}", err);
    }

    #[test]
    fn lowering_reports_the_same_errors(stmts in arb_stmts()) {
        let program = Program::single(stmts);
        let (_, lowered) = lower_program(&program);
        prop_assert_eq!(lowered, infer_program(&program));
    }

    #[test]
    fn cfg_edges_are_mirrored_and_reachable(stmts in arb_stmts()) {
        let cfg = CfgBuilder::new().build_for_stmts(&stmts);
        let reachable: HashSet<BlockId> = cfg.reverse_postorder().into_iter().collect();
        for block in cfg.blocks.values() {
            for succ in &block.successors {
                prop_assert!(cfg.block(*succ).is_some_and(|b| b.predecessors.contains(&block.id)));
            }
            for pred in &block.predecessors {
                prop_assert!(cfg.block(*pred).is_some_and(|b| b.successors.contains(&block.id)));
            }
            prop_assert!(block.id == cfg.exit || reachable.contains(&block.id));
        }
    }

    #[test]
    fn reaching_definitions_fixpoint_is_order_independent(stmts in arb_stmts()) {
        same_fixpoint(&ReachingDefinitions, &stmts)?;
    }

    #[test]
    fn live_variables_fixpoint_is_order_independent(stmts in arb_stmts()) {
        same_fixpoint(&LiveVariables, &stmts)?;
    }

    #[test]
    fn constant_propagation_fixpoint_is_order_independent(stmts in arb_stmts()) {
        same_fixpoint(&ConstantPropagation, &stmts)?;
    }
}

#[test]
fn record_fields_are_order_insensitive() {
    let mut arena = TypeArena::new();
    let mut vars = HashMap::new();
    let fields: BTreeMap<String, Type> = [("b".to_string(), Type::Bool), ("a".to_string(), Type::Num)].into();
    let l = arena.from_type(&Type::Record(fields.clone()), &mut vars);
    let r = arena.from_type(&Type::record([("a", Type::Num), ("b", Type::Bool)]), &mut vars);
    assert!(unify_types(&mut arena, l, r).is_ok());
    assert_eq!(arena.to_type(l), Type::Record(fields));
}
