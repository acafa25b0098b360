//! Dataflow analysis framework with worklist-based fixpoint solver

use super::cfg::{BasicBlock, BlockId, Cfg};
use crate::config::{SolverConfig, WorklistOrder};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use tracing::{debug, warn};

/// Direction of dataflow analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

/// Generic trait for dataflow analyses
///
/// The solver terminates only when the fact lattice has finite height and
/// both `meet` and `transfer` are monotone.
pub trait DataflowAnalysis {
    /// The type of facts being propagated
    type Fact: Clone + PartialEq;

    fn direction(&self) -> Direction;

    /// Fact at the graph boundary: entry for forward, exit for backward
    fn initial_value(&self, cfg: &Cfg) -> Self::Fact;

    /// Fact every other block starts from
    fn boundary_value(&self) -> Self::Fact;

    /// Combine the facts flowing in from neighbouring blocks
    fn meet(&self, values: &[Self::Fact], block: &BasicBlock) -> Self::Fact;

    /// The block's own effect on the incoming fact
    fn transfer(&self, input: &Self::Fact, block: &BasicBlock) -> Self::Fact;
}

/// Result of fixpoint computation
///
/// `in_facts` hold at the start of each block and `out_facts` at its end,
/// whatever the direction. Both maps follow block creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataflowResult<F> {
    pub in_facts: IndexMap<BlockId, F>,
    pub out_facts: IndexMap<BlockId, F>,
    pub direction: Direction,
    /// Blocks popped from the worklist
    pub iterations: usize,
    /// False only when the iteration cap stopped the solver
    pub converged: bool,
}

impl<F> DataflowResult<F> {
    pub fn in_fact(&self, block: BlockId) -> Option<&F> {
        self.in_facts.get(&block)
    }

    pub fn out_fact(&self, block: BlockId) -> Option<&F> {
        self.out_facts.get(&block)
    }
}

impl<F: fmt::Display> fmt::Display for DataflowResult<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (block, input) in &self.in_facts {
            write!(f, "{block}: in {input}")?;
            if let Some(output) = self.out_facts.get(block) {
                write!(f, " out {output}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Worklist-based fixpoint solver
#[derive(Debug, Clone, Default)]
pub struct FixpointSolver {
    config: SolverConfig,
}

impl FixpointSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Compute fixpoint for a dataflow analysis
    pub fn solve<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let result = match analysis.direction() {
            Direction::Forward => self.solve_forward(analysis, cfg),
            Direction::Backward => self.solve_backward(analysis, cfg),
        };
        debug!(
            analysis = std::any::type_name::<A>(),
            direction = %result.direction,
            iterations = result.iterations,
            converged = result.converged,
            "dataflow fixpoint"
        );
        result
    }

    /// Every block once, in the configured order; blocks the traversal
    /// misses follow in creation order
    fn initial_worklist(&self, cfg: &Cfg, direction: Direction) -> VecDeque<BlockId> {
        let mut order = match (self.config.worklist_order, direction) {
            (WorklistOrder::ReversePostorder, Direction::Forward) => cfg.reverse_postorder(),
            (WorklistOrder::ReversePostorder, Direction::Backward) => cfg.postorder(),
            (WorklistOrder::Insertion, _) => cfg.block_ids().collect(),
        };
        let seen: HashSet<BlockId> = order.iter().copied().collect();
        order.extend(cfg.block_ids().filter(|id| !seen.contains(id)));
        order.into()
    }

    /// Returns false once the configured cap is reached
    fn within_budget(&self, iterations: usize) -> bool {
        match self.config.max_iterations {
            Some(max) if iterations >= max => {
                warn!(max, "dataflow solver hit its iteration cap");
                false
            }
            _ => true,
        }
    }

    fn solve_forward<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let mut in_facts: IndexMap<BlockId, A::Fact> =
            cfg.block_ids().map(|id| (id, analysis.boundary_value())).collect();
        let mut out_facts = in_facts.clone();
        let initial = analysis.initial_value(cfg);
        in_facts.insert(cfg.entry, initial.clone());

        let mut worklist = self.initial_worklist(cfg, Direction::Forward);
        let mut in_worklist: HashSet<BlockId> = worklist.iter().copied().collect();
        let mut iterations = 0;
        let mut converged = true;

        while let Some(block_id) = worklist.pop_front() {
            in_worklist.remove(&block_id);
            if !self.within_budget(iterations) {
                converged = false;
                break;
            }
            iterations += 1;

            let Some(block) = cfg.block(block_id) else {
                continue;
            };

            let new_in = if block_id == cfg.entry {
                initial.clone()
            } else if block.predecessors.is_empty() {
                analysis.boundary_value()
            } else {
                let pred_facts: Vec<A::Fact> = block
                    .predecessors
                    .iter()
                    .filter_map(|pred| out_facts.get(pred).cloned())
                    .collect();
                analysis.meet(&pred_facts, block)
            };

            let new_out = analysis.transfer(&new_in, block);
            in_facts.insert(block_id, new_in);

            if out_facts.get(&block_id) != Some(&new_out) {
                out_facts.insert(block_id, new_out);
                for &succ in &block.successors {
                    if in_worklist.insert(succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }

        DataflowResult {
            in_facts,
            out_facts,
            direction: Direction::Forward,
            iterations,
            converged,
        }
    }

    /// Mirror of the forward solver: facts flow from successors' IN into a
    /// block's OUT, and the transfer produces its IN.
    fn solve_backward<A: DataflowAnalysis>(&self, analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let mut out_facts: IndexMap<BlockId, A::Fact> =
            cfg.block_ids().map(|id| (id, analysis.boundary_value())).collect();
        let mut in_facts = out_facts.clone();
        let initial = analysis.initial_value(cfg);
        out_facts.insert(cfg.exit, initial.clone());

        let mut worklist = self.initial_worklist(cfg, Direction::Backward);
        let mut in_worklist: HashSet<BlockId> = worklist.iter().copied().collect();
        let mut iterations = 0;
        let mut converged = true;

        while let Some(block_id) = worklist.pop_front() {
            in_worklist.remove(&block_id);
            if !self.within_budget(iterations) {
                converged = false;
                break;
            }
            iterations += 1;

            let Some(block) = cfg.block(block_id) else {
                continue;
            };

            let new_out = if block_id == cfg.exit {
                initial.clone()
            } else if block.successors.is_empty() {
                analysis.boundary_value()
            } else {
                let succ_facts: Vec<A::Fact> = block
                    .successors
                    .iter()
                    .filter_map(|succ| in_facts.get(succ).cloned())
                    .collect();
                analysis.meet(&succ_facts, block)
            };

            let new_in = analysis.transfer(&new_out, block);
            out_facts.insert(block_id, new_out);

            if in_facts.get(&block_id) != Some(&new_in) {
                in_facts.insert(block_id, new_in);
                for &pred in &block.predecessors {
                    if in_worklist.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }
        }

        DataflowResult {
            in_facts,
            out_facts,
            direction: Direction::Backward,
            iterations,
            converged,
        }
    }
}

/// Run `analysis` over `cfg` with the default solver configuration
pub fn analyze<A: DataflowAnalysis>(analysis: &A, cfg: &Cfg) -> DataflowResult<A::Fact> {
    FixpointSolver::new().solve(analysis, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::dataflow::CfgBuilder;

    /// Counts blocks on the longest acyclic path, capped to keep the
    /// lattice finite
    struct Depth;

    impl DataflowAnalysis for Depth {
        type Fact = usize;

        fn direction(&self) -> Direction {
            Direction::Forward
        }

        fn initial_value(&self, _cfg: &Cfg) -> usize {
            0
        }

        fn boundary_value(&self) -> usize {
            0
        }

        fn meet(&self, values: &[usize], _block: &BasicBlock) -> usize {
            values.iter().copied().max().unwrap_or(0)
        }

        fn transfer(&self, input: &usize, _block: &BasicBlock) -> usize {
            (input + 1).min(50)
        }
    }

    #[test]
    fn test_forward_straight_line() {
        let cfg = CfgBuilder::new().build_for_stmts(&[let_("a", num(1.0)), let_("b", num(2.0))]);
        let result = analyze(&Depth, &cfg);
        assert!(result.converged);
        assert_eq!(result.in_fact(cfg.entry), Some(&0));
        assert_eq!(result.out_fact(cfg.exit), Some(&4));
    }

    #[test]
    fn test_loop_reaches_cap_and_converges() {
        let cfg = CfgBuilder::new().build_for_stmts(&[while_(var("c"), vec![assign("x", num(1.0))])]);
        let result = analyze(&Depth, &cfg);
        assert!(result.converged);
        assert_eq!(result.out_fact(cfg.exit), Some(&50));
    }

    #[test]
    fn test_iteration_cap_stops_solver() {
        let cfg = CfgBuilder::new().build_for_stmts(&[while_(var("c"), vec![assign("x", num(1.0))])]);
        let solver = FixpointSolver::with_config(SolverConfig {
            max_iterations: Some(3),
            ..SolverConfig::default()
        });
        let result = solver.solve(&Depth, &cfg);
        assert!(!result.converged);
        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_insertion_order_reaches_same_fixpoint() {
        let cfg = CfgBuilder::new().build_for_stmts(&[
            let_("i", num(0.0)),
            while_(var("c"), vec![if_(var("d"), vec![break_()], None)]),
        ]);
        let rpo = analyze(&Depth, &cfg);
        let insertion = FixpointSolver::with_config(SolverConfig {
            worklist_order: WorklistOrder::Insertion,
            ..SolverConfig::default()
        })
        .solve(&Depth, &cfg);
        assert_eq!(rpo.in_facts, insertion.in_facts);
        assert_eq!(rpo.out_facts, insertion.out_facts);
    }
}
