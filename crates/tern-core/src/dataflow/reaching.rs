//! Reaching definitions

use super::cfg::{BasicBlock, Cfg};
use super::effects::defined_names;
use super::lattice::NameSet;
use super::solver::{DataflowAnalysis, Direction};

/// Forward analysis of which variables may have been defined on some path
/// to each point.
///
/// Facts are sets of names: a redefinition kills the name and generates it
/// again, so OUT = (IN − kill) ∪ gen.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReachingDefinitions;

impl ReachingDefinitions {
    pub fn new() -> Self {
        Self
    }
}

impl DataflowAnalysis for ReachingDefinitions {
    type Fact = NameSet;

    fn direction(&self) -> Direction {
        Direction::Forward
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
        let mut out = input.clone();
        for stmt in &block.stmts {
            let defs = defined_names(stmt);
            for name in &defs {
                out.remove(name);
            }
            for name in defs {
                out.insert(name);
            }
        }
        out
    }
}
