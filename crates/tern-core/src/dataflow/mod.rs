//! Control-flow graphs and dataflow analysis
//!
//! This module implements:
//! - CFG construction from surface statements, with break/continue resolved
//!   to the innermost loop
//! - A direction-parametrised, worklist-based fixpoint solver
//! - Reaching definitions, live variables and constant propagation

mod builder;
mod cfg;
mod constants;
mod effects;
mod lattice;
mod liveness;
mod reaching;
mod solver;

pub use builder::CfgBuilder;
pub use cfg::{BasicBlock, BlockId, Cfg, CfgStmt};
pub use constants::ConstantPropagation;
pub use effects::{collect_body, collect_expr, defined_names, store_base, used_names};
pub use lattice::{ConstEnv, ConstLattice, ConstValue, NameSet};
pub use liveness::LiveVariables;
pub use reaching::ReachingDefinitions;
pub use solver::{analyze, DataflowAnalysis, DataflowResult, Direction, FixpointSolver};
