//! # Tern Analysis
//!
//! Whole-program analysis driver for Tern. Runs type inference and typed
//! lowering from `tern-core`, builds a control-flow graph for the top-level
//! statements and for each top-level function, and solves reaching
//! definitions, live variables and constant propagation over every graph.
//!
//! ## Modules
//!
//! - **[`report`]** - [`Analyzer`] and the serialisable [`AnalysisReport`]
//! - **[`findings`]** - Dead stores and constant branch conditions
//!
//! ## Quick Start
//!
//! ```rust
//! use tern_analysis::prelude::*;
//! use tern_core::ast::build::*;
//! use tern_core::ast::{BinOp, Program};
//!
//! let program = Program::single(vec![
//!     let_("x", num(10.0)),
//!     let_("y", binary(BinOp::Mul, var("x"), num(2.0))),
//!     expr_stmt(call("print", vec![var("y")])),
//! ]);
//!
//! let report = Analyzer::new().analyze(&program);
//! assert!(report.is_well_typed());
//! assert_eq!(report.top_level.cyclomatic_complexity, 1);
//! assert_eq!(report.findings().count(), 0);
//! ```

pub mod findings;
pub mod report;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::findings::Finding;
    pub use crate::report::{AnalysisReport, Analyzer, FunctionReport, GraphReport, ReportError};
}

pub use findings::Finding;
pub use report::{AnalysisReport, Analyzer, FunctionReport, GraphReport, ReportError};
