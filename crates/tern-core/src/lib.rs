//! # Tern Core
//!
//! Semantic analysis for the Tern teaching language: Hindley–Milner type
//! inference with let-polymorphism, lowering to a typed tree, control-flow
//! graph construction and a worklist dataflow framework.
//!
//! ## Quick Start
//!
//! ```rust
//! use tern_core::ast::build::*;
//! use tern_core::ast::{BinOp, Program};
//!
//! let program = Program::single(vec![
//!     let_("x", num(10.0)),
//!     let_("y", binary(BinOp::Mul, var("x"), num(2.0))),
//!     expr_stmt(call("print", vec![var("y")])),
//! ]);
//!
//! assert!(tern_core::infer_program(&program).is_empty());
//!
//! let (typed, errors) = tern_core::lower_program(&program);
//! assert!(errors.is_empty());
//! assert_eq!(typed.modules[0].body[1].to_string(), "let y: Num = (x * 2)\n");
//! ```

pub mod ast;
pub mod config;
pub mod dataflow;
pub mod infer;
pub mod prelude;
pub mod tir;
pub mod types;

pub use config::{ConfigError, SemaConfig, SolverConfig, WorklistOrder};
pub use infer::{InferenceSession, Inferencer};
pub use tir::{Lowerer, TypedProgram};

use ast::Program;
use types::TypeError;

/// Type-check `program` with the default configuration.
///
/// An empty list means the program is well typed.
pub fn infer_program(program: &Program) -> Vec<TypeError> {
    InferenceSession::new().infer_program(program)
}

/// Type-check `program` and build its typed tree.
///
/// The tree is returned even when errors were found; nodes touched by an
/// error carry placeholder types.
pub fn lower_program(program: &Program) -> (TypedProgram, Vec<TypeError>) {
    InferenceSession::new().lower_program(program)
}
