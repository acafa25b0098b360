//! Whole-program analysis reports
//!
//! [`Analyzer::analyze`] type-checks and lowers a program, then builds one
//! control-flow graph for the top-level statements and one per top-level
//! function and runs reaching definitions, live variables and constant
//! propagation over each.

use crate::findings::{captured_names, constant_conditions, dead_stores, Finding};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tern_core::ast::{Program, Stmt};
use tern_core::dataflow::{
    Cfg, CfgBuilder, ConstEnv, ConstantPropagation, DataflowResult, FixpointSolver, LiveVariables, NameSet,
    ReachingDefinitions,
};
use tern_core::tir::TypedStmtKind;
use tern_core::types::{Type, TypeError};
use tern_core::{InferenceSession, SemaConfig, TypedProgram};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialise report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub errors: Vec<TypeError>,
    pub program: TypedProgram,
    /// Graph of every module's top-level statements
    pub top_level: GraphReport,
    pub functions: Vec<FunctionReport>,
}

impl AnalysisReport {
    pub fn is_well_typed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionReport> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Findings from every graph, top level first
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.top_level
            .findings
            .iter()
            .chain(self.functions.iter().flat_map(|f| f.graph.findings.iter()))
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionReport {
    pub name: String,
    pub module: String,
    pub parameters: usize,
    /// Inferred type, with free variables left as `'tN`
    pub signature: Type,
    pub graph: GraphReport,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    pub blocks: usize,
    pub edges: usize,
    /// `edges - blocks + 2`
    pub cyclomatic_complexity: usize,
    /// Pretty-printed graph
    pub cfg: String,
    pub reaching: DataflowResult<NameSet>,
    pub live: DataflowResult<NameSet>,
    pub constants: DataflowResult<ConstEnv>,
    pub findings: Vec<Finding>,
}

/// Runs inference, lowering and the dataflow analyses over whole programs
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: SemaConfig,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SemaConfig) -> Self {
        Self { config }
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self::with_config(SemaConfig::from_file(path)?))
    }

    pub fn config(&self) -> &SemaConfig {
        &self.config
    }

    pub fn analyze(&self, program: &Program) -> AnalysisReport {
        let mut session = InferenceSession::with_config(&self.config);
        let (typed, errors) = session.lower_program(program);

        let top_level_stmts: Vec<Stmt> = program.modules.iter().flat_map(|m| m.body.iter().cloned()).collect();
        let top_level = self.analyze_graph(
            "<program>",
            CfgBuilder::new().build_for_program(program),
            &top_level_stmts,
        );

        let mut functions = Vec::new();
        for (module, typed_module) in program.modules.iter().zip(&typed.modules) {
            let signatures = typed_module.body.iter().filter_map(|stmt| match &stmt.kind {
                TypedStmtKind::Function(func) => Some(func.ty.clone()),
                _ => None,
            });
            for (func, signature) in module.functions().zip(signatures) {
                let cfg = CfgBuilder::new().build_for_function(func);
                functions.push(FunctionReport {
                    name: func.name.clone(),
                    module: module.name.clone(),
                    parameters: func.params.len(),
                    signature,
                    graph: self.analyze_graph(&func.name, cfg, &func.body),
                });
            }
        }

        info!(
            modules = program.modules.len(),
            functions = functions.len(),
            errors = errors.len(),
            "analysed program"
        );

        AnalysisReport {
            errors,
            program: typed,
            top_level,
            functions,
        }
    }

    fn analyze_graph(&self, name: &str, cfg: Cfg, body: &[Stmt]) -> GraphReport {
        let solver = FixpointSolver::with_config(self.config.solver.clone());
        let reaching = solver.solve(&ReachingDefinitions, &cfg);
        let live = solver.solve(&LiveVariables, &cfg);
        let constants = solver.solve(&ConstantPropagation, &cfg);

        let mut findings = dead_stores(&cfg, &live, &captured_names(body));
        findings.extend(constant_conditions(&cfg, &constants));
        findings.sort_by_key(Finding::block);

        let blocks = cfg.len();
        let edges: usize = cfg.blocks.values().map(|b| b.successors.len()).sum();
        debug!(graph = name, blocks, edges, findings = findings.len(), "analysed graph");

        GraphReport {
            blocks,
            edges,
            cyclomatic_complexity: (edges + 2).saturating_sub(blocks),
            cfg: cfg.to_string(),
            reaching,
            live,
            constants,
            findings,
        }
    }
}

impl fmt::Display for GraphReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "blocks {}, edges {}, complexity {}",
            self.blocks, self.edges, self.cyclomatic_complexity
        )?;
        writeln!(f, "{}", self.cfg.trim_end())?;
        writeln!(f, "reaching definitions:\n{}", self.reaching)?;
        writeln!(f, "live variables:\n{}", self.live)?;
        write!(f, "constants:\n{}", self.constants)?;
        for finding in &self.findings {
            writeln!(f, "warning: {finding}")?;
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {error}")?;
        }
        write!(f, "{}", self.program)?;
        writeln!(f, "\n== <program> ==")?;
        write!(f, "{}", self.top_level)?;
        for func in &self.functions {
            writeln!(f, "\n== {} :: {} ==", func.name, func.signature)?;
            write!(f, "{}", func.graph)?;
        }
        Ok(())
    }
}
