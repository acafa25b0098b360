//! Configuration for inference sessions and the dataflow solver

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaConfig {
    /// Bring the builtin functions (`print`, `len`, `str`, `push`) into scope
    pub prelude: bool,
    pub solver: SolverConfig,
}

impl Default for SemaConfig {
    fn default() -> Self {
        Self {
            prelude: true,
            solver: SolverConfig::default(),
        }
    }
}

impl SemaConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_json_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Order in which blocks are first placed on the worklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorklistOrder {
    /// Reverse postorder for forward analyses, postorder for backward ones
    #[default]
    ReversePostorder,
    /// Block creation order
    Insertion,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Upper bound on worklist pops. `None` trusts the analysis to be
    /// monotone over a finite-height lattice.
    pub max_iterations: Option<usize>,
    pub worklist_order: WorklistOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SemaConfig::default();
        assert!(config.prelude);
        assert_eq!(config.solver.max_iterations, None);
        assert_eq!(config.solver.worklist_order, WorklistOrder::ReversePostorder);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SemaConfig::from_json_str(r#"{"solver": {"max_iterations": 50}}"#).unwrap();
        assert!(config.prelude);
        assert_eq!(config.solver.max_iterations, Some(50));
    }

    #[test]
    fn test_worklist_order_snake_case() {
        let config =
            SemaConfig::from_json_str(r#"{"prelude": false, "solver": {"worklist_order": "insertion"}}"#).unwrap();
        assert!(!config.prelude);
        assert_eq!(config.solver.worklist_order, WorklistOrder::Insertion);
    }

    #[test]
    fn test_invalid_json() {
        let err = SemaConfig::from_json_str("{ prelude: yes }").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"prelude": false}}"#).unwrap();
        let config = SemaConfig::from_file(file.path()).unwrap();
        assert!(!config.prelude);
    }

    #[test]
    fn test_from_missing_file() {
        let err = SemaConfig::from_file(Path::new("/nonexistent/tern.json")).unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }
}
