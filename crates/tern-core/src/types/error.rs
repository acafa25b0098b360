//! Type errors
//!
//! [`UnifyError`] is what the unifier itself reports: it knows the two types
//! but not where in the program they came from. The inference walkers attach
//! the span of the node being checked and collect the result as a
//! [`TypeError`].

use super::ty::{Type, VarId};
use crate::ast::Span;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnifyError {
    #[error("cannot unify {expected} with {found}")]
    Mismatch { expected: Type, found: Type },

    #[error("arity mismatch: expected {expected} parameter(s), found {found}")]
    Arity { expected: usize, found: usize },

    #[error("cannot unify records with different fields: {{{}}} vs {{{}}}", .expected.join(", "), .found.join(", "))]
    FieldMismatch { expected: Vec<String>, found: Vec<String> },

    #[error("infinite type: {var} occurs in {ty}")]
    InfiniteType { var: VarId, ty: Type },
}

/// Error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeErrorKind {
    /// Variable or function referenced but not in scope
    UndefinedName,
    /// Incompatible ground types, record field-set mismatch or arity mismatch
    UnificationFailure,
    /// Occurs-check violation
    InfiniteType,
    /// Field access on a known record type that lacks the field
    UndefinedField,
}

/// A located, collected diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{span}: {message}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
    pub message: String,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn undefined_name(name: &str, span: Span) -> Self {
        Self::new(TypeErrorKind::UndefinedName, span, format!("undefined variable: {name}"))
    }

    pub fn undefined_field(field: &str, record: &Type, span: Span) -> Self {
        Self::new(
            TypeErrorKind::UndefinedField,
            span,
            format!("undefined field `{field}` on {record}"),
        )
    }

    pub fn from_unify(err: UnifyError, span: Span) -> Self {
        let kind = match err {
            UnifyError::InfiniteType { .. } => TypeErrorKind::InfiniteType,
            UnifyError::Mismatch { .. } | UnifyError::Arity { .. } | UnifyError::FieldMismatch { .. } => {
                TypeErrorKind::UnificationFailure
            }
        };
        Self::new(kind, span, err.to_string())
    }
}
