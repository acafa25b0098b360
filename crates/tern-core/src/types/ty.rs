//! The type universe
//!
//! Two representations live side by side:
//!
//! - [`TypeKind`] nodes stored in a [`TypeArena`](super::TypeArena) and named
//!   by [`TypeId`]. This is the working form during inference: variables are
//!   union-find slots that get bound in place.
//! - [`Type`], an owned tree with every bound variable substituted away. This
//!   is what leaves a session (typed tree, diagnostics, tests).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Handle to a node in a [`TypeArena`](super::TypeArena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a type variable (a slot in the binding table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'t{}", self.0)
    }
}

/// Arena node
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Var(VarId),
    Num,
    Bool,
    String,
    None,
    Unit,
    Fun(Vec<TypeId>, TypeId),
    Array(TypeId),
    Record(BTreeMap<String, TypeId>),
    Ref(TypeId),
}

/// Fully resolved, owned type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A variable still free after resolution
    Var(VarId),
    Num,
    Bool,
    String,
    None,
    Unit,
    Fun(Vec<Type>, Box<Type>),
    Array(Box<Type>),
    Record(BTreeMap<String, Type>),
    Ref(Box<Type>),
}

impl Type {
    pub fn fun(params: Vec<Type>, ret: Type) -> Self {
        Type::Fun(params, Box::new(ret))
    }

    pub fn array(elem: Type) -> Self {
        Type::Array(Box::new(elem))
    }

    pub fn reference(inner: Type) -> Self {
        Type::Ref(Box::new(inner))
    }

    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Type)>) -> Self {
        Type::Record(
            fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        )
    }

    /// True when no free variable remains anywhere inside
    pub fn is_ground(&self) -> bool {
        self.free_vars().is_empty()
    }

    pub fn free_vars(&self) -> BTreeSet<VarId> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut BTreeSet<VarId>) {
        match self {
            Type::Var(v) => {
                vars.insert(*v);
            }
            Type::Num | Type::Bool | Type::String | Type::None | Type::Unit => {}
            Type::Fun(params, ret) => {
                for param in params {
                    param.collect_vars(vars);
                }
                ret.collect_vars(vars);
            }
            Type::Array(inner) | Type::Ref(inner) => inner.collect_vars(vars),
            Type::Record(fields) => {
                for ty in fields.values() {
                    ty.collect_vars(vars);
                }
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(v) => write!(f, "{v}"),
            Type::Num => write!(f, "Num"),
            Type::Bool => write!(f, "Bool"),
            Type::String => write!(f, "String"),
            Type::None => write!(f, "None"),
            Type::Unit => write!(f, "Unit"),
            Type::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Array(elem) => write!(f, "[{elem}]"),
            Type::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
            Type::Ref(inner) => write!(f, "ref {inner}"),
        }
    }
}

/// `∀vars. body`
///
/// Only [`TypeArena::generalize`](super::TypeArena::generalize) creates
/// polymorphic schemes and only
/// [`TypeArena::instantiate`](super::TypeArena::instantiate) consumes them.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeScheme {
    pub vars: BTreeSet<VarId>,
    pub body: TypeId,
}

impl TypeScheme {
    pub fn monomorphic(body: TypeId) -> Self {
        Self {
            vars: BTreeSet::new(),
            body,
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        !self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_function() {
        let ty = Type::fun(vec![Type::Num, Type::Var(VarId(3))], Type::Bool);
        assert_eq!(ty.to_string(), "(Num, 't3) -> Bool");
    }

    #[test]
    fn test_display_record_is_sorted() {
        let ty = Type::record([("y", Type::Bool), ("x", Type::array(Type::Num))]);
        assert_eq!(ty.to_string(), "{x: [Num], y: Bool}");
    }

    #[test]
    fn test_free_vars() {
        let ty = Type::fun(
            vec![Type::Var(VarId(1))],
            Type::reference(Type::Var(VarId(2))),
        );
        assert_eq!(ty.free_vars(), BTreeSet::from([VarId(1), VarId(2)]));
        assert!(!ty.is_ground());
        assert!(Type::array(Type::String).is_ground());
    }
}
