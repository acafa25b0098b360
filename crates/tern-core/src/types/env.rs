//! Persistent type environment
//!
//! A parent-pointer chain: extending pushes one frame in front of the current
//! head and shares the rest, so every earlier environment stays valid and
//! extension never copies.

use super::arena::TypeArena;
use super::ty::{TypeScheme, VarId};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

#[derive(Debug)]
struct Frame {
    name: String,
    scheme: TypeScheme,
    parent: Option<Arc<Frame>>,
}

#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    head: Option<Arc<Frame>>,
}

impl TypeEnv {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn extend(&self, name: impl Into<String>, scheme: TypeScheme) -> TypeEnv {
        TypeEnv {
            head: Some(Arc::new(Frame {
                name: name.into(),
                scheme,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeScheme> {
        self.frames().find(|frame| frame.name == name).map(|frame| &frame.scheme)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Visible bindings, innermost first, shadowed ones skipped
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &TypeScheme)> {
        let mut seen = HashSet::new();
        self.frames().filter_map(move |frame| {
            seen.insert(frame.name.as_str())
                .then_some((frame.name.as_str(), &frame.scheme))
        })
    }

    /// Union over visible schemes of their body's free vars minus the
    /// scheme's own quantified vars
    pub fn free_vars(&self, arena: &mut TypeArena) -> BTreeSet<VarId> {
        self.free_vars_except(arena, None)
    }

    /// As [`free_vars`](Self::free_vars), ignoring the binding of `skip`
    pub fn free_vars_except(&self, arena: &mut TypeArena, skip: Option<&str>) -> BTreeSet<VarId> {
        let mut vars = BTreeSet::new();
        for (name, scheme) in self.bindings() {
            if Some(name) == skip {
                continue;
            }
            let body_vars = arena.free_vars(scheme.body);
            vars.extend(body_vars.difference(&scheme.vars).copied());
        }
        vars
    }

    pub fn len(&self) -> usize {
        self.bindings().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }
}
